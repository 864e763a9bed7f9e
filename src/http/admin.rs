// Authoring API - JSON CRUD over pages

use axum::{extract::State, http::StatusCode, Json};

use super::extract::{ApiJson, ApiPath};
use crate::{
    app_state::AppState,
    core::PageId,
    error::{AppError, AppResult},
    models::{NewPage, Page, PageChanges, PageFilter},
};

/// GET /admin/api/pages
pub async fn list_pages(State(state): State<AppState>) -> AppResult<Json<Vec<Page>>> {
    let pages = state.repository.list(PageFilter::All).await?;
    Ok(Json(pages))
}

/// POST /admin/api/pages
pub async fn create_page(
    State(state): State<AppState>,
    ApiJson(new_page): ApiJson<NewPage>,
) -> AppResult<(StatusCode, Json<Page>)> {
    let page = state.repository.create(new_page).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

/// GET /admin/api/pages/{id}
pub async fn get_page(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Page>> {
    let id = PageId::new(id);
    state
        .repository
        .find(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Page {} not found", id)))
}

/// PATCH /admin/api/pages/{id}
pub async fn update_page(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<PageChanges>,
) -> AppResult<Json<Page>> {
    let page = state.repository.update(PageId::new(id), changes).await?;
    Ok(Json(page))
}

/// DELETE /admin/api/pages/{id}
pub async fn delete_page(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.repository.delete(PageId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/api/pages/{id}/homepage
pub async fn set_homepage(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Page>> {
    let page = state.repository.set_as_homepage(PageId::new(id)).await?;
    Ok(Json(page))
}
