// Public site handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    models::PageFilter,
    services::{ResolvedPage, Resolution},
};

/// GET /
pub async fn home(State(state): State<AppState>) -> Response {
    match render_home(&state).await {
        Ok(html) => html.into_response(),
        Err(err) => error_page(&state, err).await,
    }
}

/// GET /{slug}
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let resolution = match state.resolver.resolve_slug(&slug).await {
        Ok(resolution) => resolution,
        Err(err) => return error_page(&state, err).await,
    };

    match resolution {
        Resolution::Redirect(location) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Resolution::Render(resolved) => match render(&state, &resolved).await {
            Ok(html) => html.into_response(),
            Err(err) => error_page(&state, err).await,
        },
    }
}

/// Any path no route matched
pub async fn fallback(State(state): State<AppState>) -> Response {
    not_found_page(&state).await
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pages = state.repository.count_all().await?;
    Ok(Json(json!({
        "status": "ok",
        "pages": pages
    })))
}

async fn render_home(state: &AppState) -> AppResult<Html<String>> {
    let resolved = state.resolver.resolve_root().await?;
    render(state, &resolved).await
}

async fn render(state: &AppState, resolved: &ResolvedPage) -> AppResult<Html<String>> {
    let navigation = state.repository.list(PageFilter::Published).await?;
    let html = state.renderer.render_page(resolved, &navigation).await?;
    Ok(Html(html))
}

/// Not-found renders the HTML 404 page; everything else keeps the JSON error body.
async fn error_page(state: &AppState, err: AppError) -> Response {
    match err {
        AppError::NotFound(reason) => {
            debug!(%reason, "serving 404 page");
            not_found_page(state).await
        }
        other => other.into_response(),
    }
}

async fn not_found_page(state: &AppState) -> Response {
    let rendered = match state.repository.list(PageFilter::Published).await {
        Ok(pages) => state.renderer.render_not_found(&pages),
        Err(err) => Err(err),
    };

    match rendered {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(err) => err.into_response(),
    }
}
