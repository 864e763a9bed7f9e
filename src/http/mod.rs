// HTTP surface - public site routes and the authoring API

pub mod admin;
pub mod extract;
pub mod middleware;
pub mod site;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub fn create_router(state: AppState) -> Router {
    let admin_api = Router::new()
        .route("/pages", get(admin::list_pages).post(admin::create_page))
        .route(
            "/pages/{id}",
            get(admin::get_page)
                .patch(admin::update_page)
                .delete(admin::delete_page),
        )
        .route("/pages/{id}/homepage", post(admin::set_homepage))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin_token,
        ));

    Router::new()
        .route("/", get(site::home))
        .route("/health", get(site::health))
        .route("/{slug}", get(site::show))
        .nest("/admin/api", admin_api)
        .fallback(site::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
