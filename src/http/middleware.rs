// Bearer token guard for the authoring API

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{app_state::AppState, error::AppError};

/// Rejects the request unless it carries `Authorization: Bearer <ADMIN_TOKEN>`.
/// Without a configured token every request passes.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config.admin.token.as_deref() {
        match bearer_token(request.headers()) {
            Some(token) if token == expected => {}
            Some(_) => {
                warn!(path = %request.uri().path(), "rejected admin request with invalid token");
                return Err(AppError::Unauthorized("Invalid admin token".to_string()));
            }
            None => {
                warn!(path = %request.uri().path(), "rejected admin request without token");
                return Err(AppError::Unauthorized("Missing bearer token".to_string()));
            }
        }
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert_eq!(bearer_token(&headers), Some("secret"));
    }
}
