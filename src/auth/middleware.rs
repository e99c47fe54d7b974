//! Authentication filters
//!
//! First two links of the request pipeline: bearer validation and
//! organization membership. Later filters (tenant, workspace membership,
//! minimum role) build on the extensions these insert.

use crate::auth::{decode_token, Claims};
use crate::error::AppError;
use crate::state::SharedState;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Validate the bearer credential and attach [`Claims`] to the request
pub async fn authenticate(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?;

    let claims = decode_token(token, &state.settings.auth.jwt_secret)?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Confirm the user belongs to an active organization and attach it.
///
/// Must run after [`authenticate`].
pub async fn require_organization(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Missing authentication context".to_string()))?;

    let org = state
        .organizations
        .find_active(claims.org)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    request.extensions_mut().insert(org);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_token;
    use crate::state::test_state;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn handler() -> &'static str {
        "OK"
    }

    fn router(state: SharedState) -> Router {
        Router::new()
            .route("/test", get(handler))
            .layer(from_fn_with_state(state.clone(), authenticate))
            .with_state(state)
    }

    #[tokio::test]
    async fn missing_header_returns_401() {
        let state = test_state();
        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_returns_401() {
        let state = test_state();
        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .header(AUTHORIZATION, "Basic dXNlcjpwdw==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_token_returns_401() {
        let state = test_state();
        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .header(AUTHORIZATION, "Bearer bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_passes_through() {
        let state = test_state();
        let token = test_token(Uuid::new_v4(), Uuid::new_v4(), "test-secret");
        let response = router(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .header(AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
