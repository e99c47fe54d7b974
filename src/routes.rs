//! Route definitions and router setup
//!
//! Mounts every feature router behind the authorization pipeline and the
//! shared middleware stack.

use crate::auth;
use crate::config::Settings;
use crate::state::SharedState;
use crate::tenant;
use crate::{alerts, dashboard, email, insights, workspace};
use axum::{
    http::{header, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let cors = build_cors_layer(settings);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(TimeoutLayer::new(Duration::from_secs(
            settings.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Feature routers behind the authorization pipeline. Layer order is
    // outside-in: authenticate, organization, tenant; the workspace router
    // adds the membership filter for workspace-scoped paths.
    let api = Router::new()
        .merge(workspace::router(state.clone()))
        .merge(alerts::router())
        .merge(dashboard::router())
        .merge(email::router())
        .merge(insights::router())
        .layer(from_fn_with_state(state.clone(), tenant::require_tenant))
        .layer(from_fn_with_state(
            state.clone(),
            auth::require_organization,
        ))
        .layer(from_fn_with_state(state.clone(), auth::authenticate));

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    }
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
