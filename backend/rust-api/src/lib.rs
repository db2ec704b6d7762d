use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod presentation;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// Preflight answers for browser clients on any origin.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .allow_origin(Any)
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .merge(explain_routes(app_state.clone()))
        .with_state(app_state)
        // CORS sits outside the auth layer so preflight never needs a credential
        .layer(cors_layer())
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn explain_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/explain", post(handlers::explain::explain))
        // Path used by the hosted edge-function deployment
        .route(
            "/functions/v1/explain-hoisting",
            post(handlers::explain::explain),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::bearer_auth_middleware,
        ))
}
