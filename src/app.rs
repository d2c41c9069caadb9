//! HTTP routing configuration

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middlewares, services::logsink::LogWriter, state::AppState};

/// Creates the Axum router with all routes configured.
pub fn app(state: AppState, log: LogWriter) -> Router {
    let auth = from_fn(middlewares::auth_middlewares::jwt_auth);

    Router::new()
        // Health check endpoints (no auth required)
        .route("/health", get(handlers::health_handlers::health))
        .route("/ready", get(handlers::health_handlers::ready))
        // Public account endpoints
        .route(
            "/api/user/register",
            post(handlers::auth_handlers::register),
        )
        .route("/api/user/login", post(handlers::auth_handlers::login))
        // Event endpoints (JWT protected)
        .route(
            "/api/events",
            post(handlers::event_handlers::create).layer(auth.clone()),
        )
        .route(
            "/api/events/{id}",
            put(handlers::event_handlers::update).layer(auth.clone()),
        )
        .route(
            "/api/events/{id}",
            delete(handlers::event_handlers::delete).layer(auth.clone()),
        )
        .route(
            "/api/events/day/{date}",
            get(handlers::event_handlers::get_day).layer(auth.clone()),
        )
        .route(
            "/api/events/week/{date}",
            get(handlers::event_handlers::get_week).layer(auth.clone()),
        )
        .route(
            "/api/events/month/{date}",
            get(handlers::event_handlers::get_month).layer(auth),
        )
        .with_state(state)
        .layer(from_fn_with_state(
            log,
            middlewares::log_middlewares::request_logger,
        ))
        .layer(TraceLayer::new_for_http())
}
