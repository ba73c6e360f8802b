use crate::handlers;
use crate::middleware;
use crate::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    let rate_limiter = Arc::new(middleware::RateLimiter::new());

    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Auth routes
        .route(
            "/api/auth/register",
            post(handlers::auth::register).layer(from_fn_with_state(
                rate_limiter.clone(),
                middleware::rate_limit_registration,
            )),
        )
        .route(
            "/api/auth/login",
            post(handlers::auth::login).layer(from_fn_with_state(
                rate_limiter.clone(),
                middleware::rate_limit_login,
            )),
        )
        .route(
            "/api/auth/me",
            get(handlers::auth::me)
                .route_layer(from_fn_with_state(state.clone(), middleware::require_auth)),
        )
        // Two-factor routes
        .route(
            "/api/2fa/setup",
            post(handlers::two_factor::setup)
                .route_layer(from_fn_with_state(state.clone(), middleware::require_auth)),
        )
        .route(
            "/api/2fa/verify-setup",
            post(handlers::two_factor::verify_setup)
                .route_layer(from_fn_with_state(state.clone(), middleware::require_auth)),
        )
        .route(
            "/api/2fa/login",
            post(handlers::two_factor::complete_login).layer(from_fn_with_state(
                rate_limiter,
                middleware::rate_limit_two_factor,
            )),
        )
        .with_state(state)
}
