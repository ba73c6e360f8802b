// EduAid Authentication API Server
// Main entry point for the auth service REST API

mod config;
mod handlers;
mod middleware;
mod routes;

use config::Config;
use dotenvy::dotenv;
use eduaid_auth::{AuthService, JwtService};
use eduaid_store::UserStore;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub struct AppState {
    pub auth_service: AuthService,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,eduaid_api=debug,tower_http=debug".to_string()),
        )
        .init();

    tracing::info!("🚀 Starting EduAid Auth API");
    tracing::info!("📦 Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env();
    tracing::info!("🔌 Server: {}:{}", config.server_host, config.server_port);

    // Initialize JWT service
    let jwt_service = JwtService::with_session_ttl(&config.jwt_secret, config.session_ttl_days);
    tracing::info!("🔐 JWT service initialized");

    // Initialize user store
    let store = Arc::new(UserStore::new());
    tracing::info!("🗄️  User store initialized");

    // Create auth service
    let auth_service = AuthService::new(store, jwt_service, config.totp_issuer.clone());
    tracing::info!("🔑 Auth service initialized");

    // Create app state
    let state = Arc::new(AppState { auth_service });

    // Create router
    let app = routes::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!("📡 Routes configured:");
    tracing::info!("   GET  /health");
    tracing::info!("   POST /api/auth/register");
    tracing::info!("   POST /api/auth/login");
    tracing::info!("   GET  /api/auth/me");
    tracing::info!("   POST /api/2fa/setup");
    tracing::info!("   POST /api/2fa/verify-setup");
    tracing::info!("   POST /api/2fa/login");

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("✅ Server ready at http://{}", addr);

    axum::serve(listener, app).await.expect("Server error");

    Ok(())
}
