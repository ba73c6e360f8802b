use crate::middleware::AuthUser;
use crate::AppState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use eduaid_auth::{AuthError, AuthResponse, LoginRequest, RegisterRequest};
use eduaid_models::UserProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.auth_service.register(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!("Registration error: {}", e);

            let status_code = match e {
                AuthError::AlreadyExists(_) => StatusCode::CONFLICT,
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((
                status_code,
                Json(ErrorResponse::new("registration_failed", &e.to_string())),
            ))
        }
    }
}

/// Login with email and password.
/// Accounts with two-factor enabled get a staged token instead of a session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.auth_service.login(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!("Login error: {}", e);

            let status_code = match e {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserInactive => StatusCode::FORBIDDEN,
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((
                status_code,
                Json(ErrorResponse::new("login_failed", &e.to_string())),
            ))
        }
    }
}

/// Get current user profile
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserProfile>, (StatusCode, Json<ErrorResponse>)> {
    match state.auth_service.get_user(auth_user.user_id).await {
        Ok(profile) => Ok(Json(profile)),
        Err(e) => {
            tracing::error!("Get user error: {}", e);
            Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("user_not_found", "User not found")),
            ))
        }
    }
}
