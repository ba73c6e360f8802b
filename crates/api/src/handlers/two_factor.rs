use crate::handlers::auth::ErrorResponse;
use crate::middleware::AuthUser;
use crate::AppState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use eduaid_auth::{AuthError, AuthResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    pub provisioning_uri: String,
    /// PNG rendering of the provisioning URI as a data URL
    pub qr_image: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifySetupRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifySetupResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorLoginRequest {
    pub code: String,
    pub temp_token: String,
}

/// Provision a TOTP secret for the authenticated user
/// POST /api/2fa/setup
pub async fn setup(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<TwoFactorSetupResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .auth_service
        .begin_two_factor_setup(auth_user.user_id)
        .await
    {
        Ok(setup) => Ok(Json(TwoFactorSetupResponse {
            secret: setup.secret,
            provisioning_uri: setup.otpauth_url,
            qr_image: format!("data:image/png;base64,{}", BASE64.encode(&setup.qr_png)),
        })),
        Err(e) => {
            tracing::error!("Two-factor setup error: {}", e);

            let status_code = match e {
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((
                status_code,
                Json(ErrorResponse::new(
                    "setup_failed",
                    "Could not initiate two-factor setup",
                )),
            ))
        }
    }
}

/// Verify the provisioned secret and enable two-factor
/// POST /api/2fa/verify-setup
pub async fn verify_setup(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<VerifySetupRequest>,
) -> Result<Json<VerifySetupResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .auth_service
        .confirm_two_factor_setup(auth_user.user_id, &request.code)
        .await
    {
        Ok(()) => Ok(Json(VerifySetupResponse { success: true })),
        Err(e) => {
            tracing::warn!("Two-factor setup verification failed: {}", e);

            let (status_code, error) = match e {
                AuthError::SetupNotInitiated => (StatusCode::BAD_REQUEST, "setup_not_initiated"),
                AuthError::InvalidCode => (StatusCode::UNAUTHORIZED, "invalid_code"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "verification_failed"),
            };
            Err((
                status_code,
                Json(ErrorResponse::new(error, "Invalid verification code")),
            ))
        }
    }
}

/// Exchange a staged token plus a TOTP code for a full session
/// POST /api/2fa/login
///
/// Every rejection gets the same body; the precise reason is only logged so
/// a caller cannot distinguish a wrong code from a disabled account.
pub async fn complete_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TwoFactorLoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .auth_service
        .complete_two_factor_login(&request.temp_token, &request.code)
        .await
    {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!("Two-factor login failed: {}", e);

            let status_code = match e {
                AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            };
            Err((
                status_code,
                Json(ErrorResponse::new(
                    "two_factor_failed",
                    "Invalid code or expired login session",
                )),
            ))
        }
    }
}
