use crate::handlers::auth::ErrorResponse;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use eduaid_auth::AuthService;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated user context
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(
    headers: &HeaderMap,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "missing_auth_header",
                    "Authorization header is required",
                )),
            )
        })?
        .to_str()
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "invalid_auth_header",
                    "Invalid Authorization header format",
                )),
            )
        })?;

    if !auth_header.starts_with("Bearer ") {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "invalid_auth_scheme",
                "Authorization header must use Bearer scheme",
            )),
        ));
    }

    Ok(auth_header[7..].to_string())
}

/// Validate a session token and build the request's user context
pub fn validate_token(
    auth_service: &AuthService,
    token: &str,
) -> Result<AuthUser, (StatusCode, Json<ErrorResponse>)> {
    let claims = auth_service.jwt.validate_session_token(token).map_err(|e| {
        tracing::warn!("Token validation failed: {}", e);
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("invalid_token", "Invalid or expired token")),
        )
    })?;

    let user_id = claims.user_id().map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("invalid_token", "Invalid user ID in token")),
        )
    })?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
    })
}

/// Middleware to require a valid session token
pub async fn require_auth(
    State(state): State<Arc<crate::AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_bearer_token(&headers)?;
    let auth_user = validate_token(&state.auth_service, &token)?;

    // Add user context to request extensions
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
