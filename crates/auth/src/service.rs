use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::token::JwtService;
use crate::totp;
use chrono::Utc;
use eduaid_models::{TwoFactorCredential, User, UserProfile, UserRole};
use eduaid_store::{StoreError, UserStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,

    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    pub password: String,
}

/// Everything a user needs to enroll an authenticator app.
/// The QR image is a rendering of `otpauth_url`, nothing more.
#[derive(Debug, Serialize)]
pub struct TwoFactorSetup {
    pub secret: String,
    pub otpauth_url: String,
    pub qr_png: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum AuthResponse {
    #[serde(rename = "success")]
    Success {
        token: String,
        token_type: String,
        expires_in: i64,
        user: UserProfile,
    },
    #[serde(rename = "two_factor_required")]
    TwoFactorRequired { temp_token: String, message: String },
}

pub struct AuthService {
    store: Arc<UserStore>,
    pub jwt: JwtService,
    issuer: String,
}

impl AuthService {
    pub fn new(store: Arc<UserStore>, jwt: JwtService, issuer: String) -> Self {
        Self { store, jwt, issuer }
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        request.validate()?;

        let password_hash = PasswordHasher::hash(&request.password)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: request.email,
            name: request.name,
            role: request.role,
            password_hash,
            two_factor: TwoFactorCredential::default(),
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let user = self.store.insert(user).await.map_err(|e| match e {
            StoreError::AlreadyExists { key, .. } => AuthError::AlreadyExists(key),
            other => AuthError::Store(other),
        })?;

        let token = self.jwt.issue_session_token(user.id, &user.email)?;

        Ok(AuthResponse::Success {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.session_ttl_seconds(),
            user: user.into(),
        })
    }

    /// Login with email and password.
    ///
    /// When the account has two-factor authentication enabled, the password
    /// alone does not produce a session: the caller gets a short-lived staged
    /// token to exchange at `complete_two_factor_login`.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        request.validate()?;

        let user = self
            .store
            .find_by_email(&request.email)
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::UserInactive);
        }

        let is_valid = PasswordHasher::verify(&request.password, &user.password_hash)?;
        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        if user.two_factor.is_ready() {
            let temp_token = self.begin_two_factor_login(&user)?;

            return Ok(AuthResponse::TwoFactorRequired {
                temp_token,
                message: "Please verify your identity with a one-time code.".to_string(),
            });
        }

        self.store.update_last_login(user.id).await?;

        let token = self.jwt.issue_session_token(user.id, &user.email)?;

        Ok(AuthResponse::Success {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.session_ttl_seconds(),
            user: user.into(),
        })
    }

    /// Provision a fresh TOTP secret for a user.
    ///
    /// Always disables two-factor until the new secret is confirmed, even if
    /// it was previously enabled. Re-running setup rotates the secret.
    pub async fn begin_two_factor_setup(&self, user_id: Uuid) -> Result<TwoFactorSetup> {
        let mut user = self.store.find_by_id(user_id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => AuthError::UserNotFound,
            other => AuthError::Store(other),
        })?;

        let secret = totp::generate_secret();
        let otpauth_url = totp::generate_totp_uri(&secret, &user.email, &self.issuer);
        let qr_png = totp::generate_qr_code(&otpauth_url)?;

        user.two_factor = TwoFactorCredential {
            secret: Some(secret.clone()),
            enabled: false,
        };
        self.store.save(&user).await?;

        tracing::info!(user_id = %user.id, "Two-factor setup initiated");

        Ok(TwoFactorSetup {
            secret,
            otpauth_url,
            qr_png,
        })
    }

    /// Confirm possession of the provisioned secret with a valid code.
    /// Re-confirming an already-enabled credential is accepted.
    pub async fn confirm_two_factor_setup(&self, user_id: Uuid, code: &str) -> Result<()> {
        let mut user = self.store.find_by_id(user_id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => AuthError::UserNotFound,
            other => AuthError::Store(other),
        })?;

        let secret = user
            .two_factor
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::SetupNotInitiated)?;

        if !totp::verify_totp(&secret, code.trim())? {
            return Err(AuthError::InvalidCode);
        }

        user.two_factor.enabled = true;
        self.store.save(&user).await?;

        tracing::info!(user_id = %user.id, "Two-factor setup confirmed");

        Ok(())
    }

    /// Issue the staged login token for a password-verified user with
    /// two-factor enabled.
    pub fn begin_two_factor_login(&self, user: &User) -> Result<String> {
        self.jwt.issue_pending_token(user.id, &user.email)
    }

    /// Exchange a staged token plus a valid TOTP code for a full session.
    ///
    /// Checks run in a fixed order: token signature and expiry, stage tag,
    /// user state, then the code itself. No step invalidates the staged
    /// token; it stays exchangeable until its own expiry.
    pub async fn complete_two_factor_login(
        &self,
        temp_token: &str,
        code: &str,
    ) -> Result<AuthResponse> {
        let claims = self
            .jwt
            .validate_pending_token(temp_token)
            .map_err(|e| match e {
                AuthError::InvalidStage => AuthError::InvalidStage,
                other => AuthError::StagedToken(other.to_string()),
            })?;

        let user_id = claims
            .user_id()
            .map_err(|e| AuthError::StagedToken(e.to_string()))?;

        let user = self
            .store
            .find_by_id(user_id)
            .await
            .map_err(|_| AuthError::TwoFactorNotEnabled)?;

        let secret = match user.two_factor.secret.as_deref() {
            Some(s) if user.two_factor.enabled && !s.is_empty() => s,
            _ => return Err(AuthError::TwoFactorNotEnabled),
        };

        if !totp::verify_totp(secret, code.trim())? {
            return Err(AuthError::InvalidCode);
        }

        self.store.update_last_login(user.id).await?;

        let token = self.jwt.issue_session_token(user.id, &user.email)?;

        tracing::info!(user_id = %user.id, "Two-factor login completed");

        Ok(AuthResponse::Success {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.session_ttl_seconds(),
            user: user.into(),
        })
    }

    /// Look up the user-safe profile for an authenticated caller
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserProfile> {
        let user = self.store.find_by_id(user_id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => AuthError::UserNotFound,
            other => AuthError::Store(other),
        })?;

        Ok(user.into())
    }
}
