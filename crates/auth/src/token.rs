use crate::error::{AuthError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// TTL of the staged login token issued between password verification and
/// TOTP verification. Deliberately short: the token is replayable until it
/// expires.
pub const PENDING_TTL_MINUTES: i64 = 5;

const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // User ID
    pub email: String,         // User email
    pub exp: i64,              // Expiration time
    pub iat: i64,              // Issued at
    pub jti: String,           // JWT ID (unique identifier)
    pub token_type: TokenType, // session or two_factor_pending
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AuthError::InvalidToken("Malformed subject claim".to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Session,
    TwoFactorPending,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    session_ttl_days: i64,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self::with_session_ttl(secret, DEFAULT_SESSION_TTL_DAYS)
    }

    pub fn with_session_ttl(secret: &str, session_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            session_ttl_days,
        }
    }

    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let session_ttl_days = std::env::var("SESSION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SESSION_TTL_DAYS);

        Self::with_session_ttl(&secret, session_ttl_days)
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_days * 24 * 60 * 60
    }

    fn issue(&self, user_id: Uuid, email: &str, ttl: Duration, token_type: TokenType) -> Result<String> {
        let now = Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Generate a full session token (7-day default expiry)
    pub fn issue_session_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        self.issue(
            user_id,
            email,
            Duration::days(self.session_ttl_days),
            TokenType::Session,
        )
    }

    /// Generate a staged login token: password verified, TOTP pending.
    /// Short-lived; exchanged for a session token by the 2FA login step.
    pub fn issue_pending_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        self.issue(
            user_id,
            email,
            Duration::minutes(PENDING_TTL_MINUTES),
            TokenType::TwoFactorPending,
        )
    }

    /// Validate and decode a token of any kind
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(self.algorithm);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Validate a session token specifically
    pub fn validate_session_token(&self, token: &str) -> Result<Claims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != TokenType::Session {
            return Err(AuthError::InvalidToken(
                "Token is not a session token".to_string(),
            ));
        }

        Ok(claims)
    }

    /// Validate a staged login token specifically.
    /// A session token presented here is a stage confusion, not a bad signature.
    pub fn validate_pending_token(&self, token: &str) -> Result<Claims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != TokenType::TwoFactorPending {
            return Err(AuthError::InvalidStage);
        }

        Ok(claims)
    }
}
