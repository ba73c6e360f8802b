use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
    Admin,
}

/// Per-user TOTP state. `enabled` only becomes true once the owner has
/// proven possession of the secret with a valid code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwoFactorCredential {
    pub secret: Option<String>,
    pub enabled: bool,
}

impl TwoFactorCredential {
    /// True when the credential can actually gate a login: enabled and
    /// backed by a non-empty secret.
    pub fn is_ready(&self) -> bool {
        self.enabled && self.secret.as_deref().map_or(false, |s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    pub email: String,
    pub name: String,
    pub role: UserRole,

    pub password_hash: String,

    pub two_factor: TwoFactorCredential,

    pub is_active: bool,

    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,

    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default)]
    pub role: UserRole,
}

/// User-safe projection returned over HTTP. Never carries the password
/// hash or the TOTP secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            two_factor_enabled: user.two_factor.enabled,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_ready_only_when_enabled_with_secret() {
        let mut credential = TwoFactorCredential::default();
        assert!(!credential.is_ready());

        credential.secret = Some("JBSWY3DPEHPK3PXP".to_string());
        assert!(!credential.is_ready());

        credential.enabled = true;
        assert!(credential.is_ready());

        credential.secret = Some(String::new());
        assert!(!credential.is_ready());

        credential.secret = None;
        assert!(!credential.is_ready());
    }

    #[test]
    fn profile_does_not_expose_the_secret() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "avery@example.com".to_string(),
            name: "Avery".to_string(),
            role: UserRole::Teacher,
            password_hash: "hash".to_string(),
            two_factor: TwoFactorCredential {
                secret: Some("JBSWY3DPEHPK3PXP".to_string()),
                enabled: true,
            },
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let profile = UserProfile::from(user);
        assert!(profile.two_factor_enabled);
        assert_eq!(profile.role, UserRole::Teacher);

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("JBSWY3DPEHPK3PXP"));
        assert!(!json.contains("password"));
    }
}
