use crate::error::{Result, StoreError};
use chrono::Utc;
use eduaid_models::User;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process user store. Each method takes the lock exactly once, so
/// every operation is an atomic read-modify-write on a single record.
#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new user. Email addresses are unique (case-insensitive).
    pub async fn insert(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::already_exists("User", &user.email));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", &id.to_string()))
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> Result<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| StoreError::not_found("User", email))
    }

    /// Write back a modified user record
    pub async fn save(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;

        let entry = users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found("User", &user.id.to_string()))?;

        *entry = User {
            updated_at: Utc::now(),
            ..user.clone()
        };

        Ok(())
    }

    /// Update last login timestamp
    pub async fn update_last_login(&self, id: Uuid) -> Result<()> {
        let mut users = self.users.write().await;

        let user = users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("User", &id.to_string()))?;

        user.last_login_at = Some(Utc::now());
        user.updated_at = Utc::now();

        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduaid_models::{TwoFactorCredential, UserRole};

    fn sample_user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Test User".to_string(),
            role: UserRole::Student,
            password_hash: "hash".to_string(),
            two_factor: TwoFactorCredential::default(),
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = UserStore::new();
        let user = store.insert(sample_user("a@example.com")).await.unwrap();

        let by_id = store.find_by_id(user.id).await.unwrap();
        assert_eq!(by_id.email, "a@example.com");

        let by_email = store.find_by_email("a@example.com").await.unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let store = UserStore::new();
        store.insert(sample_user("Mixed@Example.com")).await.unwrap();

        assert!(store.find_by_email("mixed@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = UserStore::new();
        store.insert(sample_user("a@example.com")).await.unwrap();

        let err = store.insert(sample_user("A@EXAMPLE.COM")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn find_unknown_user_fails() {
        let store = UserStore::new();

        let err = store.find_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn save_writes_back_changes() {
        let store = UserStore::new();
        let mut user = store.insert(sample_user("a@example.com")).await.unwrap();

        user.two_factor = TwoFactorCredential {
            secret: Some("JBSWY3DPEHPK3PXP".to_string()),
            enabled: true,
        };
        store.save(&user).await.unwrap();

        let reloaded = store.find_by_id(user.id).await.unwrap();
        assert!(reloaded.two_factor.enabled);
        assert!(reloaded.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn save_unknown_user_fails() {
        let store = UserStore::new();

        let err = store.save(&sample_user("ghost@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_last_login_stamps_the_record() {
        let store = UserStore::new();
        let user = store.insert(sample_user("a@example.com")).await.unwrap();
        assert!(user.last_login_at.is_none());

        store.update_last_login(user.id).await.unwrap();

        let reloaded = store.find_by_id(user.id).await.unwrap();
        assert!(reloaded.last_login_at.is_some());
    }
}
