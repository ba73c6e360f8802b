pub mod user;

// Re-export commonly used types
pub use user::{NewUser, TwoFactorCredential, User, UserProfile, UserRole};
