pub mod error;
pub mod password;
pub mod service;
pub mod token;
pub mod totp;

pub use error::{AuthError, Result};
pub use service::{AuthResponse, AuthService, LoginRequest, RegisterRequest, TwoFactorSetup};
pub use token::{Claims, JwtService, TokenType};
