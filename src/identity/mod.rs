pub mod dto;
pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Identity, Session};

pub use http::HttpIdentityProvider;
pub use memory::InMemoryIdentityProvider;

/// Sign-in, sign-out and session lookup against the identity backend.
/// Implementations own the single session of the running client.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError>;
    async fn sign_out(&self) -> Result<(), AppError>;
    async fn current_user(&self) -> Option<Identity>;
    async fn session(&self) -> Option<Session>;
}

/// Rejects empty credentials before any network call. Returns the trimmed email.
pub fn validate_credentials(email: &str, password: &str) -> Result<String, AppError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Please fill in all fields".to_string()));
    }
    Ok(email.to_string())
}
