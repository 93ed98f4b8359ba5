use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::{IdentityProvider, validate_credentials};
use crate::models::{Identity, Session};

/// Identity provider with accounts held in memory. Used for local runs and tests.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: HashMap<String, (String, Identity)>,
    session: RwLock<Option<Session>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, password: &str, identity: Identity) -> Self {
        self.accounts.insert(
            identity.email.to_lowercase(),
            (password.to_string(), identity),
        );
        self
    }

    /// Starts with `identity` already signed in.
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            accounts: HashMap::new(),
            session: RwLock::new(Some(Session {
                access_token: Uuid::new_v4().to_string(),
                refresh_token: None,
                expires_at: None,
                user: identity,
            })),
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = validate_credentials(email, password)?;
        let identity = match self.accounts.get(&email.to_lowercase()) {
            Some((expected, identity)) if expected == password => identity.clone(),
            _ => return Err(AppError::Auth("Invalid login credentials".to_string())),
        };

        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: None,
            expires_at: None,
            user: identity,
        };
        info!("signed in as {}", session.user.id);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.session.write().await.take();
        Ok(())
    }

    async fn current_user(&self) -> Option<Identity> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }
}
