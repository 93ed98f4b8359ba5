use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AppError;
use crate::identity::{IdentityProvider, dto, validate_credentials};
use crate::models::{Identity, Session};
use crate::store::StoreError;

/// Identity provider backed by the hosted auth API (`/auth/v1`).
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    anon_key: String,
    timeout: Duration,
    session: RwLock<Option<Session>>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            timeout,
            session: RwLock::new(None),
        })
    }

    fn transport(&self, err: reqwest::Error) -> AppError {
        AppError::Store(StoreError::from_transport(err, self.timeout))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = validate_credentials(email, password)?;
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&dto::PasswordGrantRequest {
                email: &email,
                password,
            })
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.json::<dto::AuthErrorResponse>().await.unwrap_or_default();
            let message = body.into_message();
            warn!("sign-in rejected for {}: {}", email, message);
            return Err(AppError::Auth(message));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(StoreError::Rejected {
                status: status.as_u16(),
                body,
            }));
        }

        let token = response
            .json::<dto::TokenResponse>()
            .await
            .map_err(|e| self.transport(e))?;
        let session = token.into_session(Utc::now().timestamp());

        info!("signed in as {}", session.user.id);
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        // The local session is already gone; a failed remote logout only leaves
        // the token to expire on its own.
        let url = format!("{}/auth/v1/logout", self.base_url);
        let result = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => info!("signed out {}", session.user.id),
            Ok(resp) => warn!("remote sign-out returned {}", resp.status()),
            Err(e) => warn!("remote sign-out failed: {}", e),
        }
        Ok(())
    }

    async fn current_user(&self) -> Option<Identity> {
        self.session().await.map(|s| s.user)
    }

    async fn session(&self) -> Option<Session> {
        let guard = self.session.read().await;
        guard
            .as_ref()
            .filter(|s| !s.is_expired(Utc::now().timestamp()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_credentials_fail_without_a_request() {
        // Nothing listens on this port; a network attempt would surface as a store error.
        let provider =
            HttpIdentityProvider::new("http://127.0.0.1:9", "anon", Duration::from_millis(200)).unwrap();
        let err = provider.sign_in("", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(provider.current_user().await.is_none());
    }

    #[tokio::test]
    async fn sign_out_without_session_is_a_no_op() {
        let provider =
            HttpIdentityProvider::new("http://127.0.0.1:9", "anon", Duration::from_millis(200)).unwrap();
        assert!(provider.sign_out().await.is_ok());
    }
}
