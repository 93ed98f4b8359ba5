use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;

/// Which record store implementation backs the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Rest,
}

#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    pub database_url: String,
    pub backend_url: String,
    pub anon_key: String,
    pub request_timeout: Duration,
}

impl PortalConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let store = match lookup("RECORD_STORE").as_deref() {
            None | Some("sqlite") => StoreBackend::Sqlite,
            Some("rest") => StoreBackend::Rest,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "RECORD_STORE must be `sqlite` or `rest`, got `{}`",
                    other
                )));
            }
        };

        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://portal.db".to_string());

        let backend_url = lookup("BACKEND_URL")
            .ok_or_else(|| AppError::Config("BACKEND_URL is not set".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let anon_key = lookup("BACKEND_ANON_KEY")
            .ok_or_else(|| AppError::Config("BACKEND_ANON_KEY is not set".to_string()))?;

        let timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    AppError::Config(format!("REQUEST_TIMEOUT_SECS must be a positive integer, got `{}`", raw))
                })?,
            None => 10,
        };

        Ok(Self {
            bind_addr,
            store,
            database_url,
            backend_url,
            anon_key,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
