use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Please sign in first".to_string()),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(StoreError::Constraint(msg)) => {
                error!("constraint violation: {}", msg);
                (
                    StatusCode::CONFLICT,
                    "The request conflicts with an existing record".to_string(),
                )
            }
            AppError::Store(StoreError::Timeout(after)) => {
                error!("record store timed out after {:?}", after);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "The backend did not respond in time".to_string(),
                )
            }
            AppError::Store(e) => {
                error!("record store error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Backend error occurred".to_string(),
                )
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_violations_map_to_conflict() {
        let resp = AppError::Store(StoreError::Constraint("dup".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn timeouts_map_to_gateway_timeout() {
        let resp = AppError::Store(StoreError::Timeout(std::time::Duration::from_secs(1)))
            .into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn unauthenticated_maps_to_401() {
        assert_eq!(AppError::Unauthenticated.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
