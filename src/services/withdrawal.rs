use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::IdentityProvider;
use crate::models::{NewWithdrawalRequest, WithdrawalRequest};
use crate::store::{self, Collection, RecordStore};

pub struct WithdrawalService {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl WithdrawalService {
    pub fn new(store: Arc<dyn RecordStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// Files a withdrawal request for the signed-in student. It stays `pending`
    /// until reviewed by staff.
    pub async fn submit(&self, req: NewWithdrawalRequest) -> Result<WithdrawalRequest, AppError> {
        let identity = self
            .identity
            .current_user()
            .await
            .ok_or(AppError::Unauthenticated)?;
        let reason = withdrawal_reason(&req)?;

        let request = WithdrawalRequest {
            id: Uuid::new_v4().to_string(),
            student_id: identity.id,
            reason,
            status: "pending".to_string(),
            submitted_at: Utc::now().to_rfc3339(),
        };
        let row = store::encode_row(Collection::WithdrawalRequests, &request)?;
        let inserted = self.store.insert(Collection::WithdrawalRequests, row).await?;
        let stored: WithdrawalRequest = store::decode_row(Collection::WithdrawalRequests, inserted)?;

        info!("withdrawal request {} filed by {}", stored.id, stored.student_id);
        Ok(stored)
    }
}

/// Typed text wins over a preset choice; one of them must be non-blank.
fn withdrawal_reason(req: &NewWithdrawalRequest) -> Result<String, AppError> {
    [req.reason.as_deref(), req.selected_reason.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|r| !r.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Please select or enter a reason for withdrawal".to_string()))
}
