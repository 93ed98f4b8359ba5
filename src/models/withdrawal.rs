use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: String,
    pub student_id: String,
    pub reason: String,
    pub status: String,
    pub submitted_at: String,
}

/// Either a reason picked from the preset list or free text (or both).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWithdrawalRequest {
    #[serde(default)]
    pub selected_reason: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}
