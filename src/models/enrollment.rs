use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Dropped,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Dropped => "dropped",
        }
    }
}

/// A `student_courses` row. `student_id` holds the identity id of the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub grade: Option<String>,
    pub enrolled_at: String,
    pub dropped_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollmentRequest {
    pub course_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EnrollmentResult {
    Enrolled { enrollment: Enrollment },
    /// An active enrollment already existed; nothing was inserted.
    AlreadyEnrolled { enrollment: Enrollment },
    Dropped { enrollment: Enrollment },
    /// No active enrollment to drop; nothing was written.
    NotActive,
}

/// Enrollment joined with the course it refers to, for the add/drop status screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentView {
    pub enrollment_id: String,
    pub course_id: String,
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub status: EnrollmentStatus,
    pub grade: Option<String>,
    pub enrolled_at: String,
    pub dropped_at: Option<String>,
}
