use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::Term;

/// One input row of the GPA computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedCredit {
    pub credits: u32,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeRow {
    pub course_id: String,
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub grade: Option<String>,
    /// `None` when the grade is absent or not in the grade table.
    pub grade_points: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeReport {
    pub term: Option<Term>,
    pub courses: Vec<GradeRow>,
    pub total_credits: u32,
    pub semester_gpa: Decimal,
}
