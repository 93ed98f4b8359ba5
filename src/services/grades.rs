use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::error::AppError;
use crate::models::{Enrollment, EnrollmentStatus, GradeReport, GradeRow, GradedCredit, Term};
use crate::services::enrollment::courses_by_id;
use crate::store::{self, Collection, Filter, RecordStore};

/// Letter grade to grade points, in tenths.
const GRADE_POINTS: [(&str, i64); 10] = [
    ("A", 40),
    ("A-", 37),
    ("B+", 33),
    ("B", 30),
    ("B-", 27),
    ("C+", 23),
    ("C", 20),
    ("C-", 17),
    ("D", 10),
    ("F", 0),
];

/// Points for a letter grade, or `None` for anything outside the table
/// (including an absent grade or "N/A"). Letters match exactly.
pub fn grade_points(grade: &str) -> Option<Decimal> {
    GRADE_POINTS
        .iter()
        .find(|(letter, _)| *letter == grade)
        .map(|(_, tenths)| Decimal::new(*tenths, 1))
}

/// Credit-weighted mean of grade points, rounded half-up to two places.
///
/// Rows with an ungraded or unrecognised grade add 0 points but still count
/// toward attempted credits.
pub fn compute_gpa(rows: &[GradedCredit]) -> Decimal {
    let mut total_points = Decimal::ZERO;
    let mut total_credits = Decimal::ZERO;

    for row in rows {
        let credits = Decimal::from(row.credits);
        let points = row
            .grade
            .as_deref()
            .and_then(grade_points)
            .unwrap_or(Decimal::ZERO);
        total_points += points * credits;
        total_credits += credits;
    }

    let mut gpa = if total_credits > Decimal::ZERO {
        (total_points / total_credits).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };
    gpa.rescale(2);
    gpa
}

pub struct GradeCalculator {
    store: Arc<dyn RecordStore>,
}

impl GradeCalculator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Active enrollments joined with course metadata.
    ///
    /// Enrollments carry no term of their own, so `term` is not used to filter;
    /// it is only echoed back in [`GradeCalculator::grade_report`].
    pub async fn list_active_enrollments_with_grades(
        &self,
        student_id: &str,
        _term: Option<Term>,
    ) -> Result<Vec<GradeRow>, AppError> {
        let filter = Filter::new()
            .eq("student_id", student_id)
            .eq("status", EnrollmentStatus::Active.as_str());
        let enrollments: Vec<Enrollment> =
            store::fetch(self.store.as_ref(), Collection::StudentCourses, &filter).await?;
        let courses = courses_by_id(self.store.as_ref(), enrollments.iter().map(|e| e.course_id.as_str())).await?;

        let mut rows = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let Some(course) = courses.get(&enrollment.course_id) else {
                warn!(
                    "skipping enrollment {}: course {} not found",
                    enrollment.id, enrollment.course_id
                );
                continue;
            };
            let grade = enrollment
                .grade
                .filter(|g| !g.trim().is_empty() && !g.trim().eq_ignore_ascii_case("N/A"));
            rows.push(GradeRow {
                course_id: course.id.clone(),
                code: course.code.clone(),
                name: course.name.clone(),
                credits: course.credits,
                grade_points: grade.as_deref().and_then(grade_points),
                grade,
            });
        }
        Ok(rows)
    }

    pub async fn grade_report(&self, student_id: &str, term: Option<Term>) -> Result<GradeReport, AppError> {
        let courses = self.list_active_enrollments_with_grades(student_id, term).await?;
        let graded: Vec<GradedCredit> = courses
            .iter()
            .map(|row| GradedCredit {
                credits: row.credits,
                grade: row.grade.clone(),
            })
            .collect();

        Ok(GradeReport {
            term,
            total_credits: courses.iter().map(|row| row.credits).sum(),
            semester_gpa: compute_gpa(&graded),
            courses,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn row(credits: u32, grade: Option<&str>) -> GradedCredit {
        GradedCredit {
            credits,
            grade: grade.map(str::to_string),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn empty_input_is_zero_with_two_places() {
        let gpa = compute_gpa(&[]);
        assert_eq!(gpa, Decimal::ZERO);
        assert_eq!(gpa.to_string(), "0.00");
    }

    #[test]
    fn credit_weighted_average() {
        // (3 * 4.0 + 2 * 2.7) / 5 = 3.48
        let gpa = compute_gpa(&[row(3, Some("A")), row(2, Some("B-"))]);
        assert_eq!(gpa, dec("3.48"));
    }

    #[test]
    fn midpoints_round_half_up() {
        // (1 * 2.3 + 3 * 3.0) / 4 = 2.825; banker's rounding would give 2.82
        let gpa = compute_gpa(&[row(1, Some("C+")), row(3, Some("B"))]);
        assert_eq!(gpa.to_string(), "2.83");
    }

    #[test]
    fn ungraded_courses_count_credits_at_zero_points() {
        // (3 * 4.0 + 3 * 0) / 6 = 2.00
        let gpa = compute_gpa(&[row(3, Some("A")), row(3, None)]);
        assert_eq!(gpa, dec("2.00"));

        let gpa = compute_gpa(&[row(3, Some("A")), row(3, Some("N/A"))]);
        assert_eq!(gpa, dec("2.00"));
    }

    #[test]
    fn whole_results_still_print_two_places() {
        assert_eq!(compute_gpa(&[row(4, Some("B"))]).to_string(), "3.00");
    }

    #[test]
    fn grade_table_lookup() {
        assert_eq!(grade_points("A-"), Some(dec("3.7")));
        assert_eq!(grade_points("B+"), Some(dec("3.3")));
        assert_eq!(grade_points("F"), Some(Decimal::ZERO));
        assert_eq!(grade_points("D+"), None);
        assert_eq!(grade_points("N/A"), None);
        assert_eq!(grade_points(""), None);
    }

    #[test]
    fn lowercase_or_padded_letters_are_outside_the_table() {
        assert_eq!(grade_points("a"), None);
        assert_eq!(grade_points(" B+ "), None);

        // (3 * 0 + 1 * 4.0) / 4 = 1.00
        let gpa = compute_gpa(&[row(3, Some("a")), row(1, Some("A"))]);
        assert_eq!(gpa, dec("1.00"));
    }
}
