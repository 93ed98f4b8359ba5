pub mod enrollment;
pub mod grades;
pub mod profile;
pub mod withdrawal;

pub use enrollment::{EnrollmentManager, search_courses};
pub use grades::{GradeCalculator, compute_gpa, grade_points};
pub use profile::ProfileResolver;
pub use withdrawal::WithdrawalService;
