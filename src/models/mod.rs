pub mod course;
pub mod enrollment;
pub mod grade;
pub mod identity;
pub mod profile;
pub mod withdrawal;

pub use course::Course;
pub use enrollment::{Enrollment, EnrollmentResult, EnrollmentStatus, EnrollmentView, NewEnrollmentRequest};
pub use grade::{GradeReport, GradeRow, GradedCredit};
pub use identity::{Identity, Session, SignInRequest};
pub use profile::{Profile, ProfileView, Term};
pub use withdrawal::{NewWithdrawalRequest, WithdrawalRequest};
