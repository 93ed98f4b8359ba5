use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::identity::IdentityProvider;
use crate::models::{Course, Enrollment, EnrollmentResult, EnrollmentStatus, EnrollmentView, Identity};
use crate::store::{self, Collection, Filter, RecordStore, Row, StoreError};

/// Case-insensitive substring match on course name, code or instructor.
/// A blank query returns the input untouched.
pub fn search_courses(courses: Vec<Course>, query: &str) -> Vec<Course> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return courses;
    }

    courses
        .into_iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&needle)
                || c.code.to_lowercase().contains(&needle)
                || c.instructor.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Course catalog and add/drop. Holds no state between calls.
pub struct EnrollmentManager {
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl EnrollmentManager {
    pub fn new(store: Arc<dyn RecordStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(store::fetch(self.store.as_ref(), Collection::Courses, &Filter::new()).await?)
    }

    pub async fn find_course(&self, course_id: &str) -> Result<Course, AppError> {
        let filter = Filter::new().eq("id", course_id);
        store::fetch::<Course>(self.store.as_ref(), Collection::Courses, &filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("course {}", course_id)))
    }

    pub async fn active_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, AppError> {
        let filter = Filter::new()
            .eq("student_id", student_id)
            .eq("course_id", course_id)
            .eq("status", EnrollmentStatus::Active.as_str());
        Ok(store::fetch::<Enrollment>(self.store.as_ref(), Collection::StudentCourses, &filter)
            .await?
            .into_iter()
            .next())
    }

    pub async fn add_enrollment(&self, student_id: &str, course_id: &str) -> Result<EnrollmentResult, AppError> {
        self.require_identity().await?;
        require_ids(student_id, course_id)?;

        if let Some(enrollment) = self.active_enrollment(student_id, course_id).await? {
            info!("{} already enrolled in {}", student_id, course_id);
            return Ok(EnrollmentResult::AlreadyEnrolled { enrollment });
        }

        let course = self.find_course(course_id).await?;
        if !course.available {
            return Err(AppError::Validation(format!(
                "{} is not open for enrollment",
                course.code
            )));
        }

        let row = new_enrollment_row(student_id, course_id);
        match self.store.insert(Collection::StudentCourses, row).await {
            Ok(inserted) => {
                let enrollment: Enrollment = store::decode_row(Collection::StudentCourses, inserted)?;
                info!("enrolled {} in {} ({})", student_id, course.code, enrollment.id);
                Ok(EnrollmentResult::Enrolled { enrollment })
            }
            // A concurrent add may have won the race to the unique index.
            Err(StoreError::Constraint(msg)) => match self.active_enrollment(student_id, course_id).await? {
                Some(enrollment) => {
                    warn!("concurrent enrollment of {} in {} resolved to existing row", student_id, course_id);
                    Ok(EnrollmentResult::AlreadyEnrolled { enrollment })
                }
                None => Err(AppError::Store(StoreError::Constraint(msg))),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Marks the active enrollment as dropped. The row is kept as history.
    pub async fn drop_enrollment(&self, student_id: &str, course_id: &str) -> Result<EnrollmentResult, AppError> {
        self.require_identity().await?;
        require_ids(student_id, course_id)?;

        let Some(mut enrollment) = self.active_enrollment(student_id, course_id).await? else {
            info!("{} has no active enrollment in {}", student_id, course_id);
            return Ok(EnrollmentResult::NotActive);
        };

        let now = Utc::now().to_rfc3339();
        let filter = Filter::new()
            .eq("id", enrollment.id.as_str())
            .eq("status", EnrollmentStatus::Active.as_str());
        let mut patch = Row::new();
        patch.insert("status".to_string(), json!(EnrollmentStatus::Dropped.as_str()));
        patch.insert("dropped_at".to_string(), json!(now));

        let changed = self
            .store
            .update(Collection::StudentCourses, &filter, patch)
            .await?;
        if changed == 0 {
            warn!("enrollment {} was no longer active when dropping", enrollment.id);
            return Ok(EnrollmentResult::NotActive);
        }

        info!("dropped {} from {} ({})", student_id, course_id, enrollment.id);
        enrollment.status = EnrollmentStatus::Dropped;
        enrollment.dropped_at = Some(now);
        Ok(EnrollmentResult::Dropped { enrollment })
    }

    /// Every enrollment of the student, dropped ones included, with course details.
    pub async fn list_enrollments(&self, student_id: &str) -> Result<Vec<EnrollmentView>, AppError> {
        let filter = Filter::new().eq("student_id", student_id);
        let enrollments: Vec<Enrollment> =
            store::fetch(self.store.as_ref(), Collection::StudentCourses, &filter).await?;
        let courses = courses_by_id(self.store.as_ref(), enrollments.iter().map(|e| e.course_id.as_str())).await?;

        Ok(enrollments
            .into_iter()
            .filter_map(|e| match courses.get(&e.course_id) {
                Some(course) => Some(EnrollmentView {
                    enrollment_id: e.id,
                    course_id: e.course_id,
                    code: course.code.clone(),
                    name: course.name.clone(),
                    credits: course.credits,
                    status: e.status,
                    grade: e.grade,
                    enrolled_at: e.enrolled_at,
                    dropped_at: e.dropped_at,
                }),
                None => {
                    warn!("enrollment {} references missing course {}", e.id, e.course_id);
                    None
                }
            })
            .collect())
    }

    async fn require_identity(&self) -> Result<Identity, AppError> {
        self.identity
            .current_user()
            .await
            .ok_or(AppError::Unauthenticated)
    }
}

/// Loads the courses with the given ids, keyed by id.
pub(crate) async fn courses_by_id<'a>(
    store: &dyn RecordStore,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, Course>, AppError> {
    let ids: BTreeSet<&str> = ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let filter = Filter::new().one_of("id", ids);
    let courses: Vec<Course> = store::fetch(store, Collection::Courses, &filter).await?;
    Ok(courses.into_iter().map(|c| (c.id.clone(), c)).collect())
}

fn require_ids(student_id: &str, course_id: &str) -> Result<(), AppError> {
    if student_id.trim().is_empty() {
        return Err(AppError::Validation("student id is required".to_string()));
    }
    if course_id.trim().is_empty() {
        return Err(AppError::Validation("course id is required".to_string()));
    }
    Ok(())
}

fn new_enrollment_row(student_id: &str, course_id: &str) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    row.insert("student_id".to_string(), json!(student_id));
    row.insert("course_id".to_string(), json!(course_id));
    row.insert("status".to_string(), json!(EnrollmentStatus::Active.as_str()));
    row.insert("grade".to_string(), Value::Null);
    row.insert("enrolled_at".to_string(), json!(Utc::now().to_rfc3339()));
    row
}
