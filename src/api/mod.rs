use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::*;
use crate::services::{EnrollmentManager, GradeCalculator, ProfileResolver, WithdrawalService, search_courses};
use crate::state::AppState;

#[derive(Deserialize)]
struct CourseQueryParams {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Deserialize)]
struct GradeQueryParams {
    #[serde(default)]
    year: Option<String>,
    #[serde(default)]
    semester: Option<String>,
}

impl GradeQueryParams {
    /// Parsed here rather than by the extractor so bad input gets the JSON error body.
    fn parse(&self) -> Result<(Option<u32>, Option<u8>), AppError> {
        Ok((parse_param("year", &self.year)?, parse_param("semester", &self.semester)?))
    }
}

fn parse_param<T: std::str::FromStr>(name: &str, raw: &Option<String>) -> Result<Option<T>, AppError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{} must be a number, got `{}`", name, value))),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/me", get(me))
        .route("/profile", get(profile))
        .route("/courses", get(list_courses))
        .route("/enrollments", get(list_enrollments).post(add_enrollment))
        .route("/enrollments/{course_id}/drop", post(drop_enrollment))
        .route("/grades", get(grades))
        .route("/withdrawals", post(submit_withdrawal))
        .with_state(state)
}

async fn current_identity(state: &AppState) -> Result<Identity, AppError> {
    state
        .identity
        .current_user()
        .await
        .ok_or(AppError::Unauthenticated)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.store.ping().await?;
    Ok(StatusCode::OK)
}

async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<Identity>, AppError> {
    let session = state.identity.sign_in(&req.email, &req.password).await?;
    Ok(Json(session.user))
}

async fn sign_out(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.identity.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(state): State<AppState>) -> Result<Json<Identity>, AppError> {
    Ok(Json(current_identity(&state).await?))
}

async fn profile(State(state): State<AppState>) -> Result<Json<ProfileView>, AppError> {
    let identity = current_identity(&state).await?;
    let view = ProfileResolver::new(state.store.clone())
        .profile_view(&identity)
        .await?;
    Ok(Json(view))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(params): Query<CourseQueryParams>,
) -> Result<Json<Vec<Course>>, AppError> {
    let manager = EnrollmentManager::new(state.store.clone(), state.identity.clone());
    let courses = manager.list_courses().await?;
    Ok(Json(search_courses(courses, params.q.as_deref().unwrap_or_default())))
}

async fn list_enrollments(State(state): State<AppState>) -> Result<Json<Vec<EnrollmentView>>, AppError> {
    let identity = current_identity(&state).await?;
    let manager = EnrollmentManager::new(state.store.clone(), state.identity.clone());
    Ok(Json(manager.list_enrollments(&identity.id).await?))
}

async fn add_enrollment(
    State(state): State<AppState>,
    Json(req): Json<NewEnrollmentRequest>,
) -> Result<(StatusCode, Json<EnrollmentResult>), AppError> {
    let identity = current_identity(&state).await?;
    let manager = EnrollmentManager::new(state.store.clone(), state.identity.clone());
    let result = manager.add_enrollment(&identity.id, &req.course_id).await?;
    let status = match result {
        EnrollmentResult::Enrolled { .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(result)))
}

async fn drop_enrollment(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<EnrollmentResult>, AppError> {
    let identity = current_identity(&state).await?;
    let manager = EnrollmentManager::new(state.store.clone(), state.identity.clone());
    Ok(Json(manager.drop_enrollment(&identity.id, &course_id).await?))
}

async fn grades(
    State(state): State<AppState>,
    Query(params): Query<GradeQueryParams>,
) -> Result<Json<GradeReport>, AppError> {
    let identity = current_identity(&state).await?;
    let term = match params.parse()? {
        (Some(year), Some(semester)) => Some(Term::new(year, semester)?),
        (None, None) => match ProfileResolver::new(state.store.clone()).get_profile(&identity).await {
            Ok(profile) => Some(profile.term()),
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        _ => {
            return Err(AppError::Validation(
                "year and semester must be given together".to_string(),
            ));
        }
    };

    let report = GradeCalculator::new(state.store.clone())
        .grade_report(&identity.id, term)
        .await?;
    Ok(Json(report))
}

async fn submit_withdrawal(
    State(state): State<AppState>,
    Json(req): Json<NewWithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalRequest>), AppError> {
    let service = WithdrawalService::new(state.store.clone(), state.identity.clone());
    let request = service.submit(req).await?;
    Ok((StatusCode::CREATED, Json(request)))
}
