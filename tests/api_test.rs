mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use student_portal::api::router;
use student_portal::state::AppState;
use tower::ServiceExt;

use common::{signed_in, signed_out, store};

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_checks_the_store() {
    let app = router(AppState { store: store().await, identity: signed_out() });
    let (status, _) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sign_in_flow_gates_student_routes() {
    let app = router(AppState { store: store().await, identity: signed_out() });

    let (status, body) = call(&app, "GET", "/enrollments", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Please sign in first");

    let (status, _) = call(&app, "POST", "/auth/sign-in", Some(json!({ "email": "", "password": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/auth/sign-in",
        Some(json!({ "email": "biruk@student.edu", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        "POST",
        "/auth/sign-in",
        Some(json!({ "email": " biruk@student.edu ", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "u-biruk");

    let (status, body) = call(&app, "GET", "/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "Biruk Bejiga");

    let (status, _) = call(&app, "POST", "/auth/sign-out", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", "/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn course_search_is_case_insensitive() {
    let app = router(AppState { store: store().await, identity: signed_out() });

    let (status, body) = call(&app, "GET", "/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = call(&app, "GET", "/courses?q=FIN", None).await;
    let codes: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["AcFn 3065"]);

    let (_, body) = call(&app, "GET", "/courses?q=taylor", None).await;
    assert_eq!(body[0]["code"], "Mktg 3040");
}

#[tokio::test]
async fn add_drop_and_grades_over_http() {
    let app = router(AppState { store: store().await, identity: signed_in() });

    let (status, body) = call(&app, "POST", "/enrollments", Some(json!({ "course_id": "c-bus" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"], "enrolled");
    assert_eq!(body["enrollment"]["status"], "active");

    let (status, body) = call(&app, "POST", "/enrollments", Some(json!({ "course_id": "c-bus" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "already_enrolled");

    let (status, _) = call(&app, "POST", "/enrollments", Some(json!({ "course_id": "c-mkt" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/enrollments", Some(json!({ "course_id": "nope" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "GET", "/grades", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_credits"], 3);
    assert_eq!(body["semester_gpa"], "0.00");
    assert_eq!(body["term"], Value::Null);

    let (status, body) = call(&app, "POST", "/enrollments/c-bus/drop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "dropped");
    let (_, body) = call(&app, "POST", "/enrollments/c-bus/drop", None).await;
    assert_eq!(body["result"], "not_active");

    let (_, body) = call(&app, "GET", "/enrollments", None).await;
    assert_eq!(body[0]["status"], "dropped");
}

#[tokio::test]
async fn grade_term_is_validated() {
    let app = router(AppState { store: store().await, identity: signed_in() });

    let (status, _) = call(&app, "GET", "/grades?year=3", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "GET", "/grades?year=3&semester=4", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "GET", "/grades?year=2&semester=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["term"], json!({ "year": 2, "semester": 1 }));
}

#[tokio::test]
async fn non_numeric_term_gets_a_json_error() {
    let app = router(AppState { store: store().await, identity: signed_in() });

    let (status, body) = call(&app, "GET", "/grades?year=third&semester=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "year must be a number, got `third`");

    let (status, body) = call(&app, "GET", "/grades?year=3&semester=x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn profile_falls_back_to_identity() {
    let app = router(AppState { store: store().await, identity: signed_in() });

    let (status, body) = call(&app, "GET", "/profile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Biruk Bejiga");
    assert_eq!(body["student_id"], "STU-2021-001");
    assert_eq!(body["department"], Value::Null);
}

#[tokio::test]
async fn withdrawal_needs_a_reason() {
    let app = router(AppState { store: store().await, identity: signed_in() });

    let (status, body) = call(&app, "POST", "/withdrawals", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please select or enter a reason for withdrawal");

    let (status, body) = call(
        &app,
        "POST",
        "/withdrawals",
        Some(json!({ "selected_reason": "Health issues" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["reason"], "Health issues");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["student_id"], "u-biruk");
}
