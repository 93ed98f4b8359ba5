#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use student_portal::identity::InMemoryIdentityProvider;
use student_portal::models::Identity;
use student_portal::store::{Collection, RecordStore, Row, SqliteStore};

pub const STUDENT_ID: &str = "u-biruk";

pub fn student() -> Identity {
    Identity {
        id: STUDENT_ID.to_string(),
        email: "biruk@student.edu".to_string(),
        display_name: Some("Biruk Bejiga".to_string()),
        student_number: Some("STU-2021-001".to_string()),
    }
}

/// Fresh in-memory sqlite store with the schema applied.
pub async fn store() -> Arc<SqliteStore> {
    // one connection: every connection to sqlite::memory: is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");
    let store = SqliteStore::new(pool, Duration::from_secs(5));
    store.migrate().await.expect("Failed to run migrations");
    store
        .insert(Collection::Courses, course_row("c-bus", "Mgmt 3070", "Business Analytics", 3, "Dr. Anderson", true))
        .await
        .expect("Failed to seed course");
    store
        .insert(Collection::Courses, course_row("c-fin", "AcFn 3065", "Corporate Finance", 2, "Prof. Martinez", true))
        .await
        .expect("Failed to seed course");
    store
        .insert(Collection::Courses, course_row("c-mkt", "Mktg 3040", "Marketing Strategy", 3, "Dr. Taylor", false))
        .await
        .expect("Failed to seed course");
    Arc::new(store)
}

pub fn course_row(id: &str, code: &str, name: &str, credits: u32, instructor: &str, available: bool) -> Row {
    row(json!({
        "id": id,
        "code": code,
        "name": name,
        "credits": credits,
        "instructor": instructor,
        "schedule": "Mon, Wed 10:00 AM",
        "available": available,
    }))
}

pub fn profile_row(identity: &Identity) -> Row {
    row(json!({
        "id": identity.id,
        "full_name": "Biruk Bejiga",
        "student_id": "STU-2021-001",
        "department": "Accounting & Finance",
        "year": 3,
        "semester": 3,
    }))
}

pub fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

pub fn signed_in() -> Arc<InMemoryIdentityProvider> {
    Arc::new(InMemoryIdentityProvider::signed_in(student()))
}

pub fn signed_out() -> Arc<InMemoryIdentityProvider> {
    Arc::new(InMemoryIdentityProvider::new().with_account("secret", student()))
}
