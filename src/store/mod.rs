pub mod rest;
pub mod sqlite;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// A record as exchanged with the store: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("backend rejected request with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to decode {collection} row: {message}")]
    Decode {
        collection: &'static str,
        message: String,
    },

    #[error("unknown column `{column}` on {collection}")]
    UnknownColumn {
        collection: &'static str,
        column: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl StoreError {
    /// Maps a reqwest failure, folding client-side timeouts into `Timeout`.
    pub fn from_transport(err: reqwest::Error, limit: Duration) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(limit)
        } else {
            StoreError::Http(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Bool,
}

/// The collections the service reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    Courses,
    StudentCourses,
    WithdrawalRequests,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Courses => "courses",
            Collection::StudentCourses => "student_courses",
            Collection::WithdrawalRequests => "withdrawal_requests",
        }
    }

    pub fn columns(&self) -> &'static [(&'static str, ColumnKind)] {
        use ColumnKind::*;
        match self {
            Collection::Profiles => &[
                ("id", Text),
                ("full_name", Text),
                ("student_id", Text),
                ("department", Text),
                ("year", Integer),
                ("semester", Integer),
            ],
            Collection::Courses => &[
                ("id", Text),
                ("code", Text),
                ("name", Text),
                ("credits", Integer),
                ("instructor", Text),
                ("schedule", Text),
                ("available", Bool),
            ],
            Collection::StudentCourses => &[
                ("id", Text),
                ("student_id", Text),
                ("course_id", Text),
                ("status", Text),
                ("grade", Text),
                ("enrolled_at", Text),
                ("dropped_at", Text),
            ],
            Collection::WithdrawalRequests => &[
                ("id", Text),
                ("student_id", Text),
                ("reason", Text),
                ("status", Text),
                ("submitted_at", Text),
            ],
        }
    }

    /// Ordering used for queries so results are stable for a given store state.
    pub fn order_by(&self) -> &'static str {
        match self {
            Collection::Courses => "code",
            Collection::StudentCourses => "enrolled_at",
            Collection::WithdrawalRequests => "submitted_at",
            Collection::Profiles => "id",
        }
    }

    pub fn column_kind(&self, column: &str) -> Result<ColumnKind, StoreError> {
        self.columns()
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| StoreError::UnknownColumn {
                collection: self.name(),
                column: column.to_string(),
            })
    }

    pub fn column_list(&self) -> String {
        self.columns()
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`; a null value means `column IS NULL`.
    Eq(String, Value),
    /// `column IN (values)`; an empty list matches nothing.
    In(String, Vec<Value>),
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq(column, _) | Condition::In(column, _) => column,
        }
    }
}

/// A conjunction of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column.to_string(), value.into()));
        self
    }

    pub fn one_of<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn validate(&self, collection: Collection) -> Result<(), StoreError> {
        for condition in &self.conditions {
            collection.column_kind(condition.column())?;
        }
        Ok(())
    }
}

/// Generic access to the backend's record collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Row>, StoreError>;
    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, StoreError>;
    /// Applies `patch` to every row matching `filter`; returns the number of rows changed.
    async fn update(&self, collection: Collection, filter: &Filter, patch: Row) -> Result<u64, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

pub async fn fetch<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    filter: &Filter,
) -> Result<Vec<T>, StoreError> {
    store
        .query(collection, filter)
        .await?
        .into_iter()
        .map(|row| decode_row(collection, row))
        .collect()
}

pub fn decode_row<T: DeserializeOwned>(collection: Collection, row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode {
        collection: collection.name(),
        message: e.to_string(),
    })
}

pub fn encode_row<T: Serialize>(collection: Collection, value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(StoreError::InvalidRequest(format!(
            "{} rows must be objects, got {}",
            collection.name(),
            other
        ))),
        Err(e) => Err(StoreError::InvalidRequest(e.to_string())),
    }
}

pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
