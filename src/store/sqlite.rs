use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row as _, Sqlite, SqlitePool};

use crate::store::{
    Collection, ColumnKind, Condition, Filter, RecordStore, Row, StoreError, with_timeout,
};

/// Record store backed by a local sqlite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool, timeout))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_rows(&self, collection: Collection, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        filter.validate(collection)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {}",
            collection.column_list(),
            collection.name()
        ));
        push_where(&mut qb, collection, filter)?;
        qb.push(format!(" ORDER BY {}, rowid", collection.order_by()));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter().map(|row| read_row(collection, row)).collect()
    }

    async fn insert_row(&self, collection: Collection, row: Row) -> Result<Row, StoreError> {
        if row.is_empty() {
            return Err(StoreError::InvalidRequest(format!(
                "empty insert into {}",
                collection.name()
            )));
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (", collection.name()));
        let mut columns = qb.separated(", ");
        for column in row.keys() {
            collection.column_kind(column)?;
            columns.push(column.as_str());
        }
        qb.push(") VALUES (");
        let mut first = true;
        for (column, value) in &row {
            if !first {
                qb.push(", ");
            }
            first = false;
            push_value(&mut qb, collection.column_kind(column)?, column, value)?;
        }
        qb.push(format!(") RETURNING {}", collection.column_list()));

        let inserted = qb.build().fetch_one(&self.pool).await.map_err(map_sqlx)?;
        read_row(collection, &inserted)
    }

    async fn update_rows(&self, collection: Collection, filter: &Filter, patch: Row) -> Result<u64, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::InvalidRequest(format!(
                "refusing unfiltered update of {}",
                collection.name()
            )));
        }
        if patch.is_empty() {
            return Ok(0);
        }
        filter.validate(collection)?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", collection.name()));
        let mut first = true;
        for (column, value) in &patch {
            let kind = collection.column_kind(column)?;
            if !first {
                qb.push(", ");
            }
            first = false;
            qb.push(format!("{} = ", column));
            push_value(&mut qb, kind, column, value)?;
        }
        push_where(&mut qb, collection, filter)?;

        let result = qb.build().execute(&self.pool).await.map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        with_timeout(self.timeout, self.fetch_rows(collection, filter)).await
    }

    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, StoreError> {
        with_timeout(self.timeout, self.insert_row(collection, row)).await
    }

    async fn update(&self, collection: Collection, filter: &Filter, patch: Row) -> Result<u64, StoreError> {
        with_timeout(self.timeout, self.update_rows(collection, filter, patch)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query("select 1").execute(&self.pool).await?;
            Ok::<(), StoreError>(())
        })
        .await
    }
}

fn push_where(
    qb: &mut QueryBuilder<'_, Sqlite>,
    collection: Collection,
    filter: &Filter,
) -> Result<(), StoreError> {
    for (i, condition) in filter.conditions().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        let column = condition.column();
        let kind = collection.column_kind(column)?;
        match condition {
            Condition::Eq(_, Value::Null) => {
                qb.push(format!("{} IS NULL", column));
            }
            Condition::Eq(_, value) => {
                qb.push(format!("{} = ", column));
                push_value(qb, kind, column, value)?;
            }
            Condition::In(_, values) if values.is_empty() => {
                qb.push("1 = 0");
            }
            Condition::In(_, values) => {
                qb.push(format!("{} IN (", column));
                for (j, value) in values.iter().enumerate() {
                    if j > 0 {
                        qb.push(", ");
                    }
                    push_value(qb, kind, column, value)?;
                }
                qb.push(")");
            }
        }
    }
    Ok(())
}

fn push_value(
    qb: &mut QueryBuilder<'_, Sqlite>,
    kind: ColumnKind,
    column: &str,
    value: &Value,
) -> Result<(), StoreError> {
    let mismatch = || {
        StoreError::InvalidRequest(format!("value {} does not fit column `{}`", value, column))
    };

    match (kind, value) {
        (ColumnKind::Text, Value::Null) => {
            qb.push_bind(None::<String>);
        }
        (ColumnKind::Integer | ColumnKind::Bool, Value::Null) => {
            qb.push_bind(None::<i64>);
        }
        (ColumnKind::Text, Value::String(s)) => {
            qb.push_bind(s.clone());
        }
        (ColumnKind::Integer, Value::Number(n)) => {
            qb.push_bind(n.as_i64().ok_or_else(mismatch)?);
        }
        (ColumnKind::Bool, Value::Bool(b)) => {
            qb.push_bind(*b);
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

fn read_row(collection: Collection, row: &SqliteRow) -> Result<Row, StoreError> {
    let mut out = Row::new();
    for (column, kind) in collection.columns() {
        let value = match kind {
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(*column)?
                .map(Value::String),
            ColumnKind::Integer => row
                .try_get::<Option<i64>, _>(*column)?
                .map(Value::from),
            ColumnKind::Bool => row
                .try_get::<Option<bool>, _>(*column)?
                .map(Value::Bool),
        };
        out.insert(column.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(out)
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => {
                return StoreError::Constraint(db.message().to_string());
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}
