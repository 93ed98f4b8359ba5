use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, error};

use crate::identity::IdentityProvider;
use crate::store::{Collection, Condition, Filter, RecordStore, Row, StoreError};

/// Record store speaking the PostgREST dialect of the hosted backend
/// (`/rest/v1/{collection}`).
pub struct RestStore {
    client: Client,
    base_url: String,
    anon_key: String,
    identity: Option<Arc<dyn IdentityProvider>>,
    timeout: Duration,
}

impl RestStore {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            identity: None,
            timeout,
        })
    }

    /// Sends the signed-in user's access token instead of the anon key when a
    /// session exists, so row-level policies apply.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    fn collection_url(&self, collection: Collection, params: &[(String, String)]) -> Result<Url, StoreError> {
        let raw = format!("{}/rest/v1/{}", self.base_url, collection.name());
        Url::parse_with_params(&raw, params)
            .map_err(|e| StoreError::InvalidRequest(format!("bad backend url {}: {}", raw, e)))
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = match &self.identity {
            Some(identity) => identity.session().await.map(|s| s.access_token),
            None => None,
        };
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or_else(|| self.anon_key.clone()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| StoreError::from_transport(e, self.timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("backend returned {}: {}", status, body);
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Constraint(body));
        }
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_rows(&self, collection: Collection, response: Response) -> Result<Vec<Row>, StoreError> {
        response.json::<Vec<Row>>().await.map_err(|e| {
            if e.is_decode() {
                StoreError::Decode {
                    collection: collection.name(),
                    message: e.to_string(),
                }
            } else {
                StoreError::from_transport(e, self.timeout)
            }
        })
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let mut params = vec![
            ("select".to_string(), collection.column_list()),
            ("order".to_string(), format!("{}.asc", collection.order_by())),
        ];
        params.extend(filter_params(collection, filter)?);

        let url = self.collection_url(collection, &params)?;
        debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        self.read_rows(collection, response).await
    }

    async fn insert(&self, collection: Collection, row: Row) -> Result<Row, StoreError> {
        for column in row.keys() {
            collection.column_kind(column)?;
        }

        let url = self.collection_url(collection, &[])?;
        let request = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(request).await?;

        self.read_rows(collection, response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode {
                collection: collection.name(),
                message: "insert returned no representation".to_string(),
            })
    }

    async fn update(&self, collection: Collection, filter: &Filter, patch: Row) -> Result<u64, StoreError> {
        if filter.is_empty() {
            return Err(StoreError::InvalidRequest(format!(
                "refusing unfiltered update of {}",
                collection.name()
            )));
        }
        for column in patch.keys() {
            collection.column_kind(column)?;
        }

        let url = self.collection_url(collection, &filter_params(collection, filter)?)?;
        let request = self
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(request).await?;
        Ok(self.read_rows(collection, response).await?.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let url = self.collection_url(
            Collection::Courses,
            &[
                ("select".to_string(), "id".to_string()),
                ("limit".to_string(), "1".to_string()),
            ],
        )?;
        self.send(self.client.get(url)).await?;
        Ok(())
    }
}

/// Renders a filter as PostgREST query parameters (`col=eq.v`, `col=in.(a,b)`).
pub fn filter_params(collection: Collection, filter: &Filter) -> Result<Vec<(String, String)>, StoreError> {
    filter.validate(collection)?;
    Ok(filter
        .conditions()
        .iter()
        .map(|condition| match condition {
            Condition::Eq(column, Value::Null) => (column.clone(), "is.null".to_string()),
            Condition::Eq(column, value) => (column.clone(), format!("eq.{}", plain(value))),
            Condition::In(column, values) => {
                let list = values.iter().map(quoted).collect::<Vec<_>>().join(",");
                (column.clone(), format!("in.({})", list))
            }
        })
        .collect())
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_eq_in_and_null_conditions() {
        let filter = Filter::new()
            .eq("student_id", "u-1")
            .eq("status", "active")
            .eq("grade", Value::Null)
            .one_of("course_id", ["c-1", "c \"2\""]);

        let params = filter_params(Collection::StudentCourses, &filter).unwrap();
        assert_eq!(
            params,
            vec![
                ("student_id".to_string(), "eq.u-1".to_string()),
                ("status".to_string(), "eq.active".to_string()),
                ("grade".to_string(), "is.null".to_string()),
                ("course_id".to_string(), "in.(\"c-1\",\"c \\\"2\\\"\")".to_string()),
            ]
        );
    }

    #[test]
    fn renders_numbers_and_bools_verbatim() {
        let filter = Filter::new().eq("credits", 3).eq("available", true);
        let params = filter_params(Collection::Courses, &filter).unwrap();
        assert_eq!(params[0].1, "eq.3");
        assert_eq!(params[1].1, "eq.true");
    }

    #[test]
    fn collection_url_encodes_filters() {
        let store = RestStore::new("http://localhost:54321/", "anon", Duration::from_secs(1)).unwrap();
        let url = store
            .collection_url(
                Collection::Courses,
                &[("code".to_string(), "eq.Mgmt 3070".to_string())],
            )
            .unwrap();
        assert_eq!(url.path(), "/rest/v1/courses");
        assert_eq!(url.query(), Some("code=eq.Mgmt+3070"));
    }

    #[test]
    fn unknown_filter_columns_fail_before_any_request() {
        let filter = Filter::new().eq("secret", "x");
        assert!(matches!(
            filter_params(Collection::Profiles, &filter),
            Err(StoreError::UnknownColumn { .. })
        ));
    }
}
