use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::compiler::CompiledQuery;
use crate::services::backend::{BackendError, Hit, SearchBackend};

/// Connection details for the submissions index
#[derive(Debug, Clone)]
pub struct ElasticsearchOptions {
    pub endpoint: String,
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Elasticsearch client for submission searches
///
/// Talks to the `_count` and `_search` endpoints of a single index. The
/// underlying connection pool is shared by every request of the service.
pub struct ElasticsearchClient {
    base_url: String,
    index: String,
    credentials: Credentials,
    client: Client,
}

enum Credentials {
    None,
    Basic { username: String, password: Option<String> },
    ApiKey(String),
}

impl ElasticsearchClient {
    /// Create a new client
    ///
    /// An API key takes precedence over basic credentials.
    pub fn new(options: ElasticsearchOptions) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()?;

        let credentials = match (options.api_key, options.username) {
            (Some(key), _) => Credentials::ApiKey(key),
            (None, Some(username)) => Credentials::Basic {
                username,
                password: options.password,
            },
            (None, None) => Credentials::None,
        };

        Ok(Self {
            base_url: options.endpoint.trim_end_matches('/').to_string(),
            index: options.index,
            credentials,
            client,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn index_url(&self, action: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(&self.index),
            action
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::None => request,
            Credentials::Basic { username, password } => request.basic_auth(username, password.as_ref()),
            Credentials::ApiKey(key) => request.header("Authorization", format!("ApiKey {}", key)),
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, BackendError> {
        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Search backend request to {} failed: {} - {}", url, status, body);
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Response is not JSON: {}", e)))
    }

    /// Check that the cluster answers and is not red
    pub async fn health_check(&self) -> Result<bool, BackendError> {
        let url = format!("{}/_cluster/health", self.base_url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let json: Value = response.json().await?;
        Ok(matches!(
            json.get("status").and_then(Value::as_str),
            Some("green") | Some("yellow")
        ))
    }
}

impl SearchBackend for ElasticsearchClient {
    async fn count(&self, query: &CompiledQuery) -> Result<u64, BackendError> {
        let url = self.index_url("_count");
        let json = self.post_json(&url, &json!({ "query": query })).await?;

        let count = json
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| BackendError::InvalidResponse("Missing count".into()))?;

        tracing::debug!("Index {} reports {} matches", self.index, count);
        Ok(count)
    }

    async fn search(
        &self,
        query: &CompiledQuery,
        offset: u64,
        limit: u64,
        fields: &[&str],
    ) -> Result<Vec<Hit>, BackendError> {
        let url = self.index_url("_search");
        let body = json!({
            "query": query,
            "from": offset,
            "size": limit,
            "_source": fields,
            "track_total_hits": false
        });
        let json = self.post_json(&url, &body).await?;

        if json.get("timed_out").and_then(Value::as_bool) == Some(true) {
            return Err(BackendError::InvalidResponse("Search timed out".into()));
        }

        let hits = json
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .ok_or_else(|| BackendError::InvalidResponse("Missing hits array".into()))?;

        Ok(hits
            .iter()
            .map(|hit| {
                hit.get("_source")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(endpoint: &str) -> ElasticsearchOptions {
        ElasticsearchOptions {
            endpoint: endpoint.to_string(),
            index: "submissions".to_string(),
            username: None,
            password: None,
            api_key: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = ElasticsearchClient::new(options("http://localhost:9200/")).unwrap();

        assert_eq!(client.base_url, "http://localhost:9200");
        assert_eq!(client.index_url("_count"), "http://localhost:9200/submissions/_count");
    }

    #[test]
    fn test_api_key_wins_over_basic_auth() {
        let mut opts = options("http://localhost:9200");
        opts.username = Some("elastic".to_string());
        opts.api_key = Some("secret".to_string());

        let client = ElasticsearchClient::new(opts).unwrap();
        assert!(matches!(client.credentials, Credentials::ApiKey(_)));
    }
}
