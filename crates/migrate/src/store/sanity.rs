// ABOUTME: Sanity HTTP API implementation of ContentStore using reqwest.
// ABOUTME: Handles GROQ queries with JSON-encoded parameters and mutation transactions with bearer auth.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{ContentStore, Mutation, MutationOutcome};
use crate::config::StoreConfig;
use crate::error::MigrateError;

/// Longest response body quoted in an error message.
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

/// Client for one Sanity project dataset.
#[derive(Debug, Clone)]
pub struct SanityClient {
    http: reqwest::Client,
    config: StoreConfig,
    base: String,
}

impl SanityClient {
    pub fn new(config: StoreConfig) -> Result<Self, MigrateError> {
        let base = config.base_url()?.as_str().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| MigrateError::config(&base, "BuildClient", Some(e.into())))?;
        Ok(Self { http, config, base })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn endpoint(&self, kind: &str) -> String {
        format!(
            "{}/v{}/data/{}/{}",
            self.base, self.config.api_version, kind, self.config.dataset
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

async fn error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    let mut body = resp.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    format!("HTTP {}: {}", status.as_u16(), body)
}

impl ContentStore for SanityClient {
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Vec<Value>, MigrateError> {
        let url = self.endpoint("query");
        let mut pairs: Vec<(String, String)> = vec![
            ("query".to_string(), query.to_string()),
            ("perspective".to_string(), "raw".to_string()),
        ];
        for (name, value) in params {
            pairs.push((format!("${}", name), value.to_string()));
        }

        debug!(url = %url, query, "fetch");
        let resp = self
            .authorize(self.http.get(&url).query(&pairs))
            .send()
            .await
            .map_err(|e| MigrateError::fetch(&url, "Query", Some(e.into())))?;
        if !resp.status().is_success() {
            let msg = error_body(resp).await;
            return Err(MigrateError::fetch(&url, "Query", Some(anyhow::anyhow!(msg))));
        }

        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| MigrateError::decode(&url, "Query", Some(e.into())))?;
        Ok(match body.result {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }

    async fn mutate(&self, mutations: &[Mutation]) -> Result<MutationOutcome, MigrateError> {
        let url = self.endpoint("mutate");
        let target = mutations
            .iter()
            .map(Mutation::id)
            .collect::<Vec<_>>()
            .join(",");
        self.config.require_token()?;

        debug!(url = %url, count = mutations.len(), "mutate");
        let resp = self
            .authorize(
                self.http
                    .post(&url)
                    .query(&[("returnIds", "true"), ("visibility", "sync")])
                    .json(&json!({ "mutations": mutations })),
            )
            .send()
            .await
            .map_err(|e| MigrateError::write(&target, "Mutate", Some(e.into())))?;

        match resp.status() {
            status if status.is_success() => resp
                .json()
                .await
                .map_err(|e| MigrateError::decode(&target, "Mutate", Some(e.into()))),
            // A missing document on delete is reported as 404 by some proxies.
            StatusCode::NOT_FOUND if mutations.iter().all(|m| matches!(m, Mutation::Delete { .. })) => {
                Ok(MutationOutcome::default())
            }
            _ => {
                let msg = error_body(resp).await;
                Err(MigrateError::write(&target, "Mutate", Some(anyhow::anyhow!(msg))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DeleteOutcome;
    use httpmock::prelude::*;
    use serde_json::Map;

    fn client(server: &MockServer, token: Option<&str>) -> SanityClient {
        let mut config = StoreConfig::new("proj")
            .dataset("staging")
            .api_version("2024-10-01")
            .api_host(server.base_url());
        if let Some(t) = token {
            config = config.token(t);
        }
        SanityClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn fetch_sends_query_params_and_perspective() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v2024-10-01/data/query/staging")
                .query_param("query", "*[_type == $type]")
                .query_param("$type", "\"post\"")
                .query_param("perspective", "raw")
                .header("authorization", "Bearer tok");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"ms": 3, "result": [{"_id": "a"}, {"_id": "drafts.a"}]}"#);
        });

        let docs = client(&server, Some("tok"))
            .fetch("*[_type == $type]", &[("type", json!("post"))])
            .await
            .unwrap();
        mock.assert();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn fetch_maps_http_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2024-10-01/data/query/staging");
            then.status(401).body(r#"{"error": "Unauthorized"}"#);
        });

        let err = client(&server, None).fetch("*", &[]).await.unwrap_err();
        assert!(err.is_fetch());
        assert!(err.to_string().contains("HTTP 401"));
    }

    #[tokio::test]
    async fn mutate_posts_transaction_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2024-10-01/data/mutate/staging")
                .query_param("returnIds", "true")
                .header("authorization", "Bearer tok")
                .json_body(json!({"mutations": [
                    {"patch": {"id": "a", "set": {"title": "T"}}},
                    {"delete": {"id": "drafts.a"}}
                ]}));
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"transactionId": "tx1", "results": [{"id": "a", "operation": "update"}, {"id": "drafts.a", "operation": "delete"}]}"#);
        });

        let mut set = Map::new();
        set.insert("title".to_string(), json!("T"));
        let outcome = client(&server, Some("tok"))
            .transaction(&[Mutation::patch("a", set), Mutation::delete("drafts.a")])
            .await
            .unwrap();
        mock.assert();
        assert_eq!(outcome.transaction_id, "tx1");
        assert_eq!(outcome.results.len(), 2);
    }

    #[tokio::test]
    async fn mutate_without_token_fails_before_any_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let err = client(&server, None)
            .delete("drafts.a")
            .await
            .unwrap_err();
        assert!(err.is_config());
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn delete_of_missing_document_is_not_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2024-10-01/data/mutate/staging");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"transactionId": "tx2", "results": []}"#);
        });

        let outcome = client(&server, Some("tok")).delete("drafts.gone").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
    }

    #[tokio::test]
    async fn mutate_maps_server_errors_to_write() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2024-10-01/data/mutate/staging");
            then.status(500).body("boom");
        });

        let err = client(&server, Some("tok"))
            .patch("a", Map::new())
            .await
            .unwrap_err();
        assert!(err.is_write());
        assert_eq!(err.target, "a");
    }
}
