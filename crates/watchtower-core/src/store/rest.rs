//! Redis-over-HTTP client (Upstash REST protocol).
//!
//! Each command is POSTed to the endpoint as a JSON array, e.g.
//! `["SETEX", "watchtower:last_scan", 3600, "{...}"]`, with a bearer token.
//! Replies are `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::KeyValueStore;
use crate::config::StoreConfig;
use crate::error::{ConfigError, StoreError};

struct Endpoint {
    url: Url,
    token: String,
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct RestStore {
    endpoint: Option<Endpoint>,
    client: Client,
}

impl RestStore {
    /// A store that rejects every operation with [`StoreError::NotConfigured`].
    pub fn unconfigured() -> Self {
        Self {
            endpoint: None,
            client: Client::new(),
        }
    }

    /// Build from connection parameters.
    ///
    /// Missing url or token yields an unconfigured store; a malformed url is
    /// a configuration error.
    pub fn new(url: Option<&str>, token: Option<&str>, timeout: Duration) -> Result<Self, ConfigError> {
        let (url, token) = match (url.filter(|u| !u.is_empty()), token.filter(|t| !t.is_empty())) {
            (Some(url), Some(token)) => (url, token),
            _ => return Ok(Self::unconfigured()),
        };

        let url = Url::parse(url).map_err(|e| ConfigError::InvalidValue {
            key: "store.url".into(),
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "store.timeout_secs".into(),
                message: e.to_string(),
            })?;

        Ok(Self {
            endpoint: Some(Endpoint {
                url,
                token: token.to_string(),
            }),
            client,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.url.as_deref(),
            config.token.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn command(&self, args: Value) -> Result<Value, StoreError> {
        let endpoint = self.endpoint.as_ref().ok_or(StoreError::NotConfigured)?;
        let name = args
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();

        let resp = self
            .client
            .post(endpoint.url.clone())
            .bearer_auth(&endpoint.token)
            .json(&args)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        let reply: Reply = serde_json::from_str(&body).map_err(|_| StoreError::UnexpectedResponse {
            command: name.clone(),
            message: format!("HTTP {status}: {body}"),
        })?;

        if let Some(message) = reply.error {
            return Err(StoreError::Api { command: name, message });
        }
        if !status.is_success() {
            return Err(StoreError::Api {
                command: name,
                message: format!("HTTP {status}"),
            });
        }
        Ok(reply.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl KeyValueStore for RestStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(StoreError::UnexpectedResponse {
                command: "GET".into(),
                message: other.to_string(),
            }),
        }
    }

    async fn set_ex(&self, key: &str, ttl: Duration, value: String) -> Result<(), StoreError> {
        // SETEX rejects a zero expiry.
        let secs = ttl.as_secs().max(1);
        self.command(json!(["SETEX", key, secs, value])).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        match self.command(json!(["KEYS", pattern])).await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(StoreError::UnexpectedResponse {
                        command: "KEYS".into(),
                        message: other.to_string(),
                    }),
                })
                .collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(StoreError::UnexpectedResponse {
                command: "KEYS".into(),
                message: other.to_string(),
            }),
        }
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.command(json!(["DEL", key])).await?;
        Ok(removed.as_u64().unwrap_or(0) > 0)
    }
}
