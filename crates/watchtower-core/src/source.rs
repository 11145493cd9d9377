//! Where opportunities come from.
//!
//! A scan polls every registered [`OpportunitySource`]. The built-in catalog
//! is a [`FixtureSource`]; configured agency feeds are [`HttpSource`]s that
//! return a JSON array of opportunities.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use url::Url;

use crate::catalog;
use crate::config::SourceConfig;
use crate::error::{ConfigError, SourceError};
use crate::opportunity::Opportunity;

#[async_trait]
pub trait OpportunitySource: Send + Sync {
    /// Short label used in logs and errors.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<Opportunity>, SourceError>;
}

/// Serves a fixed list.
pub struct FixtureSource {
    name: String,
    opportunities: Vec<Opportunity>,
}

impl FixtureSource {
    pub fn new(name: impl Into<String>, opportunities: Vec<Opportunity>) -> Self {
        Self {
            name: name.into(),
            opportunities,
        }
    }

    /// The built-in federal catalog as of `today`.
    pub fn federal_catalog(today: NaiveDate) -> Self {
        Self::new("federal-catalog", catalog::federal_catalog(today))
    }
}

#[async_trait]
impl OpportunitySource for FixtureSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Opportunity>, SourceError> {
        Ok(self.opportunities.clone())
    }
}

/// GETs a JSON array of opportunities from a feed URL.
pub struct HttpSource {
    name: String,
    url: Url,
    token: Option<String>,
    client: Client,
}

impl HttpSource {
    pub fn new(name: impl Into<String>, url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let name = name.into();
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidValue {
            key: format!("sources.{name}.url"),
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: format!("sources.{name}.timeout_secs"),
                message: e.to_string(),
            })?;
        Ok(Self {
            name,
            url,
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.name.clone(),
            &config.url,
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl OpportunitySource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Opportunity>, SourceError> {
        let mut request = self.client.get(self.url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(|e| SourceError::Http {
            source_name: self.name.clone(),
            message: e.to_string(),
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                source_name: self.name.clone(),
                status: status.as_u16(),
            });
        }

        resp.json::<Vec<Opportunity>>()
            .await
            .map_err(|e| SourceError::Decode {
                source_name: self.name.clone(),
                message: e.to_string(),
            })
    }
}
