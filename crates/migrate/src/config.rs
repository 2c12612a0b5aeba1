// ABOUTME: Content store configuration read from the process environment.
// ABOUTME: StoreConfig carries project, dataset, API version, credentials and an optional host override.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::MigrateError;

pub const ENV_PROJECT_ID: &str = "SANITY_PROJECT_ID";
pub const ENV_PUBLIC_PROJECT_ID: &str = "NEXT_PUBLIC_SANITY_PROJECT_ID";
pub const ENV_DATASET: &str = "SANITY_DATASET";
pub const ENV_PUBLIC_DATASET: &str = "NEXT_PUBLIC_SANITY_DATASET";
pub const ENV_API_VERSION: &str = "SANITY_API_VERSION";
pub const ENV_WRITE_TOKEN: &str = "SANITY_API_WRITE_TOKEN";
pub const ENV_TOKEN: &str = "SANITY_API_TOKEN";
pub const ENV_API_HOST: &str = "SANITY_API_HOST";

pub const DEFAULT_DATASET: &str = "production";
pub const DEFAULT_API_VERSION: &str = "2024-10-01";

/// Identity and credentials for one content store dataset.
#[derive(Clone)]
pub struct StoreConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub token: Option<String>,
    /// Base URL replacing `https://{project_id}.api.sanity.io`.
    pub api_host: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

// Keeps the token out of logs.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("api_version", &self.api_version)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_host", &self.api_host)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: DEFAULT_DATASET.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
            api_host: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("medal-migrate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = Some(host.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, MigrateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MigrateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let project_id = get(&[ENV_PROJECT_ID, ENV_PUBLIC_PROJECT_ID]).ok_or_else(|| {
            MigrateError::config(
                ENV_PROJECT_ID,
                "LoadConfig",
                Some(anyhow::anyhow!("environment variable is not set")),
            )
        })?;

        let mut config = StoreConfig::new(project_id);
        if let Some(dataset) = get(&[ENV_DATASET, ENV_PUBLIC_DATASET]) {
            config.dataset = dataset;
        }
        if let Some(version) = get(&[ENV_API_VERSION]) {
            config.api_version = version.trim_start_matches('v').to_string();
        }
        config.token = get(&[ENV_WRITE_TOKEN, ENV_TOKEN]);
        config.api_host = get(&[ENV_API_HOST]);

        config.base_url()?;
        Ok(config)
    }

    /// The write token, or a Config error when none is configured.
    pub fn require_token(&self) -> Result<&str, MigrateError> {
        self.token.as_deref().ok_or_else(|| {
            MigrateError::config(
                ENV_WRITE_TOKEN,
                "RequireToken",
                Some(anyhow::anyhow!("a write token is required to apply changes")),
            )
        })
    }

    pub fn base_url(&self) -> Result<Url, MigrateError> {
        let raw = match &self.api_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.sanity.io", self.project_id),
        };
        let url = Url::parse(&raw).map_err(|e| {
            MigrateError::config(ENV_API_HOST, "LoadConfig", Some(anyhow::anyhow!("{}: {}", raw, e)))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(MigrateError::config(
                ENV_API_HOST,
                "LoadConfig",
                Some(anyhow::anyhow!("unsupported scheme: {}", other)),
            )),
        }
    }
}
