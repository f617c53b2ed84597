//! Gateway configuration, loaded from TOML or from the environment.

use anyhow::{Context, Result, bail};
use jobs::{Deadlines, PollPolicy};
use provider::HttpProvider;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Required: API key for the generation API.
pub const API_KEY_VAR: &str = "SCENARIO_API_KEY";
/// Required: secret paired with [`API_KEY_VAR`].
pub const SECRET_KEY_VAR: &str = "SCENARIO_SECRET_API_KEY";
/// Optional: listening port.
pub const PORT_VAR: &str = "PORT";
/// Optional: API root override.
pub const BASE_URL_VAR: &str = "SCENARIO_API_URL";
/// Optional: transport failures one poll may absorb.
pub const POLL_RETRIES_VAR: &str = "EASEL_POLL_RETRIES";
/// Optional: idle seconds before a session is evicted.
pub const SESSION_IDLE_VAR: &str = "EASEL_SESSION_IDLE_SECS";

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listener.
    #[serde(default)]
    pub server: ServerConfig,
    /// Generation API credentials and root.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Polling cadence and deadlines.
    #[serde(default)]
    pub jobs: JobsConfig,
    /// Session table housekeeping.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

/// Generation API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (supports `${ENV_VAR}` expansion).
    #[serde(default)]
    pub api_key: String,
    /// API secret (supports `${ENV_VAR}` expansion).
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound on one HTTP exchange with the API.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_base_url() -> String {
    HttpProvider::DEFAULT_BASE_URL.to_owned()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub poll_interval_ms: u64,
    /// Deadline for generation, transformation and background removal.
    pub standard_timeout_ms: u64,
    /// Deadline for upscaling.
    pub upscale_timeout_ms: u64,
    /// Consecutive transport failures a single poll may absorb.
    pub poll_retries: u32,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            standard_timeout_ms: 120_000,
            upscale_timeout_ms: 180_000,
            poll_retries: 0,
        }
    }
}

impl JobsConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            transport_retries: self.poll_retries,
        }
    }

    pub fn deadlines(&self) -> Deadlines {
        Deadlines {
            standard: Duration::from_millis(self.standard_timeout_ms),
            heavy: Duration::from_millis(self.upscale_timeout_ms),
        }
    }
}

/// Session table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Evict sessions idle for this long. Sessions never expire when unset.
    pub idle_timeout_secs: Option<u64>,
    /// How often the eviction sweep runs.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: None,
            sweep_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl GatewayConfig {
    /// Parse a TOML string, expanding `${VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = crate::utils::expand_env_vars(toml_str);
        toml::from_str(&expanded).context("invalid gateway configuration")
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Build and validate a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build and validate a configuration from `lookup`, which maps a
    /// variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        config.provider.api_key = var(API_KEY_VAR).unwrap_or_default();
        config.provider.secret_key = var(SECRET_KEY_VAR).unwrap_or_default();
        if let Some(url) = var(BASE_URL_VAR) {
            config.provider.base_url = url;
        }
        if let Some(port) = var(PORT_VAR) {
            config.server.port = parse_var(PORT_VAR, &port)?;
        }
        if let Some(retries) = var(POLL_RETRIES_VAR) {
            config.jobs.poll_retries = parse_var(POLL_RETRIES_VAR, &retries)?;
        }
        if let Some(idle) = var(SESSION_IDLE_VAR) {
            config.session.idle_timeout_secs = Some(parse_var(SESSION_IDLE_VAR, &idle)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the gateway cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.provider.api_key.trim().is_empty() {
            bail!("missing API key: set {API_KEY_VAR}");
        }
        if self.provider.secret_key.trim().is_empty() {
            bail!("missing API secret: set {SECRET_KEY_VAR}");
        }
        if self.provider.base_url.trim().is_empty() {
            bail!("provider.base_url must not be empty");
        }
        if self.provider.request_timeout_ms == 0 {
            bail!("provider.request_timeout_ms must be positive");
        }
        if self.jobs.poll_interval_ms == 0 {
            bail!("jobs.poll_interval_ms must be positive");
        }
        if self.jobs.standard_timeout_ms == 0 || self.jobs.upscale_timeout_ms == 0 {
            bail!("job timeouts must be positive");
        }
        if self.session.idle_timeout_secs == Some(0) {
            bail!("session.idle_timeout_secs must be positive when set");
        }
        if self.session.idle_timeout_secs.is_some() && self.session.sweep_interval_secs == 0 {
            bail!("session.sweep_interval_secs must be positive");
        }
        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{name} is not a valid number: {value}"))
}
