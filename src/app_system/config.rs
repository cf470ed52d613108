use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Runtime settings, read from `RENTAL_*` environment variables (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Origin of the persistence API, without the `/api` suffix.
    pub api_base_url: Option<String>,
    /// Bound on every outbound call.
    pub request_timeout: Duration,
    /// Header sent on every request so tunnelled deployments skip their interstitial page.
    pub bypass_header: (String, String),
    /// Where the session record is kept. `None` keeps sessions in memory only.
    pub session_dir: Option<PathBuf>,
    /// Period of the background reconciliation pass, if any.
    pub reconcile_interval: Option<Duration>,
    pub channel_buffer: usize,
    /// Post the starter catalog when the store has no products.
    pub seed_catalog: bool,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout: Duration::from_secs(15),
            bypass_header: ("ngrok-skip-browser-warning".to_string(), "true".to_string()),
            session_dir: None,
            reconcile_interval: None,
            channel_buffer: 32,
            seed_catalog: true,
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    let Some(value) = var(name) else {
        return Ok(None);
    };
    let parsed = value.trim().parse().ok();
    parsed.map(Some).ok_or(ConfigError::InvalidValue { name, value })
}

impl StoreConfig {
    /// Loads `.env` when present, then overlays the environment on the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        config.api_base_url = var("RENTAL_API_BASE_URL");
        if let Some(secs) = parsed::<u64>("RENTAL_API_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(header) = var("RENTAL_BYPASS_HEADER") {
            let (name, value) = header.split_once(':').ok_or(ConfigError::InvalidValue {
                name: "RENTAL_BYPASS_HEADER",
                value: header.clone(),
            })?;
            config.bypass_header = (name.trim().to_string(), value.trim().to_string());
        }
        config.session_dir = var("RENTAL_SESSION_DIR").map(PathBuf::from);
        config.reconcile_interval = parsed::<u64>("RENTAL_RECONCILE_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        if let Some(buffer) = parsed::<usize>("RENTAL_CHANNEL_BUFFER")? {
            config.channel_buffer = buffer.max(1);
        }
        if let Some(seed) = parsed::<bool>("RENTAL_SEED_CATALOG")? {
            config.seed_catalog = seed;
        }
        Ok(config)
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = Some(interval);
        self
    }

    pub fn with_seed_catalog(mut self, seed: bool) -> Self {
        self.seed_catalog = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let config = StoreConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.bypass_header.0, "ngrok-skip-browser-warning");
        assert!(config.seed_catalog);
        assert!(config.api_base_url.is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let config = StoreConfig::default()
            .with_api_base_url("http://localhost:5000")
            .with_request_timeout(Duration::from_millis(200))
            .with_seed_catalog(false);
        assert_eq!(config.api_base_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(config.request_timeout, Duration::from_millis(200));
        assert!(!config.seed_catalog);
    }
}
