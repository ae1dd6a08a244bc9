//! Service configuration.

use std::time::Duration;

use ratequote_common::Currency;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Upstream rate source configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the fxratesapi-compatible upstream.
    pub base_url: String,
    /// Optional API key sent with every request.
    pub api_key: Option<String>,
    /// Per-fetch timeout.
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.fxratesapi.com".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Background engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between processing cycles.
    pub interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Rate source settings.
    pub source: SourceConfig,
    /// Scheduler settings.
    pub engine: EngineConfig,
    /// Allow-list of currencies accepted by the API.
    pub supported_currencies: Vec<Currency>,
    /// Default log level when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            source: SourceConfig::default(),
            engine: EngineConfig::default(),
            supported_currencies: vec![Currency::usd(), Currency::eur(), Currency::mxn()],
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("SERVER_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }

        if let Ok(url) = std::env::var("EXTERNAL_API_URL") {
            config.source.base_url = url;
        }

        if let Ok(key) = std::env::var("EXTERNAL_API_KEY") {
            if !key.is_empty() {
                config.source.api_key = Some(key);
            }
        }

        if let Some(timeout) = duration_from_env("EXTERNAL_API_TIMEOUT") {
            config.source.timeout = timeout;
        }

        if let Some(interval) = duration_from_env("WORKER_INTERVAL") {
            config.engine.interval = interval;
        }

        if let Ok(codes) = std::env::var("SUPPORTED_CURRENCIES") {
            let currencies: Vec<Currency> = codes
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(Currency::new)
                .collect();
            if !currencies.is_empty() {
                config.supported_currencies = currencies;
            }
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.source.base_url.is_empty() {
            return Err("Rate source base URL cannot be empty".to_string());
        }

        if self.source.timeout.is_zero() {
            return Err("Rate source timeout cannot be 0".to_string());
        }

        if self.engine.interval.is_zero() {
            return Err("Worker interval cannot be 0".to_string());
        }

        if self.supported_currencies.len() < 2 {
            return Err("At least two supported currencies are required".to_string());
        }

        Ok(())
    }
}

/// Read a duration in whole seconds from the environment.
fn duration_from_env(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
