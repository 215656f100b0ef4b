use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Default per-file upload cap (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// Extra request-body allowance on top of the file cap for multipart framing.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CLIENT_URI: &str = "http://localhost:5173";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 20;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summary server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub server_port: u16,
    /// The only browser origin allowed to call the API.
    pub client_origin: String,
    /// API key for the Generative Language API.
    pub gemini_api_key: String,
    /// Model identifier used for every summarization call.
    pub gemini_model: String,
    /// Base URL of the Generative Language API.
    pub gemini_api_url: String,
    /// Upper bound on a single summarization call.
    pub summary_timeout: Duration,
    /// Largest accepted PDF, in bytes.
    pub max_file_size: usize,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
    /// Length of one rate-limit window.
    pub rate_limit_window: Duration,
    /// Requests allowed per client within one window.
    pub rate_limit_max_requests: u32,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as absent so that `FOO=` in a `.env` file falls back to the
    /// default instead of failing to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let max_file_size = parse_or(&get, "MAX_FILE_SIZE_BYTES", DEFAULT_MAX_FILE_SIZE)?;
        let max_body_size = parse_or(
            &get,
            "MAX_BODY_SIZE_BYTES",
            max_file_size.saturating_add(MULTIPART_OVERHEAD),
        )?;
        if max_file_size == 0 || max_body_size < max_file_size {
            return Err(ConfigError::InvalidValue("MAX_BODY_SIZE_BYTES".into()));
        }

        let window_secs: u64 = parse_or(
            &get,
            "RATE_LIMIT_WINDOW_SECS",
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        )?;
        if window_secs == 0 {
            return Err(ConfigError::InvalidValue("RATE_LIMIT_WINDOW_SECS".into()));
        }
        let rate_limit_max_requests: u32 = parse_or(
            &get,
            "RATE_LIMIT_MAX_REQUESTS",
            DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        )?;
        if rate_limit_max_requests == 0 {
            return Err(ConfigError::InvalidValue("RATE_LIMIT_MAX_REQUESTS".into()));
        }

        let timeout_secs: u64 = parse_or(
            &get,
            "SUMMARY_TIMEOUT_SECS",
            DEFAULT_SUMMARY_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_TIMEOUT_SECS".into()));
        }

        Ok(Self {
            server_port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            client_origin: get("CLIENT_URI").unwrap_or_else(|| DEFAULT_CLIENT_URI.to_string()),
            gemini_api_key: get("GEMINI_AI_API_KEY")
                .ok_or_else(|| ConfigError::MissingVariable("GEMINI_AI_API_KEY".to_string()))?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_url: get("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            summary_timeout: Duration::from_secs(timeout_secs),
            max_file_size,
            max_body_size,
            rate_limit_window: Duration::from_secs(window_secs),
            rate_limit_max_requests,
        })
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        server_port = config.server_port,
        client_origin = %config.client_origin,
        model = %config.gemini_model,
        max_file_size = config.max_file_size,
        rate_limit_window_secs = config.rate_limit_window.as_secs(),
        rate_limit_max_requests = config.rate_limit_max_requests,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_api_key_is_set() {
        let config = Config::from_lookup(lookup(&[("GEMINI_AI_API_KEY", "secret")]))
            .expect("config");

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.client_origin, "http://localhost:5173");
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.max_body_size, 10 * 1024 * 1024 + MULTIPART_OVERHEAD);
        assert_eq!(config.rate_limit_window, Duration::from_secs(900));
        assert_eq!(config.rate_limit_max_requests, 20);
        assert_eq!(config.summary_timeout, Duration::from_secs(60));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let error = Config::from_lookup(lookup(&[])).expect_err("api key required");
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "GEMINI_AI_API_KEY"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_AI_API_KEY", "secret"),
            ("PORT", "  "),
            ("GEMINI_MODEL", ""),
        ]))
        .expect("config");

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_AI_API_KEY", "secret"),
            ("PORT", "8080"),
            ("CLIENT_URI", "https://summaries.example"),
            ("MAX_FILE_SIZE_BYTES", "2048"),
            ("RATE_LIMIT_WINDOW_SECS", "60"),
            ("RATE_LIMIT_MAX_REQUESTS", "5"),
        ]))
        .expect("config");

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.client_origin, "https://summaries.example");
        assert_eq!(config.max_file_size, 2048);
        assert_eq!(config.max_body_size, 2048 + MULTIPART_OVERHEAD);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.rate_limit_max_requests, 5);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let error = Config::from_lookup(lookup(&[
            ("GEMINI_AI_API_KEY", "secret"),
            ("PORT", "not-a-port"),
        ]))
        .expect_err("invalid port");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "PORT"));
    }

    #[test]
    fn body_limit_smaller_than_file_limit_is_rejected() {
        let error = Config::from_lookup(lookup(&[
            ("GEMINI_AI_API_KEY", "secret"),
            ("MAX_FILE_SIZE_BYTES", "4096"),
            ("MAX_BODY_SIZE_BYTES", "1024"),
        ]))
        .expect_err("body limit too small");
        assert!(matches!(error, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let error = Config::from_lookup(lookup(&[
            ("GEMINI_AI_API_KEY", "secret"),
            ("RATE_LIMIT_MAX_REQUESTS", "0"),
        ]))
        .expect_err("zero limit");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "RATE_LIMIT_MAX_REQUESTS"));
    }
}
