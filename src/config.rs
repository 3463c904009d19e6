//! Client configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the storefront REST API (e.g. `https://shop.example/api/`)
    pub api_base_url: String,
    /// Login entry point the UI redirects to when the session ends
    pub login_path: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Quiet period before a search query is sent
    pub search_debounce: Duration,
    /// Where the persistent key-value store lives
    pub session_file: PathBuf,
    /// Optional IP geolocation endpoint (`{ip}`-free, returns caller's location)
    pub ip_geolocation_url: Option<String>,
    /// Optional fixed device position (latitude, longitude)
    pub fixed_position: Option<(f64, f64)>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api/".to_string(),
            login_path: "/login".to_string(),
            request_timeout: Duration::from_secs(15),
            search_debounce: Duration::from_millis(300),
            session_file: PathBuf::from(".storefront-session.json"),
            ip_geolocation_url: None,
            fixed_position: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_base_url =
            env::var("API_BASE_URL").map_err(|_| ConfigError::Missing("API_BASE_URL"))?;

        let fixed_position = match (env::var("FIXED_LATITUDE"), env::var("FIXED_LONGITUDE")) {
            (Ok(lat), Ok(lon)) => Some((
                parse_var("FIXED_LATITUDE", &lat)?,
                parse_var("FIXED_LONGITUDE", &lon)?,
            )),
            _ => None,
        };

        Ok(Self {
            api_base_url: normalize_base_url(&api_base_url),
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(15),
            ),
            search_debounce: Duration::from_millis(
                env::var("SEARCH_DEBOUNCE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".storefront-session.json")),
            ip_geolocation_url: env::var("IP_GEOLOCATION_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            fixed_position,
        })
    }

    /// Config pointing at a specific backend (used by tests).
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            api_base_url: normalize_base_url(base_url),
            ..Self::default()
        }
    }
}

/// Relative paths are joined onto the base URL, so it must end in `/`.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

fn parse_var(name: &'static str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(name, value.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("API_BASE_URL", "https://shop.example/api");
        env::set_var("FIXED_LATITUDE", "37.7749");
        env::set_var("FIXED_LONGITUDE", "-122.4194");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_base_url, "https://shop.example/api/");
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.fixed_position, Some((37.7749, -122.4194)));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        assert_eq!(normalize_base_url("http://x/api"), "http://x/api/");
        assert_eq!(normalize_base_url("http://x/api/"), "http://x/api/");
    }
}
