use std::env;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{ClientError, ClientResult};

// =========================================================
// Runtime configuration
// =========================================================

/// Defaults used when the variable is absent or unparsable.
const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_SESSION_FILE: &str = "mutual-session.json";
const DEFAULT_MATCH_BANNER_MS: u64 = 2_500;
const DEFAULT_INTRO_DELAY_MS: u64 = 1_500;
const DEFAULT_MESSAGE_POLL_MS: u64 = 5_000;
const DEFAULT_DISCOVER_PAGE_SIZE: u32 = 10;
const DEFAULT_MATCHES_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_prefix: String,
    pub http_timeout: Duration,
    pub session_file: PathBuf,
    pub match_banner: Duration,
    pub intro_delay: Duration,
    pub message_poll: Duration,
    pub discover_page_size: u32,
    pub matches_page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ClientConfig {
    /// Reads `MUTUAL_*` variables, after loading `.env` if there is one.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let millis = |key: &str, default: u64| {
            Duration::from_millis(
                lookup(key)
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(default),
            )
        };
        let count = |key: &str, default: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        Self {
            api_url: text("MUTUAL_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            // set but empty means no prefix
            api_prefix: lookup("MUTUAL_API_PREFIX")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
            http_timeout: millis("MUTUAL_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS),
            session_file: PathBuf::from(text("MUTUAL_SESSION_FILE", DEFAULT_SESSION_FILE)),
            match_banner: millis("MUTUAL_MATCH_BANNER_MS", DEFAULT_MATCH_BANNER_MS),
            intro_delay: millis("MUTUAL_INTRO_DELAY_MS", DEFAULT_INTRO_DELAY_MS),
            message_poll: millis("MUTUAL_MESSAGE_POLL_MS", DEFAULT_MESSAGE_POLL_MS),
            discover_page_size: count("MUTUAL_DISCOVER_PAGE_SIZE", DEFAULT_DISCOVER_PAGE_SIZE),
            matches_page_size: count("MUTUAL_MATCHES_PAGE_SIZE", DEFAULT_MATCHES_PAGE_SIZE),
        }
    }

    /// Base that request paths are appended to, e.g. `http://host/api/v1`.
    pub fn api_base(&self) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            self.api_url.clone()
        } else {
            format!("{}/{}", self.api_url, prefix)
        }
    }

    /// Public URL of an uploaded photo (`Photo::file_path` is relative to `/uploads`).
    pub fn photo_url(&self, file_path: &str) -> ClientResult<String> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| ClientError::invalid_input(e.to_string()).in_op_with("config.photo_url", &self.api_url))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ClientError::invalid_input("API URL cannot carry a path")
                    .in_op_with("config.photo_url", self.api_url.clone())
            })?;
            segments.pop_if_empty().push("uploads");
            segments.extend(file_path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(pairs: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_env() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.api_base(), "http://localhost:8000/api/v1");
        assert_eq!(cfg.http_timeout, Duration::from_secs(15));
        assert_eq!(cfg.match_banner, Duration::from_millis(2500));
        assert_eq!(cfg.message_poll, Duration::from_secs(5));
        assert_eq!(cfg.discover_page_size, 10);
        assert_eq!(cfg.matches_page_size, 20);
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let cfg = config_with(&[
            ("MUTUAL_API_URL", "https://mutual.example/"),
            ("MUTUAL_API_PREFIX", ""),
            ("MUTUAL_MATCH_BANNER_MS", "soon"),
            ("MUTUAL_DISCOVER_PAGE_SIZE", "0"),
            ("MUTUAL_MATCHES_PAGE_SIZE", "50"),
        ]);
        assert_eq!(cfg.api_base(), "https://mutual.example");
        assert_eq!(cfg.match_banner, Duration::from_millis(DEFAULT_MATCH_BANNER_MS));
        assert_eq!(cfg.discover_page_size, DEFAULT_DISCOVER_PAGE_SIZE);
        assert_eq!(cfg.matches_page_size, 50);
    }

    #[test]
    fn prefix_is_normalised_and_can_be_turned_off() {
        assert_eq!(config_with(&[("MUTUAL_API_PREFIX", "  ")]).api_base(), "http://localhost:8000");
        assert_eq!(
            config_with(&[("MUTUAL_API_PREFIX", "/v2/")]).api_base(),
            "http://localhost:8000/v2"
        );
        assert_eq!(config_with(&[]).api_base(), "http://localhost:8000/api/v1");
    }

    #[test]
    fn photo_url_encodes_segments() {
        let cfg = ClientConfig::default();
        assert_eq!(
            cfg.photo_url("user 1/a#b.jpg").unwrap(),
            "http://localhost:8000/uploads/user%201/a%23b.jpg"
        );
    }
}
