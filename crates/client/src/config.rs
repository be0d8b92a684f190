//! Client configuration, read from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `STOREFRONT_API_URL` | `http://localhost:3333` |
//! | `STOREFRONT_DATA_DIR` | `{app_data_dir}/storefront` |
//! | `STOREFRONT_REQUEST_TIMEOUT_MS` | none (requests may wait indefinitely) |
//! | `STOREFRONT_LOG_FORMAT` | `pretty` (`json` also accepted) |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use storefront_observability::LogFormat;

pub const DEFAULT_API_URL: &str = "http://localhost:3333";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    /// `None` means the OS app data directory.
    pub data_dir: Option<PathBuf>,
    pub request_timeout: Option<Duration>,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: None,
            request_timeout: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("STOREFRONT_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }

        if let Some(dir) = lookup("STOREFRONT_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(ms) = lookup("STOREFRONT_REQUEST_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .with_context(|| format!("STOREFRONT_REQUEST_TIMEOUT_MS is not a number: {ms:?}"))?;
            if ms == 0 {
                bail!("STOREFRONT_REQUEST_TIMEOUT_MS must be positive");
            }
            config.request_timeout = Some(Duration::from_millis(ms));
        }

        if let Some(format) = lookup("STOREFRONT_LOG_FORMAT") {
            config.log_format = format
                .parse()
                .map_err(|e: String| anyhow::anyhow!("invalid STOREFRONT_LOG_FORMAT: {e}"))?;
        }

        Ok(config)
    }
}
