//! YAML site list schema and parsing.
//!
//! Example file:
//!
//! ```yaml
//! defaults:
//!   timeout: 10
//!   max_attempts: 3
//!   retry_backoff_ms: 2000
//!
//! sites:
//!   - url: https://example.com
//!   - url: https://example.com/health
//!     expected_status: 204
//!     timeout: 2.5
//!   - url: https://shop.example.com
//!     keyword: "Add to cart"
//!   - url: https://legacy.example.com
//!     disabled: true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::{
    CheckerConfig, DEFAULT_EXPECTED_STATUS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF,
    DEFAULT_TIMEOUT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Site at index {index} is missing the required 'url' field")]
    MissingUrl { index: usize },
    #[error("Invalid site URL at index {index}: {url} ({reason})")]
    InvalidUrl {
        index: usize,
        url: String,
        reason: String,
    },
    #[error("Invalid timeout for {url}: {value} (must be a positive number of seconds)")]
    InvalidTimeout { url: String, value: f64 },
    #[error("Invalid expected status for {url}: {value} (must be 100-599)")]
    InvalidStatus { url: String, value: u16 },
    #[error("Invalid max_attempts for {url}: must be at least 1")]
    InvalidAttempts { url: String },
}

/// A configured target. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSpec {
    pub url: String,
    pub expected_status: u16,
    pub timeout: Duration,
    /// Case-insensitive text the response body must contain.
    pub keyword: Option<String>,
    pub max_attempts: u32,
}

impl SiteSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expected_status: DEFAULT_EXPECTED_STATUS,
            timeout: DEFAULT_TIMEOUT,
            keyword: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitesFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub sites: Vec<SiteDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsConfig {
    /// Seconds.
    pub timeout: Option<f64>,
    pub expected_status: Option<u16>,
    pub max_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteDef {
    /// Kept optional so a missing value is reported by index rather than
    /// as a generic parse failure.
    pub url: Option<String>,
    pub expected_status: Option<u16>,
    pub timeout: Option<f64>,
    pub keyword: Option<String>,
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub disabled: bool,
}

impl SitesFile {
    /// Read and parse a site file. Field validation happens in [`Self::site_specs`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(file)
    }

    /// An empty document is an empty site list.
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let parsed: Option<SitesFile> = serde_yaml::from_str(content)?;
        Ok(parsed.unwrap_or_default())
    }

    /// Resolve every enabled site against the defaults, in file order.
    pub fn site_specs(&self) -> Result<Vec<SiteSpec>, ConfigError> {
        let mut specs = Vec::with_capacity(self.sites.len());

        for (index, site) in self.sites.iter().enumerate() {
            if site.disabled {
                info!(index, url = site.url.as_deref().unwrap_or(""), "Skipping disabled site");
                continue;
            }

            let url = site.url.as_deref().ok_or(ConfigError::MissingUrl { index })?;
            validate_url(index, url)?;

            let expected_status = site
                .expected_status
                .or(self.defaults.expected_status)
                .unwrap_or(DEFAULT_EXPECTED_STATUS);
            if !(100..=599).contains(&expected_status) {
                return Err(ConfigError::InvalidStatus {
                    url: url.to_string(),
                    value: expected_status,
                });
            }

            let timeout = match site.timeout.or(self.defaults.timeout) {
                Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs).map_err(|_| {
                    ConfigError::InvalidTimeout {
                        url: url.to_string(),
                        value: secs,
                    }
                })?,
                Some(secs) => {
                    return Err(ConfigError::InvalidTimeout {
                        url: url.to_string(),
                        value: secs,
                    })
                }
                None => DEFAULT_TIMEOUT,
            };

            let max_attempts = site
                .max_attempts
                .or(self.defaults.max_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS);
            if max_attempts == 0 {
                return Err(ConfigError::InvalidAttempts {
                    url: url.to_string(),
                });
            }

            specs.push(SiteSpec {
                url: url.to_string(),
                expected_status,
                timeout,
                keyword: site.keyword.clone().filter(|k| !k.is_empty()),
                max_attempts,
            });
        }

        Ok(specs)
    }

    pub fn to_checker_config(&self) -> CheckerConfig {
        let mut config = CheckerConfig::default().with_retry_backoff(
            self.defaults
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RETRY_BACKOFF),
        );
        if let Some(n) = self.defaults.concurrency {
            config = config.with_max_concurrent_checks(n);
        }
        config
    }
}

fn validate_url(index: usize, raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        index,
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            index,
            url: raw.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(())
}

/// Load the site file and resolve it into specs plus checker tunables.
pub fn load(path: &Path) -> Result<(Vec<SiteSpec>, CheckerConfig), ConfigError> {
    let file = SitesFile::load(path)?;
    let specs = file.site_specs()?;
    Ok((specs, file.to_checker_config()))
}
