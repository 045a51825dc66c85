use std::time::Duration;

/// Default number of attempts per site before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default expected HTTP status.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;
/// Default fixed pause between attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(2000);

/// Tunables for a checker run. Per-site expectations live on [`crate::SiteSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    /// Fixed pause between attempts against the same site.
    pub retry_backoff: Duration,
    /// Upper bound on in-flight site checks.
    pub max_concurrent_checks: usize,
    /// TCP connect timeout applied by the shared client.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_concurrent_checks: 10,
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("uptime-checker/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CheckerConfig {
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_max_concurrent_checks(mut self, max: usize) -> Self {
        self.max_concurrent_checks = max.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_clamped_to_one() {
        let config = CheckerConfig::default().with_max_concurrent_checks(0);
        assert_eq!(config.max_concurrent_checks, 1);
    }

    #[test]
    fn default_user_agent_carries_version() {
        let config = CheckerConfig::default();
        assert!(config.user_agent.starts_with("uptime-checker/"));
    }
}
