mod http;

pub use http::HttpProbe;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::sites::SiteSpec;

/// Why a single site check did not succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("Network error: {reason}")]
    Network { reason: String },
    #[error("Timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },
    #[error("Unexpected status {actual} (expected {expected})")]
    StatusMismatch { expected: u16, actual: u16 },
    #[error("Keyword '{keyword}' not found in response body")]
    KeywordMissing { keyword: String },
}

impl CheckError {
    /// Transport failures are worth another attempt; a wrong answer is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::StatusMismatch { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

/// What came back from one GET.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    /// Leading part of the body, only read when the site has a keyword.
    pub body: Option<String>,
}

/// Trait for issuing one HTTP GET against a site.
///
/// Implementations perform a single attempt; retries belong to the checker.
/// The trait is object-safe and Send + Sync for use across async tasks.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, site: &SiteSpec) -> Result<ProbeResponse, CheckError>;
}
