use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::CheckError;
use crate::sites::SiteSpec;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write report to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of checking one site once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub url: String,
    pub expected_status: u16,
    pub actual_status: Option<u16>,
    pub success: bool,
    pub error: Option<String>,
    /// Latency of the final attempt; absent when no response arrived.
    pub latency_ms: Option<u64>,
    pub attempts: u32,
}

/// How the final attempt against a site ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A response arrived; `error` is set when it missed the expectations.
    Responded {
        status: u16,
        latency_ms: u64,
        error: Option<CheckError>,
    },
    /// No response after the last attempt.
    Unreachable { error: CheckError },
}

impl CheckResult {
    pub fn from_outcome(site: &SiteSpec, outcome: Outcome, attempts: u32) -> Self {
        let (actual_status, latency_ms, error) = match outcome {
            Outcome::Responded {
                status,
                latency_ms,
                error,
            } => (Some(status), Some(latency_ms), error),
            Outcome::Unreachable { error } => (None, None, Some(error)),
        };
        Self {
            url: site.url.clone(),
            expected_status: site.expected_status,
            actual_status,
            success: error.is_none(),
            error: error.map(|e| e.to_string()),
            latency_ms,
            attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub ok: usize,
    pub fail: usize,
    pub total: usize,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OK:{} | FAIL:{} | Total:{}", self.ok, self.fail, self.total)
    }
}

/// Aggregate of one run, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub results: Vec<CheckResult>,
    pub overall_success: bool,
}

impl Report {
    pub fn new(results: Vec<CheckResult>) -> Self {
        Self::at(Utc::now(), results)
    }

    pub fn at(timestamp: DateTime<Utc>, results: Vec<CheckResult>) -> Self {
        let overall_success = results.iter().all(|r| r.success);
        Self {
            timestamp,
            results,
            overall_success,
        }
    }

    pub fn summary(&self) -> Summary {
        let ok = self.results.iter().filter(|r| r.success).count();
        Summary {
            ok,
            fail: self.results.len() - ok,
            total: self.results.len(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the pretty-printed report, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        let write_err = |source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, json).map_err(write_err)
    }

    /// Plain-text summary, one line per site plus a totals line.
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Uptime report {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for r in &self.results {
            if r.success {
                let _ = write!(out, "[OK] {}", r.url);
                if let Some(status) = r.actual_status {
                    let _ = write!(out, " ({}", status);
                    if let Some(ms) = r.latency_ms {
                        let _ = write!(out, ", {}ms", ms);
                    }
                    out.push(')');
                }
            } else {
                let _ = write!(
                    out,
                    "[FAIL] {} - {}",
                    r.url,
                    r.error.as_deref().unwrap_or("unknown error")
                );
            }
            out.push('\n');
        }
        out.push_str(&self.summary().to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(url: &str) -> CheckResult {
        CheckResult {
            url: url.into(),
            expected_status: 200,
            actual_status: Some(200),
            success: true,
            error: None,
            latency_ms: Some(42),
            attempts: 1,
        }
    }

    fn failed(url: &str) -> CheckResult {
        CheckResult {
            url: url.into(),
            expected_status: 200,
            actual_status: None,
            success: false,
            error: Some("Network error: connection refused".into()),
            latency_ms: None,
            attempts: 3,
        }
    }

    #[test]
    fn from_outcome_healthy_response() {
        let site = SiteSpec::new("https://a.com");
        let outcome = Outcome::Responded {
            status: 200,
            latency_ms: 18,
            error: None,
        };
        let r = CheckResult::from_outcome(&site, outcome, 1);
        assert!(r.success);
        assert_eq!(r.actual_status, Some(200));
        assert_eq!(r.latency_ms, Some(18));
        assert!(r.error.is_none());
        assert_eq!(r.attempts, 1);
    }

    #[test]
    fn from_outcome_mismatched_response_keeps_status() {
        let site = SiteSpec::new("https://a.com/missing");
        let outcome = Outcome::Responded {
            status: 404,
            latency_ms: 7,
            error: Some(CheckError::StatusMismatch {
                expected: 200,
                actual: 404,
            }),
        };
        let r = CheckResult::from_outcome(&site, outcome, 1);
        assert!(!r.success);
        assert_eq!(r.actual_status, Some(404));
        assert_eq!(r.error.as_deref(), Some("Unexpected status 404 (expected 200)"));
    }

    #[test]
    fn from_outcome_unreachable_has_no_status_or_latency() {
        let site = SiteSpec::new("https://down.com").with_expected_status(204);
        let outcome = Outcome::Unreachable {
            error: CheckError::Network {
                reason: "dns error".into(),
            },
        };
        let r = CheckResult::from_outcome(&site, outcome, 3);
        assert!(!r.success);
        assert_eq!(r.expected_status, 204);
        assert!(r.actual_status.is_none());
        assert!(r.latency_ms.is_none());
        assert_eq!(r.error.as_deref(), Some("Network error: dns error"));
        assert_eq!(r.attempts, 3);
    }

    #[test]
    fn overall_success_requires_every_result() {
        assert!(Report::new(vec![ok("a"), ok("b")]).overall_success);
        assert!(!Report::new(vec![ok("a"), failed("b")]).overall_success);
        assert!(Report::new(vec![]).overall_success);
    }

    #[test]
    fn summary_counts() {
        let report = Report::new(vec![ok("a"), failed("b"), ok("c")]);
        let summary = report.summary();
        assert_eq!(summary, Summary { ok: 2, fail: 1, total: 3 });
        assert_eq!(summary.to_string(), "OK:2 | FAIL:1 | Total:3");
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let report = Report::new(vec![ok("https://a.com"), failed("https://b.com")]);
        let parsed: Report = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn json_uses_null_for_absent_values() {
        let report = Report::new(vec![failed("https://b.com")]);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let result = &value["results"][0];
        assert!(result["actual_status"].is_null());
        assert!(result["latency_ms"].is_null());
        assert_eq!(result["attempts"], 3);
        assert_eq!(value["overall_success"], false);
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn write_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/report.json");
        let report = Report::new(vec![ok("https://a.com")]);
        report.write_json(&path).unwrap();

        let parsed: Report =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn write_json_reports_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new(vec![]);
        let err = report.write_json(dir.path()).unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }), "{}", err);
    }

    #[test]
    fn render_text_lists_each_site() {
        let report = Report::new(vec![ok("https://a.com"), failed("https://b.com")]);
        let text = report.render_text();
        assert!(text.contains("[OK] https://a.com (200, 42ms)"), "{}", text);
        assert!(
            text.contains("[FAIL] https://b.com - Network error: connection refused"),
            "{}",
            text
        );
        assert!(text.ends_with("OK:1 | FAIL:1 | Total:2"), "{}", text);
    }
}
