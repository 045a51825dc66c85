use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::CheckerConfig;
use crate::probe::{CheckError, Probe};
use crate::report::{CheckResult, Outcome, Report};
use crate::sites::SiteSpec;

/// Runs every configured site check once and aggregates a [`Report`].
pub struct Checker {
    config: CheckerConfig,
    probe: Arc<dyn Probe>,
}

impl Checker {
    pub fn new(config: CheckerConfig, probe: Arc<dyn Probe>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    pub async fn run(&self, specs: &[SiteSpec]) -> Report {
        self.run_with_progress(specs, |_| {}).await
    }

    /// Like [`Self::run`], calling `on_result` as each site finishes
    /// (completion order, not config order).
    pub async fn run_with_progress<F>(&self, specs: &[SiteSpec], on_result: F) -> Report
    where
        F: Fn(&CheckResult),
    {
        info!(
            sites = specs.len(),
            concurrency = self.config.max_concurrent_checks,
            "Starting site checks"
        );

        let concurrency = self.config.max_concurrent_checks.max(1);
        let mut slots: Vec<Option<CheckResult>> = vec![None; specs.len()];

        let mut results = stream::iter(specs.iter().enumerate())
            .map(|(i, site)| async move { (i, self.check_site(site).await) })
            .buffer_unordered(concurrency);

        while let Some((i, result)) = results.next().await {
            on_result(&result);
            slots[i] = Some(result);
        }

        let results: Vec<CheckResult> = slots.into_iter().flatten().collect();
        let report = Report::new(results);
        let summary = report.summary();
        info!(
            ok = summary.ok,
            fail = summary.fail,
            total = summary.total,
            overall_success = report.overall_success,
            "Site checks finished"
        );
        report
    }

    /// Check one site with bounded retries. Never fails; errors become data.
    pub async fn check_site(&self, site: &SiteSpec) -> CheckResult {
        let max_attempts = site.max_attempts.max(1);
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            if attempts > 0 {
                debug!(
                    url = %site.url,
                    attempt = attempts + 1,
                    backoff_ms = self.config.retry_backoff.as_millis() as u64,
                    "Retrying site check"
                );
                tokio::time::sleep(self.config.retry_backoff).await;
            }
            attempts += 1;

            let started = Instant::now();
            match self.probe.probe(site).await {
                Ok(response) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    let error = evaluate(site, response.status, response.body.as_deref()).err();
                    match &error {
                        None => debug!(url = %site.url, status = response.status, attempts, "Site healthy"),
                        Some(e) => warn!(url = %site.url, status = response.status, error = %e, "Site check failed"),
                    }
                    let outcome = Outcome::Responded {
                        status: response.status,
                        latency_ms,
                        error,
                    };
                    return CheckResult::from_outcome(site, outcome, attempts);
                }
                Err(e) => {
                    warn!(url = %site.url, attempt = attempts, max_attempts, error = %e, "Site probe error");
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| CheckError::Network {
            reason: "no attempt was made".to_string(),
        });
        CheckResult::from_outcome(site, Outcome::Unreachable { error }, attempts)
    }
}

/// Compare a received response against the site's expectations.
pub fn evaluate(site: &SiteSpec, status: u16, body: Option<&str>) -> Result<(), CheckError> {
    if status != site.expected_status {
        return Err(CheckError::StatusMismatch {
            expected: site.expected_status,
            actual: status,
        });
    }
    if let Some(ref keyword) = site.keyword {
        let found = body
            .map(|b| b.to_lowercase().contains(&keyword.to_lowercase()))
            .unwrap_or(false);
        if !found {
            return Err(CheckError::KeywordMissing {
                keyword: keyword.clone(),
            });
        }
    }
    Ok(())
}
