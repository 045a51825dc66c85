//! Webhook notification of a finished run.
//!
//! After the report is written the CLI can POST it to a chat webhook
//! (Slack-compatible `{"text": ...}` body) or to a generic endpoint that
//! receives a versioned JSON envelope, optionally HMAC-signed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::report::{Report, Summary};

pub const SIGNATURE_HEADER: &str = "X-Uptime-Signature-256";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Invalid signing secret")]
    InvalidSecret,
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookFormat {
    /// `{"text": "..."}`, accepted by Slack and most chat incoming webhooks.
    #[default]
    Slack,
    /// Full [`WebhookPayload`] envelope.
    Json,
}

/// Configuration for a single webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    #[serde(default)]
    pub format: WebhookFormat,

    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_webhook_retries")]
    pub max_retries: u32,

    /// Optional HMAC-SHA256 signing secret for the signature header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

fn default_webhook_retries() -> u32 {
    2
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: WebhookFormat::default(),
            timeout_ms: default_webhook_timeout_ms(),
            max_retries: default_webhook_retries(),
            secret: None,
        }
    }

    pub fn with_format(mut self, format: WebhookFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        self.secret = secret.filter(|s| !s.is_empty());
        self
    }
}

/// The JSON envelope POSTed in [`WebhookFormat::Json`] mode.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub version: u8,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub notification_type: &'static str,
    pub overall_success: bool,
    pub summary: Summary,
    pub report: &'a Report,
}

impl<'a> WebhookPayload<'a> {
    pub fn from_report(report: &'a Report) -> Self {
        Self {
            version: 1,
            id: Uuid::new_v4().to_string(),
            timestamp: report.timestamp,
            notification_type: "report",
            overall_success: report.overall_success,
            summary: report.summary(),
            report,
        }
    }
}

/// Chat message text for a report.
pub fn slack_text(report: &Report) -> String {
    let badge = if report.overall_success { "✅" } else { "❌" };
    format!("{} {}", badge, report.render_text())
}

/// Serialize the body for the configured format.
pub fn build_body(config: &WebhookConfig, report: &Report) -> Result<Vec<u8>, WebhookError> {
    let body = match config.format {
        WebhookFormat::Slack => serde_json::to_vec(&serde_json::json!({ "text": slack_text(report) }))?,
        WebhookFormat::Json => serde_json::to_vec(&WebhookPayload::from_report(report))?,
    };
    Ok(body)
}

/// POST the report to one webhook, retrying transient failures.
pub async fn notify(
    client: &Client,
    config: &WebhookConfig,
    report: &Report,
) -> Result<(), WebhookError> {
    let body = build_body(config, report)?;
    let signature = match config.secret.as_deref() {
        Some(secret) => Some(sign_payload(&body, secret)?),
        None => None,
    };

    let result = deliver(
        client,
        &config.url,
        body,
        signature.as_deref(),
        Duration::from_millis(config.timeout_ms),
        config.max_retries,
    )
    .await;

    match &result {
        Ok(()) => debug!(url = %config.url, "Webhook delivered"),
        Err(e) => warn!(url = %config.url, error = %e, "Webhook delivery failed"),
    }
    result
}

async fn deliver(
    client: &Client,
    url: &str,
    body: Vec<u8>,
    signature: Option<&str>,
    timeout: Duration,
    max_retries: u32,
) -> Result<(), WebhookError> {
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
            tokio::time::sleep(backoff).await;
        }

        let mut req = client
            .post(url)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .body(body.clone());

        if let Some(signature) = signature {
            req = req.header(SIGNATURE_HEADER, format!("sha256={}", signature));
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => {
                let status = resp.status().as_u16();
                let err = WebhookError::Http {
                    url: url.to_string(),
                    status,
                };
                if (400..500).contains(&status) && status != 429 {
                    return Err(err);
                }
                last_error = Some(err);
            }
            Err(e) => {
                last_error = Some(WebhookError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| WebhookError::Request {
        url: url.to_string(),
        reason: "no delivery attempt was made".to_string(),
    }))
}

fn sign_payload(body: &[u8], secret: &str) -> Result<String, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CheckResult;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn report(success: bool) -> Report {
        Report::new(vec![CheckResult {
            url: "https://example.com".into(),
            expected_status: 200,
            actual_status: Some(if success { 200 } else { 503 }),
            success,
            error: (!success).then(|| "Unexpected status 503 (expected 200)".to_string()),
            latency_ms: Some(12),
            attempts: 1,
        }])
    }

    fn fast(url: String) -> WebhookConfig {
        WebhookConfig {
            url,
            format: WebhookFormat::Slack,
            timeout_ms: 1000,
            max_retries: 1,
            secret: None,
        }
    }

    #[test]
    fn slack_body_has_text_field() {
        let body = build_body(&WebhookConfig::new("https://hooks.example.com"), &report(false)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let text = value["text"].as_str().unwrap();
        assert!(text.starts_with("❌"), "{}", text);
        assert!(text.contains("[FAIL] https://example.com"), "{}", text);
    }

    #[test]
    fn json_body_wraps_report() {
        let config = WebhookConfig::new("https://hooks.example.com").with_format(WebhookFormat::Json);
        let body = build_body(&config, &report(true)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["type"], "report");
        assert_eq!(value["overall_success"], true);
        assert_eq!(value["summary"]["total"], 1);
        assert_eq!(value["report"]["results"][0]["url"], "https://example.com");
    }

    #[test]
    fn empty_secret_is_ignored() {
        let config = WebhookConfig::new("https://x").with_secret(Some(String::new()));
        assert!(config.secret.is_none());
    }

    #[test]
    fn hmac_signature_is_deterministic() {
        let body = b"test payload";
        let sig1 = sign_payload(body, "my-secret").unwrap();
        let sig2 = sign_payload(body, "my-secret").unwrap();
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);

        let sig3 = sign_payload(body, "other-secret").unwrap();
        assert_ne!(sig1, sig3);
    }

    #[tokio::test]
    async fn notify_posts_slack_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_string_contains("[OK] https://example.com"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = fast(format!("{}/hook", server.uri()));
        notify(&Client::new(), &config, &report(true)).await.unwrap();
    }

    #[tokio::test]
    async fn notify_signs_when_secret_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = fast(server.uri())
            .with_format(WebhookFormat::Json)
            .with_secret(Some("s3cret".into()));
        notify(&Client::new(), &config, &report(false)).await.unwrap();
    }

    #[tokio::test]
    async fn notify_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = notify(&Client::new(), &fast(server.uri()), &report(true))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::Http { status: 404, .. }), "{}", err);
    }

    #[tokio::test]
    async fn notify_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        notify(&Client::new(), &fast(server.uri()), &report(true))
            .await
            .unwrap();
    }
}
