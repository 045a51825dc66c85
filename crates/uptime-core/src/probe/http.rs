use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{CheckError, Probe, ProbeResponse};
use crate::config::CheckerConfig;
use crate::sites::SiteSpec;

/// Upper bound on body bytes read for keyword matching.
pub const MAX_BODY_BYTES: usize = 4096;

/// reqwest-backed probe sharing one connection pool across all sites.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(config: &CheckerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(Self::build_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn build_client(config: &CheckerConfig) -> Result<Client, reqwest::Error> {
        Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(4)
            .gzip(true)
            .build()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, site: &SiteSpec) -> Result<ProbeResponse, CheckError> {
        let mut response = self
            .client
            .get(&site.url)
            .timeout(site.timeout)
            .send()
            .await
            .map_err(|e| classify(e, site.timeout))?;

        let status = response.status().as_u16();
        debug!(url = %site.url, status, "Received response");

        if site.keyword.is_none() {
            return Ok(ProbeResponse { status, body: None });
        }

        let mut buf = Vec::with_capacity(MAX_BODY_BYTES);
        while buf.len() < MAX_BODY_BYTES {
            match response.chunk().await.map_err(|e| classify(e, site.timeout))? {
                Some(chunk) => {
                    let take = chunk.len().min(MAX_BODY_BYTES - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }

        Ok(ProbeResponse {
            status,
            body: Some(String::from_utf8_lossy(&buf).into_owned()),
        })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> CheckError {
    if err.is_timeout() {
        CheckError::Timeout { after: timeout }
    } else {
        CheckError::Network {
            reason: error_chain(&err),
        }
    }
}

/// reqwest's top-level message hides the cause (DNS, refused, TLS).
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
