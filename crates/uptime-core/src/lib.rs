#![forbid(unsafe_code)]

pub mod checker;
pub mod config;
pub mod probe;
pub mod report;
pub mod sites;
pub mod webhook;

pub use checker::Checker;
pub use config::CheckerConfig;
pub use probe::{CheckError, HttpProbe, Probe, ProbeResponse};
pub use report::{CheckResult, Outcome, Report, ReportError, Summary};
pub use sites::{ConfigError, SiteSpec, SitesFile};
pub use webhook::{notify, WebhookConfig, WebhookError, WebhookFormat};
