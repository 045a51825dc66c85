mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use uptime_core::{sites, Checker, HttpProbe, Report, WebhookConfig, WebhookFormat};

/// All sites healthy.
const EXIT_HEALTHY: u8 = 0;
/// Config or report I/O failure.
const EXIT_FATAL: u8 = 1;
/// At least one site failed its check.
const EXIT_UNHEALTHY: u8 = 2;

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        VERSION
    } else {
        // Called once; lives for the program's lifetime.
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HookFormat {
    Slack,
    Json,
}

impl From<HookFormat> for WebhookFormat {
    fn from(f: HookFormat) -> Self {
        match f {
            HookFormat::Slack => WebhookFormat::Slack,
            HookFormat::Json => WebhookFormat::Json,
        }
    }
}

/// Check that a list of web sites answer with the expected HTTP status.
#[derive(Debug, Parser)]
#[command(name = "uptime-check", version = version_string(), about)]
struct Cli {
    /// Path to the YAML site list.
    #[arg(short, long, default_value = "monitor/sites.yml")]
    config: PathBuf,

    /// Write the JSON report to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Maximum number of sites checked at once. Overrides the config file.
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Webhook to notify with the run summary.
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// Webhook body format.
    #[arg(long, value_enum, default_value_t = HookFormat::Slack)]
    webhook_format: HookFormat,

    /// HMAC-SHA256 secret used to sign webhook bodies.
    #[arg(long, env = "UPTIME_WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: Option<String>,

    /// Log output format (logs go to stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Do not print the summary to stdout.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(true) => ExitCode::from(EXIT_HEALTHY),
        Ok(false) => ExitCode::from(EXIT_UNHEALTHY),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Returns whether every site was healthy; `Err` only for fatal failures.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let (specs, mut config) = sites::load(&cli.config)?;
    tracing::info!(path = %cli.config.display(), sites = specs.len(), "Loaded site list");

    if let Some(n) = cli.concurrency {
        config = config.with_max_concurrent_checks(n);
    }

    let client = HttpProbe::build_client(&config)?;
    let probe = Arc::new(HttpProbe::with_client(client.clone()));
    let checker = Checker::new(config, probe);

    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(specs.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} checking sites {pos}/{len} {wide_msg}")?,
        )
    };
    let report = checker
        .run_with_progress(&specs, |result| {
            progress.set_message(result.url.clone());
            progress.inc(1);
        })
        .await;
    progress.finish_and_clear();

    if !cli.quiet {
        println!("{}", output::render(&report));
    }

    if let Some(ref path) = cli.json {
        report.write_json(path)?;
        tracing::info!(path = %path.display(), "Wrote JSON report");
    }

    if let Some(url) = cli.webhook_url.filter(|u| !u.is_empty()) {
        send_webhook(&client, url, cli.webhook_format, cli.webhook_secret, &report).await;
    }

    Ok(report.overall_success)
}

async fn send_webhook(
    client: &reqwest::Client,
    url: String,
    format: HookFormat,
    secret: Option<String>,
    report: &Report,
) {
    let config = WebhookConfig::new(url)
        .with_format(format.into())
        .with_secret(secret);
    // Delivery failures are logged inside notify and never change the exit code.
    let _ = uptime_core::notify(client, &config, report).await;
}

fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        LogFormat::Json => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
