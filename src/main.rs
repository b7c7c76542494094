use clap::Parser;
use miette::Diagnostic;
use miette::Result;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::Cli;
use crate::client::ClientError;
use crate::client::NlpClient;
use crate::config::ConfigError;
use crate::config::ConfigResolver;
use crate::config::ProbeConfig;
use crate::outputter::OutPutter;
use crate::parser::ProbeFile;
use crate::runner::ProbeEvent;
use crate::runner::RunReport;
use crate::runner::Runner;
use crate::runner::SweepReport;

mod cli;
mod client;
mod config;
mod corpus;
mod endpoints;
mod outputter;
mod parser;
mod runner;
#[cfg(test)]
mod test_support;

#[derive(Error, Debug, Diagnostic)]
pub enum ProbeError {
    #[error("Failed to read config file")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse config file")]
    TomlParsing(#[from] toml::de::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ConfigError(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Reads the optional config file and merges it with the CLI flags.
///
/// Without `--config` only the flags and the built-in defaults apply.
///
/// # Errors
/// Returns a `ProbeError` if:
/// - The config file cannot be read,
/// - The TOML fails to parse,
/// - Or a resolved value fails validation.
fn load_config(cli: &Cli) -> Result<ProbeConfig, ProbeError> {
    let resolver = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(ProbeError::FileError)?;
            let file: ProbeFile = toml::from_str(&contents).map_err(ProbeError::TomlParsing)?;
            ConfigResolver::new(&file, &contents, path)
        }
        None => ConfigResolver::without_file(),
    };

    Ok(resolver.resolve(cli)?)
}

/// Installs the stderr `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `warn`, or `debug` with
/// `-v`. Logs stay on stderr so the report on stdout is clean.
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Runs the probe and the outputter side by side.
///
/// The runner owns the only sender, so the outputter stops once the run is
/// over. A failed outputter task is logged and never turns the run into an
/// error.
///
/// # Concurrency
/// Requests stay sequential inside the runner; only rendering runs in its own
/// Tokio task, fed over a flume channel.
async fn run_pipeline(client: NlpClient, config: ProbeConfig) -> RunReport {
    let (tx, rx) = flume::unbounded::<ProbeEvent>();
    let outputter_handle = tokio::spawn(async move { OutPutter::start(rx).await });
    let runner = Runner::new(client, config, tx);

    let (report, outputter) = futures::join!(runner.run(), outputter_handle);
    if let Err(error) = outputter {
        tracing::warn!(%error, "outputter task failed");
    }

    report
}

/// Entry point: parses flags, resolves config, then runs one probe pass.
///
/// # Errors
/// Fails only when the configuration is invalid or the HTTP client cannot be
/// built. Unreachable services and failing endpoints still exit 0.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = load_config(&cli)?;
    tracing::debug!(
        base_url = %config.base_url,
        texts = %config.texts_path.display(),
        timeout = ?config.timeout,
        "configuration resolved"
    );

    let client = NlpClient::new(&config).map_err(ProbeError::Client)?;
    let report = run_pipeline(client, config).await;

    tracing::debug!(
        healthy = report.connectivity.is_healthy(),
        completed = report.sweep.as_ref().map(SweepReport::completed),
        failures = report.sweep.as_ref().map(SweepReport::failures),
        "run complete"
    );

    Ok(())
}
