use clap::Parser;

/// Smoke-test an NLP microservice: check the root endpoint, then run the
/// vectorization and tokenization endpoints once each
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the service, e.g. http://localhost:8000
    #[arg(long, env = "NLP_PROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// File with sample texts separated by blank lines
    #[arg(short, long)]
    pub texts: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// `max_features` sent to the vectorization endpoints
    #[arg(long)]
    pub max_features: Option<u32>,

    /// Optional TOML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print debug logs to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
