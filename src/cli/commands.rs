use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "vulnmap", version, about = "Point-in-time vulnerability reports for URLs and organizations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// SQLite database path (overrides the configuration)
    #[arg(long, global = true)]
    pub db: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import organizations, urls, endpoints and scan events from a JSON feed
    Import(ImportArgs),
    /// Recompute stored reports
    Rebuild(RebuildArgs),
    /// Show stored reports
    Report(ReportArgs),
    /// List what a scanner would visit right now
    Plan(PlanArgs),
    /// Start the HTTP REST API server
    Serve(ServeArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ImportArgs {
    /// JSON file with `organizations`, `urls`, `endpoints` and `scans`
    pub file: String,

    /// Rebuild the imported urls (and their organizations) afterwards
    #[arg(long)]
    pub rebuild: bool,
}

#[derive(Args, Clone)]
pub struct RebuildArgs {
    /// Comma-separated url ids
    #[arg(long, value_delimiter = ',')]
    pub url: Vec<i64>,

    /// Comma-separated organization ids
    #[arg(long, value_delimiter = ',')]
    pub organization: Vec<i64>,

    /// Rebuild every url and organization
    #[arg(long, conflicts_with_all = ["url", "organization"])]
    pub all: bool,

    /// Do not rebuild organizations owning the rebuilt urls
    #[arg(long)]
    pub no_cascade: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Url,
    Organization,
}

#[derive(Args, Clone)]
pub struct ReportArgs {
    pub kind: ReportKind,

    pub id: i64,

    /// Show the report in effect at this moment (RFC3339), default now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Show every stored report instead of one
    #[arg(long, conflicts_with = "at")]
    pub history: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct PlanArgs {
    /// Scanner name, e.g. tls_qualys or dnssec
    pub scanner: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port (overrides the configuration)
    #[arg(long)]
    pub port: Option<u16>,

    /// Listen address (overrides the configuration)
    #[arg(long)]
    pub host: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Configuration file to check
    pub config: String,
}
