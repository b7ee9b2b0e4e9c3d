use clap::Parser;
use tracing_subscriber::EnvFilter;

use vulnmap::cli::{self, Cli, CliContext, Commands};
use vulnmap::errors::VulnmapError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            VulnmapError::Config(_) | VulnmapError::Yaml(_) => 2,
            VulnmapError::UnknownRating { .. } => 3,
            VulnmapError::NotFound(_) => 4,
            VulnmapError::InvalidInput(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<(), VulnmapError> {
    if let Commands::Validate(args) = cli.command {
        return cli::validate::handle_validate(args).await;
    }

    let ctx = CliContext::load(cli.config.as_deref(), cli.db.as_deref()).await?;
    match cli.command {
        Commands::Import(args) => cli::import::handle_import(&ctx, args).await,
        Commands::Rebuild(args) => cli::rebuild::handle_rebuild(&ctx, args).await,
        Commands::Report(args) => cli::report::handle_report(&ctx, args).await,
        Commands::Plan(args) => cli::plan::handle_plan(&ctx, args).await,
        Commands::Serve(args) => cli::serve::handle_serve(&ctx, args).await,
        Commands::Validate(args) => cli::validate::handle_validate(args).await,
    }
}
