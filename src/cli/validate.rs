use std::path::PathBuf;

use crate::cli::commands::ValidateArgs;
use crate::config::parse_config;
use crate::errors::VulnmapError;
use crate::reporting::{severity_table, ReportSettings};
use crate::scanners::ScannerRegistry;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), VulnmapError> {
    let path = PathBuf::from(&args.config);
    let config = parse_config(&path).await?;
    let settings = ReportSettings::from_config(&config, &ScannerRegistry::builtin());
    let severity = severity_table(&config);
    println!("Configuration is valid: {}", args.config);
    println!(
        "  {} endpoint scan types, {} url scan types, {} severity rules, report epoch {}",
        settings.filter.endpoint.len(),
        settings.filter.url.len(),
        severity.len(),
        settings.default_epoch.to_rfc3339()
    );
    Ok(())
}
