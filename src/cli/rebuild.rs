use crate::cli::commands::RebuildArgs;
use crate::cli::context::CliContext;
use crate::dispatch::{RebuildRequest, RebuildSummary};
use crate::errors::VulnmapError;

pub fn print_summary(summary: &RebuildSummary) {
    println!(
        "Rebuilt {} urls ({} reports) and {} organizations ({} reports)",
        summary.urls_rebuilt,
        summary.url_reports_written,
        summary.organizations_rebuilt,
        summary.organization_reports_written
    );
    for failure in &summary.failures {
        println!("  FAILED {} [{}]: {}", failure.key, failure.error_type, failure.message);
    }
}

pub async fn handle_rebuild(ctx: &CliContext, args: RebuildArgs) -> Result<(), VulnmapError> {
    let db = ctx.open_database()?;
    let request = RebuildRequest {
        urls: args.url,
        organizations: args.organization,
        all: args.all,
        cascade: !args.no_cascade,
    };
    let summary = ctx.dispatcher(&db, false).run(request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    // Surface the first failure so the exit code reflects it.
    match summary.failures.first() {
        None => Ok(()),
        Some(failure) => Err(VulnmapError::Internal(format!(
            "{} of the rebuilt units failed, first: {}",
            summary.failures.len(),
            failure.key
        ))),
    }
}
