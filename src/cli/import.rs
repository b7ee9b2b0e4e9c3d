use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::commands::ImportArgs;
use crate::cli::context::CliContext;
use crate::db::InventoryImport;
use crate::dispatch::RebuildRequest;
use crate::errors::VulnmapError;

const MAX_FEED_SIZE: u64 = 256 * 1024 * 1024;

pub async fn read_feed(path: &Path) -> Result<InventoryImport, VulnmapError> {
    if !path.exists() {
        return Err(VulnmapError::NotFound(format!("Feed file not found: {}", path.display())));
    }
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_FEED_SIZE {
        return Err(VulnmapError::InvalidInput(format!(
            "Feed file too large ({} bytes, max {})",
            metadata.len(),
            MAX_FEED_SIZE
        )));
    }
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

pub async fn handle_import(ctx: &CliContext, args: ImportArgs) -> Result<(), VulnmapError> {
    let path = PathBuf::from(&args.file);
    let feed = read_feed(&path).await?;
    let db = ctx.open_database()?;
    let counts = db.import(&feed)?;
    println!(
        "Imported {} organizations, {} urls, {} endpoints, {} scans",
        counts.organizations, counts.urls, counts.endpoints, counts.scans
    );

    if args.rebuild && !feed.urls.is_empty() {
        let request = RebuildRequest {
            urls: feed.urls.iter().map(|u| u.id).collect(),
            organizations: feed.organizations.iter().map(|o| o.id).collect(),
            cascade: true,
            ..Default::default()
        };
        info!(urls = request.urls.len(), "Rebuilding imported urls");
        let summary = ctx.dispatcher(&db, true).run(request).await?;
        crate::cli::rebuild::print_summary(&summary);
    }
    Ok(())
}
