use crate::cli::commands::PlanArgs;
use crate::cli::context::CliContext;
use crate::db::InventoryScope;
use crate::errors::VulnmapError;
use crate::models::SubjectKind;
use crate::reporting::reporting_now;
use crate::scanners::ScannerName;

pub async fn handle_plan(ctx: &CliContext, args: PlanArgs) -> Result<(), VulnmapError> {
    let name = ScannerName::parse(&args.scanner)?;
    let scanner = ctx
        .registry
        .get(name)
        .ok_or_else(|| VulnmapError::NotFound(format!("Scanner {} not registered", name)))?;

    let db = ctx.open_database()?;
    let inventory = db.load_inventory(InventoryScope::All)?;
    let planned = scanner.plan.compose(&inventory, reporting_now());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }
    println!("{}: {} planned scans", scanner.display_name, planned.len());
    for scan in &planned {
        let kind = match scan.subject_kind {
            SubjectKind::Endpoint => "endpoint",
            SubjectKind::Url => "url",
        };
        println!("  {:<8} {:>6}  {}", kind, scan.subject_id, scan.target);
    }
    Ok(())
}
