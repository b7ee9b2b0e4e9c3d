use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::aggregate::{
    calculation_differs, organization_at, synthesize_organization_reports, UrlReportIndex,
};
use super::moments::significant_moments;
use super::settings::ReportSettings;
use super::severity::SeverityMapper;
use super::store::{EventStore, ReportingWindow};
use super::synthesizer::synthesize_url_reports;
use super::timeline::build_timeline;
use crate::db::{Database, InventoryScope};
use crate::errors::VulnmapError;
use crate::models::{OrganizationId, OrganizationReport, UrlId, UrlReport};

/// Full snapshot history of one URL, computed from the store without persisting.
pub fn compute_url_reports(
    store: &impl EventStore,
    url_id: UrlId,
    settings: &ReportSettings,
    severity: &dyn SeverityMapper,
    now: DateTime<Utc>,
) -> Result<Vec<UrlReport>, VulnmapError> {
    let window = ReportingWindow::until(now);
    let history = store
        .history(url_id, &settings.filter, &window)
        .ok_or_else(|| VulnmapError::NotFound(format!("Url {} not found", url_id)))?;

    let moments = significant_moments(std::slice::from_ref(&history), now);
    if moments.is_empty() {
        debug!(url = %history.url.address, "No reportable events");
        return Ok(Vec::new());
    }
    let timeline = build_timeline(&history, &moments);
    synthesize_url_reports(&history, &timeline, severity)
}

/// Full snapshot history of one organization, from already stored URL snapshots.
pub fn compute_organization_reports(
    store: &impl EventStore,
    organization_id: OrganizationId,
    index: &UrlReportIndex,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> Result<Vec<OrganizationReport>, VulnmapError> {
    let organization = store
        .organization(organization_id)
        .ok_or_else(|| VulnmapError::NotFound(format!("Organization {} not found", organization_id)))?;
    let urls = store.urls_of_organization(organization_id);

    let window = ReportingWindow::until(now);
    let histories: Vec<_> = urls
        .iter()
        .filter_map(|u| store.history(u.id, &settings.filter, &window))
        .collect();
    let moments = significant_moments(&histories, now);

    synthesize_organization_reports(organization, &urls, index, &moments, settings.default_epoch)
}

/// Recompute and replace every stored snapshot of a URL. Returns the number written.
pub fn rebuild_url(
    db: &Database,
    url_id: UrlId,
    settings: &ReportSettings,
    severity: &dyn SeverityMapper,
    now: DateTime<Utc>,
) -> Result<usize, VulnmapError> {
    let inventory = db.load_inventory(InventoryScope::Urls(std::slice::from_ref(&url_id)))?;
    let reports = compute_url_reports(&inventory, url_id, settings, severity, now)?;
    let written = db.replace_url_reports(url_id, &reports)?;
    info!(url_id, reports = written, "Rebuilt url reports");
    Ok(written)
}

/// Recompute and replace every stored snapshot of an organization. The URL snapshots
/// of its members must be current.
pub fn rebuild_organization(
    db: &Database,
    organization_id: OrganizationId,
    settings: &ReportSettings,
    now: DateTime<Utc>,
) -> Result<usize, VulnmapError> {
    let inventory = db.load_inventory(InventoryScope::Organizations(std::slice::from_ref(&organization_id)))?;
    let url_ids: Vec<UrlId> = inventory.urls().map(|u| u.id).collect();
    let index = UrlReportIndex::new(db.url_reports_for_urls(&url_ids)?);

    let reports = compute_organization_reports(&inventory, organization_id, &index, settings, now)?;
    let written = db.replace_organization_reports(organization_id, &reports)?;
    info!(organization_id, reports = written, "Rebuilt organization reports");
    Ok(written)
}

/// Append a snapshot of the organization as of `now`, unless nothing changed since the
/// latest stored one. Returns whether a snapshot was written.
pub fn update_organization_now(
    db: &Database,
    organization_id: OrganizationId,
    now: DateTime<Utc>,
) -> Result<bool, VulnmapError> {
    let inventory = db.load_inventory(InventoryScope::Organizations(std::slice::from_ref(&organization_id)))?;
    let organization = inventory
        .organization(organization_id)
        .ok_or_else(|| VulnmapError::NotFound(format!("Organization {} not found", organization_id)))?;
    let urls = inventory.urls_of_organization(organization_id);
    let url_ids: Vec<UrlId> = urls.iter().map(|u| u.id).collect();
    let index = UrlReportIndex::new(db.url_reports_for_urls(&url_ids)?);

    let calculation = organization_at(organization, &urls, &index, now);
    let value = serde_json::to_value(&calculation)?;
    let previous = db.latest_organization_calculation(organization_id)?;
    if !calculation_differs(previous.as_deref(), &value) {
        debug!(organization_id, "Organization unchanged");
        return Ok(false);
    }

    db.append_organization_report(&OrganizationReport::new(now, calculation))?;
    info!(organization_id, "Appended organization report");
    Ok(true)
}
