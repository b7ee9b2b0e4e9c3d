use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::models::ReportQuery;
use crate::api::AppState;
use crate::errors::VulnmapError;
use crate::models::{OrganizationId, OrganizationReport, UrlId, UrlReport};
use crate::reporting::reporting_now;

fn require_url(state: &AppState, id: UrlId) -> Result<(), VulnmapError> {
    match state.db.get_url(id)? {
        Some(_) => Ok(()),
        None => Err(VulnmapError::NotFound(format!("Url {} not found", id))),
    }
}

fn require_organization(state: &AppState, id: OrganizationId) -> Result<(), VulnmapError> {
    match state.db.get_organization(id)? {
        Some(_) => Ok(()),
        None => Err(VulnmapError::NotFound(format!("Organization {} not found", id))),
    }
}

pub async fn list_url_reports(
    State(state): State<AppState>,
    Path(id): Path<UrlId>,
) -> Result<Json<Vec<UrlReport>>, VulnmapError> {
    require_url(&state, id)?;
    Ok(Json(state.db.url_reports(id)?))
}

/// The snapshot in effect at `at`: the latest one taken at or before it.
pub async fn get_url_report(
    State(state): State<AppState>,
    Path(id): Path<UrlId>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<UrlReport>, VulnmapError> {
    require_url(&state, id)?;
    let at = query.at.unwrap_or_else(reporting_now);
    state
        .db
        .latest_url_report(id, at)?
        .map(Json)
        .ok_or_else(|| VulnmapError::NotFound(format!("No report for url {} at {}", id, at.to_rfc3339())))
}

pub async fn list_organization_reports(
    State(state): State<AppState>,
    Path(id): Path<OrganizationId>,
) -> Result<Json<Vec<OrganizationReport>>, VulnmapError> {
    require_organization(&state, id)?;
    Ok(Json(state.db.organization_reports(id)?))
}

pub async fn get_organization_report(
    State(state): State<AppState>,
    Path(id): Path<OrganizationId>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<OrganizationReport>, VulnmapError> {
    require_organization(&state, id)?;
    let at = query.at.unwrap_or_else(reporting_now);
    state
        .db
        .latest_organization_report(id, at)?
        .map(Json)
        .ok_or_else(|| {
            VulnmapError::NotFound(format!("No report for organization {} at {}", id, at.to_rfc3339()))
        })
}
