use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::api::models::RefreshResponse;
use crate::api::AppState;
use crate::dispatch::{RebuildRequest, RebuildSummary};
use crate::errors::VulnmapError;
use crate::models::OrganizationId;

pub async fn rebuild(
    State(state): State<AppState>,
    Json(request): Json<RebuildRequest>,
) -> Result<Json<RebuildSummary>, VulnmapError> {
    info!(
        urls = request.urls.len(),
        organizations = request.organizations.len(),
        all = request.all,
        "Rebuild requested over API"
    );
    let summary = state.dispatcher.run(request).await?;
    Ok(Json(summary))
}

pub async fn refresh_organization(
    State(state): State<AppState>,
    Path(id): Path<OrganizationId>,
) -> Result<Json<RefreshResponse>, VulnmapError> {
    let appended = state.dispatcher.update_organization_now(id).await?;
    Ok(Json(RefreshResponse { organization_id: id, appended }))
}
