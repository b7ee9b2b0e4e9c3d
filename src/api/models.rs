use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::OrganizationId;

/// `?at=` on the single-report routes. Absent means now.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub organization_id: OrganizationId,
    pub appended: bool,
}
