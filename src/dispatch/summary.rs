use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locks::RebuildKey;
use crate::errors::VulnmapError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildFailure {
    pub key: String,
    pub error_type: String,
    pub message: String,
}

/// Outcome of one dispatcher run. Failed units do not abort the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub run_id: String,
    pub at: DateTime<Utc>,
    pub urls_rebuilt: usize,
    pub url_reports_written: usize,
    pub organizations_rebuilt: usize,
    pub organization_reports_written: usize,
    pub failures: Vec<RebuildFailure>,
}

impl RebuildSummary {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            at,
            urls_rebuilt: 0,
            url_reports_written: 0,
            organizations_rebuilt: 0,
            organization_reports_written: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, key: RebuildKey, result: &Result<usize, VulnmapError>) {
        match (key, result) {
            (RebuildKey::Url(_), Ok(written)) => {
                self.urls_rebuilt += 1;
                self.url_reports_written += written;
            }
            (RebuildKey::Organization(_), Ok(written)) => {
                self.organizations_rebuilt += 1;
                self.organization_reports_written += written;
            }
            (_, Err(e)) => self.failures.push(RebuildFailure {
                key: key.to_string(),
                error_type: e.classify().error_type.to_string(),
                message: e.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
