//! Runs rebuilds: one unit per URL or organization, bounded by a worker pool, with
//! at most one active rebuild per unit. URL rebuilds cascade into the organizations
//! owning the URL once they have finished.

pub mod locks;
pub mod summary;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::db::Database;
use crate::errors::{with_retry, RetryConfig, VulnmapError};
use crate::models::{OrganizationId, UrlId};
use crate::reporting::{self, ReportSettings, SeverityTable};

pub use locks::{RebuildKey, RebuildLocks};
pub use summary::{RebuildFailure, RebuildSummary};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebuildRequest {
    #[serde(default)]
    pub urls: Vec<UrlId>,
    #[serde(default)]
    pub organizations: Vec<OrganizationId>,
    /// Every URL and every organization.
    #[serde(default)]
    pub all: bool,
    /// Also rebuild organizations owning the requested URLs.
    #[serde(default = "default_cascade")]
    pub cascade: bool,
}

fn default_cascade() -> bool {
    true
}

impl RebuildRequest {
    pub fn is_empty(&self) -> bool {
        !self.all && self.urls.is_empty() && self.organizations.is_empty()
    }
}

#[derive(Clone)]
pub struct RebuildDispatcher {
    db: Database,
    settings: Arc<ReportSettings>,
    severity: Arc<SeverityTable>,
    locks: RebuildLocks,
    workers: Arc<Semaphore>,
    retry: RetryConfig,
}

impl RebuildDispatcher {
    pub fn new(
        db: Database,
        settings: ReportSettings,
        severity: SeverityTable,
        workers: usize,
        retry: RetryConfig,
    ) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
            severity: Arc::new(severity),
            locks: RebuildLocks::new(),
            workers: Arc::new(Semaphore::new(workers.max(1))),
            retry,
        }
    }

    pub fn locks(&self) -> &RebuildLocks {
        &self.locks
    }

    pub async fn run(&self, request: RebuildRequest) -> Result<RebuildSummary, VulnmapError> {
        if request.is_empty() {
            return Err(VulnmapError::InvalidInput(
                "Nothing to rebuild: name urls, organizations or all".into(),
            ));
        }
        let now = reporting::reporting_now();
        let mut summary = RebuildSummary::new(now);

        let url_ids: BTreeSet<UrlId> = if request.all {
            self.db.all_url_ids()?.into_iter().collect()
        } else {
            request.urls.iter().copied().collect()
        };
        info!(run_id = %summary.run_id, urls = url_ids.len(), "Rebuild started");

        let url_results = join_all(url_ids.iter().map(|id| self.rebuild_url(*id, now))).await;
        let mut rebuilt: Vec<UrlId> = Vec::new();
        for (id, result) in url_ids.iter().zip(url_results) {
            if let Err(e) = &result {
                warn!(url_id = id, error = %e, "Url rebuild failed");
            } else {
                rebuilt.push(*id);
            }
            summary.record(RebuildKey::Url(*id), &result);
        }

        let mut organization_ids: BTreeSet<OrganizationId> = request.organizations.iter().copied().collect();
        if request.all {
            organization_ids.extend(self.db.all_organization_ids()?);
        } else if request.cascade && !rebuilt.is_empty() {
            organization_ids.extend(self.db.organizations_of_urls(&rebuilt)?);
        }

        let org_results =
            join_all(organization_ids.iter().map(|id| self.rebuild_organization(*id, now))).await;
        for (id, result) in organization_ids.iter().zip(org_results) {
            if let Err(e) = &result {
                warn!(organization_id = id, error = %e, "Organization rebuild failed");
            }
            summary.record(RebuildKey::Organization(*id), &result);
        }

        self.locks.prune();
        info!(
            run_id = %summary.run_id,
            urls = summary.urls_rebuilt,
            organizations = summary.organizations_rebuilt,
            failures = summary.failures.len(),
            "Rebuild finished"
        );
        Ok(summary)
    }

    pub async fn rebuild_url(&self, url_id: UrlId, now: DateTime<Utc>) -> Result<usize, VulnmapError> {
        let _guard = self.locks.acquire(RebuildKey::Url(url_id)).await;
        let _permit = self.acquire_worker().await?;
        with_retry("rebuild_url", &self.retry, || {
            let db = self.db.clone();
            let settings = self.settings.clone();
            let severity = self.severity.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    reporting::rebuild_url(&db, url_id, &settings, severity.as_ref(), now)
                })
                .await
                .map_err(|e| VulnmapError::Internal(format!("Rebuild task failed: {}", e)))?
            }
        })
        .await
    }

    pub async fn rebuild_organization(
        &self,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<usize, VulnmapError> {
        let _guard = self.locks.acquire(RebuildKey::Organization(organization_id)).await;
        let _permit = self.acquire_worker().await?;
        with_retry("rebuild_organization", &self.retry, || {
            let db = self.db.clone();
            let settings = self.settings.clone();
            async move {
                tokio::task::spawn_blocking(move || {
                    reporting::rebuild_organization(&db, organization_id, &settings, now)
                })
                .await
                .map_err(|e| VulnmapError::Internal(format!("Rebuild task failed: {}", e)))?
            }
        })
        .await
    }

    /// Append a current snapshot of an organization if its state changed.
    pub async fn update_organization_now(&self, organization_id: OrganizationId) -> Result<bool, VulnmapError> {
        let _guard = self.locks.acquire(RebuildKey::Organization(organization_id)).await;
        let _permit = self.acquire_worker().await?;
        let db = self.db.clone();
        let now = reporting::reporting_now();
        tokio::task::spawn_blocking(move || reporting::update_organization_now(&db, organization_id, now))
            .await
            .map_err(|e| VulnmapError::Internal(format!("Update task failed: {}", e)))?
    }

    async fn acquire_worker(&self) -> Result<tokio::sync::SemaphorePermit<'_>, VulnmapError> {
        self.workers
            .acquire()
            .await
            .map_err(|_| VulnmapError::Internal("Worker pool closed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InventoryImport;
    use crate::reporting::test_support::*;
    use crate::scanners;

    fn dispatcher(db: &Database) -> RebuildDispatcher {
        RebuildDispatcher::new(
            db.clone(),
            ReportSettings::default(),
            SeverityTable::builtin(),
            2,
            RetryConfig { max_retries: 0, fail_fast: true },
        )
    }

    fn seed(db: &Database) {
        db.import(&InventoryImport {
            organizations: vec![organization(1, "Gemeente Test")],
            urls: vec![url_in(10, "test.nl", 1), url_in(11, "broken.nl", 1)],
            endpoints: vec![endpoint(100, 10, 4, 443), endpoint(101, 11, 4, 443)],
            scans: vec![
                endpoint_scan(1, 100, scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "A", day(2)),
                endpoint_scan(2, 101, scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "Z", day(2)),
            ],
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let db = Database::in_memory().unwrap();
        let result = dispatcher(&db).run(RebuildRequest::default()).await;
        assert!(matches!(result, Err(VulnmapError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_units() {
        let db = Database::in_memory().unwrap();
        seed(&db);
        let summary = dispatcher(&db)
            .run(RebuildRequest { urls: vec![10, 11], cascade: true, ..Default::default() })
            .await
            .unwrap();

        assert_eq!(summary.urls_rebuilt, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].key, "url:11");
        assert_eq!(summary.failures[0].error_type, "UnknownRatingError");
        assert_eq!(summary.organizations_rebuilt, 1);
        assert_eq!(db.url_reports(10).unwrap().len(), 1);
        assert!(db.url_reports(11).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_cascade_leaves_organizations_alone() {
        let db = Database::in_memory().unwrap();
        seed(&db);
        let summary = dispatcher(&db)
            .run(RebuildRequest { urls: vec![10], cascade: false, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(summary.organizations_rebuilt, 0);
        assert!(db.organization_reports(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_organization_now_only_on_change() {
        let db = Database::in_memory().unwrap();
        seed(&db);
        let d = dispatcher(&db);
        d.run(RebuildRequest { urls: vec![10], ..Default::default() }).await.unwrap();
        let stored = db.organization_reports(1).unwrap().len();

        assert!(!d.update_organization_now(1).await.unwrap());
        assert_eq!(db.organization_reports(1).unwrap().len(), stored);
    }

    #[tokio::test]
    async fn test_unknown_url_is_reported_as_failure() {
        let db = Database::in_memory().unwrap();
        let summary = dispatcher(&db)
            .run(RebuildRequest { urls: vec![404], ..Default::default() })
            .await
            .unwrap();
        assert_eq!(summary.failures[0].error_type, "NotFoundError");
    }
}
