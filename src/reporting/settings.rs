use chrono::{DateTime, SubsecRound, Utc};

use super::severity::SeverityTable;
use super::store::ScanTypeFilter;
use crate::config::VulnmapConfig;
use crate::scanners::ScannerRegistry;

/// Everything a rebuild needs to know besides the data itself.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub filter: ScanTypeFilter,
    pub default_epoch: DateTime<Utc>,
}

impl ReportSettings {
    /// Configured allow-lists win; otherwise every scan type the registry knows.
    pub fn from_config(config: &VulnmapConfig, registry: &ScannerRegistry) -> Self {
        let mut filter = registry.default_filter();
        if let Some(reporting) = &config.reporting {
            if let Some(types) = &reporting.endpoint_scan_types {
                filter.endpoint = types.iter().cloned().collect();
            }
            if let Some(types) = &reporting.url_scan_types {
                filter.url = types.iter().cloned().collect();
            }
        }
        Self { filter, default_epoch: config.report_epoch() }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self::from_config(&VulnmapConfig::default(), &ScannerRegistry::builtin())
    }
}

pub fn severity_table(config: &VulnmapConfig) -> SeverityTable {
    SeverityTable::builtin().with_rules(config.severity_rules())
}

/// Current instant at the precision snapshots are stored with.
pub fn reporting_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
