//! Turns the scan event feed into point-in-time snapshots.
//!
//! Per URL: significant moments, a day-bucketed timeline, then a walk over that
//! timeline that carries findings forward. Per organization: the latest URL snapshots
//! summed at every moment any member URL changed.

pub mod aggregate;
pub mod moments;
pub mod rebuild;
pub mod reducer;
pub mod settings;
pub mod severity;
pub mod store;
pub mod synthesizer;
pub mod timeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregate::{calculation_differs, organization_at, synthesize_organization_reports, UrlReportIndex};
pub use moments::{end_of_day, significant_moments};
pub use rebuild::{
    compute_organization_reports, compute_url_reports, rebuild_organization, rebuild_url,
    update_organization_now,
};
pub use reducer::latest_scan_per_day;
pub use settings::{reporting_now, severity_table, ReportSettings};
pub use severity::{SeverityMapper, SeverityTable};
pub use store::{EventStore, Inventory, ReportingWindow, ScanTypeFilter, UrlHistory};
pub use synthesizer::{synthesize_url_reports, REPEATED_FINDING_EXPLANATION};
pub use timeline::{build_timeline, Timeline, TimelineDay};
