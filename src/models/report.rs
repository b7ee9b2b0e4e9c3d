use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{EndpointId, OrganizationId, UrlId};
use super::scan_event::ScanId;
use super::severity::Impact;

/// Counters shared by URL and organization snapshots.
///
/// `high`/`medium`/`low`/`ok` are the sum of URL-level and endpoint-level findings.
/// Explained findings never count towards the unexplained fields; they land in the
/// matching `explained_*` field instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTotals {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub ok: u32,
    pub total_issues: u32,

    pub total_endpoints: u32,
    pub high_endpoints: u32,
    pub medium_endpoints: u32,
    pub low_endpoints: u32,
    pub ok_endpoints: u32,

    pub total_url_issues: u32,
    pub url_issues_high: u32,
    pub url_issues_medium: u32,
    pub url_issues_low: u32,
    pub url_ok: u32,

    pub total_endpoint_issues: u32,
    pub endpoint_issues_high: u32,
    pub endpoint_issues_medium: u32,
    pub endpoint_issues_low: u32,
    pub endpoint_ok: u32,

    pub explained_high: u32,
    pub explained_medium: u32,
    pub explained_low: u32,
    pub explained_total_issues: u32,

    pub explained_high_endpoints: u32,
    pub explained_medium_endpoints: u32,
    pub explained_low_endpoints: u32,

    pub explained_total_url_issues: u32,
    pub explained_url_issues_high: u32,
    pub explained_url_issues_medium: u32,
    pub explained_url_issues_low: u32,

    pub explained_total_endpoint_issues: u32,
    pub explained_endpoint_issues_high: u32,
    pub explained_endpoint_issues_medium: u32,
    pub explained_endpoint_issues_low: u32,
}

impl std::ops::AddAssign<&IssueTotals> for IssueTotals {
    fn add_assign(&mut self, other: &IssueTotals) {
        macro_rules! sum {
            ($($field:ident),* $(,)?) => { $( self.$field += other.$field; )* };
        }
        sum!(
            high, medium, low, ok, total_issues,
            total_endpoints, high_endpoints, medium_endpoints, low_endpoints, ok_endpoints,
            total_url_issues, url_issues_high, url_issues_medium, url_issues_low, url_ok,
            total_endpoint_issues, endpoint_issues_high, endpoint_issues_medium,
            endpoint_issues_low, endpoint_ok,
            explained_high, explained_medium, explained_low, explained_total_issues,
            explained_high_endpoints, explained_medium_endpoints, explained_low_endpoints,
            explained_total_url_issues, explained_url_issues_high, explained_url_issues_medium,
            explained_url_issues_low,
            explained_total_endpoint_issues, explained_endpoint_issues_high,
            explained_endpoint_issues_medium, explained_endpoint_issues_low,
        );
    }
}

/// Highest-severity-wins reduction of a set of counters.
pub fn judge(high: u32, medium: u32, low: u32) -> Impact {
    if high > 0 {
        Impact::High
    } else if medium > 0 {
        Impact::Medium
    } else if low > 0 {
        Impact::Low
    } else {
        Impact::Ok
    }
}

/// Judged URL counts, only present on organization snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTotals {
    pub total_urls: u32,
    pub high_urls: u32,
    pub medium_urls: u32,
    pub low_urls: u32,
    pub ok_urls: u32,
    pub explained_high_urls: u32,
    pub explained_medium_urls: u32,
    pub explained_low_urls: u32,
}

impl UrlTotals {
    /// Count one URL snapshot. A URL without any finding at all is neither ok nor bad.
    pub fn count(&mut self, url: &UrlCalculation) {
        self.total_urls += 1;
        let t = &url.totals;
        match judge(t.high, t.medium, t.low) {
            Impact::High => self.high_urls += 1,
            Impact::Medium => self.medium_urls += 1,
            Impact::Low => self.low_urls += 1,
            Impact::Ok if url.is_ok => self.ok_urls += 1,
            Impact::Ok => {}
        }
        match judge(t.explained_high, t.explained_medium, t.explained_low) {
            Impact::High => self.explained_high_urls += 1,
            Impact::Medium => self.explained_medium_urls += 1,
            Impact::Low => self.explained_low_urls += 1,
            Impact::Ok => {}
        }
    }
}

/// One scan as it appears in a snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCalculation {
    #[serde(rename = "type")]
    pub scan_type: String,
    pub scan_id: ScanId,
    pub rating: String,
    pub explanation: String,
    pub since: DateTime<Utc>,
    pub last_scan: DateTime<Utc>,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub ok: u32,
    pub explained_high: u32,
    pub explained_medium: u32,
    pub explained_low: u32,
    pub is_explained: bool,
    /// Same finding already counted on a sibling endpoint with the same port and IP version.
    pub is_repeated: bool,
    #[serde(default)]
    pub operator_explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCalculation {
    pub id: EndpointId,
    pub concat: String,
    pub ip_version: u8,
    pub port: u16,
    pub protocol: String,
    pub ratings: Vec<FindingCalculation>,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub ok: u32,
    pub explained_high: u32,
    pub explained_medium: u32,
    pub explained_low: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCalculation {
    pub url: String,
    pub url_id: UrlId,
    /// Judged ok: no issues while at least one endpoint or URL-level finding exists.
    pub is_ok: bool,
    #[serde(flatten)]
    pub totals: IssueTotals,
    pub ratings: Vec<FindingCalculation>,
    pub endpoints: Vec<EndpointCalculation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationCalculation {
    pub organization_id: OrganizationId,
    pub name: String,
    #[serde(flatten)]
    pub totals: IssueTotals,
    #[serde(flatten)]
    pub url_totals: UrlTotals,
    pub urls: Vec<UrlCalculation>,
}

/// Point-in-time snapshot of one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlReport {
    /// Assigned by the database.
    pub id: Option<i64>,
    pub url_id: UrlId,
    pub at_when: DateTime<Utc>,
    pub totals: IssueTotals,
    pub is_ok: bool,
    pub calculation: UrlCalculation,
}

impl UrlReport {
    pub fn new(at_when: DateTime<Utc>, calculation: UrlCalculation) -> Self {
        Self {
            id: None,
            url_id: calculation.url_id,
            at_when,
            totals: calculation.totals,
            is_ok: calculation.is_ok,
            calculation,
        }
    }
}

/// Point-in-time snapshot of one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationReport {
    pub id: Option<i64>,
    pub organization_id: OrganizationId,
    pub at_when: DateTime<Utc>,
    pub totals: IssueTotals,
    pub url_totals: UrlTotals,
    pub calculation: OrganizationCalculation,
}

impl OrganizationReport {
    pub fn new(at_when: DateTime<Utc>, calculation: OrganizationCalculation) -> Self {
        Self {
            id: None,
            organization_id: calculation.organization_id,
            at_when,
            totals: calculation.totals,
            url_totals: calculation.url_totals,
            calculation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_calc(high: u32, is_ok: bool) -> UrlCalculation {
        UrlCalculation {
            url: "example.nl".into(),
            url_id: 1,
            is_ok,
            totals: IssueTotals { high, total_issues: high, ..Default::default() },
            ratings: vec![],
            endpoints: vec![],
        }
    }

    #[test]
    fn test_judge_highest_wins() {
        assert_eq!(judge(1, 3, 9), Impact::High);
        assert_eq!(judge(0, 1, 9), Impact::Medium);
        assert_eq!(judge(0, 0, 2), Impact::Low);
        assert_eq!(judge(0, 0, 0), Impact::Ok);
    }

    #[test]
    fn test_issue_totals_add_assign_sums_every_counter() {
        let mut a = IssueTotals { high: 1, ok_endpoints: 2, explained_url_issues_low: 1, ..Default::default() };
        let b = IssueTotals { high: 2, ok_endpoints: 1, explained_url_issues_low: 4, ..Default::default() };
        a += &b;
        assert_eq!(a.high, 3);
        assert_eq!(a.ok_endpoints, 3);
        assert_eq!(a.explained_url_issues_low, 5);
    }

    #[test]
    fn test_url_totals_count_judges_urls() {
        let mut totals = UrlTotals::default();
        totals.count(&url_calc(1, false));
        totals.count(&url_calc(0, true));
        totals.count(&url_calc(0, false));
        assert_eq!(totals.total_urls, 3);
        assert_eq!(totals.high_urls, 1);
        assert_eq!(totals.ok_urls, 1);
    }

    #[test]
    fn test_url_calculation_flattens_totals() {
        let value = serde_json::to_value(url_calc(2, false)).unwrap();
        assert_eq!(value["high"], 2);
        assert_eq!(value["total_issues"], 2);
        assert!(value["endpoints"].as_array().unwrap().is_empty());
        let back: UrlCalculation = serde_json::from_value(value).unwrap();
        assert_eq!(back.totals.high, 2);
    }
}
