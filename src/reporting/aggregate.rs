use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::errors::VulnmapError;
use crate::models::{
    IssueTotals, Organization, OrganizationCalculation, OrganizationReport, Url, UrlId, UrlReport,
    UrlTotals,
};

/// Stored URL snapshots, grouped per URL and ordered by `at_when`.
#[derive(Debug, Clone, Default)]
pub struct UrlReportIndex {
    reports: HashMap<UrlId, Vec<UrlReport>>,
}

impl UrlReportIndex {
    pub fn new(reports: impl IntoIterator<Item = UrlReport>) -> Self {
        let mut grouped: HashMap<UrlId, Vec<UrlReport>> = HashMap::new();
        for report in reports {
            grouped.entry(report.url_id).or_default().push(report);
        }
        for list in grouped.values_mut() {
            list.sort_by_key(|r| r.at_when);
        }
        Self { reports: grouped }
    }

    /// Latest snapshot of `url_id` taken at or before `when`.
    pub fn latest_at(&self, url_id: UrlId, when: DateTime<Utc>) -> Option<&UrlReport> {
        let list = self.reports.get(&url_id)?;
        let idx = list.partition_point(|r| r.at_when <= when);
        idx.checked_sub(1).map(|i| &list[i])
    }

    pub fn len(&self) -> usize {
        self.reports.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.values().all(Vec::is_empty)
    }
}

/// State of an organization at `when`: the latest snapshot of every URL that was
/// relevant at that moment. URLs without any snapshot yet are left out.
pub fn organization_at(
    organization: &Organization,
    urls: &[&Url],
    index: &UrlReportIndex,
    when: DateTime<Utc>,
) -> OrganizationCalculation {
    let mut totals = IssueTotals::default();
    let mut url_totals = UrlTotals::default();
    let mut calculations = Vec::new();

    for url in urls.iter().filter(|u| u.is_relevant_at(when)) {
        let Some(report) = index.latest_at(url.id, when) else {
            continue;
        };
        totals += &report.calculation.totals;
        url_totals.count(&report.calculation);
        calculations.push(report.calculation.clone());
    }
    calculations.sort_by(|a, b| {
        (Reverse(a.totals.high), Reverse(a.totals.medium), Reverse(a.totals.low), &a.url)
            .cmp(&(Reverse(b.totals.high), Reverse(b.totals.medium), Reverse(b.totals.low), &b.url))
    });

    OrganizationCalculation {
        organization_id: organization.id,
        name: organization.name.clone(),
        totals,
        url_totals,
        urls: calculations,
    }
}

/// Full snapshot history of an organization.
///
/// The first snapshot sits at the organization's creation (or `default_epoch` when
/// that is unknown) and exists even without any URL. After that a snapshot is only
/// kept when it differs from the one before it.
pub fn synthesize_organization_reports(
    organization: &Organization,
    urls: &[&Url],
    index: &UrlReportIndex,
    moments: &[DateTime<Utc>],
    default_epoch: DateTime<Utc>,
) -> Result<Vec<OrganizationReport>, VulnmapError> {
    let anchor = organization.created_on.unwrap_or(default_epoch);
    let first = organization_at(organization, urls, index, anchor);
    let mut previous = serde_json::to_value(&first)?;
    let mut reports = vec![OrganizationReport::new(anchor, first)];

    for moment in moments.iter().filter(|m| **m > anchor) {
        let calculation = organization_at(organization, urls, index, *moment);
        let value = serde_json::to_value(&calculation)?;
        if value == previous {
            continue;
        }
        previous = value;
        reports.push(OrganizationReport::new(*moment, calculation));
    }

    debug!(organization = %organization.name, reports = reports.len(), "Synthesized organization reports");
    Ok(reports)
}

/// Whether `current` should be stored after `previous`. A stored payload that no
/// longer parses is treated as different.
pub fn calculation_differs(previous: Option<&str>, current: &Value) -> bool {
    match previous {
        None => true,
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(stored) => stored != *current,
            Err(e) => {
                debug!(error = %e, "Stored organization calculation unreadable");
                true
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UrlCalculation;
    use crate::reporting::test_support::*;

    fn report(url: &Url, when: DateTime<Utc>, high: u32, is_ok: bool) -> UrlReport {
        UrlReport::new(
            when,
            UrlCalculation {
                url: url.address.clone(),
                url_id: url.id,
                is_ok,
                totals: IssueTotals {
                    high,
                    total_issues: high,
                    ok: u32::from(is_ok),
                    ..Default::default()
                },
                ratings: vec![],
                endpoints: vec![],
            },
        )
    }

    fn epoch() -> DateTime<Utc> {
        at(1, 0)
    }

    #[test]
    fn test_latest_at_picks_report_at_or_before() {
        let u = url(10, "test.nl");
        let index = UrlReportIndex::new(vec![report(&u, day(5), 1, false), report(&u, day(2), 0, true)]);
        assert!(index.latest_at(10, day(1)).is_none());
        assert_eq!(index.latest_at(10, day(2)).unwrap().at_when, day(2));
        assert_eq!(index.latest_at(10, day(4)).unwrap().at_when, day(2));
        assert_eq!(index.latest_at(10, day(9)).unwrap().at_when, day(5));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_organization_sums_urls() {
        let org = organization(1, "Gemeente Test");
        let good = url_in(10, "good.nl", 1);
        let bad = url_in(11, "bad.nl", 1);
        let index = UrlReportIndex::new(vec![report(&good, day(2), 0, true), report(&bad, day(2), 1, false)]);

        let calc = organization_at(&org, &[&good, &bad], &index, day(3));
        assert_eq!(calc.totals.high, 1);
        assert_eq!(calc.url_totals.total_urls, 2);
        assert_eq!(calc.url_totals.high_urls, 1);
        assert_eq!(calc.url_totals.ok_urls, 1);
        assert_eq!(calc.urls[0].url, "bad.nl");
    }

    #[test]
    fn test_organization_excludes_irrelevant_urls() {
        let org = organization(1, "Gemeente Test");
        let mut gone = url_in(10, "gone.nl", 1);
        gone.is_dead = true;
        gone.is_dead_since = Some(day(3));
        let index = UrlReportIndex::new(vec![report(&gone, day(2), 1, false)]);

        assert_eq!(organization_at(&org, &[&gone], &index, day(2)).url_totals.total_urls, 1);
        assert_eq!(organization_at(&org, &[&gone], &index, day(4)).url_totals.total_urls, 0);
    }

    #[test]
    fn test_default_snapshot_without_urls() {
        let mut org = organization(1, "Gemeente Leeg");
        org.created_on = None;
        let reports =
            synthesize_organization_reports(&org, &[], &UrlReportIndex::default(), &[day(3)], epoch()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].at_when, epoch());
        assert_eq!(reports[0].totals, IssueTotals::default());
        assert!(reports[0].calculation.urls.is_empty());
    }

    #[test]
    fn test_unchanged_states_are_not_repeated() {
        let org = organization(1, "Gemeente Test");
        let u = url_in(10, "test.nl", 1);
        let index = UrlReportIndex::new(vec![report(&u, day(2), 1, false), report(&u, day(6), 0, true)]);
        let moments = [day(2), day(3), day(4), day(6)];

        let reports = synthesize_organization_reports(&org, &[&u], &index, &moments, epoch()).unwrap();
        let times: Vec<_> = reports.iter().map(|r| r.at_when).collect();
        assert_eq!(times, vec![org.created_on.unwrap(), day(2), day(6)]);
        assert_eq!(reports[1].totals.high, 1);
        assert_eq!(reports[2].url_totals.ok_urls, 1);
    }

    #[test]
    fn test_calculation_differs() {
        let org = organization(1, "Gemeente Test");
        let value = serde_json::to_value(organization_at(&org, &[], &UrlReportIndex::default(), day(1))).unwrap();
        let raw = value.to_string();

        assert!(calculation_differs(None, &value));
        assert!(!calculation_differs(Some(&raw), &value));
        assert!(calculation_differs(Some("{not json"), &value));
        assert!(calculation_differs(Some("{\"high\": 3}"), &value));
    }
}
