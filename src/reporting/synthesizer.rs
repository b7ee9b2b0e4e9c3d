use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::severity::SeverityMapper;
use super::store::UrlHistory;
use super::timeline::{Timeline, TimelineDay};
use crate::errors::VulnmapError;
use crate::models::{
    judge, Endpoint, EndpointCalculation, EndpointId, FindingCalculation, Impact, IssueTotals,
    ScanEvent, Url, UrlCalculation, UrlReport,
};

pub const REPEATED_FINDING_EXPLANATION: &str = "Repeated finding. Probably because this url changed IP addresses or has multiple IP addresses (common for failover / load-balancing).";

/// Walk a URL's timeline and emit one snapshot per day on which its state could change.
///
/// Scans carry forward until superseded by a newer scan of the same type on the same
/// endpoint. Dead endpoints never reappear. The first terminal day (URL not resolvable
/// or dead) closes the history with an all-zero snapshot, but only if something was
/// reported before it.
pub fn synthesize_url_reports(
    history: &UrlHistory<'_>,
    timeline: &Timeline<'_>,
    severity: &dyn SeverityMapper,
) -> Result<Vec<UrlReport>, VulnmapError> {
    let url = history.url;
    let endpoints: HashMap<EndpointId, &Endpoint> =
        history.endpoints.iter().map(|ep| (ep.id, *ep)).collect();

    let mut previous_endpoint_scans: BTreeMap<EndpointId, BTreeMap<&str, &ScanEvent>> = BTreeMap::new();
    let mut previous_url_scans: BTreeMap<&str, &ScanEvent> = BTreeMap::new();
    let mut previously_seen: BTreeSet<EndpointId> = BTreeSet::new();
    let mut dead: BTreeSet<EndpointId> = BTreeSet::new();
    let mut reports: Vec<UrlReport> = Vec::new();

    for day in timeline.days() {
        if day.is_terminal() {
            if reports.is_empty() {
                debug!(url = %url.address, moment = %day.moment, "URL gone before its first report");
            } else {
                reports.push(UrlReport::new(day.moment, empty_calculation(url)));
            }
            break;
        }

        for endpoint_id in &day.dead_endpoints {
            dead.insert(*endpoint_id);
            previous_endpoint_scans.remove(endpoint_id);
        }
        for scan in &day.url_scans {
            previous_url_scans.insert(scan.scan_type.as_str(), *scan);
        }
        for (endpoint_id, scans) in &day.endpoint_scans {
            if dead.contains(endpoint_id) {
                continue;
            }
            let latest = previous_endpoint_scans.entry(*endpoint_id).or_default();
            for scan in scans {
                latest.insert(scan.scan_type.as_str(), *scan);
            }
        }

        let relevant: BTreeSet<EndpointId> = day
            .active_endpoints
            .union(&previously_seen)
            .filter(|id| !dead.contains(id))
            .copied()
            .collect();
        previously_seen = relevant.clone();

        let calculation = calculate_day(
            url,
            day,
            &relevant,
            &endpoints,
            &previous_endpoint_scans,
            &previous_url_scans,
            severity,
        )?;

        let has_findings = !calculation.endpoints.is_empty() || !calculation.ratings.is_empty();
        if !has_findings && reports.is_empty() {
            continue;
        }
        reports.push(UrlReport::new(day.moment, calculation));
    }

    debug!(url = %url.address, days = timeline.len(), reports = reports.len(), "Synthesized URL reports");
    Ok(reports)
}

fn calculate_day(
    url: &Url,
    day: &TimelineDay<'_>,
    relevant: &BTreeSet<EndpointId>,
    endpoints: &HashMap<EndpointId, &Endpoint>,
    endpoint_scans: &BTreeMap<EndpointId, BTreeMap<&str, &ScanEvent>>,
    url_scans: &BTreeMap<&str, &ScanEvent>,
    severity: &dyn SeverityMapper,
) -> Result<UrlCalculation, VulnmapError> {
    let mut totals = IssueTotals::default();

    let mut ratings = Vec::with_capacity(url_scans.len());
    for scan in url_scans.values() {
        let finding = finding(scan, severity)?;
        totals.url_issues_high += finding.high;
        totals.url_issues_medium += finding.medium;
        totals.url_issues_low += finding.low;
        totals.url_ok += finding.ok;
        totals.explained_url_issues_high += finding.explained_high;
        totals.explained_url_issues_medium += finding.explained_medium;
        totals.explained_url_issues_low += finding.explained_low;
        ratings.push(finding);
    }
    sort_findings(&mut ratings);

    // Same finding on the same port and IP version is counted once per day.
    let mut labels: HashMap<(bool, u16), BTreeSet<&str>> = HashMap::new();
    let mut endpoint_calculations = Vec::with_capacity(relevant.len());
    for id in relevant {
        let (Some(endpoint), Some(scans)) = (endpoints.get(id), endpoint_scans.get(id)) else {
            continue;
        };
        let seen = labels.entry((endpoint.is_ipv6(), endpoint.port)).or_default();
        let mut calculation = endpoint_calculation(endpoint);
        for (scan_type, scan) in scans {
            let mut finding = finding(scan, severity)?;
            if !seen.insert(*scan_type) {
                mark_repeated(&mut finding);
            }
            calculation.high += finding.high;
            calculation.medium += finding.medium;
            calculation.low += finding.low;
            calculation.ok += finding.ok;
            calculation.explained_high += finding.explained_high;
            calculation.explained_medium += finding.explained_medium;
            calculation.explained_low += finding.explained_low;
            calculation.ratings.push(finding);
        }
        sort_findings(&mut calculation.ratings);

        totals.total_endpoints += 1;
        match judge(calculation.high, calculation.medium, calculation.low) {
            Impact::High => totals.high_endpoints += 1,
            Impact::Medium => totals.medium_endpoints += 1,
            Impact::Low => totals.low_endpoints += 1,
            Impact::Ok => totals.ok_endpoints += 1,
        }
        match judge(calculation.explained_high, calculation.explained_medium, calculation.explained_low) {
            Impact::High => totals.explained_high_endpoints += 1,
            Impact::Medium => totals.explained_medium_endpoints += 1,
            Impact::Low => totals.explained_low_endpoints += 1,
            Impact::Ok => {}
        }
        totals.endpoint_issues_high += calculation.high;
        totals.endpoint_issues_medium += calculation.medium;
        totals.endpoint_issues_low += calculation.low;
        totals.endpoint_ok += calculation.ok;
        totals.explained_endpoint_issues_high += calculation.explained_high;
        totals.explained_endpoint_issues_medium += calculation.explained_medium;
        totals.explained_endpoint_issues_low += calculation.explained_low;
        endpoint_calculations.push(calculation);
    }
    endpoint_calculations.sort_by_key(|ep| (Reverse(ep.high), Reverse(ep.medium), Reverse(ep.low), ep.id));

    totals.total_url_issues = totals.url_issues_high + totals.url_issues_medium + totals.url_issues_low;
    totals.total_endpoint_issues =
        totals.endpoint_issues_high + totals.endpoint_issues_medium + totals.endpoint_issues_low;
    totals.high = totals.url_issues_high + totals.endpoint_issues_high;
    totals.medium = totals.url_issues_medium + totals.endpoint_issues_medium;
    totals.low = totals.url_issues_low + totals.endpoint_issues_low;
    totals.ok = totals.url_ok + totals.endpoint_ok;
    totals.total_issues = totals.high + totals.medium + totals.low;

    totals.explained_total_url_issues = totals.explained_url_issues_high
        + totals.explained_url_issues_medium
        + totals.explained_url_issues_low;
    totals.explained_total_endpoint_issues = totals.explained_endpoint_issues_high
        + totals.explained_endpoint_issues_medium
        + totals.explained_endpoint_issues_low;
    totals.explained_high = totals.explained_url_issues_high + totals.explained_endpoint_issues_high;
    totals.explained_medium = totals.explained_url_issues_medium + totals.explained_endpoint_issues_medium;
    totals.explained_low = totals.explained_url_issues_low + totals.explained_endpoint_issues_low;
    totals.explained_total_issues = totals.explained_high + totals.explained_medium + totals.explained_low;

    let has_findings = !endpoint_calculations.is_empty() || !ratings.is_empty();
    debug!(url = %url.address, moment = %day.moment, endpoints = endpoint_calculations.len(), "Calculated URL state");

    Ok(UrlCalculation {
        url: url.address.clone(),
        url_id: url.id,
        is_ok: has_findings && totals.total_issues == 0,
        totals,
        ratings,
        endpoints: endpoint_calculations,
    })
}

fn finding(scan: &ScanEvent, severity: &dyn SeverityMapper) -> Result<FindingCalculation, VulnmapError> {
    let rating = severity.severity(scan)?;
    let mut finding = FindingCalculation {
        scan_type: scan.scan_type.clone(),
        scan_id: scan.id,
        rating: scan.rating.clone(),
        explanation: rating.explanation.clone(),
        since: scan.determined_on,
        last_scan: scan.last_scan_moment,
        high: 0,
        medium: 0,
        low: 0,
        ok: rating.ok,
        explained_high: 0,
        explained_medium: 0,
        explained_low: 0,
        is_explained: scan.is_explained,
        is_repeated: false,
        operator_explanation: scan.explanation.clone(),
    };
    if scan.is_explained {
        finding.explained_high = rating.high;
        finding.explained_medium = rating.medium;
        finding.explained_low = rating.low;
    } else {
        finding.high = rating.high;
        finding.medium = rating.medium;
        finding.low = rating.low;
    }
    Ok(finding)
}

fn mark_repeated(finding: &mut FindingCalculation) {
    finding.high = 0;
    finding.medium = 0;
    finding.low = 0;
    finding.ok = 0;
    finding.explained_high = 0;
    finding.explained_medium = 0;
    finding.explained_low = 0;
    finding.is_repeated = true;
    finding.explanation = REPEATED_FINDING_EXPLANATION.to_string();
}

fn sort_findings(findings: &mut [FindingCalculation]) {
    findings.sort_by(|a, b| {
        (Reverse(a.high), Reverse(a.medium), Reverse(a.low), &a.scan_type)
            .cmp(&(Reverse(b.high), Reverse(b.medium), Reverse(b.low), &b.scan_type))
    });
}

fn endpoint_calculation(endpoint: &Endpoint) -> EndpointCalculation {
    EndpointCalculation {
        id: endpoint.id,
        concat: endpoint.concat(),
        ip_version: endpoint.ip_version,
        port: endpoint.port,
        protocol: endpoint.protocol.clone(),
        ratings: Vec::new(),
        high: 0,
        medium: 0,
        low: 0,
        ok: 0,
        explained_high: 0,
        explained_medium: 0,
        explained_low: 0,
    }
}

/// Snapshot of a URL that no longer has anything to report.
pub fn empty_calculation(url: &Url) -> UrlCalculation {
    UrlCalculation {
        url: url.address.clone(),
        url_id: url.id,
        is_ok: false,
        totals: IssueTotals::default(),
        ratings: Vec::new(),
        endpoints: Vec::new(),
    }
}
