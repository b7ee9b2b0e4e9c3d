use chrono::{DateTime, TimeZone, Utc};
use vulnmap::db::{Database, InventoryImport};
use vulnmap::models::{Endpoint, Organization, ScanEvent, SubjectKind, Url};
use vulnmap::reporting::{rebuild_organization, rebuild_url, ReportSettings, SeverityTable};
use vulnmap::scanners::{DNSSEC, TLS_QUALYS_ENCRYPTION_QUALITY};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    at(20, 12)
}

fn organization(id: i64, created_on: Option<DateTime<Utc>>) -> Organization {
    Organization {
        id,
        name: format!("Gemeente {}", id),
        country: Some("NL".into()),
        type_name: Some("municipality".into()),
        created_on,
    }
}

fn url(id: i64, address: &str, organization: i64) -> Url {
    Url {
        id,
        address: address.into(),
        created_on: at(1, 0),
        is_dead: false,
        is_dead_since: None,
        not_resolvable: false,
        not_resolvable_since: None,
        organizations: vec![organization],
    }
}

fn https_endpoint(id: i64, url_id: i64) -> Endpoint {
    Endpoint {
        id,
        url_id,
        ip_version: 4,
        protocol: "https".into(),
        port: 443,
        discovered_on: at(1, 0),
        is_dead: false,
        is_dead_since: None,
    }
}

fn scan(id: i64, kind: SubjectKind, subject: i64, scan_type: &str, rating: &str, when: DateTime<Utc>) -> ScanEvent {
    ScanEvent {
        id,
        subject_kind: kind,
        subject_id: subject,
        scan_type: scan_type.into(),
        rating: rating.into(),
        determined_on: when,
        last_scan_moment: when,
        is_explained: false,
        explanation: None,
    }
}

fn rebuild(db: &Database, url_id: i64) -> usize {
    rebuild_url(db, url_id, &ReportSettings::default(), &SeverityTable::builtin(), now()).unwrap()
}

#[test]
fn test_url_history_through_degradation_and_disappearance() {
    let db = Database::in_memory().unwrap();
    let mut test_nl = url(10, "test.nl", 1);
    test_nl.not_resolvable = true;
    test_nl.not_resolvable_since = Some(at(3, 9));
    db.import(&InventoryImport {
        organizations: vec![organization(1, Some(at(1, 0)))],
        urls: vec![test_nl],
        endpoints: vec![https_endpoint(100, 10)],
        scans: vec![
            scan(1, SubjectKind::Endpoint, 100, TLS_QUALYS_ENCRYPTION_QUALITY, "A+", at(1, 10)),
            scan(2, SubjectKind::Endpoint, 100, TLS_QUALYS_ENCRYPTION_QUALITY, "F", at(2, 10)),
        ],
    })
    .unwrap();

    assert_eq!(rebuild(&db, 10), 3);
    let reports = db.url_reports(10).unwrap();
    assert_eq!(reports.len(), 3);

    assert_eq!(reports[0].totals.ok, 1);
    assert_eq!(reports[0].totals.total_endpoints, 1);
    assert!(reports[0].is_ok);

    assert_eq!(reports[1].totals.high, 1);
    assert_eq!(reports[1].totals.ok, 0);
    assert!(!reports[1].is_ok);

    assert_eq!(reports[2].totals.total_endpoints, 0);
    assert_eq!(reports[2].totals.high, 0);
    assert!(reports[2].calculation.endpoints.is_empty());

    let at_times: Vec<_> = reports.iter().map(|r| r.at_when).collect();
    assert!(at_times.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_rebuild_is_idempotent() {
    let db = Database::in_memory().unwrap();
    db.import(&InventoryImport {
        organizations: vec![organization(1, Some(at(1, 0)))],
        urls: vec![url(10, "test.nl", 1)],
        endpoints: vec![https_endpoint(100, 10)],
        scans: vec![
            scan(1, SubjectKind::Endpoint, 100, TLS_QUALYS_ENCRYPTION_QUALITY, "B", at(2, 10)),
            scan(2, SubjectKind::Url, 10, DNSSEC, "not ok", at(4, 10)),
        ],
    })
    .unwrap();

    rebuild(&db, 10);
    let first: Vec<_> = db.url_reports(10).unwrap().into_iter().map(|r| (r.at_when, r.calculation)).collect();
    rebuild(&db, 10);
    let second: Vec<_> = db.url_reports(10).unwrap().into_iter().map(|r| (r.at_when, r.calculation)).collect();
    assert_eq!(first, second);
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].1.totals.url_issues_high, 1);
    assert_eq!(second[1].1.totals.endpoint_issues_low, 1);
}

#[test]
fn test_explained_finding_is_not_an_issue() {
    let db = Database::in_memory().unwrap();
    let mut explained = scan(1, SubjectKind::Endpoint, 100, TLS_QUALYS_ENCRYPTION_QUALITY, "F", at(2, 10));
    explained.is_explained = true;
    explained.explanation = Some("Legacy clients, accepted by the board".into());
    db.import(&InventoryImport {
        organizations: vec![organization(1, Some(at(1, 0)))],
        urls: vec![url(10, "test.nl", 1)],
        endpoints: vec![https_endpoint(100, 10)],
        scans: vec![explained],
    })
    .unwrap();

    rebuild(&db, 10);
    let report = db.latest_url_report(10, now()).unwrap().unwrap();
    assert_eq!(report.totals.high, 0);
    assert_eq!(report.totals.explained_high, 1);
    assert_eq!(report.totals.explained_high_endpoints, 1);
    let finding = &report.calculation.endpoints[0].ratings[0];
    assert!(finding.is_explained);
    assert_eq!(finding.operator_explanation.as_deref(), Some("Legacy clients, accepted by the board"));
}

#[test]
fn test_organization_combines_url_snapshots() {
    let db = Database::in_memory().unwrap();
    db.import(&InventoryImport {
        organizations: vec![organization(1, Some(at(1, 0)))],
        urls: vec![url(10, "good.nl", 1), url(11, "bad.nl", 1)],
        endpoints: vec![https_endpoint(100, 10), https_endpoint(101, 11)],
        scans: vec![
            scan(1, SubjectKind::Endpoint, 100, TLS_QUALYS_ENCRYPTION_QUALITY, "A", at(2, 10)),
            scan(2, SubjectKind::Endpoint, 101, TLS_QUALYS_ENCRYPTION_QUALITY, "F", at(3, 10)),
        ],
    })
    .unwrap();
    rebuild(&db, 10);
    rebuild(&db, 11);

    let written = rebuild_organization(&db, 1, &ReportSettings::default(), now()).unwrap();
    let reports = db.organization_reports(1).unwrap();
    assert_eq!(written, reports.len());
    assert_eq!(reports[0].at_when, at(1, 0));
    assert_eq!(reports[0].url_totals.total_urls, 0);

    let latest = reports.last().unwrap();
    assert_eq!(latest.totals.high, 1);
    assert_eq!(latest.url_totals.total_urls, 2);
    assert_eq!(latest.url_totals.high_urls, 1);
    assert_eq!(latest.url_totals.ok_urls, 1);

    let mid = db.latest_organization_report(1, at(3, 1)).unwrap().unwrap();
    assert_eq!(mid.url_totals.total_urls, 1);
    assert_eq!(mid.url_totals.ok_urls, 1);
}

#[test]
fn test_organization_without_urls_gets_epoch_snapshot() {
    let db = Database::in_memory().unwrap();
    db.import(&InventoryImport { organizations: vec![organization(2, None)], ..Default::default() })
        .unwrap();

    assert_eq!(rebuild_organization(&db, 2, &ReportSettings::default(), now()).unwrap(), 1);
    let reports = db.organization_reports(2).unwrap();
    assert_eq!(reports[0].at_when.to_rfc3339(), "2016-01-01T00:00:00+00:00");
    assert_eq!(reports[0].totals.total_issues, 0);
    assert!(reports[0].calculation.urls.is_empty());
}
