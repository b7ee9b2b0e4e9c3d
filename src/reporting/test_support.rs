//! Fixture builders shared by the reporting unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{Endpoint, Organization, ScanEvent, SubjectKind, Url};

/// Day `n` of March 2026 at `hour`:00 UTC.
pub fn at(n: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, n, hour, 0, 0).unwrap()
}

/// Day `n` of March 2026 at 10:00 UTC.
pub fn day(n: u32) -> DateTime<Utc> {
    at(n, 10)
}

pub fn organization(id: i64, name: &str) -> Organization {
    Organization {
        id,
        name: name.into(),
        country: Some("NL".into()),
        type_name: Some("municipality".into()),
        created_on: Some(at(1, 0)),
    }
}

pub fn url(id: i64, address: &str) -> Url {
    Url {
        id,
        address: address.into(),
        created_on: at(1, 0),
        is_dead: false,
        is_dead_since: None,
        not_resolvable: false,
        not_resolvable_since: None,
        organizations: vec![],
    }
}

pub fn url_in(id: i64, address: &str, organization: i64) -> Url {
    let mut u = url(id, address);
    u.organizations.push(organization);
    u
}

pub fn endpoint(id: i64, url_id: i64, ip_version: u8, port: u16) -> Endpoint {
    Endpoint {
        id,
        url_id,
        ip_version,
        protocol: if port == 80 { "http".into() } else { "https".into() },
        port,
        discovered_on: at(1, 0),
        is_dead: false,
        is_dead_since: None,
    }
}

pub fn endpoint_scan(id: i64, endpoint: i64, scan_type: &str, rating: &str, when: DateTime<Utc>) -> ScanEvent {
    scan(id, SubjectKind::Endpoint, endpoint, scan_type, rating, when)
}

pub fn url_scan(id: i64, url: i64, scan_type: &str, rating: &str, when: DateTime<Utc>) -> ScanEvent {
    scan(id, SubjectKind::Url, url, scan_type, rating, when)
}

fn scan(
    id: i64,
    subject_kind: SubjectKind,
    subject_id: i64,
    scan_type: &str,
    rating: &str,
    when: DateTime<Utc>,
) -> ScanEvent {
    ScanEvent {
        id,
        subject_kind,
        subject_id,
        scan_type: scan_type.into(),
        rating: rating.into(),
        determined_on: when,
        last_scan_moment: when,
        is_explained: false,
        explanation: None,
    }
}
