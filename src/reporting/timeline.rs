use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};

use super::reducer::latest_scan_per_day;
use super::store::UrlHistory;
use crate::models::{EndpointId, ScanEvent};

/// What happened to one URL on one significant day.
#[derive(Debug, Clone)]
pub struct TimelineDay<'a> {
    pub moment: DateTime<Utc>,
    /// Endpoints scanned on or before this day that have not died yet.
    pub active_endpoints: BTreeSet<EndpointId>,
    /// Latest scan per type, for endpoints scanned on this day.
    pub endpoint_scans: BTreeMap<EndpointId, Vec<&'a ScanEvent>>,
    pub dead_endpoints: BTreeSet<EndpointId>,
    pub url_scans: Vec<&'a ScanEvent>,
    pub url_not_resolvable: bool,
    pub url_is_dead: bool,
}

impl<'a> TimelineDay<'a> {
    fn new(moment: DateTime<Utc>) -> Self {
        Self {
            moment,
            active_endpoints: BTreeSet::new(),
            endpoint_scans: BTreeMap::new(),
            dead_endpoints: BTreeSet::new(),
            url_scans: Vec::new(),
            url_not_resolvable: false,
            url_is_dead: false,
        }
    }

    /// The URL stopped existing on this day; nothing after it is reported.
    pub fn is_terminal(&self) -> bool {
        self.url_not_resolvable || self.url_is_dead
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline<'a> {
    days: BTreeMap<NaiveDate, TimelineDay<'a>>,
}

impl<'a> Timeline<'a> {
    pub fn days(&self) -> impl Iterator<Item = &TimelineDay<'a>> {
        self.days.values()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&TimelineDay<'a>> {
        self.days.get(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Bucket a URL's events into the given moments, one entry per calendar day.
pub fn build_timeline<'a>(history: &UrlHistory<'a>, moments: &[DateTime<Utc>]) -> Timeline<'a> {
    let mut days: BTreeMap<NaiveDate, TimelineDay<'a>> = moments
        .iter()
        .map(|moment| (moment.date_naive(), TimelineDay::new(*moment)))
        .collect();

    for scan in latest_scan_per_day(history.endpoint_scans.iter().copied()) {
        if let Some(day) = days.get_mut(&scan.determined_on.date_naive()) {
            day.endpoint_scans.entry(scan.subject_id).or_default().push(scan);
        }
    }
    for scan in latest_scan_per_day(history.url_scans.iter().copied()) {
        if let Some(day) = days.get_mut(&scan.determined_on.date_naive()) {
            day.url_scans.push(scan);
        }
    }
    for (endpoint, died) in history.endpoint_deaths() {
        if let Some(day) = days.get_mut(&died.date_naive()) {
            day.dead_endpoints.insert(endpoint.id);
        }
    }
    if let Some(day) = history.url_not_resolvable_on().and_then(|when| days.get_mut(&when.date_naive())) {
        day.url_not_resolvable = true;
    }
    if let Some(day) = history.url_died_on().and_then(|when| days.get_mut(&when.date_naive())) {
        day.url_is_dead = true;
    }

    let mut alive: BTreeSet<EndpointId> = BTreeSet::new();
    let mut dead: BTreeSet<EndpointId> = BTreeSet::new();
    for day in days.values_mut() {
        dead.extend(day.dead_endpoints.iter().copied());
        alive.extend(day.endpoint_scans.keys().copied());
        alive.retain(|id| !dead.contains(id));
        day.active_endpoints = alive.clone();
    }

    Timeline { days }
}
