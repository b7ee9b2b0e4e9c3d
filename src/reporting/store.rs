use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::models::{
    Endpoint, EndpointId, Organization, OrganizationId, ScanEvent, SubjectKind, Url, UrlId,
};

/// Reportable scan types, split by the level they are scanned at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanTypeFilter {
    pub endpoint: BTreeSet<String>,
    pub url: BTreeSet<String>,
}

impl ScanTypeFilter {
    pub fn new<E, U, S>(endpoint: E, url: U) -> Self
    where
        E: IntoIterator<Item = S>,
        U: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoint: endpoint.into_iter().map(Into::into).collect(),
            url: url.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, scan: &ScanEvent) -> bool {
        match scan.subject_kind {
            SubjectKind::Endpoint => self.endpoint.contains(&scan.scan_type),
            SubjectKind::Url => self.url.contains(&scan.scan_type),
        }
    }
}

/// Upper bound of the events considered by one rebuild.
#[derive(Debug, Clone, Copy)]
pub struct ReportingWindow {
    pub until: DateTime<Utc>,
}

impl ReportingWindow {
    pub fn until(until: DateTime<Utc>) -> Self {
        Self { until }
    }

    pub fn contains(&self, when: DateTime<Utc>) -> bool {
        when <= self.until
    }
}

/// Everything the timeline walk of a single URL needs, borrowed from the store.
#[derive(Debug, Clone)]
pub struct UrlHistory<'a> {
    pub url: &'a Url,
    pub endpoints: Vec<&'a Endpoint>,
    pub endpoint_scans: Vec<&'a ScanEvent>,
    pub url_scans: Vec<&'a ScanEvent>,
    pub window: ReportingWindow,
}

impl<'a> UrlHistory<'a> {
    /// Endpoints that died inside the window, with their moment of death.
    pub fn endpoint_deaths(&self) -> impl Iterator<Item = (&'a Endpoint, DateTime<Utc>)> + '_ {
        self.endpoints.iter().filter_map(move |ep| {
            ep.died_on()
                .filter(|when| self.window.contains(*when))
                .map(|when| (*ep, when))
        })
    }

    pub fn url_not_resolvable_on(&self) -> Option<DateTime<Utc>> {
        self.url.not_resolvable_on().filter(|when| self.window.contains(*when))
    }

    pub fn url_died_on(&self) -> Option<DateTime<Utc>> {
        self.url.died_on().filter(|when| self.window.contains(*when))
    }
}

/// Read-only access to the scan event feed and the entities it refers to.
pub trait EventStore {
    fn url(&self, id: UrlId) -> Option<&Url>;
    fn organization(&self, id: OrganizationId) -> Option<&Organization>;
    fn urls_of_organization(&self, id: OrganizationId) -> Vec<&Url>;
    fn endpoints_of_url(&self, id: UrlId) -> Vec<&Endpoint>;
    fn endpoint_scans_of_url(&self, id: UrlId) -> Vec<&ScanEvent>;
    fn url_scans_of_url(&self, id: UrlId) -> Vec<&ScanEvent>;

    /// Reportable events of one URL inside the window. `None` for an unknown URL.
    fn history<'a>(
        &'a self,
        id: UrlId,
        filter: &ScanTypeFilter,
        window: &ReportingWindow,
    ) -> Option<UrlHistory<'a>> {
        let url = self.url(id)?;
        let keep = |scan: &&ScanEvent| filter.allows(scan) && window.contains(scan.determined_on);
        Some(UrlHistory {
            url,
            endpoints: self.endpoints_of_url(id),
            endpoint_scans: self.endpoint_scans_of_url(id).into_iter().filter(keep).collect(),
            url_scans: self.url_scans_of_url(id).into_iter().filter(keep).collect(),
            window: *window,
        })
    }
}

/// Owned entities plus back-indices, built once per rebuild pass.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    organizations: BTreeMap<OrganizationId, Organization>,
    urls: BTreeMap<UrlId, Url>,
    endpoints: BTreeMap<EndpointId, Endpoint>,
    scans: Vec<ScanEvent>,
    endpoints_by_url: HashMap<UrlId, Vec<EndpointId>>,
    urls_by_organization: HashMap<OrganizationId, Vec<UrlId>>,
    endpoint_scans_by_url: HashMap<UrlId, Vec<usize>>,
    url_scans_by_url: HashMap<UrlId, Vec<usize>>,
}

impl Inventory {
    pub fn new(
        organizations: Vec<Organization>,
        urls: Vec<Url>,
        endpoints: Vec<Endpoint>,
        scans: Vec<ScanEvent>,
    ) -> Self {
        let mut inventory = Self {
            organizations: organizations.into_iter().map(|o| (o.id, o)).collect(),
            urls: urls.into_iter().map(|u| (u.id, u)).collect(),
            endpoints: endpoints.into_iter().map(|e| (e.id, e)).collect(),
            scans,
            ..Default::default()
        };
        inventory.index();
        inventory
    }

    fn index(&mut self) {
        for url in self.urls.values() {
            for org in &url.organizations {
                self.urls_by_organization.entry(*org).or_default().push(url.id);
            }
        }
        for endpoint in self.endpoints.values() {
            self.endpoints_by_url.entry(endpoint.url_id).or_default().push(endpoint.id);
        }
        for (idx, scan) in self.scans.iter().enumerate() {
            match scan.subject_kind {
                SubjectKind::Endpoint => {
                    // Scans of endpoints outside this inventory are not reportable here.
                    if let Some(endpoint) = self.endpoints.get(&scan.subject_id) {
                        self.endpoint_scans_by_url.entry(endpoint.url_id).or_default().push(idx);
                    }
                }
                SubjectKind::Url => {
                    if self.urls.contains_key(&scan.subject_id) {
                        self.url_scans_by_url.entry(scan.subject_id).or_default().push(idx);
                    }
                }
            }
        }
    }

    pub fn urls(&self) -> impl Iterator<Item = &Url> {
        self.urls.values()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    pub fn organizations(&self) -> impl Iterator<Item = &Organization> {
        self.organizations.values()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    fn scans_at(&self, indices: Option<&Vec<usize>>) -> Vec<&ScanEvent> {
        indices
            .map(|idx| idx.iter().map(|i| &self.scans[*i]).collect())
            .unwrap_or_default()
    }
}

impl EventStore for Inventory {
    fn url(&self, id: UrlId) -> Option<&Url> {
        self.urls.get(&id)
    }

    fn organization(&self, id: OrganizationId) -> Option<&Organization> {
        self.organizations.get(&id)
    }

    fn urls_of_organization(&self, id: OrganizationId) -> Vec<&Url> {
        self.urls_by_organization
            .get(&id)
            .map(|ids| ids.iter().filter_map(|u| self.urls.get(u)).collect())
            .unwrap_or_default()
    }

    fn endpoints_of_url(&self, id: UrlId) -> Vec<&Endpoint> {
        self.endpoints_by_url
            .get(&id)
            .map(|ids| ids.iter().filter_map(|e| self.endpoints.get(e)).collect())
            .unwrap_or_default()
    }

    fn endpoint_scans_of_url(&self, id: UrlId) -> Vec<&ScanEvent> {
        self.scans_at(self.endpoint_scans_by_url.get(&id))
    }

    fn url_scans_of_url(&self, id: UrlId) -> Vec<&ScanEvent> {
        self.scans_at(self.url_scans_by_url.get(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::test_support::*;

    #[test]
    fn test_inventory_back_indices() {
        let inventory = Inventory::new(
            vec![organization(1, "Gemeente Test")],
            vec![url_in(10, "test.nl", 1), url_in(11, "other.nl", 1)],
            vec![endpoint(100, 10, 4, 443), endpoint(101, 11, 6, 443)],
            vec![
                endpoint_scan(1, 100, "tls_qualys_encryption_quality", "A", day(1)),
                url_scan(2, 10, "DNSSEC", "ok", day(1)),
                endpoint_scan(3, 999, "tls_qualys_encryption_quality", "F", day(1)),
            ],
        );

        assert_eq!(inventory.urls_of_organization(1).len(), 2);
        assert_eq!(inventory.endpoints_of_url(10).len(), 1);
        assert_eq!(inventory.endpoint_scans_of_url(10).len(), 1);
        assert_eq!(inventory.url_scans_of_url(10).len(), 1);
        assert!(inventory.endpoint_scans_of_url(11).is_empty());
        assert_eq!(inventory.scan_count(), 3);
    }

    #[test]
    fn test_history_applies_filter_and_window() {
        let inventory = Inventory::new(
            vec![],
            vec![url(10, "test.nl")],
            vec![endpoint(100, 10, 4, 443)],
            vec![
                endpoint_scan(1, 100, "tls_qualys_encryption_quality", "A", day(1)),
                endpoint_scan(2, 100, "not_reportable", "whatever", day(1)),
                endpoint_scan(3, 100, "tls_qualys_encryption_quality", "F", day(9)),
            ],
        );
        let filter = ScanTypeFilter::new(["tls_qualys_encryption_quality"], ["DNSSEC"]);
        let history = inventory
            .history(10, &filter, &ReportingWindow::until(day(5)))
            .unwrap();

        assert_eq!(history.endpoint_scans.len(), 1);
        assert_eq!(history.endpoint_scans[0].id, 1);
        assert!(history.url_scans.is_empty());
        assert!(inventory.history(42, &filter, &ReportingWindow::until(day(5))).is_none());
    }

    #[test]
    fn test_history_ignores_deaths_after_window() {
        let mut ep = endpoint(100, 10, 4, 443);
        ep.is_dead = true;
        ep.is_dead_since = Some(day(8));
        let inventory = Inventory::new(vec![], vec![url(10, "test.nl")], vec![ep], vec![]);
        let filter = ScanTypeFilter::default();

        let early = inventory.history(10, &filter, &ReportingWindow::until(day(5))).unwrap();
        assert_eq!(early.endpoint_deaths().count(), 0);

        let late = inventory.history(10, &filter, &ReportingWindow::until(day(9))).unwrap();
        assert_eq!(late.endpoint_deaths().count(), 1);
    }
}
