use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{EndpointId, SubjectKind, Url, UrlId};
use crate::reporting::{EventStore, Inventory};

/// One unit of work a scanner would perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedScan {
    pub subject_kind: SubjectKind,
    pub subject_id: i64,
    pub url_id: UrlId,
    pub target: String,
}

/// Decides which subjects a scanner should visit.
pub trait ComposeScanPlan: Send + Sync {
    fn compose(&self, inventory: &Inventory, now: DateTime<Utc>) -> Vec<PlannedScan>;
}

/// Alive endpoints speaking one of `protocols`, optionally on a fixed port.
pub struct EndpointPlan {
    pub protocols: &'static [&'static str],
    pub port: Option<u16>,
}

impl ComposeScanPlan for EndpointPlan {
    fn compose(&self, inventory: &Inventory, now: DateTime<Utc>) -> Vec<PlannedScan> {
        let mut planned: Vec<(EndpointId, PlannedScan)> = Vec::new();
        for url in inventory.urls().filter(|u| u.is_relevant_at(now)) {
            for endpoint in inventory.endpoints_of_url(url.id) {
                if !endpoint.is_alive_at(now)
                    || !self.protocols.contains(&endpoint.protocol.as_str())
                    || self.port.is_some_and(|port| port != endpoint.port)
                {
                    continue;
                }
                planned.push((
                    endpoint.id,
                    PlannedScan {
                        subject_kind: SubjectKind::Endpoint,
                        subject_id: endpoint.id,
                        url_id: url.id,
                        target: format!("{} {}", url.address, endpoint.concat()),
                    },
                ));
            }
        }
        planned.sort_by_key(|(id, _)| *id);
        planned.into_iter().map(|(_, scan)| scan).collect()
    }
}

/// Every URL that still resolves.
pub struct UrlPlan;

impl ComposeScanPlan for UrlPlan {
    fn compose(&self, inventory: &Inventory, now: DateTime<Utc>) -> Vec<PlannedScan> {
        inventory
            .urls()
            .filter(|u| u.is_relevant_at(now))
            .map(|u: &Url| PlannedScan {
                subject_kind: SubjectKind::Url,
                subject_id: u.id,
                url_id: u.id,
                target: u.address.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::test_support::*;

    fn inventory() -> Inventory {
        let mut gone = url(11, "gone.nl");
        gone.not_resolvable = true;
        gone.not_resolvable_since = Some(day(2));
        let mut dead_endpoint = endpoint(103, 10, 6, 443);
        dead_endpoint.is_dead = true;
        dead_endpoint.is_dead_since = Some(day(2));

        Inventory::new(
            vec![],
            vec![url(10, "test.nl"), gone],
            vec![
                endpoint(101, 10, 4, 443),
                endpoint(102, 10, 4, 80),
                dead_endpoint,
                endpoint(104, 11, 4, 443),
            ],
            vec![],
        )
    }

    #[test]
    fn test_endpoint_plan_selects_alive_matching_endpoints() {
        let plan = EndpointPlan { protocols: &["https"], port: None };
        let scans = plan.compose(&inventory(), day(5));
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].subject_id, 101);
        assert_eq!(scans[0].target, "test.nl https/443 IPv4");
    }

    #[test]
    fn test_endpoint_plan_port_restriction() {
        let plan = EndpointPlan { protocols: &["http", "https"], port: Some(80) };
        let scans = plan.compose(&inventory(), day(5));
        assert_eq!(scans.iter().map(|s| s.subject_id).collect::<Vec<_>>(), vec![102]);
    }

    #[test]
    fn test_url_plan_skips_unresolvable_urls() {
        let scans = UrlPlan.compose(&inventory(), day(5));
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].subject_kind, SubjectKind::Url);
        assert_eq!(scans[0].target, "test.nl");
    }
}
