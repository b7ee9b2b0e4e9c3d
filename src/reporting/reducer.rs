use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{ScanEvent, Subject};

/// Keep only the latest scan per (subject, scan type, calendar day).
///
/// Latest means greatest `determined_on`; on equal timestamps the higher scan id wins,
/// so repeated runs over the same data always pick the same event. Output is sorted by
/// (`determined_on`, id).
pub fn latest_scan_per_day<'a, I>(scans: I) -> Vec<&'a ScanEvent>
where
    I: IntoIterator<Item = &'a ScanEvent>,
{
    let mut latest: BTreeMap<(Subject, &'a str, NaiveDate), &'a ScanEvent> = BTreeMap::new();

    for scan in scans {
        let key = (scan.subject(), scan.scan_type.as_str(), scan.determined_on.date_naive());
        match latest.entry(key) {
            Entry::Vacant(e) => {
                e.insert(scan);
            }
            Entry::Occupied(mut e) => {
                let current = e.get();
                if (scan.determined_on, scan.id) > (current.determined_on, current.id) {
                    e.insert(scan);
                }
            }
        }
    }

    let mut reduced: Vec<&ScanEvent> = latest.into_values().collect();
    reduced.sort_by_key(|scan| (scan.determined_on, scan.id));
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::test_support::*;

    #[test]
    fn test_keeps_latest_of_the_day() {
        let scans = vec![
            endpoint_scan(1, 100, "tls_qualys_encryption_quality", "A", at(3, 8)),
            endpoint_scan(2, 100, "tls_qualys_encryption_quality", "F", at(3, 20)),
            endpoint_scan(3, 100, "tls_qualys_encryption_quality", "B", at(3, 12)),
        ];
        let reduced = latest_scan_per_day(&scans);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].rating, "F");
    }

    #[test]
    fn test_equal_timestamps_highest_id_wins() {
        let scans = vec![
            endpoint_scan(9, 100, "plain_https", "no_https", day(3)),
            endpoint_scan(4, 100, "plain_https", "ok", day(3)),
        ];
        let reduced = latest_scan_per_day(&scans);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].id, 9);

        let reversed: Vec<_> = scans.iter().rev().collect();
        assert_eq!(latest_scan_per_day(reversed)[0].id, 9);
    }

    #[test]
    fn test_distinct_keys_survive() {
        let scans = vec![
            endpoint_scan(1, 100, "plain_https", "ok", day(3)),
            endpoint_scan(2, 101, "plain_https", "ok", day(3)),
            endpoint_scan(3, 100, "ftp", "secure", day(3)),
            endpoint_scan(4, 100, "plain_https", "no_https", day(4)),
            url_scan(5, 100, "plain_https", "ok", day(3)),
        ];
        let reduced = latest_scan_per_day(&scans);
        assert_eq!(reduced.len(), 5);
        assert!(reduced.windows(2).all(|w| (w[0].determined_on, w[0].id) <= (w[1].determined_on, w[1].id)));
    }
}
