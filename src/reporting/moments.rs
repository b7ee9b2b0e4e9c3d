use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use super::store::UrlHistory;

/// Last representable instant of `date` in UTC (23:59:59.999999).
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    (date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::microseconds(1)).and_utc()
}

/// Days on which anything changed for the given URLs, normalized to end of day.
///
/// A change is a scan determination, an endpoint death, or the URL dying or going
/// unresolvable. If the last moment falls on the current day it is replaced by `now`,
/// so a report of today never claims a future instant.
pub fn significant_moments(histories: &[UrlHistory<'_>], now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut days: BTreeSet<NaiveDate> = BTreeSet::new();

    for history in histories {
        let scans = history.endpoint_scans.iter().chain(history.url_scans.iter());
        days.extend(scans.map(|scan| scan.determined_on.date_naive()));
        days.extend(history.endpoint_deaths().map(|(_, when)| when.date_naive()));
        days.extend(history.url_not_resolvable_on().map(|when| when.date_naive()));
        days.extend(history.url_died_on().map(|when| when.date_naive()));
    }

    let mut moments: Vec<DateTime<Utc>> = days.into_iter().map(end_of_day).collect();
    if let Some(last) = moments.last_mut() {
        if last.date_naive() == now.date_naive() && now < *last {
            *last = now;
        }
    }
    moments
}
