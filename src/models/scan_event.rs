use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{EndpointId, UrlId};

pub type ScanId = i64;

/// What a scan was performed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Endpoint,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    Endpoint(EndpointId),
    Url(UrlId),
}

/// One scanner determination. Never mutated: a changed rating arrives as a new event,
/// an unchanged rating only moves `last_scan_moment` forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: ScanId,
    pub subject_kind: SubjectKind,
    pub subject_id: i64,
    pub scan_type: String,
    /// Scanner-defined vocabulary, e.g. "A+" or "missing".
    pub rating: String,
    /// When this rating was first determined.
    pub determined_on: DateTime<Utc>,
    /// When the scanner last confirmed this rating.
    pub last_scan_moment: DateTime<Utc>,
    #[serde(default)]
    pub is_explained: bool,
    /// Operator-supplied justification for an explained finding.
    #[serde(default)]
    pub explanation: Option<String>,
}

impl ScanEvent {
    pub fn subject(&self) -> Subject {
        match self.subject_kind {
            SubjectKind::Endpoint => Subject::Endpoint(self.subject_id),
            SubjectKind::Url => Subject::Url(self.subject_id),
        }
    }

    pub fn is_endpoint_scan(&self) -> bool {
        self.subject_kind == SubjectKind::Endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_event_parses_feed_record() {
        let json = r#"{
            "id": 7,
            "subject_kind": "endpoint",
            "subject_id": 12,
            "scan_type": "tls_qualys_encryption_quality",
            "rating": "A+",
            "determined_on": "2026-01-02T10:00:00Z",
            "last_scan_moment": "2026-01-05T10:00:00Z"
        }"#;
        let scan: ScanEvent = serde_json::from_str(json).unwrap();
        assert_eq!(scan.subject(), Subject::Endpoint(12));
        assert!(!scan.is_explained);
        assert!(scan.explanation.is_none());
        assert!(scan.is_endpoint_scan());
    }

    #[test]
    fn test_subject_kind_url() {
        let kind: SubjectKind = serde_json::from_str("\"url\"").unwrap();
        assert_eq!(kind, SubjectKind::Url);
    }
}
