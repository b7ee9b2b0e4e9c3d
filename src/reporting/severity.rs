use std::collections::{BTreeSet, HashMap};

use crate::config::SeverityRule;
use crate::errors::VulnmapError;
use crate::models::{Impact, ScanEvent, SeverityRating};
use crate::scanners;

/// Maps one scan to its severity. A rating without a rule is bad upstream data.
pub trait SeverityMapper: Send + Sync {
    fn severity(&self, scan: &ScanEvent) -> Result<SeverityRating, VulnmapError>;
}

const BUILTIN_RULES: &[(&str, &str, Impact, &str)] = &[
    (scanners::TLS_QUALYS_CERTIFICATE_TRUSTED, "trusted", Impact::Ok, "Certificate is trusted."),
    (scanners::TLS_QUALYS_CERTIFICATE_TRUSTED, "not trusted", Impact::High, "Certificate is not trusted."),
    (scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "A+", Impact::Ok, "Good transport security, rated A+."),
    (scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "A", Impact::Ok, "Good transport security, rated A."),
    (scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "A-", Impact::Ok, "Good transport security, rated A-."),
    (scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "B", Impact::Low, "Less than optimal transport security, rated B."),
    (scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "C", Impact::Medium, "Insufficient transport security, rated C."),
    (scanners::TLS_QUALYS_ENCRYPTION_QUALITY, "F", Impact::High, "Broken transport security, rated F."),
    (scanners::PLAIN_HTTPS, "ok", Impact::Ok, "Redirects to a secure site."),
    (scanners::PLAIN_HTTPS, "no_https_redirect", Impact::Medium, "Does not redirect to the secure site."),
    (scanners::PLAIN_HTTPS, "no_https", Impact::High, "Site does not use encryption at all."),
    (scanners::STRICT_TRANSPORT_SECURITY, "present", Impact::Ok, "Strict-Transport-Security header present."),
    (scanners::STRICT_TRANSPORT_SECURITY, "missing", Impact::Medium, "Missing Strict-Transport-Security header."),
    (scanners::X_FRAME_OPTIONS, "present", Impact::Ok, "X-Frame-Options header present."),
    (scanners::X_FRAME_OPTIONS, "missing", Impact::Low, "Missing X-Frame-Options header."),
    (scanners::X_CONTENT_TYPE_OPTIONS, "present", Impact::Ok, "X-Content-Type-Options header present."),
    (scanners::X_CONTENT_TYPE_OPTIONS, "missing", Impact::Low, "Missing X-Content-Type-Options header."),
    (scanners::FTP, "secure", Impact::Ok, "FTP server supports encryption."),
    (scanners::FTP, "outdated", Impact::Medium, "FTP server only supports outdated encryption."),
    (scanners::FTP, "insecure", Impact::High, "FTP server does not support encryption."),
    (scanners::DNSSEC, "ok", Impact::Ok, "DNSSEC is implemented correctly."),
    (scanners::DNSSEC, "not ok", Impact::High, "DNSSEC is incorrect or not implemented."),
];

/// Lookup table keyed on scan type, then rating.
#[derive(Debug, Clone, Default)]
pub struct SeverityTable {
    rules: HashMap<String, HashMap<String, (Impact, String)>>,
}

impl SeverityTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (scan_type, rating, impact, explanation) in BUILTIN_RULES {
            table.insert(scan_type, rating, *impact, explanation.to_string());
        }
        table
    }

    /// Rules from configuration replace built-in rules with the same key.
    pub fn with_rules(mut self, rules: &[SeverityRule]) -> Self {
        for rule in rules {
            let explanation = rule
                .explanation
                .clone()
                .unwrap_or_else(|| format!("{} rated {}.", rule.scan_type, rule.rating));
            self.insert(&rule.scan_type, &rule.rating, rule.impact, explanation);
        }
        self
    }

    fn insert(&mut self, scan_type: &str, rating: &str, impact: Impact, explanation: String) {
        self.rules
            .entry(scan_type.to_string())
            .or_default()
            .insert(rating.to_string(), (impact, explanation));
    }

    pub fn scan_types(&self) -> BTreeSet<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SeverityMapper for SeverityTable {
    fn severity(&self, scan: &ScanEvent) -> Result<SeverityRating, VulnmapError> {
        self.rules
            .get(scan.scan_type.as_str())
            .and_then(|ratings| ratings.get(scan.rating.as_str()))
            .map(|(impact, explanation)| SeverityRating::new(*impact, explanation.as_str()))
            .ok_or_else(|| VulnmapError::UnknownRating {
                scan_type: scan.scan_type.clone(),
                rating: scan.rating.clone(),
            })
    }
}
