use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::plan::{ComposeScanPlan, EndpointPlan, UrlPlan};
use crate::errors::VulnmapError;
use crate::models::SubjectKind;
use crate::reporting::ScanTypeFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerName {
    TlsQualys,
    SecurityHeaders,
    PlainHttps,
    Ftp,
    Dnssec,
}

impl ScannerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TlsQualys => "tls_qualys",
            Self::SecurityHeaders => "security_headers",
            Self::PlainHttps => "plain_https",
            Self::Ftp => "ftp",
            Self::Dnssec => "dnssec",
        }
    }

    pub fn parse(name: &str) -> Result<Self, VulnmapError> {
        match name {
            "tls_qualys" => Ok(Self::TlsQualys),
            "security_headers" => Ok(Self::SecurityHeaders),
            "plain_https" => Ok(Self::PlainHttps),
            "ftp" => Ok(Self::Ftp),
            "dnssec" => Ok(Self::Dnssec),
            other => Err(VulnmapError::NotFound(format!("Unknown scanner: {}", other))),
        }
    }
}

impl std::fmt::Display for ScannerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ScannerDefinition {
    pub name: ScannerName,
    pub display_name: &'static str,
    pub level: SubjectKind,
    /// Scan types this scanner produces; all of them are reportable by default.
    pub scan_types: &'static [&'static str],
    pub plan: Box<dyn ComposeScanPlan>,
}

/// Scanners known at startup. Lookups never reach for global state.
pub struct ScannerRegistry {
    scanners: Vec<ScannerDefinition>,
}

impl ScannerRegistry {
    pub fn builtin() -> Self {
        Self {
            scanners: vec![
                ScannerDefinition {
                    name: ScannerName::TlsQualys,
                    display_name: "Qualys SSL Labs TLS",
                    level: SubjectKind::Endpoint,
                    scan_types: &[super::TLS_QUALYS_CERTIFICATE_TRUSTED, super::TLS_QUALYS_ENCRYPTION_QUALITY],
                    plan: Box::new(EndpointPlan { protocols: &["https"], port: None }),
                },
                ScannerDefinition {
                    name: ScannerName::SecurityHeaders,
                    display_name: "HTTP security headers",
                    level: SubjectKind::Endpoint,
                    scan_types: &[
                        super::STRICT_TRANSPORT_SECURITY,
                        super::X_FRAME_OPTIONS,
                        super::X_CONTENT_TYPE_OPTIONS,
                    ],
                    plan: Box::new(EndpointPlan { protocols: &["http", "https"], port: None }),
                },
                ScannerDefinition {
                    name: ScannerName::PlainHttps,
                    display_name: "Plain HTTPS redirect",
                    level: SubjectKind::Endpoint,
                    scan_types: &[super::PLAIN_HTTPS],
                    plan: Box::new(EndpointPlan { protocols: &["http"], port: Some(80) }),
                },
                ScannerDefinition {
                    name: ScannerName::Ftp,
                    display_name: "FTP encryption",
                    level: SubjectKind::Endpoint,
                    scan_types: &[super::FTP],
                    plan: Box::new(EndpointPlan { protocols: &["ftp"], port: None }),
                },
                ScannerDefinition {
                    name: ScannerName::Dnssec,
                    display_name: "DNSSEC",
                    level: SubjectKind::Url,
                    scan_types: &[super::DNSSEC],
                    plan: Box::new(UrlPlan),
                },
            ],
        }
    }

    pub fn get(&self, name: ScannerName) -> Option<&ScannerDefinition> {
        self.scanners.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScannerDefinition> {
        self.scanners.iter()
    }

    pub fn scan_types(&self) -> BTreeSet<&'static str> {
        self.scanners.iter().flat_map(|s| s.scan_types.iter().copied()).collect()
    }

    /// Every registered scan type, split by level.
    pub fn default_filter(&self) -> ScanTypeFilter {
        let of_level = |level: SubjectKind| {
            self.scanners
                .iter()
                .filter(move |s| s.level == level)
                .flat_map(|s| s.scan_types.iter().copied())
                .collect::<Vec<_>>()
        };
        ScanTypeFilter::new(of_level(SubjectKind::Endpoint), of_level(SubjectKind::Url))
    }
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
