use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Impact;

pub const DEFAULT_DATABASE_PATH: &str = "./data/vulnmap.db";
pub const DEFAULT_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VulnmapConfig {
    pub database: Option<DatabaseConfig>,
    pub reporting: Option<ReportingConfig>,
    pub severity: Option<Vec<SeverityRule>>,
    pub dispatch: Option<DispatchConfig>,
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReportingConfig {
    /// Reportable endpoint scan types. All registered types when unset.
    pub endpoint_scan_types: Option<Vec<String>>,
    pub url_scan_types: Option<Vec<String>>,
    /// Anchor of the first snapshot of organizations without a creation date.
    pub default_report_epoch: Option<DateTime<Utc>>,
}

/// Overrides or extends the built-in severity of one (scan type, rating) pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeverityRule {
    pub scan_type: String,
    pub rating: String,
    pub impact: Impact,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DispatchConfig {
    pub workers: Option<usize>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// 2016-01-01T00:00:00Z.
pub fn default_report_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl VulnmapConfig {
    pub fn database_path(&self) -> String {
        self.database
            .as_ref()
            .and_then(|d| d.path.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
    }

    pub fn report_epoch(&self) -> DateTime<Utc> {
        self.reporting
            .as_ref()
            .and_then(|r| r.default_report_epoch)
            .unwrap_or_else(default_report_epoch)
    }

    pub fn severity_rules(&self) -> &[SeverityRule] {
        self.severity.as_deref().unwrap_or(&[])
    }

    pub fn workers(&self) -> usize {
        self.dispatch
            .as_ref()
            .and_then(|d| d.workers)
            .unwrap_or(DEFAULT_WORKERS)
    }

    pub fn max_retries(&self) -> u32 {
        self.dispatch.as_ref().and_then(|d| d.max_retries).unwrap_or(3)
    }

    pub fn api_host(&self) -> String {
        self.api
            .as_ref()
            .and_then(|a| a.host.clone())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
    }

    pub fn api_port(&self) -> u16 {
        self.api.as_ref().and_then(|a| a.port).unwrap_or(DEFAULT_API_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VulnmapConfig::default();
        assert_eq!(config.database_path(), DEFAULT_DATABASE_PATH);
        assert_eq!(config.workers(), DEFAULT_WORKERS);
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.api_port(), 8080);
        assert!(config.severity_rules().is_empty());
        assert_eq!(config.report_epoch().to_rfc3339(), "2016-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_severity_rule_deserialize() {
        let rule: SeverityRule = serde_yaml::from_str(
            "scan_type: ftp\nrating: outdated\nimpact: high\n",
        )
        .unwrap();
        assert_eq!(rule.impact, Impact::High);
        assert!(rule.explanation.is_none());
    }

    #[test]
    fn test_full_config_deserialize() {
        let yaml = r#"
database:
  path: /tmp/map.db
reporting:
  url_scan_types: [DNSSEC]
  default_report_epoch: 2020-01-01T00:00:00Z
dispatch:
  workers: 8
api:
  port: 9000
"#;
        let config: VulnmapConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database_path(), "/tmp/map.db");
        assert_eq!(config.workers(), 8);
        assert_eq!(config.api_port(), 9000);
        assert_eq!(config.report_epoch().to_rfc3339(), "2020-01-01T00:00:00+00:00");
    }
}
