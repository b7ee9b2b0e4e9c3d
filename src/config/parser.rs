use std::collections::HashMap;
use std::path::Path;

use crate::errors::VulnmapError;
use super::types::VulnmapConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<VulnmapConfig, VulnmapError> {
    if !path.exists() {
        return Err(VulnmapError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(VulnmapError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<VulnmapConfig, VulnmapError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(VulnmapConfig::default());
    }

    validate_schema(&yaml)?;

    let config: VulnmapConfig = serde_yaml::from_value(yaml)?;

    validate_conflicts(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), VulnmapError> {
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| VulnmapError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| VulnmapError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| VulnmapError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Advisory only: typed parsing below is the hard gate.
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &VulnmapConfig) -> Result<(), VulnmapError> {
    let mut seen = HashMap::new();
    for rule in config.severity_rules() {
        let key = (rule.scan_type.as_str(), rule.rating.as_str());
        if let Some(previous) = seen.insert(key, rule.impact) {
            if previous != rule.impact {
                return Err(VulnmapError::Config(format!(
                    "Conflicting severity rules for scan type '{}' rating '{}': {} and {}",
                    rule.scan_type, rule.rating, previous, rule.impact
                )));
            }
            warn!(scan_type = %rule.scan_type, rating = %rule.rating, "Duplicate severity rule");
        }
    }

    if let Some(dispatch) = &config.dispatch {
        if dispatch.workers == Some(0) {
            return Err(VulnmapError::Config("dispatch.workers must be at least 1".into()));
        }
    }

    if let Some(reporting) = &config.reporting {
        let endpoint_empty = reporting.endpoint_scan_types.as_ref().is_some_and(|t| t.is_empty());
        let url_empty = reporting.url_scan_types.as_ref().is_some_and(|t| t.is_empty());
        if endpoint_empty && url_empty {
            warn!("No reportable scan types configured; every report will be empty");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DispatchConfig, SeverityRule};
    use crate::models::Impact;

    fn rule(impact: Impact) -> SeverityRule {
        SeverityRule {
            scan_type: "ftp".to_string(),
            rating: "outdated".to_string(),
            impact,
            explanation: None,
        }
    }

    #[test]
    fn test_validate_conflicts_contradicting_rules() {
        let config = VulnmapConfig {
            severity: Some(vec![rule(Impact::High), rule(Impact::Low)]),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_duplicate_identical_rules() {
        let config = VulnmapConfig {
            severity: Some(vec![rule(Impact::High), rule(Impact::High)]),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_ok());
    }

    #[test]
    fn test_validate_conflicts_zero_workers() {
        let config = VulnmapConfig {
            dispatch: Some(DispatchConfig { workers: Some(0), max_retries: None }),
            ..Default::default()
        };
        assert!(validate_conflicts(&config).is_err());
    }

    #[test]
    fn test_validate_conflicts_empty_config() {
        assert!(validate_conflicts(&VulnmapConfig::default()).is_ok());
    }

    #[test]
    fn test_parse_empty_document() {
        let config = parse_config_str("").unwrap();
        assert!(config.database.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_impact() {
        let yaml = "severity:\n  - scan_type: ftp\n    rating: outdated\n    impact: catastrophic\n";
        assert!(matches!(parse_config_str(yaml), Err(VulnmapError::Yaml(_))));
    }

    #[tokio::test]
    async fn test_parse_config_missing_file() {
        let err = parse_config(Path::new("/nonexistent/vulnmap.yaml")).await.unwrap_err();
        assert!(matches!(err, VulnmapError::Config(_)));
    }

    #[tokio::test]
    async fn test_parse_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vulnmap.yaml");
        tokio::fs::write(&path, "dispatch:\n  workers: 2\n  max_retries: 1\n").await.unwrap();
        let config = parse_config(&path).await.unwrap();
        assert_eq!(config.workers(), 2);
        assert_eq!(config.max_retries(), 1);
    }
}
