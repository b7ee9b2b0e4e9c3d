use std::path::PathBuf;

use crate::config::{parse_config, VulnmapConfig};
use crate::db::Database;
use crate::dispatch::RebuildDispatcher;
use crate::errors::{RetryConfig, VulnmapError};
use crate::reporting::{severity_table, ReportSettings};
use crate::scanners::ScannerRegistry;

/// Configuration and paths shared by every subcommand.
pub struct CliContext {
    pub config: VulnmapConfig,
    pub db_path: String,
    pub registry: ScannerRegistry,
}

impl CliContext {
    pub async fn load(config_path: Option<&str>, db_override: Option<&str>) -> Result<Self, VulnmapError> {
        let config = match config_path {
            Some(path) => parse_config(&PathBuf::from(path)).await?,
            None => VulnmapConfig::default(),
        };
        let db_path = db_override.map(str::to_string).unwrap_or_else(|| config.database_path());
        Ok(Self { config, db_path, registry: ScannerRegistry::builtin() })
    }

    pub fn open_database(&self) -> Result<Database, VulnmapError> {
        Database::new(&self.db_path)
    }

    pub fn settings(&self) -> ReportSettings {
        ReportSettings::from_config(&self.config, &self.registry)
    }

    /// `fail_fast` turns retries off, for one-shot runs.
    pub fn dispatcher(&self, db: &Database, fail_fast: bool) -> RebuildDispatcher {
        RebuildDispatcher::new(
            db.clone(),
            self.settings(),
            severity_table(&self.config),
            self.config.workers(),
            RetryConfig { max_retries: self.config.max_retries(), fail_fast },
        )
    }
}
