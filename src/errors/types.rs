use thiserror::Error;

#[derive(Debug, Error)]
pub enum VulnmapError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A scan whose type and rating have no severity rule. Indicates bad upstream data.
    #[error("No severity rule for scan type '{scan_type}' with rating '{rating}'")]
    UnknownRating { scan_type: String, rating: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Database busy: {0}")]
    DatabaseBusy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
