use super::types::VulnmapError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl VulnmapError {
    /// Classify this error to decide whether the dispatch layer may retry the unit of work.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Transient: a concurrent writer held the SQLite lock, or the worker died.
            VulnmapError::DatabaseBusy(_) => ErrorClassification {
                error_type: "DatabaseBusyError",
                retryable: true,
            },
            VulnmapError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },
            VulnmapError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: true,
            },

            // Data or setup problems: retrying yields the same result.
            VulnmapError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            VulnmapError::UnknownRating { .. } => ErrorClassification {
                error_type: "UnknownRatingError",
                retryable: false,
            },
            VulnmapError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                retryable: false,
            },
            VulnmapError::InvalidInput(_) => ErrorClassification {
                error_type: "InvalidInputError",
                retryable: false,
            },
            VulnmapError::Database(_) => ErrorClassification {
                error_type: "DatabaseError",
                retryable: false,
            },
            VulnmapError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            VulnmapError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
        }
    }
}
