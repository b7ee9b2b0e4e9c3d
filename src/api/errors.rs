use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::errors::VulnmapError;

impl IntoResponse for VulnmapError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            VulnmapError::NotFound(_) => StatusCode::NOT_FOUND,
            VulnmapError::InvalidInput(_) | VulnmapError::Config(_) => StatusCode::BAD_REQUEST,
            VulnmapError::UnknownRating { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            VulnmapError::DatabaseBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error_type = self.classify().error_type;

        (status, Json(json!({"error": self.to_string(), "error_type": error_type}))).into_response()
    }
}
