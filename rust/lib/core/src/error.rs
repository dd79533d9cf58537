use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these,
// never on the human-readable message string.

/// Stable error code constants.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const INTERNAL: &str = "INTERNAL";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified error type for the relation graph.
///
/// Each variant maps to a stable error code (see [`error_code`]) and the
/// HTTP status an outer request layer should answer with.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Referenced identity or edge does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Operation would violate a graph invariant (duplicate edge,
    /// following a blocker, ...). HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Malformed input shape. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Conflict(_) => error_code::ALREADY_EXISTS,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::Conflict(_) => 409,
            ServiceError::Validation(_) => 400,
            ServiceError::Storage(_) | ServiceError::Internal(_) => 500,
        }
    }

    /// Whether the failure was caused by the caller's request rather than
    /// by the backend.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// JSON body `{"code": ..., "message": ...}` for an outer request layer.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        })
    }
}
