//! Structured error types for clone operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    SessionNotFound,
    PageNotFound,
    QueryNotFound,
    MissingContextParam,

    // Precondition errors
    HierarchyNotLoaded,
    MappingNotBuilt,
    TemplateEmpty,

    // Step-order / idempotency violations
    StepOutOfOrder,
    NotReadyToCommit,
    AlreadyCommitted,

    // Correlation errors
    CorrelationFailed,

    // Formatting errors
    EmptyInsert,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Structured error surfaced to the orchestrating caller.
#[derive(Debug, Serialize)]
pub struct CloneError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CloneError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn session_not_found(session_id: &str) -> Self {
        Self::new(
            ErrorCode::SessionNotFound,
            format!("Session not found: {}", session_id),
        )
    }

    pub fn page_not_found(page_id: i64) -> Self {
        Self::new(
            ErrorCode::PageNotFound,
            format!("Target page not found in page_registry: {}", page_id),
        )
    }

    pub fn query_not_found(qry_name: &str) -> Self {
        Self::new(
            ErrorCode::QueryNotFound,
            format!("No active event_sql found with qryName: {}", qry_name),
        )
    }

    pub fn missing_context_param(param: &str) -> Self {
        Self::new(
            ErrorCode::MissingContextParam,
            format!("Context parameter :{} is not set for the acting identity", param),
        )
        .with_field(param)
    }

    pub fn hierarchy_not_loaded() -> Self {
        Self::new(
            ErrorCode::HierarchyNotLoaded,
            "Template hierarchy not loaded. Run hierarchy step first.",
        )
    }

    pub fn mapping_not_built() -> Self {
        Self::new(
            ErrorCode::MappingNotBuilt,
            "ID mapping not found. Run components step first.",
        )
    }

    pub fn step_out_of_order(requested: &str, current: &str) -> Self {
        Self::new(
            ErrorCode::StepOutOfOrder,
            format!(
                "Step '{}' may not run while session is at '{}'",
                requested, current
            ),
        )
    }

    pub fn already_committed(session_id: &str) -> Self {
        Self::new(
            ErrorCode::AlreadyCommitted,
            format!("Session already committed: {}", session_id),
        )
    }

    pub fn correlation_failed(comp_name: &str) -> Self {
        Self::new(
            ErrorCode::CorrelationFailed,
            format!("Failed to find new ID for comp_name: {}", comp_name),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for CloneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CloneError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for CloneError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CloneError>() {
            Ok(clone_err) => clone_err,
            Err(err) => CloneError::database(err),
        }
    }
}

impl From<rusqlite::Error> for CloneError {
    fn from(err: rusqlite::Error) -> Self {
        CloneError::database(err)
    }
}

impl From<serde_json::Error> for CloneError {
    fn from(err: serde_json::Error) -> Self {
        CloneError::internal(err)
    }
}

/// Result type for clone operations.
pub type CloneResult<T> = std::result::Result<T, CloneError>;
