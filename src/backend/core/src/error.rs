//! Error handling for Tensor Core.
//!
//! `TensorError` is what resource handlers return: a stable code, a message
//! safe to show the caller and an internal message that is only logged. The
//! access subsystem keeps its own narrow enums in [`crate::rbac::error`] and
//! converts into `TensorError` at the handler boundary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tensor_core::error::{ErrorContext, Result};
//!
//! fn load_snapshot(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).context("Failed to read grant snapshot")
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::rbac::error::{AggregationError, EvaluationError, StoreError};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

pub type Result<T> = std::result::Result<T, TensorError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes. Stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Access resolution (1000-1099)
    GrantStoreUnavailable,
    MalformedGrant,
    UserLookupFailed,
    OrganizationMismatch,
    Forbidden,

    // Persistence (2000-2099)
    DatabaseError,
    DatabaseUnavailable,
    RecordNotFound,
    InvalidJson,

    // Configuration (5000-5099)
    ConfigurationError,
    InvalidConfiguration,

    // Internal (9000-9099)
    InternalError,
}

impl ErrorCode {
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::GrantStoreUnavailable => 1000,
            Self::MalformedGrant => 1001,
            Self::UserLookupFailed => 1002,
            Self::OrganizationMismatch => 1003,
            Self::Forbidden => 1030,

            Self::DatabaseError => 2000,
            Self::DatabaseUnavailable => 2001,
            Self::RecordNotFound => 2004,
            Self::InvalidJson => 2010,

            Self::ConfigurationError => 5000,
            Self::InvalidConfiguration => 5001,

            Self::InternalError => 9000,
        }
    }

    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RecordNotFound => StatusCode::NOT_FOUND,
            Self::GrantStoreUnavailable | Self::DatabaseUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::MalformedGrant
            | Self::UserLookupFailed
            | Self::OrganizationMismatch
            | Self::DatabaseError
            | Self::InvalidJson
            | Self::ConfigurationError
            | Self::InvalidConfiguration
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether retrying the whole request may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GrantStoreUnavailable | Self::UserLookupFailed | Self::DatabaseUnavailable
        )
    }

    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "access",
            2000..=2099 => "persistence",
            5000..=5099 => "configuration",
            _ => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Drives the log level an error is reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Denials and missing records
    Low,
    /// Transient lookups
    Medium,
    /// Store outages and corrupt grants
    High,
    Critical,
}

impl ErrorSeverity {
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::Forbidden | ErrorCode::RecordNotFound => Self::Low,
            ErrorCode::UserLookupFailed => Self::Medium,
            ErrorCode::GrantStoreUnavailable
            | ErrorCode::MalformedGrant
            | ErrorCode::OrganizationMismatch
            | ErrorCode::DatabaseError
            | ErrorCode::InvalidJson
            | ErrorCode::ConfigurationError
            | ErrorCode::InvalidConfiguration => Self::High,
            ErrorCode::DatabaseUnavailable | ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured details returned alongside the message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Resource, user or organization the error is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.context.is_empty() && self.entity_id.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The crate-wide error.
#[derive(Error, Debug)]
pub struct TensorError {
    code: ErrorCode,

    /// Safe to expose to callers
    user_message: Cow<'static, str>,

    /// Logged, never serialized
    internal_message: Option<String>,

    details: ErrorDetails,

    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl TensorError {
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::InternalError, "An internal error occurred", message)
    }

    /// The caller holds no grant for the requested capability.
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.details = self.details.with_context(key, value);
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    /// Log at the level the severity calls for. Denials stay at debug.
    pub fn log(&self) {
        let code = self.code.to_string();
        let entity = self.details.entity_id.as_deref().unwrap_or("-");

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::High => error!(
                error_code = %code,
                entity = entity,
                retryable = self.is_retryable(),
                internal_message = ?self.internal_message,
                source = ?self.source,
                "{}",
                self.user_message
            ),
            ErrorSeverity::Medium => warn!(
                error_code = %code,
                entity = entity,
                retryable = self.is_retryable(),
                "{}",
                self.user_message
            ),
            ErrorSeverity::Low => debug!(error_code = %code, entity = entity, "{}", self.user_message),
        }
    }

    fn record_metrics(&self) {
        counter!(
            "tensor_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub retryable: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&TensorError> for ErrorResponse {
    fn from(error: &TensorError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                details: (!error.details.is_empty()).then(|| error.details.clone()),
                retryable: error.is_retryable(),
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

impl IntoResponse for TensorError {
    fn into_response(self) -> Response {
        self.log();
        (self.http_status(), Json(ErrorResponse::from(&self))).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Attach a message to a foreign error or a missing value.
pub trait ErrorContext<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| TensorError::internal(message.into()).with_source(e))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| TensorError::new(ErrorCode::RecordNotFound, message.into()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════════════

impl From<EvaluationError> for TensorError {
    fn from(error: EvaluationError) -> Self {
        let code = match &error {
            EvaluationError::StoreUnavailable(_) => ErrorCode::GrantStoreUnavailable,
            EvaluationError::MalformedGrant { .. } => ErrorCode::MalformedGrant,
        };
        // Either way the caller cannot tell whether access exists.
        Self::with_internal(code, "Unable to verify access", error.to_string())
            .with_context("source", error.source_label())
            .with_source(error)
    }
}

impl From<AggregationError> for TensorError {
    fn from(error: AggregationError) -> Self {
        let (code, details) = match &error {
            AggregationError::Grant(inner) => return inner.clone().into(),
            AggregationError::UserLookupFailed { user_id, .. } => (
                ErrorCode::UserLookupFailed,
                ErrorDetails::new().with_entity("user", user_id.as_str()),
            ),
            AggregationError::OrganizationMismatch { organization_id, .. } => (
                ErrorCode::OrganizationMismatch,
                ErrorDetails::new().with_entity("organization", organization_id.as_str()),
            ),
        };
        Self::with_internal(code, "Unable to build access list", error.to_string())
            .with_details(details)
            .with_source(error)
    }
}

impl From<StoreError> for TensorError {
    fn from(error: StoreError) -> Self {
        let (code, user_msg) = match &error {
            StoreError::NotFound(_) => (ErrorCode::RecordNotFound, "The requested record was not found"),
            StoreError::Unavailable(_) => (ErrorCode::GrantStoreUnavailable, "The grant store is unavailable"),
        };
        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<sqlx::Error> for TensorError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => (ErrorCode::RecordNotFound, "The requested record was not found"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                (ErrorCode::DatabaseUnavailable, "The grant database is unavailable")
            }
            _ => (ErrorCode::DatabaseError, "A database error occurred"),
        };
        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<sqlx::migrate::MigrateError> for TensorError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::with_internal(ErrorCode::DatabaseError, "Database migration failed", error.to_string())
            .with_source(error)
    }
}

impl From<serde_json::Error> for TensorError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(ErrorCode::InvalidJson, "Failed to process JSON data", error.to_string())
            .with_source(error)
    }
}

impl From<std::io::Error> for TensorError {
    fn from(error: std::io::Error) -> Self {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::RecordNotFound,
            _ => ErrorCode::InternalError,
        };
        Self::with_internal(code, "An I/O error occurred", error.to_string()).with_source(error)
    }
}

impl From<anyhow::Error> for TensorError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<TensorError>() {
            Ok(tensor_error) => tensor_error,
            Err(error) => Self::internal(error.to_string()),
        }
    }
}

impl From<config::ConfigError> for TensorError {
    fn from(error: config::ConfigError) -> Self {
        let code = match &error {
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => {
                ErrorCode::InvalidConfiguration
            }
            _ => ErrorCode::ConfigurationError,
        };
        Self::with_internal(code, "Configuration could not be loaded", error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
