//! Errors raised while resolving access.
//!
//! Both the evaluator and the aggregator are fail-closed: none of these
//! errors is ever interpreted as a grant.

use thiserror::Error;

use super::models::{OrganizationId, UserId};

/// Failure reported by a [`UserDirectory`](super::store::UserDirectory) lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the permission evaluator and the grant store behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A read from the grant store failed.
    #[error("Grant store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stored grant data violates the role vocabulary.
    #[error("Malformed grant {value:?}: {reason}")]
    MalformedGrant { value: String, reason: String },
}

impl EvaluationError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    pub fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedGrant {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Short label used for log fields and metric labels.
    pub fn source_label(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::MalformedGrant { .. } => "malformed_grant",
        }
    }
}

impl From<StoreError> for EvaluationError {
    fn from(error: StoreError) -> Self {
        Self::StoreUnavailable(error.to_string())
    }
}

/// Errors from the access aggregator.
///
/// A summary is all-or-nothing: any of these aborts the whole call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("User lookup failed for {user_id}: {reason}")]
    UserLookupFailed { user_id: UserId, reason: String },

    /// The organization passed in does not own the resource.
    #[error("Resource belongs to organization {owner_id}, not {organization_id}")]
    OrganizationMismatch {
        organization_id: OrganizationId,
        owner_id: OrganizationId,
    },

    #[error(transparent)]
    Grant(#[from] EvaluationError),
}
