#![allow(clippy::result_large_err)]
//! # Tensor Core
//!
//! Role-based access resolution for the Tensor operations console.
//!
//! ## Architecture
//!
//! - **Role Catalog**: organization and resource roles and their implied capabilities
//! - **Grant Store**: read-only adapters over recorded role assignments (in-memory, PostgreSQL)
//! - **Permission Evaluator**: `can_access` for one user, resource and capability
//! - **Access Aggregator**: access-list summaries of who holds which grant
//! - **Telemetry**: structured logging with JSON, pretty and compact formats

pub mod config;
pub mod db;
pub mod error;
pub mod rbac;
pub mod telemetry;

pub use error::{ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result, TensorError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AccessConfig, Config, DatabaseConfig};
    pub use crate::db::Database;
    pub use crate::error::{ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result, TensorError};
    pub use crate::rbac::{
        AccessAggregator, AccessControlled, AccessDecision, AccessSummary, AggregationError,
        Capability, Credential, EvaluationError, EvaluatorConfig, GrantPath, GrantStore,
        InMemoryGrantStore, Inventory, JobTemplate, Organization, OrganizationId,
        OrganizationRole, PermissionEvaluator, Project, ResourceId, ResourceKind, ResourceRole,
        RoleAssignment, Team, TeamId, TerraformJobTemplate, User, UserDirectory, UserId,
    };
    pub use crate::telemetry::{init_logging, LogFormat, LoggingConfig};
}
