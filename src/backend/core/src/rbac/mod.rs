//! Role-based access resolution for credentials, inventories, projects and
//! job templates.
//!
//! This module provides:
//! - **Role Catalog**: organization and resource roles and what each implies
//! - **Resources**: the `AccessControlled` capability every resource type exposes
//! - **Grant Store**: read-only view over recorded role assignments
//! - **Permission Evaluator**: single yes/no capability checks, team-transitive
//! - **Access Aggregator**: "who has access and why" listings, non-transitive
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tensor_core::rbac::{Capability, InMemoryGrantStore, PermissionEvaluator};
//!
//! let store = Arc::new(InMemoryGrantStore::new());
//! let evaluator = PermissionEvaluator::new(store);
//!
//! if evaluator.can_access(&user, &inventory, Capability::Write).await? {
//!     // update the inventory
//! }
//! ```

pub mod aggregator;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod resources;
pub mod roles;
pub mod store;

pub use aggregator::AccessAggregator;
pub use error::{AggregationError, EvaluationError, StoreError};
pub use evaluator::{AccessDecision, EvaluatorConfig, GrantPath, PermissionEvaluator};
pub use models::{
    AccessEntry, AccessRole, AccessSummary, GranteeRef, GranteeType, Organization,
    OrganizationId, ResourceId, RoleAssignment, Team, TeamId, User, UserId,
};
pub use resources::{
    AccessControlled, AnyResource, Credential, Inventory, JobTemplate, Project,
    TerraformJobTemplate,
};
pub use roles::{
    descendants, object_roles, Capability, OrganizationRole, ResourceKind, ResourceRole,
    RoleDescriptor, ScopedRole,
};
pub use store::{GrantStore, InMemoryGrantStore, UserDirectory};
