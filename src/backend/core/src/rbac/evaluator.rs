//! Permission evaluator.
//!
//! Answers "may user U exercise capability C on resource R?" for every
//! resource kind. Checks run cheapest first and stop at the first grant:
//!
//! 1. superuser flag
//! 2. system auditor flag (read only)
//! 3. organization role of the owning organization
//! 4. direct grant on the resource
//! 5. team grant on the resource, checked against current team membership
//!
//! A store failure is returned as an error and never treated as a grant.

use futures::stream::{self, StreamExt};
use metrics::counter;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use super::error::EvaluationError;
use super::models::{GranteeRef, OrganizationId, TeamId, User};
use super::resources::AccessControlled;
use super::roles::{Capability, OrganizationRole, ResourceRole};
use super::store::GrantStore;
use crate::error::{ErrorDetails, TensorError};

// ═══════════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// Evaluator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Team membership lookups allowed in flight for one evaluation.
    pub team_check_concurrency: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            team_check_concurrency: 8,
        }
    }
}

impl From<&crate::config::AccessConfig> for EvaluatorConfig {
    fn from(config: &crate::config::AccessConfig) -> Self {
        Self {
            team_check_concurrency: config.team_check_concurrency,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════════════════════════

/// The path through which access was granted, or `Denied`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantPath {
    SuperUser,
    SystemAuditor,
    Organization(OrganizationRole),
    Direct(ResourceRole),
    Team { team_id: TeamId, role: ResourceRole },
    Denied,
}

impl GrantPath {
    pub fn is_granted(&self) -> bool {
        !matches!(self, Self::Denied)
    }

    /// Short label used for log fields and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SuperUser => "superuser",
            Self::SystemAuditor => "system_auditor",
            Self::Organization(_) => "organization",
            Self::Direct(_) => "direct",
            Self::Team { .. } => "team",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for GrantPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuperUser => f.write_str("superuser"),
            Self::SystemAuditor => f.write_str("system auditor"),
            Self::Organization(role) => write!(f, "organization {}", role),
            Self::Direct(role) => write!(f, "direct {}", role),
            Self::Team { team_id, role } => write!(f, "team {} ({})", team_id, role),
            Self::Denied => f.write_str("denied"),
        }
    }
}

/// Outcome of a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub capability: Capability,
    pub path: GrantPath,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        self.path.is_granted()
    }

    pub fn is_denied(&self) -> bool {
        !self.is_allowed()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Evaluator
// ═══════════════════════════════════════════════════════════════════════════════

/// Decides single capability questions against a [`GrantStore`].
///
/// Stateless between calls; one instance is shared by every request.
pub struct PermissionEvaluator<S: GrantStore + ?Sized> {
    store: Arc<S>,
    config: EvaluatorConfig,
}

impl<S: GrantStore + ?Sized> Clone for PermissionEvaluator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: GrantStore + ?Sized> PermissionEvaluator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EvaluatorConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: EvaluatorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate and report which path granted access.
    pub async fn decide<R>(
        &self,
        user: &User,
        resource: &R,
        capability: Capability,
    ) -> Result<AccessDecision, EvaluationError>
    where
        R: AccessControlled + ?Sized,
    {
        match self.resolve(user, resource, capability).await {
            Ok(path) => {
                debug!(
                    user_id = %user.id,
                    resource_type = resource.kind().as_str(),
                    resource_id = %resource.id(),
                    capability = %capability,
                    path = %path,
                    "Access evaluated"
                );
                counter!(
                    "access_decisions_total",
                    "capability" => capability.as_str(),
                    "path" => path.label(),
                )
                .increment(1);
                Ok(AccessDecision { capability, path })
            }
            Err(err) => {
                error!(
                    user_id = %user.id,
                    resource_type = resource.kind().as_str(),
                    resource_id = %resource.id(),
                    capability = %capability,
                    backend = self.store.name(),
                    error = %err,
                    "Access evaluation failed, denying"
                );
                counter!(
                    "access_evaluation_failures_total",
                    "source" => err.source_label(),
                    "backend" => self.store.name(),
                )
                .increment(1);
                Err(err)
            }
        }
    }

    /// `true` if any path grants `capability`.
    pub async fn can_access<R>(
        &self,
        user: &User,
        resource: &R,
        capability: Capability,
    ) -> Result<bool, EvaluationError>
    where
        R: AccessControlled + ?Sized,
    {
        Ok(self.decide(user, resource, capability).await?.is_allowed())
    }

    /// Convenience for handlers: `Ok(())` if allowed, `Forbidden` if denied.
    pub async fn enforce<R>(
        &self,
        user: &User,
        resource: &R,
        capability: Capability,
    ) -> Result<(), TensorError>
    where
        R: AccessControlled + ?Sized,
    {
        let decision = self.decide(user, resource, capability).await?;
        if decision.is_allowed() {
            return Ok(());
        }

        let kind = resource.kind();
        Err(TensorError::forbidden(format!(
            "You do not have {} access to this {}",
            capability,
            kind.noun()
        ))
        .with_details(ErrorDetails::new().with_entity(kind.as_str(), resource.id().as_str())))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution steps
    // ─────────────────────────────────────────────────────────────────────────

    async fn resolve<R>(
        &self,
        user: &User,
        resource: &R,
        capability: Capability,
    ) -> Result<GrantPath, EvaluationError>
    where
        R: AccessControlled + ?Sized,
    {
        if user.is_super_user {
            return Ok(GrantPath::SuperUser);
        }
        if capability == Capability::Read && user.is_system_auditor {
            return Ok(GrantPath::SystemAuditor);
        }

        if let Some(role) = self
            .organization_grant(user, resource.organization_id(), capability)
            .await?
        {
            return Ok(GrantPath::Organization(role));
        }

        let kind = resource.kind();
        let mut seen = HashSet::new();
        let mut candidate_teams = Vec::new();
        for assignment in resource.roles() {
            kind.ensure_supported(assignment.role)?;
            if !assignment.role.implies(capability) {
                continue;
            }
            match assignment.grantee() {
                GranteeRef::User(id) if id == user.id => {
                    return Ok(GrantPath::Direct(assignment.role));
                }
                GranteeRef::User(_) => {}
                GranteeRef::Team(team_id) => {
                    if seen.insert(team_id.clone()) {
                        candidate_teams.push((team_id, assignment.role));
                    }
                }
            }
        }

        self.team_grant(user, candidate_teams).await
    }

    /// Organization roles that satisfy `capability`. Only admin counts for
    /// use and write.
    fn organization_roles_for(capability: Capability) -> &'static [OrganizationRole] {
        match capability {
            Capability::Read => &[
                OrganizationRole::Admin,
                OrganizationRole::Member,
                OrganizationRole::Auditor,
            ],
            Capability::Use | Capability::Write => &[OrganizationRole::Admin],
        }
    }

    async fn organization_grant(
        &self,
        user: &User,
        organization_id: &OrganizationId,
        capability: Capability,
    ) -> Result<Option<OrganizationRole>, EvaluationError> {
        for role in Self::organization_roles_for(capability) {
            if self
                .store
                .is_user_in_org_with_role(&user.id, organization_id, *role)
                .await?
            {
                return Ok(Some(*role));
            }
        }
        Ok(None)
    }

    /// Check candidate teams with bounded concurrency. Results are consumed
    /// in candidate order, so the outcome equals a sequential scan.
    async fn team_grant(
        &self,
        user: &User,
        candidates: Vec<(TeamId, ResourceRole)>,
    ) -> Result<GrantPath, EvaluationError> {
        if candidates.is_empty() {
            return Ok(GrantPath::Denied);
        }

        let store = &self.store;
        let user_id = &user.id;
        let mut checks = stream::iter(candidates.into_iter().map(|(team_id, role)| async move {
            let members = store.team_members(&team_id).await?;
            Ok::<_, EvaluationError>((members.contains(user_id), team_id, role))
        }))
        .buffered(self.config.team_check_concurrency.max(1));

        // Returning drops the stream and cancels lookups still in flight.
        while let Some(checked) = checks.next().await {
            let (is_member, team_id, role) = checked?;
            if is_member {
                return Ok(GrantPath::Team { team_id, role });
            }
        }

        Ok(GrantPath::Denied)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
