// Status state machine
//
// The legal moves live in the access policy's capability table; this module
// turns (actor, record, requested status) into a plan and tells apart an
// ownership failure from a disallowed status.

use crate::access::{AccessPolicy, Action};
use crate::domain::{Actor, PickingRecord, Status};
use crate::error::PickingError;
use crate::observability::workflow_metrics;

/// What applying a requested status would do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Requested status equals the current one; nothing to write
    NoChange { status: Status },
    Change { from: Status, to: Status },
}

impl TransitionPlan {
    pub fn target(&self) -> Status {
        match self {
            TransitionPlan::NoChange { status } => *status,
            TransitionPlan::Change { to, .. } => *to,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusStateMachine {
    policy: AccessPolicy,
}

impl StatusStateMachine {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Validate a status change against the record as freshly read.
    ///
    /// Ownership and role failures are `AuthorizationDenied`; a status outside
    /// the role's table is `InvalidTransition`. Repeating the current status is
    /// a no-op once both checks pass.
    pub fn plan(
        &self,
        actor: &Actor,
        record: &PickingRecord,
        requested: Status,
    ) -> Result<TransitionPlan, PickingError> {
        self.policy.ensure(actor, Action::SetStatus, Some(record))?;

        let from = record.status;
        if !self.policy.permits_status_change(actor.role, from, requested) {
            workflow_metrics().record_invalid_transition();
            tracing::warn!(
                actor = %actor.identity,
                role = %actor.role,
                folio = %record.folio,
                from = %from,
                to = %requested,
                "Invalid status transition"
            );
            return Err(PickingError::InvalidTransition {
                role: actor.role,
                from,
                to: requested,
            });
        }

        if from == requested {
            return Ok(TransitionPlan::NoChange { status: from });
        }
        Ok(TransitionPlan::Change {
            from,
            to: requested,
        })
    }

    /// Statuses the actor could move this record into right now
    pub fn available_targets(&self, actor: &Actor, record: &PickingRecord) -> Vec<Status> {
        if !self
            .policy
            .authorize(actor, Action::SetStatus, Some(record))
            .is_allowed()
        {
            return Vec::new();
        }
        Status::ALL
            .into_iter()
            .filter(|to| self.policy.permits_status_change(actor.role, record.status, *to))
            .collect()
    }
}
