// Role-based access policy
//
// Roles are rows in a capability table, not types. Adding a role means adding
// a row; nothing else in the crate needs to change shape.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::domain::{Actor, PickingRecord, Role, Status};
use crate::error::PickingError;
use crate::observability::workflow_metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewRecords,
    SetStatus,
    Reassign,
    BulkImport,
    RegisterScan,
    UpdateScan,
    DeleteScan,
    ViewScans,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewRecords => "view_records",
            Action::SetStatus => "set_status",
            Action::Reassign => "reassign",
            Action::BulkImport => "bulk_import",
            Action::RegisterScan => "register_scan",
            Action::UpdateScan => "update_scan",
            Action::DeleteScan => "delete_scan",
            Action::ViewScans => "view_scans",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which records a role may act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    All,
    /// Only records whose `assigned_operator` is the actor
    Owned,
}

/// One row of the capability table.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub actions: HashSet<Action>,
    pub scope: RecordScope,
    /// Statuses the role may move a record into
    pub target_statuses: HashSet<Status>,
    /// Statuses the role may move a record out of
    pub source_statuses: HashSet<Status>,
}

impl Capabilities {
    fn administrative() -> Self {
        Self {
            actions: [
                Action::ViewRecords,
                Action::SetStatus,
                Action::Reassign,
                Action::BulkImport,
                Action::RegisterScan,
                Action::UpdateScan,
                Action::DeleteScan,
                Action::ViewScans,
            ]
            .into_iter()
            .collect(),
            scope: RecordScope::All,
            target_statuses: Status::ALL.into_iter().collect(),
            source_statuses: Status::ALL.into_iter().collect(),
        }
    }

    fn operator() -> Self {
        Self {
            actions: [
                Action::ViewRecords,
                Action::SetStatus,
                Action::RegisterScan,
                Action::UpdateScan,
                Action::DeleteScan,
                Action::ViewScans,
            ]
            .into_iter()
            .collect(),
            scope: RecordScope::Owned,
            target_statuses: Status::OPERATIVE.into_iter().collect(),
            source_statuses: Status::OPERATIVE.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    table: HashMap<Role, Capabilities>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl AccessPolicy {
    /// The two-role table used in production
    pub fn standard() -> Self {
        let mut table = HashMap::new();
        table.insert(Role::Responsable, Capabilities::administrative());
        table.insert(Role::Capturista, Capabilities::operator());
        Self { table }
    }

    pub fn with_capabilities(mut self, role: Role, capabilities: Capabilities) -> Self {
        self.table.insert(role, capabilities);
        self
    }

    pub fn capabilities(&self, role: Role) -> Option<&Capabilities> {
        self.table.get(&role)
    }

    /// Pure decision: may `actor` perform `action`, optionally against `record`?
    pub fn authorize(
        &self,
        actor: &Actor,
        action: Action,
        record: Option<&PickingRecord>,
    ) -> Decision {
        let Some(caps) = self.table.get(&actor.role) else {
            return Decision::Deny(format!("role {} has no capabilities", actor.role));
        };

        if !caps.actions.contains(&action) {
            return Decision::Deny(format!("{} is not granted to {}", action, actor.role));
        }

        if let Some(record) = record {
            if caps.scope == RecordScope::Owned && !actor.owns(record) {
                return Decision::Deny(format!(
                    "folio {} is not assigned to {}",
                    record.folio, actor.identity
                ));
            }
        }

        Decision::Allow
    }

    /// `authorize` as a `Result`, logging and counting denials.
    pub fn ensure(
        &self,
        actor: &Actor,
        action: Action,
        record: Option<&PickingRecord>,
    ) -> Result<(), PickingError> {
        match self.authorize(actor, action, record) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                workflow_metrics().record_denial();
                tracing::warn!(
                    actor = %actor.identity,
                    role = %actor.role,
                    action = %action,
                    folio = record.map(|r| r.folio.as_str()),
                    reason = %reason,
                    "Authorization denied"
                );
                Err(PickingError::AuthorizationDenied {
                    actor: actor.identity.clone(),
                    role: actor.role,
                    action,
                    reason,
                })
            }
        }
    }

    /// Whether the record falls inside the actor's visibility scope
    pub fn can_see(&self, actor: &Actor, record: &PickingRecord) -> bool {
        self.authorize(actor, Action::ViewRecords, Some(record)).is_allowed()
    }

    /// Whether the role's status table permits `from -> to`
    pub fn permits_status_change(&self, role: Role, from: Status, to: Status) -> bool {
        self.table
            .get(&role)
            .map(|caps| caps.source_statuses.contains(&from) && caps.target_statuses.contains(&to))
            .unwrap_or(false)
    }
}
