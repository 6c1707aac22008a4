// Core types shared by the policy, state machine, import engine and stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PickingError;

/// Unique identifier of one picking work-item. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Folio(String);

impl Folio {
    /// Build a folio from raw text, trimming surrounding whitespace.
    /// Blank text is rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PickingError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PickingError::InvalidInput("folio must not be blank".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Folio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Folio {
    type Error = PickingError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Folio> for String {
    fn from(folio: Folio) -> Self {
        folio.0
    }
}

/// Identity of an authenticated user (a capturista or a responsable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PickingError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PickingError::InvalidInput(
                "user identity must not be blank".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = PickingError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<UserId> for String {
    fn from(user: UserId) -> Self {
        user.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Administrative role: full visibility, any status, reassignment, bulk import
    Responsable,
    /// Operator role: scoped to owned records and the operative statuses
    Capturista,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Responsable => "RESPONSABLE",
            Role::Capturista => "CAPTURISTA",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PickingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RESPONSABLE" => Ok(Role::Responsable),
            "CAPTURISTA" => Ok(Role::Capturista),
            other => Err(PickingError::UnknownRole(other.to_string())),
        }
    }
}

/// An authenticated (identity, role) pair. Authentication itself happens upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub identity: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(identity: UserId, role: Role) -> Self {
        Self { identity, role }
    }

    pub fn responsable(identity: &str) -> Result<Self, PickingError> {
        Ok(Self::new(UserId::new(identity)?, Role::Responsable))
    }

    pub fn capturista(identity: &str) -> Result<Self, PickingError> {
        Ok(Self::new(UserId::new(identity)?, Role::Capturista))
    }

    /// True when the record is assigned to this actor
    pub fn owns(&self, record: &PickingRecord) -> bool {
        record.assigned_operator.as_ref() == Some(&self.identity)
    }
}

/// Operational status of a picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    /// Freshly imported, not yet worked
    #[serde(rename = "PENDIENTE", alias = "PENDING")]
    Pending,
    #[serde(rename = "SURTIDO")]
    Surtido,
    #[serde(rename = "CAPTURADO")]
    Capturado,
    #[serde(rename = "EN_VALIDACION")]
    EnValidacion,
    #[serde(rename = "DOC_LISTA")]
    DocLista,
    /// Released by the administrative role
    #[serde(rename = "LIBERADO")]
    Liberado,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Pending,
        Status::Surtido,
        Status::Capturado,
        Status::EnValidacion,
        Status::DocLista,
        Status::Liberado,
    ];

    /// The statuses an operator may move between.
    pub const OPERATIVE: [Status; 4] = [
        Status::Surtido,
        Status::Capturado,
        Status::EnValidacion,
        Status::DocLista,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDIENTE",
            Status::Surtido => "SURTIDO",
            Status::Capturado => "CAPTURADO",
            Status::EnValidacion => "EN_VALIDACION",
            Status::DocLista => "DOC_LISTA",
            Status::Liberado => "LIBERADO",
        }
    }

    pub fn is_operative(&self) -> bool {
        Self::OPERATIVE.contains(self)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = PickingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDIENTE" | "PENDING" => Ok(Status::Pending),
            "SURTIDO" => Ok(Status::Surtido),
            "CAPTURADO" => Ok(Status::Capturado),
            "EN_VALIDACION" => Ok(Status::EnValidacion),
            "DOC_LISTA" => Ok(Status::DocLista),
            "LIBERADO" => Ok(Status::Liberado),
            other => Err(PickingError::UnknownStatus(other.to_string())),
        }
    }
}

/// Auxiliary columns carried through unchanged, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Vec<(String, String)>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a column, keeping the original position on overwrite
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (column, value) in iter {
            metadata.insert(column, value);
        }
        metadata
    }
}

/// One persisted picking.
///
/// `version` is owned by the store: it starts at 1 and is bumped on every
/// successful update. Writers pass the version they read so a concurrent edit
/// is detected instead of overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickingRecord {
    pub folio: Folio,
    pub status: Status,
    pub assigned_operator: Option<UserId>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default = "initial_version")]
    pub version: u64,
}

fn initial_version() -> u64 {
    1
}

impl PickingRecord {
    /// A newly created picking: pending and unassigned.
    pub fn pending(folio: Folio, metadata: Metadata) -> Self {
        Self {
            folio,
            status: Status::Pending,
            assigned_operator: None,
            metadata,
            version: initial_version(),
        }
    }

    /// Apply a field update in place. Does not touch the version.
    pub fn apply(&mut self, update: &RecordUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(operator) = &update.assigned_operator {
            self.assigned_operator = Some(operator.clone());
        }
    }
}

/// Mutable fields of a record. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub status: Option<Status>,
    pub assigned_operator: Option<UserId>,
}

impl RecordUpdate {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn assign(operator: UserId) -> Self {
        Self {
            assigned_operator: Some(operator),
            ..Default::default()
        }
    }
}

/// Human-readable note of an applied mutation, returned to the caller and logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub folio: Folio,
    pub description: String,
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn status_changed(folio: &Folio, status: Status, actor: &UserId) -> Self {
        Self {
            folio: folio.clone(),
            description: format!("Status changed to {status} by {actor}"),
            actor: actor.clone(),
            at: Utc::now(),
        }
    }

    pub fn reassigned(folio: &Folio, operator: &UserId, actor: &UserId) -> Self {
        Self {
            folio: folio.clone(),
            description: format!("Reassigned to {operator} by {actor}"),
            actor: actor.clone(),
            at: Utc::now(),
        }
    }
}
