// Domain vocabulary: folios, users, roles, statuses and picking records

pub mod types;

pub use types::{
    Actor, AuditEvent, Folio, Metadata, PickingRecord, RecordUpdate, Role, Status, UserId,
};
