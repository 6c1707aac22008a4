// Picking Control Library - workflow integrity for warehouse picking records
// This exposes the core components for testing and integration

pub mod access;
pub mod config;
pub mod domain;
pub mod error;
pub mod import;
pub mod observability;
pub mod scans;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod visibility;
pub mod workflows;

// Re-export key types for easy access
pub use access::{AccessPolicy, Action, Capabilities, Decision, RecordScope};
pub use config::{PickingControlConfig, StoreBackend};
pub use domain::{Actor, AuditEvent, Folio, Metadata, PickingRecord, RecordUpdate, Role, Status, UserId};
pub use error::{DuplicateReason, PickingError};
pub use import::{reconcile, rows_from_json, ImportReport, ImportRow, RowOutcome, RowReport};
pub use observability::{workflow_metrics, OperationTimer, WorkflowMetrics};
pub use scans::{parse_qr, ScanRecord};
pub use service::{PickingService, ReassignOutcome, TransitionOutcome};
pub use store::{InMemoryRecordStore, JsonFileStore, RecordStore, RetryPolicy, ScanStore, StoreError};
#[cfg(feature = "database")]
pub use store::SqliteRecordStore;
pub use telemetry::{create_operation_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use visibility::{visible_records, RecordFilter};
pub use workflows::{StatusStateMachine, TransitionPlan};
