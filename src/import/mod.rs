// Bulk import: row normalization, reconciliation against existing folios, reporting

pub mod reconcile;
pub mod report;
pub mod source;

pub use reconcile::{reconcile, Reconciliation, RowOutcome, RowReport};
pub use report::{ImportCounts, ImportReport};
pub use source::{rows_from_json, ImportRow, FOLIO_COLUMN};
