// Query/visibility: which records a role may see, plus dashboard narrowing

pub mod filters;

pub use filters::{visible_records, RecordFilter};
