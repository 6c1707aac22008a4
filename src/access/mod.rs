// Access control: (role, action, record ownership) -> allow | deny

pub mod policy;

pub use policy::{AccessPolicy, Action, Capabilities, Decision, RecordScope};
