// Status workflow: legal statuses and who may move a picking between them

pub mod state_machine;

pub use state_machine::{StatusStateMachine, TransitionPlan};
