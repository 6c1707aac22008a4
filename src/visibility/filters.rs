use std::collections::HashSet;

use crate::access::AccessPolicy;
use crate::domain::{Actor, PickingRecord, Status, UserId};

/// Project a record set down to what `actor` may see, keeping store order.
pub fn visible_records(
    policy: &AccessPolicy,
    actor: &Actor,
    all_records: Vec<PickingRecord>,
) -> Vec<PickingRecord> {
    all_records
        .into_iter()
        .filter(|record| policy.can_see(actor, record))
        .collect()
}

/// Dashboard narrowing applied after visibility. Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub statuses: HashSet<Status>,
    pub operators: HashSet<UserId>,
    /// Case-insensitive substring of the folio
    pub folio_contains: Option<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn with_operator(mut self, operator: UserId) -> Self {
        self.operators.insert(operator);
        self
    }

    pub fn with_folio_search(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        self.folio_contains = (!needle.trim().is_empty()).then(|| needle.trim().to_lowercase());
        self
    }

    pub fn matches(&self, record: &PickingRecord) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&record.status);
        let operator_ok = self.operators.is_empty()
            || record
                .assigned_operator
                .as_ref()
                .map(|op| self.operators.contains(op))
                .unwrap_or(false);
        let folio_ok = self
            .folio_contains
            .as_ref()
            .map(|needle| record.folio.as_str().to_lowercase().contains(needle.as_str()))
            .unwrap_or(true);

        status_ok && operator_ok && folio_ok
    }

    pub fn apply(&self, records: Vec<PickingRecord>) -> Vec<PickingRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
