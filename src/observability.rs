use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Workflow counters, process-wide
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub transitions_applied: AtomicU64,
    pub transitions_noop: AtomicU64,
    pub reassignments: AtomicU64,
    pub authorization_denials: AtomicU64,
    pub invalid_transitions: AtomicU64,
    pub conflict_retries: AtomicU64,
    pub rows_inserted: AtomicU64,
    pub rows_skipped: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_transition(&self) {
        self.transitions_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_noop_transition(&self) {
        self.transitions_noop.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reassignment(&self) {
        self.reassignments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denial(&self) {
        self.authorization_denials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_transition(&self) {
        self.invalid_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict_retry(&self) {
        self.conflict_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_import(&self, inserted: usize, skipped: usize) {
        self.rows_inserted.fetch_add(inserted as u64, Ordering::Relaxed);
        self.rows_skipped.fetch_add(skipped as u64, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            transitions_applied: self.transitions_applied.load(Ordering::Relaxed),
            transitions_noop: self.transitions_noop.load(Ordering::Relaxed),
            reassignments: self.reassignments.load(Ordering::Relaxed),
            authorization_denials: self.authorization_denials.load(Ordering::Relaxed),
            invalid_transitions: self.invalid_transitions.load(Ordering::Relaxed),
            conflict_retries: self.conflict_retries.load(Ordering::Relaxed),
            rows_inserted: self.rows_inserted.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: transitions={}, noop={}, reassignments={}, denials={}, invalid={}, conflict_retries={}, inserted={}, skipped={}",
            stats.transitions_applied,
            stats.transitions_noop,
            stats.reassignments,
            stats.authorization_denials,
            stats.invalid_transitions,
            stats.conflict_retries,
            stats.rows_inserted,
            stats.rows_skipped
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStats {
    pub transitions_applied: u64,
    pub transitions_noop: u64,
    pub reassignments: u64,
    pub authorization_denials: u64,
    pub invalid_transitions: u64,
    pub conflict_retries: u64,
    pub rows_inserted: u64,
    pub rows_skipped: u64,
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<WorkflowMetrics> =
    std::sync::LazyLock::new(WorkflowMetrics::new);

pub fn workflow_metrics() -> &'static WorkflowMetrics {
    &WORKFLOW_METRICS
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = WorkflowMetrics::new();
        metrics.record_transition();
        metrics.record_transition();
        metrics.record_denial();
        metrics.record_import(3, 2);

        let stats = metrics.get_stats();
        assert_eq!(stats.transitions_applied, 2);
        assert_eq!(stats.authorization_denials, 1);
        assert_eq!(stats.rows_inserted, 3);
        assert_eq!(stats.rows_skipped, 2);
    }
}
