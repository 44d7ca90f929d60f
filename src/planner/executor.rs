//! Plan executor for submitting units of work.
//!
//! All units of a batch are polled concurrently on the current task. A
//! failing unit is logged and recorded; it never cancels its siblings.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::unit::{PlannedOperation, UnitOfWork};

/// Executor for batches of units of work.
#[derive(Debug, Default)]
pub struct PlanExecutor;

/// Outcome of one unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    /// What was attempted.
    #[serde(flatten)]
    pub operation: PlannedOperation,
    /// Failure message, if the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of executing one batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Identifier of this batch.
    pub run_id: Uuid,
    /// When the first unit was submitted.
    pub started_at: DateTime<Utc>,
    /// When the last unit finished.
    pub finished_at: DateTime<Utc>,
    /// Outcome of every unit, in submission order.
    pub outcomes: Vec<UnitOutcome>,
}

impl PlanExecutor {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs every unit concurrently and waits for all of them.
    pub async fn execute(&self, units: Vec<UnitOfWork<'_>>) -> BatchReport {
        if units.is_empty() {
            return BatchReport::empty();
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!("Submitting {} units of work (batch {run_id})", units.len());

        let (descriptions, calls): (Vec<_>, Vec<_>) =
            units.into_iter().map(UnitOfWork::into_parts).unzip();
        let results = join_all(calls).await;

        let outcomes: Vec<UnitOutcome> = descriptions
            .into_iter()
            .zip(results)
            .map(|(operation, result)| match result {
                Ok(()) => {
                    info!("{operation}: done");
                    UnitOutcome {
                        operation,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("{operation}: {e}");
                    UnitOutcome {
                        operation,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        info!(
            "Batch {run_id} finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}

impl UnitOutcome {
    /// Returns true if the call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl BatchReport {
    /// Returns an empty report for a batch that had nothing to do.
    #[must_use]
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
        }
    }

    /// Number of units executed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of units that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of units that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Returns the failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Returns the wall-clock duration of the batch.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::EntityKind;
    use crate::error::{CfConvergeError, PlatformError};
    use crate::planner::Operation;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn grant(username: &str, fail: bool, counter: Arc<AtomicUsize>) -> UnitOfWork<'static> {
        UnitOfWork::new(
            EntityKind::SpaceDevelopers,
            "",
            Operation::GrantSpaceDeveloper {
                username: username.to_string(),
            },
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(CfConvergeError::Platform(PlatformError::network("down")))
                } else {
                    Ok(())
                }
            },
        )
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let counter = Arc::new(AtomicUsize::new(0));
        let units = vec![
            grant("alice", false, Arc::clone(&counter)),
            grant("bob", true, Arc::clone(&counter)),
            grant("carol", false, Arc::clone(&counter)),
        ];

        let report = PlanExecutor::new().execute(units).await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);

        let failure = report.failures().next().unwrap();
        assert_eq!(
            failure.operation.operation,
            Operation::GrantSpaceDeveloper {
                username: String::from("bob"),
            }
        );
        assert!(failure.error.as_deref().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn test_units_are_lazy_until_executed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let units = vec![grant("alice", false, Arc::clone(&counter))];
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        drop(units);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = PlanExecutor::new().execute(Vec::new()).await;
        assert_eq!(report.total(), 0);
        assert_eq!(report.failed(), 0);
    }
}
