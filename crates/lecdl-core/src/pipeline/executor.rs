//! Generic task-graph executor.
//!
//! Per task: `Pending → (Cached | Running) → Complete`, or `Failed`. A task
//! whose item set is empty is complete without running. Sibling tasks are
//! independent and run up to `max_parallel` at a time on blocking threads.
//! Every task runs to an outcome; a failure never stops its siblings.

use anyhow::Result;
use std::sync::Arc;

use super::report::{GraphReport, TaskOutcome, TaskStatus};
use super::task::Task;

/// Result of actually running a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub bytes: u64,
    /// At least one item was cut short by its time limit.
    pub partial: bool,
}

/// Dispatches task kinds to real work.
pub trait TaskRunner: Send + Sync {
    /// Whether the task's artifacts already exist at their deterministic locations.
    fn is_complete(&self, task: &Task) -> Result<bool>;

    fn run(&self, task: &Task) -> Result<RunResult>;
}

/// Run every task and report the outcome of each, in input order.
pub async fn execute(
    tasks: Vec<Task>,
    runner: Arc<dyn TaskRunner>,
    max_parallel: usize,
) -> GraphReport {
    let max_parallel = max_parallel.max(1);
    let total = tasks.len();
    let mut outcomes: Vec<Option<TaskOutcome>> = vec![None; total];
    let mut identities: Vec<String> = Vec::with_capacity(total);
    let mut queue = tasks.into_iter().enumerate();
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while join_set.len() < max_parallel {
            let Some((idx, task)) = queue.next() else {
                break;
            };
            identities.push(task.identity.clone());
            if task.item_count() == 0 {
                tracing::debug!(task = %task.identity, "no items; complete");
                outcomes[idx] = Some(outcome(&task, TaskStatus::Empty, 0));
                continue;
            }
            let runner = Arc::clone(&runner);
            join_set.spawn_blocking(move || (idx, run_one(runner.as_ref(), &task)));
        }

        if join_set.is_empty() {
            break;
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        match res {
            Ok((idx, done)) => outcomes[idx] = Some(done),
            Err(e) => tracing::error!("task join: {}", e),
        }
    }

    let outcomes = outcomes
        .into_iter()
        .zip(identities)
        .map(|(done, identity)| {
            done.unwrap_or_else(|| TaskOutcome {
                identity,
                status: TaskStatus::Failed("task panicked".to_string()),
                bytes: 0,
            })
        })
        .collect();
    GraphReport { outcomes }
}

fn run_one(runner: &dyn TaskRunner, task: &Task) -> TaskOutcome {
    match runner.is_complete(task) {
        Ok(true) => {
            tracing::info!(task = %task.identity, kind = %task.kind, "cached; complete");
            return outcome(task, TaskStatus::Cached, 0);
        }
        Ok(false) => {}
        Err(e) => {
            tracing::warn!(task = %task.identity, "cache check failed: {:#}", e);
            return outcome(task, TaskStatus::Failed(format!("{e:#}")), 0);
        }
    }

    tracing::info!(task = %task.identity, kind = %task.kind, items = task.item_count(), "running");
    match runner.run(task) {
        Ok(result) => {
            tracing::info!(
                task = %task.identity,
                bytes = result.bytes,
                partial = result.partial,
                "complete"
            );
            outcome(
                task,
                TaskStatus::Complete {
                    partial: result.partial,
                },
                result.bytes,
            )
        }
        Err(e) => {
            tracing::warn!(task = %task.identity, "failed: {:#}", e);
            outcome(task, TaskStatus::Failed(format!("{e:#}")), 0)
        }
    }
}

fn outcome(task: &Task, status: TaskStatus, bytes: u64) -> TaskOutcome {
    TaskOutcome {
        identity: task.identity.clone(),
        status,
        bytes,
    }
}
