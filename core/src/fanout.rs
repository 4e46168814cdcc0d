//! Concurrent fan-out over many tasks with per-task failure isolation.

use crate::error::{TaskFailure, ToolError};
use crate::runner::run;
use crate::task::{TaskResult, TaskSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// Merged output of a fan-out run. `lines` are in completion order: whichever task
/// finished first contributes first. Failed tasks contribute no lines.
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    pub lines: Vec<String>,
    pub failures: Vec<TaskFailure>,
    pub tasks: usize,
    by_index: BTreeMap<usize, Vec<String>>,
}

impl FanOutReport {
    /// True when no task produced usable output (including when there were no tasks).
    pub fn all_failed(&self) -> bool {
        self.failures.len() == self.tasks
    }

    /// Output of one successful task, by its position in the input; empty if it failed.
    pub fn lines_of(&self, index: usize) -> &[String] {
        self.by_index.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keep the merged lines alongside partial failures, or surface an aggregate
    /// failure when every contributing tool failed.
    pub fn into_findings(self) -> Result<Findings<Vec<String>>, ToolError> {
        if self.all_failed() {
            return Err(ToolError::AllToolsFailed(self.failures));
        }
        Ok(Findings { results: self.lines, failures: self.failures })
    }
}

/// Results of a feature operation together with the tools that failed along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Findings<T> {
    pub results: T,
    pub failures: Vec<TaskFailure>,
}

impl<T> Findings<T> {
    pub fn new(results: T) -> Self {
        Findings { results, failures: Vec::new() }
    }

    pub fn with_failures(mut self, more: impl IntoIterator<Item = TaskFailure>) -> Self {
        self.failures.extend(more);
        self
    }
}

/// Run every task at once.
pub async fn run_all(specs: Vec<TaskSpec>) -> FanOutReport {
    let n = specs.len();
    run_all_bounded(specs, n).await
}

/// Run tasks concurrently with at most `limit` processes alive at a time. One task's
/// failure or timeout never cancels its siblings.
pub async fn run_all_bounded(specs: Vec<TaskSpec>, limit: usize) -> FanOutReport {
    let tasks = specs.len();
    let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
    let sem = Arc::new(Semaphore::new(limit.max(1)));
    let (tx, mut rx) = mpsc::channel::<(usize, TaskResult)>(tasks.max(1));

    for (index, spec) in specs.into_iter().enumerate() {
        let tx = tx.clone();
        let sem = sem.clone();
        tokio::spawn(async move {
            let _permit = sem.acquire_owned().await;
            let result = run(spec).await;
            let _ = tx.send((index, result)).await;
        });
    }
    drop(tx);

    let mut report = FanOutReport { tasks, ..FanOutReport::default() };
    let mut reported = vec![false; tasks];
    while let Some((index, result)) = rx.recv().await {
        reported[index] = true;
        let name = result.name.clone();
        let duration_ms = result.duration_ms;
        let stderr = result.stderr.clone();
        match result.into_lines() {
            Ok(lines) => {
                report.lines.extend(lines.iter().cloned());
                report.by_index.insert(index, lines);
            }
            Err(error) => {
                warn!(task = %name, index, duration_ms, %error, "task failed");
                if !stderr.is_empty() {
                    debug!(task = %name, %stderr, "stderr of failed task");
                }
                report.failures.push(TaskFailure { index, name, error });
            }
        }
    }
    for (index, seen) in reported.into_iter().enumerate() {
        if !seen {
            let name = names[index].clone();
            warn!(task = %name, index, "task vanished without a result");
            report.failures.push(TaskFailure { index, name: name.clone(), error: ToolError::Aborted { tool: name } });
        }
    }
    info!(tasks, lines = report.lines.len(), failed = report.failures.len(), "fan-out complete");
    report
}
