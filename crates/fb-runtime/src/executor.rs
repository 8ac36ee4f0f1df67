//! The sequential batch loop.
//!
//! For every table row the full batch plan is executed in order:
//!
//! ```text
//! row:    acquire scratch ── batch 1 ── batch 2 ── … ── batch n ── release scratch
//! batch:  render → write scratch → run (wait) → report progress
//! ```
//!
//! A runner failure ends the current row only. A declined scratch deletion or
//! a scratch I/O error ends the whole run. Cancellation is checked before each
//! batch; a running query is never interrupted.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use fb_core::{Batch, IntervalStep, Row, Table, Template, plan_batches, unresolved_placeholders};
use orion_error::ErrorOweBase;
use orion_error::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};
use crate::progress::Progress;
use crate::prompt::Confirm;
use crate::runner::QueryRunner;
use crate::scratch::{ScratchError, ScratchFile};

/// Everything that stays fixed across rows.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub template: Template,
    pub start: DateTime<FixedOffset>,
    pub stop: DateTime<FixedOffset>,
    pub step: IntervalStep,
    pub scratch_path: PathBuf,
}

/// How one row ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Completed { batches: usize },
    /// `batch` is the 1-based index of the failing batch.
    Failed { batch: usize, detail: String },
    /// Stopped before batch `completed + 1`.
    Cancelled { completed: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled && self.completed == self.rows
    }
}

pub struct BatchExecutor<R, C, W> {
    job: BatchJob,
    batches: Vec<Batch>,
    runner: R,
    confirm: C,
    progress: Progress<W>,
    cancel: CancellationToken,
}

impl<R, C, W> BatchExecutor<R, C, W>
where
    R: QueryRunner,
    C: Confirm,
    W: Write,
{
    /// Plan the batches once; every row reuses the same plan.
    pub fn new(job: BatchJob, runner: R, confirm: C, progress: Progress<W>) -> RuntimeResult<Self> {
        let batches = plan_batches(job.start, job.stop, &job.step).owe(RuntimeReason::Plan)?;
        fb_info!(
            exec,
            start = %job.start,
            stop = %job.stop,
            interval = %job.step,
            batches = batches.len(),
            "batch plan ready"
        );
        Ok(Self {
            job,
            batches,
            runner,
            confirm,
            progress,
            cancel: CancellationToken::new(),
        })
    }

    /// Use `cancel` to stop the run between batches.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn into_progress(self) -> Progress<W> {
        self.progress
    }

    /// Run every row of `table` in file order.
    ///
    /// Failed rows are counted and skipped past; the first fatal error or a
    /// cancellation stops the run.
    pub async fn run_table(&mut self, table: &Table) -> RuntimeResult<RunSummary> {
        let mut summary = RunSummary {
            rows: table.rows().len(),
            ..RunSummary::default()
        };
        if self.batches.is_empty() {
            fb_warn!(
                exec,
                start = %self.job.start,
                stop = %self.job.stop,
                "time range is empty, no batches to run"
            );
        }

        for (idx, row) in table.rows().iter().enumerate() {
            match self.run_row(idx + 1, row).await? {
                RowOutcome::Completed { .. } => summary.completed += 1,
                RowOutcome::Failed { .. } => summary.failed += 1,
                RowOutcome::Cancelled { .. } => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        fb_info!(
            exec,
            rows = summary.rows,
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "run finished"
        );
        Ok(summary)
    }

    /// Run all batches for one row. `index` is 1-based and only used for
    /// reporting.
    pub async fn run_row(&mut self, index: usize, row: &Row) -> RuntimeResult<RowOutcome> {
        let started = Instant::now();
        let total = self.batches.len();
        let range = Batch {
            start: self.job.start,
            stop: self.job.stop,
        };
        if total == 0 {
            self.progress.finish_row(index, total, &range, started.elapsed());
            return Ok(RowOutcome::Completed { batches: 0 });
        }

        let scratch = match ScratchFile::acquire(&self.job.scratch_path, &mut self.confirm) {
            Ok(scratch) => scratch,
            // A signal arrived while the prompt was waiting.
            Err(ScratchError::Prompt { .. }) if self.cancel.is_cancelled() => {
                self.progress.cancel_row();
                fb_warn!(exec, row = index, "row cancelled at scratch file prompt");
                return Ok(RowOutcome::Cancelled { completed: 0 });
            }
            Err(e) => return Err(scratch_error(e)),
        };
        fb_info!(exec, row = index, batches = total, "row started");

        for (i, batch) in self.batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.progress.cancel_row();
                fb_warn!(exec, row = index, completed = i, "row cancelled");
                return Ok(RowOutcome::Cancelled { completed: i });
            }

            let rendered = self.job.template.render(batch, row);
            if i == 0 {
                let unresolved = unresolved_placeholders(&rendered);
                if !unresolved.is_empty() {
                    fb_warn!(
                        exec,
                        row = index,
                        placeholders = ?unresolved,
                        "placeholders without a matching column are left as-is"
                    );
                }
            }
            scratch.write(&rendered).map_err(scratch_error)?;

            self.progress
                .update(index, i + 1, total, batch, started.elapsed());
            fb_debug!(exec, row = index, batch = i + 1, range = %batch, "running batch");

            if let Err(failure) = self.runner.run(scratch.path()).await {
                self.progress.fail_row(&failure.detail);
                fb_error!(
                    exec,
                    row = index,
                    batch = i + 1,
                    detail = %failure.detail,
                    "batch failed, skipping rest of row"
                );
                return Ok(RowOutcome::Failed {
                    batch: i + 1,
                    detail: failure.detail,
                });
            }
        }

        self.progress.finish_row(index, total, &range, started.elapsed());
        fb_info!(exec, row = index, batches = total, elapsed = ?started.elapsed(), "row completed");
        Ok(RowOutcome::Completed { batches: total })
    }
}

fn scratch_error(e: ScratchError) -> RuntimeError {
    let reason = match e {
        ScratchError::Declined { .. } => RuntimeReason::Declined,
        _ => RuntimeReason::Scratch,
    };
    StructError::from(reason).with_detail(e.to_string())
}

#[cfg(test)]
mod tests;
