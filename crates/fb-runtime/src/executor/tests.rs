use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use super::*;
use crate::prompt::FixedAnswer;
use crate::runner::RunFailure;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Records the scratch file contents seen on each call and fails when the
/// contents match `fail_on`.
#[derive(Default)]
struct ScriptedRunner {
    calls: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl ScriptedRunner {
    fn failing_on(contents: &str) -> Self {
        Self {
            fail_on: Some(contents.to_string()),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryRunner for ScriptedRunner {
    async fn run(&self, file: &Path) -> Result<(), RunFailure> {
        let contents = std::fs::read_to_string(file).expect("scratch file must exist during run");
        self.calls.lock().unwrap().push(contents.clone());
        if self.fail_on.as_deref() == Some(contents.as_str()) {
            return Err(RunFailure::new("boom"));
        }
        Ok(())
    }
}

/// Cancels the run from inside the first invocation, like a signal arriving
/// while a query is in flight.
struct CancellingRunner {
    cancel: CancellationToken,
    calls: Mutex<usize>,
}

#[async_trait]
impl QueryRunner for CancellingRunner {
    async fn run(&self, _file: &Path) -> Result<(), RunFailure> {
        *self.calls.lock().unwrap() += 1;
        self.cancel.cancel();
        Ok(())
    }
}

fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn job(dir: &TempDir, start: &str, stop: &str, step: &str) -> BatchJob {
    BatchJob {
        template: Template::new("{{host}} {{START}} {{STOP}}").unwrap(),
        start: ts(start),
        stop: ts(stop),
        step: step.parse().unwrap(),
        scratch_path: dir.path().join("template.flux.fluxbatch.tmp"),
    }
}

fn hosts() -> Table {
    Table::parse("| host |\n|---|\n| web-1 |\n| web-2 |\n").unwrap()
}

fn executor<R: QueryRunner, C: Confirm>(
    job: BatchJob,
    runner: R,
    confirm: C,
) -> BatchExecutor<R, C, Vec<u8>> {
    BatchExecutor::new(job, runner, confirm, Progress::new(Vec::new(), false)).unwrap()
}

fn output<R: QueryRunner, C: Confirm>(exec: BatchExecutor<R, C, Vec<u8>>) -> String {
    String::from_utf8(exec.into_progress().into_inner()).unwrap()
}

const D1: &str = "2024-01-01T00:00:00.000000000Z";
const D3: &str = "2024-01-03T00:00:00.000000000Z";
const D5: &str = "2024-01-05T00:00:00.000000000Z";
const D6: &str = "2024-01-06T00:00:00.000000000Z";

// ---------------------------------------------------------------------------
// tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_row_runs_every_batch_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    let scratch = job.scratch_path.clone();
    let mut exec = executor(job, ScriptedRunner::default(), FixedAnswer(false));
    assert_eq!(exec.batches().len(), 2);

    let summary = exec.run_table(&hosts()).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            rows: 2,
            completed: 2,
            failed: 0,
            cancelled: false,
        }
    );
    assert!(summary.is_success());
    assert_eq!(
        exec.runner().calls(),
        vec![
            format!("web-1 {D1} {D3}"),
            format!("web-1 {D3} {D5}"),
            format!("web-2 {D1} {D3}"),
            format!("web-2 {D3} {D5}"),
        ]
    );
    assert!(!scratch.exists());

    let out = output(exec);
    assert_eq!(out.matches(" done").count(), 2);
    assert!(out.contains("row 1: Processing:"), "{out}");
    assert!(out.contains("row 2: Processing:"), "{out}");
}

#[tokio::test]
async fn failure_skips_rest_of_row_only() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-06T00:00:00Z", "2d");
    let scratch = job.scratch_path.clone();
    let runner = ScriptedRunner::failing_on(&format!("web-1 {D3} {D5}"));
    let mut exec = executor(job, runner, FixedAnswer(false));

    let table = hosts();
    let first = exec.run_row(1, &table.rows()[0]).await.unwrap();
    assert_eq!(
        first,
        RowOutcome::Failed {
            batch: 2,
            detail: "boom".to_string(),
        }
    );
    // Cleanup happens on the failure path too.
    assert!(!scratch.exists());

    let second = exec.run_row(2, &table.rows()[1]).await.unwrap();
    assert_eq!(second, RowOutcome::Completed { batches: 3 });

    assert_eq!(
        exec.runner().calls(),
        vec![
            format!("web-1 {D1} {D3}"),
            format!("web-1 {D3} {D5}"),
            format!("web-2 {D1} {D3}"),
            format!("web-2 {D3} {D5}"),
            format!("web-2 {D5} {D6}"),
        ]
    );
    let out = output(exec);
    assert!(out.contains(" failed: boom\n"), "{out}");
    assert_eq!(out.matches(" done").count(), 1);
}

#[tokio::test]
async fn failed_row_is_counted_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    let runner = ScriptedRunner::failing_on(&format!("web-1 {D1} {D3}"));
    let mut exec = executor(job, runner, FixedAnswer(false));

    let summary = exec.run_table(&hosts()).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());
    assert_eq!(exec.runner().calls().len(), 3);
}

#[tokio::test]
async fn declined_stale_scratch_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    std::fs::write(&job.scratch_path, "stale").unwrap();
    let scratch = job.scratch_path.clone();
    let mut exec = executor(job, ScriptedRunner::default(), FixedAnswer(false));

    assert!(exec.run_table(&hosts()).await.is_err());
    assert!(exec.runner().calls().is_empty());
    assert_eq!(std::fs::read_to_string(&scratch).unwrap(), "stale");
}

#[tokio::test]
async fn confirmed_stale_scratch_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    std::fs::write(&job.scratch_path, "stale").unwrap();
    let scratch = job.scratch_path.clone();
    let mut exec = executor(job, ScriptedRunner::default(), FixedAnswer(true));

    let summary = exec.run_table(&hosts()).await.unwrap();
    assert!(summary.is_success());
    assert!(exec.runner().calls().iter().all(|c| c != "stale"));
    assert!(!scratch.exists());
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut exec = executor(job, ScriptedRunner::default(), FixedAnswer(false)).with_cancel(cancel);

    let summary = exec.run_table(&hosts()).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.completed, 0);
    assert!(exec.runner().calls().is_empty());
}

#[tokio::test]
async fn cancellation_waits_for_running_batch() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-07T00:00:00Z", "2d");
    let scratch = job.scratch_path.clone();
    let cancel = CancellationToken::new();
    let runner = CancellingRunner {
        cancel: cancel.clone(),
        calls: Mutex::new(0),
    };
    let mut exec = executor(job, runner, FixedAnswer(false)).with_cancel(cancel);

    let table = hosts();
    let outcome = exec.run_row(1, &table.rows()[0]).await.unwrap();
    assert_eq!(outcome, RowOutcome::Cancelled { completed: 1 });
    assert_eq!(*exec.runner().calls.lock().unwrap(), 1);
    assert!(!scratch.exists());
}

#[tokio::test]
async fn cancelled_run_does_not_start_next_row() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-03T00:00:00Z", "2d");
    let cancel = CancellationToken::new();
    let runner = CancellingRunner {
        cancel: cancel.clone(),
        calls: Mutex::new(0),
    };
    let mut exec = executor(job, runner, FixedAnswer(false)).with_cancel(cancel);

    // Row 1 has a single batch, so it completes; row 2 sees the cancellation.
    let summary = exec.run_table(&hosts()).await.unwrap();
    assert_eq!(summary.completed, 1);
    assert!(summary.cancelled);
    assert_eq!(*exec.runner().calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn empty_range_completes_without_running() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-01T00:00:00Z", "2d");
    std::fs::write(&job.scratch_path, "stale").unwrap();
    // With nothing to run, the stale file is not even looked at.
    let mut exec = executor(job, ScriptedRunner::default(), FixedAnswer(false));

    assert!(exec.batches().is_empty());
    let summary = exec.run_table(&hosts()).await.unwrap();
    assert!(summary.is_success());
    assert!(exec.runner().calls().is_empty());
}

#[tokio::test]
async fn scratch_write_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    job.scratch_path = dir.path().join("missing-dir/template.flux.tmp");
    let mut exec = executor(job, ScriptedRunner::default(), FixedAnswer(false));

    assert!(exec.run_table(&hosts()).await.is_err());
    assert!(exec.runner().calls().is_empty());
}

/// Stands in for a terminal prompt that gives up when a signal cancels the
/// run while it waits.
struct InterruptedPrompt(CancellationToken);

impl Confirm for InterruptedPrompt {
    fn confirm(&mut self, _question: &str) -> std::io::Result<bool> {
        self.0.cancel();
        Err(std::io::Error::other("prompt cancelled"))
    }
}

#[tokio::test]
async fn signal_at_scratch_prompt_cancels_run() {
    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    std::fs::write(&job.scratch_path, "stale").unwrap();
    let scratch = job.scratch_path.clone();
    let cancel = CancellationToken::new();
    let mut exec = executor(job, ScriptedRunner::default(), InterruptedPrompt(cancel.clone()))
        .with_cancel(cancel);

    let summary = exec.run_table(&hosts()).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.completed, 0);
    assert!(exec.runner().calls().is_empty());
    assert_eq!(std::fs::read_to_string(&scratch).unwrap(), "stale");
    assert!(output(exec).contains(" cancelled\n"));
}

#[tokio::test]
async fn prompt_error_without_cancellation_is_fatal() {
    struct BrokenPrompt;
    impl Confirm for BrokenPrompt {
        fn confirm(&mut self, _question: &str) -> std::io::Result<bool> {
            Err(std::io::Error::other("terminal gone"))
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let job = job(&dir, "2024-01-01T00:00:00Z", "2024-01-05T00:00:00Z", "2d");
    std::fs::write(&job.scratch_path, "stale").unwrap();
    let mut exec = executor(job, ScriptedRunner::default(), BrokenPrompt);

    assert!(exec.run_table(&hosts()).await.is_err());
    assert!(exec.runner().calls().is_empty());
}
