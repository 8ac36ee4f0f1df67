use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use fb_config::{BatcherConfig, IntervalStep};
use fb_core::{Table, Template};
use fb_runtime::executor::{BatchExecutor, BatchJob};
use fb_runtime::progress::Progress;
use fb_runtime::prompt::{Confirm, FixedAnswer, LinePrompt};
use fb_runtime::runner::CommandRunner;
use fb_runtime::signal::wait_for_signal;
use fb_runtime::tracing_init::init_tracing;

#[derive(Parser)]
#[command(
    name = "fluxbatch",
    version,
    about = "Run a Flux query template over a time range in fixed-size batches"
)]
struct Cli {
    /// Start of the time range (RFC 3339, inclusive)
    #[arg(long, value_parser = parse_timestamp)]
    start: DateTime<FixedOffset>,

    /// End of the time range (RFC 3339, exclusive)
    #[arg(long, value_parser = parse_timestamp)]
    stop: DateTime<FixedOffset>,

    /// Batch size: <n><h|d|w|m|y> [default: 2d]
    #[arg(long)]
    interval: Option<IntervalStep>,

    /// Query template file [default: template.flux]
    #[arg(long)]
    template: Option<PathBuf>,

    /// Pipe-delimited table of substitution rows [default: table.md]
    #[arg(long)]
    table: Option<PathBuf>,

    /// Path to a fluxbatch.toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delete a stale scratch file without asking
    #[arg(short, long)]
    yes: bool,

    /// Query program to invoke [default: influx]
    #[arg(long)]
    runner: Option<String>,
}

fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

impl Cli {
    /// Load the config file if one was given and lay the CLI flags over it.
    fn resolve_config(&self) -> Result<(BatcherConfig, PathBuf)> {
        let (mut config, base_dir) = match &self.config {
            Some(path) => {
                let path = path
                    .canonicalize()
                    .with_context(|| format!("config path '{}'", path.display()))?;
                let config = BatcherConfig::load(&path)?;
                let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                (config, base_dir)
            }
            None => (
                BatcherConfig::default(),
                std::env::current_dir().context("resolving working directory")?,
            ),
        };

        if let Some(interval) = self.interval {
            config.batch.interval = interval;
        }
        if let Some(template) = &self.template {
            config.batch.template = template.clone();
        }
        if let Some(table) = &self.table {
            config.batch.table = table.clone();
        }
        if let Some(runner) = &self.runner {
            config.runner.program = runner.clone();
        }
        if self.yes {
            config.prompt.assume_yes = true;
        }
        config.validate()?;
        Ok((config, base_dir))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, base_dir) = cli.resolve_config()?;
    let _guard = init_tracing(&config.logging, &base_dir)?;

    let template_path = &config.batch.template;
    let source = std::fs::read_to_string(template_path)
        .with_context(|| format!("reading template {}", template_path.display()))?;
    let template =
        Template::new(source).with_context(|| format!("template {}", template_path.display()))?;
    let table = Table::load(&config.batch.table)?;
    tracing::info!(
        domain = "conf",
        template = %template_path.display(),
        table = %config.batch.table.display(),
        headers = table.headers().len(),
        rows = table.rows().len(),
        "inputs loaded"
    );

    let job = BatchJob {
        template,
        start: cli.start,
        stop: cli.stop,
        step: config.batch.interval,
        scratch_path: config.batch.scratch_path(),
    };
    let cancel = CancellationToken::new();
    tokio::spawn(wait_for_signal(cancel.clone()));

    let confirm: Box<dyn Confirm> = if config.prompt.assume_yes {
        Box::new(FixedAnswer(true))
    } else {
        Box::new(LinePrompt::stdio(cancel.clone()))
    };
    let runner = CommandRunner::new(&config.runner);

    let mut executor = BatchExecutor::new(job, runner, confirm, Progress::stdout())
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .with_cancel(cancel);
    let summary = executor
        .run_table(&table)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if summary.cancelled {
        bail!(
            "run cancelled after {} of {} rows",
            summary.completed + summary.failed,
            summary.rows
        );
    }
    if !summary.is_success() {
        bail!("{} of {} rows failed", summary.failed, summary.rows);
    }
    Ok(())
}
