use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::logging::LoggingConfig;
use crate::types::IntervalStep;
use crate::validate;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[batch]`: what to batch and where the inputs live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    /// Cursor increment between batches.
    pub interval: IntervalStep,
    /// Query template with `{{START}}`, `{{STOP}}` and `{{<header>}}` placeholders.
    pub template: PathBuf,
    /// Pipe-delimited table supplying one substitution row per pass.
    pub table: PathBuf,
    /// Appended to the template path to name the scratch file.
    pub scratch_suffix: String,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            interval: IntervalStep::default(),
            template: PathBuf::from("template.flux"),
            table: PathBuf::from("table.md"),
            scratch_suffix: ".fluxbatch.tmp".to_string(),
        }
    }
}

impl BatchSection {
    /// Path of the rendered-template scratch file, `<template><scratch_suffix>`.
    pub fn scratch_path(&self) -> PathBuf {
        let mut name = OsString::from(self.template.as_os_str());
        name.push(&self.scratch_suffix);
        PathBuf::from(name)
    }
}

/// `[runner]`: the external query binary. The scratch file path is appended
/// as the last argument.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "influx".to_string(),
            args: vec!["query".to_string(), "--file".to_string()],
        }
    }
}

/// `[prompt]`: interactive confirmation behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Delete a stale scratch file without asking.
    pub assume_yes: bool,
}

// ---------------------------------------------------------------------------
// BatcherConfig
// ---------------------------------------------------------------------------

/// Resolved, validated `fluxbatch.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    pub batch: BatchSection,
    pub runner: RunnerConfig,
    pub prompt: PromptConfig,
    pub logging: LoggingConfig,
}

impl BatcherConfig {
    /// Read and parse a `fluxbatch.toml` file.
    ///
    /// Relative `batch.template` and `batch.table` paths are resolved against
    /// the config file's parent directory.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let mut config: Self = content
            .parse()
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        if let Some(base_dir) = path.parent() {
            config.resolve_paths(base_dir);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        for p in [&mut self.batch.template, &mut self.batch.table] {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        }
    }

    /// Re-run validation after CLI overrides have been applied.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate::validate(self)
    }
}

impl FromStr for BatcherConfig {
    type Err = anyhow::Error;

    /// Parse a TOML string into a validated [`BatcherConfig`].
    fn from_str(toml_str: &str) -> anyhow::Result<Self> {
        let config: BatcherConfig = toml::from_str(toml_str)?;
        validate::validate(&config)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
