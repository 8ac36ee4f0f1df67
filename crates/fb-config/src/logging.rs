use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// `[logging]`: diagnostics only. Stdout belongs to the progress line, so
/// events always go to stderr and, optionally, to `file`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter, `warn` unless set. Per-batch events are `info`/`debug`
    /// and would otherwise interleave with the progress bar.
    pub level: String,
    /// `module = level` overrides, e.g. `fb_runtime::runner = "debug"`.
    pub modules: HashMap<String, String>,
    /// Relative to the config file's directory.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            modules: HashMap::new(),
            file: None,
            format: LogFormat::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `<time> <LEVEL> [domain] message key=value...`
    #[default]
    Plain,
    Json,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == LogFormat::Json
    }
}
