//! Placeholder substitution for query templates.
//!
//! A template is free text containing `{{START}}`, `{{STOP}}` and
//! `{{<header>}}` placeholders. Substitution is purely textual: there is no
//! escaping, nesting or conditional logic, and a placeholder that names
//! neither a reserved bound nor a table header is copied through untouched.

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::plan::Batch;
use crate::table::Row;

/// Replaced with the batch start.
pub const START_PLACEHOLDER: &str = "{{START}}";
/// Replaced with the batch stop.
pub const STOP_PLACEHOLDER: &str = "{{STOP}}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        if source.is_empty() {
            return Err(TemplateError::Empty);
        }
        Ok(Self { source })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute the batch bounds, then every header of `row`.
    ///
    /// Reserved placeholders are replaced first, so a header literally named
    /// `START` or `STOP` never shadows the batch bounds.
    pub fn render(&self, batch: &Batch, row: &Row) -> String {
        let mut out = self
            .source
            .replace(START_PLACEHOLDER, &format_timestamp(&batch.start))
            .replace(STOP_PLACEHOLDER, &format_timestamp(&batch.stop));
        for (header, value) in row.iter() {
            let placeholder = format!("{{{{{header}}}}}");
            out = out.replace(&placeholder, value);
        }
        out
    }
}

/// RFC 3339 with exactly nine fractional digits; UTC is written as `Z`.
///
/// ```text
/// 2024-01-01T00:00:00.000000000Z
/// 2024-01-01T00:00:00.500000000+02:00
/// ```
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Names of the `{{NAME}}` placeholders still present in `text`, in order of
/// first appearance, without duplicates.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            break;
        };
        let name = &after[..close];
        if name.is_empty() || name.contains(['{', '}', '\n']) {
            // Not a placeholder; resume right after this `{{`.
            rest = after;
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[close + 2..];
    }
    names
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
