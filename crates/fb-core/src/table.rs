//! Pipe-delimited substitution tables.
//!
//! ```text
//! | host  | bucket  |
//! |-------|---------|
//! | web-1 | metrics |
//! | web-2 | metrics |
//! ```
//!
//! The first line names the columns. The second line is decorative and is
//! skipped without being inspected. Every later non-blank line is a data row
//! and must have exactly as many cells as the header.

use std::path::Path;

use anyhow::Context;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("not enough lines for a table: found {found}, need a header and a separator line")]
    TooFewLines { found: usize },
    #[error("line {line} has {found} columns, expected {expected}")]
    RowArity {
        line: usize,
        found: usize,
        expected: usize,
    },
}

/// One data row: header/value pairs in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Pair `values` with `headers`.
    ///
    /// # Panics
    ///
    /// Panics if the two lengths differ. [`Table::parse`] rejects such rows
    /// before they get here, so a mismatch is a caller bug.
    pub fn new(headers: &[String], values: Vec<String>) -> Self {
        assert_eq!(
            headers.len(),
            values.len(),
            "value headers count doesn't match values count"
        );
        Self {
            cells: headers.iter().cloned().zip(values).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Read and parse a table file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading table {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing table {}", path.display()))
    }

    /// Parse table text.
    ///
    /// Leading and trailing whitespace of the whole text is dropped first;
    /// line numbers in [`TableError::RowArity`] count from the first
    /// remaining line.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let trimmed = text.trim();
        let lines: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.lines().collect()
        };
        if lines.len() < 2 {
            return Err(TableError::TooFewLines { found: lines.len() });
        }

        let headers = split_cells(lines[0]);
        let mut rows = Vec::new();
        for (idx, line) in lines.iter().enumerate().skip(2) {
            if line.trim().is_empty() {
                continue;
            }
            let values = split_cells(line);
            if values.len() != headers.len() {
                return Err(TableError::RowArity {
                    line: idx + 1,
                    found: values.len(),
                    expected: headers.len(),
                });
            }
            rows.push(Row::new(&headers, values));
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

/// Split `| a | b |` into `["a", "b"]`. One outer pipe is stripped from each
/// end; inner cells keep their position even when empty.
fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(|cell| cell.trim().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
