//! Splitting a time range into contiguous batches.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use fb_config::{IntervalError, IntervalStep};

/// One half-open sub-range `[start, stop)` of the overall range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub start: DateTime<FixedOffset>,
    pub stop: DateTime<FixedOffset>,
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.stop.to_rfc3339())
    }
}

/// Plan the batches covering `[start, end)`.
///
/// The cursor starts at `start` and is advanced by `step`; the last batch is
/// clipped so that it stops exactly at `end`. An empty or inverted range
/// (`start >= end`) yields no batches.
pub fn plan_batches(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    step: &IntervalStep,
) -> Result<Vec<Batch>, IntervalError> {
    let mut batches = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = step.advance(cursor)?;
        let next = if next >= end { end } else { next };
        batches.push(Batch {
            start: cursor,
            stop: next,
        });
        cursor = next;
    }
    Ok(batches)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
