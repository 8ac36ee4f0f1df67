use std::io::{self, IsTerminal, Stdout, Write};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use fb_core::Batch;

const BAR_WIDTH: usize = 50;
const GREEN: &str = "\x1b[1;32m";
const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;38;5;208m";
const RESET: &str = "\x1b[0m";

/// Single-line progress display, redrawn with `\r` after every batch.
///
/// ```text
/// row 1: Processing: 2024-01-01T00:00:00Z → 2024-01-03T00:00:00Z [========================>                         ] 3/6  50% (12s)
/// ```
///
/// Writes are best-effort: a closed terminal must not abort a run.
pub struct Progress<W> {
    out: W,
    color: bool,
}

impl Progress<Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let color = out.is_terminal();
        Self::new(out, color)
    }
}

impl<W: Write> Progress<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    /// Redraw for batch `current` (1-based) of `total`.
    pub fn update(&mut self, row: usize, current: usize, total: usize, batch: &Batch, elapsed: Duration) {
        let line = render_line(row, current, total, batch, elapsed);
        let _ = write!(self.out, "\r{line}");
        let _ = self.out.flush();
    }

    /// Draw the row at 100% over its whole range and end the line.
    pub fn finish_row(&mut self, row: usize, total: usize, range: &Batch, elapsed: Duration) {
        let line = render_line(row, total, total, range, elapsed);
        let done = self.paint(GREEN, "done");
        let _ = writeln!(self.out, "\r{line} {done}");
    }

    /// End the current line with the runner's failure detail.
    pub fn fail_row(&mut self, detail: &str) {
        let failed = self.paint(RED, "failed:");
        let _ = writeln!(self.out, " {failed} {detail}");
    }

    pub fn cancel_row(&mut self) {
        let cancelled = self.paint(YELLOW, "cancelled");
        let _ = writeln!(self.out, " {cancelled}");
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn render_line(row: usize, current: usize, total: usize, batch: &Batch, elapsed: Duration) -> String {
    let ratio = if total == 0 {
        1.0
    } else {
        current as f64 / total as f64
    };
    format!(
        "row {row}: Processing: {} → {} [{}] {current}/{total} {:>3.0}% ({})",
        short_time(&batch.start),
        short_time(&batch.stop),
        bar(ratio),
        ratio * 100.0,
        format_elapsed(elapsed),
    )
}

fn bar(ratio: f64) -> String {
    let filled = ((ratio * BAR_WIDTH as f64) as usize).clamp(1, BAR_WIDTH);
    format!(
        "{}>{}",
        "=".repeat(filled - 1),
        " ".repeat(BAR_WIDTH - filled)
    )
}

fn short_time(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whole seconds in `1h2m3s` style: `0s`, `45s`, `2m0s`, `1h0m5s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
