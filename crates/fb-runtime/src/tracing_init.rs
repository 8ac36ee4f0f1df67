use std::fmt::{self as stdfmt, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Result;
use fb_config::LoggingConfig;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// ---------------------------------------------------------------------------
// DomainFormat: `[domain]` prefix instead of a `domain=` field
// ---------------------------------------------------------------------------

/// Plain-text event formatter:
///
/// ```text
/// 2026-03-02T09:14:05Z  WARN [exec] batch failed row=2 batch=3 detail="..."
/// ```
///
/// Events without a `domain` field (from dependencies) are printed without
/// the prefix.
pub struct DomainFormat {
    timer: SystemTime,
}

impl DomainFormat {
    pub fn new() -> Self {
        Self { timer: SystemTime }
    }
}

impl Default for DomainFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for DomainFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> fmt::FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let ansi = writer.has_ansi_escapes();
        let paint = |code: &str, text: &dyn stdfmt::Display| {
            if ansi {
                format!("\x1b[{code}m{text}\x1b[0m")
            } else {
                text.to_string()
            }
        };

        let mut stamp = String::new();
        if self
            .timer
            .format_time(&mut fmt::format::Writer::new(&mut stamp))
            .is_err()
        {
            stamp.push_str("<unknown time>");
        }
        write!(writer, "{}", paint("2", &stamp))?;

        let level = *event.metadata().level();
        let color = match level {
            Level::ERROR => "31",
            Level::WARN => "33",
            Level::INFO => "32",
            Level::DEBUG => "34",
            Level::TRACE => "35",
        };
        write!(writer, " {} ", paint(color, &format_args!("{level:>5}")))?;

        let mut fields = FieldSplitter::default();
        event.record(&mut fields);

        if let Some(ref domain) = fields.domain {
            write!(writer, "{} ", paint("1;36", &format_args!("[{domain}]")))?;
        }
        write!(writer, "{}", fields.message)?;
        if !fields.rest.is_empty() {
            write!(writer, " {}", paint("3", &fields.rest))?;
        }
        writeln!(writer)
    }
}

// ---------------------------------------------------------------------------
// FieldSplitter: pulls `domain` and `message` out of an event's fields
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FieldSplitter {
    domain: Option<String>,
    message: String,
    rest: String,
}

impl FieldSplitter {
    fn push(&mut self, name: &str, value: stdfmt::Arguments<'_>) {
        if !self.rest.is_empty() {
            self.rest.push(' ');
        }
        write!(&mut self.rest, "{name}={value}").ok();
    }
}

impl Visit for FieldSplitter {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "domain" => self.domain = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => self.push(name, format_args!("{value:?}")),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        match field.name() {
            "domain" => {
                let s = format!("{value:?}");
                self.domain = Some(s.trim_matches('"').to_string());
            }
            "message" => {
                write!(&mut self.message, "{value:?}").ok();
            }
            name => self.push(name, format_args!("{value:?}")),
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field.name(), format_args!("{value}"));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field.name(), format_args!("{value}"));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field.name(), format_args!("{value}"));
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Install the global `tracing` subscriber described by `config`.
///
/// Events always go to stderr; with `logging.file` set they are also written
/// to that file through a non-blocking appender. The returned guard must be
/// held until exit so buffered file output is flushed.
///
/// `RUST_LOG`, when set, replaces the configured level and module overrides.
pub fn init_tracing(config: &LoggingConfig, base_dir: &Path) -> Result<Option<WorkerGuard>> {
    let json = config.is_json();
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stderr_layer: BoxedLayer = if json {
        fmt::layer()
            .json()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(build_filter(config)?)
            .boxed()
    } else {
        fmt::layer()
            .event_format(DomainFormat::new())
            .with_writer(std::io::stderr)
            .with_filter(build_filter(config)?)
            .boxed()
    };
    layers.push(stderr_layer);

    let mut guard = None;
    if let Some(ref file) = config.file {
        let path = resolve_log_path(file, base_dir);
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("log file path has no parent directory"))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("log file path has no file name"))?;
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("creating log directory {}: {e}", dir.display()))?;

        let (writer, file_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        guard = Some(file_guard);

        let file_layer: BoxedLayer = if json {
            fmt::layer()
                .json()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(build_filter(config)?)
                .boxed()
        } else {
            fmt::layer()
                .event_format(DomainFormat::new())
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(build_filter(config)?)
                .boxed()
        };
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}

/// `RUST_LOG` if set, otherwise `level` plus one `module=level` directive per
/// override.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }
    let directives = filter_directives(config);
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("invalid log filter '{directives}': {e}"))
}

fn filter_directives(config: &LoggingConfig) -> String {
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();
    let mut directives = config.level.clone();
    for (module, level) in modules {
        write!(&mut directives, ",{module}={level}").ok();
    }
    directives
}

fn resolve_log_path(file: &Path, base_dir: &Path) -> PathBuf {
    if file.is_relative() {
        base_dir.join(file)
    } else {
        file.to_path_buf()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
