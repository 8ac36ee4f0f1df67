//! Domain-tagged logging macros.
//!
//! Every event carries a `domain` field so that plain-text output can show a
//! `[domain]` prefix and JSON consumers can filter on it. Domains in use:
//!
//! - `sys`: process lifecycle, signals
//! - `conf`: configuration and input loading
//! - `exec`: rows, batches and runner invocations
//! - `io`: scratch file handling
//!
//! ```ignore
//! fb_info!(exec, row = 1, batches = 12, "row started");
//! fb_warn!(io, path = %p.display(), error = %e, "scratch cleanup failed");
//! ```
//!
//! The domain is a bare identifier, not a string literal.

#[doc(hidden)]
macro_rules! fb_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

macro_rules! fb_error {
    ($domain:ident, $($rest:tt)*) => {
        fb_log!(error, $domain, $($rest)*)
    };
}

macro_rules! fb_warn {
    ($domain:ident, $($rest:tt)*) => {
        fb_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! fb_info {
    ($domain:ident, $($rest:tt)*) => {
        fb_log!(info, $domain, $($rest)*)
    };
}

macro_rules! fb_debug {
    ($domain:ident, $($rest:tt)*) => {
        fb_log!(debug, $domain, $($rest)*)
    };
}
