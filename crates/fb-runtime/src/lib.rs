#[macro_use]
mod log_macros;

pub mod error;
pub mod executor;
pub mod progress;
pub mod prompt;
pub mod runner;
pub mod scratch;
pub mod signal;
pub mod tracing_init;
