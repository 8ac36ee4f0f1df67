pub mod batcher;
pub mod logging;
pub mod types;
mod validate;

pub use batcher::{BatchSection, BatcherConfig, PromptConfig, RunnerConfig};
pub use logging::{LogFormat, LoggingConfig};
pub use types::{IntervalError, IntervalStep, IntervalUnit};
