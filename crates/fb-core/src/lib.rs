pub mod plan;
pub mod table;
pub mod template;

pub use fb_config::{IntervalError, IntervalStep, IntervalUnit};
pub use plan::{Batch, plan_batches};
pub use table::{Row, Table, TableError};
pub use template::{Template, TemplateError, format_timestamp, unresolved_placeholders};
