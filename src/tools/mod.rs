//! Helpers shared by the agents:
//! - `sql_validator`: SQL statement validation for read-only enforcement
//! - `format`: ASCII table rendering of result sets
//! - `chart`: horizontal bar charts

pub mod chart;
pub mod format;
pub mod sql_validator;

pub use chart::render_bar_chart;
pub use format::format_as_table;
pub use sql_validator::{looks_like_sql, validate_readonly};
