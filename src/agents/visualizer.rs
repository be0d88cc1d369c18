//! Rendering of the last result. Never touches the database.

use crate::models::ResultSet;
use crate::tools::{format_as_table, render_bar_chart};

#[derive(Debug, Clone, Copy, Default)]
pub struct Visualizer;

impl Visualizer {
    pub fn new() -> Self {
        Self
    }

    /// A bar chart when the result has a numeric column, otherwise a table.
    pub fn render(&self, result: &ResultSet) -> String {
        render_bar_chart(result).unwrap_or_else(|| format_as_table(result))
    }
}
