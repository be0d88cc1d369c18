//! Horizontal bar charts for result sets.

use super::format::{Align, clip, pad};
use crate::models::ResultSet;
use crate::models::query::{format_value, numeric_value};
use unicode_width::UnicodeWidthStr;

const MAX_BARS: usize = 50;
const BAR_WIDTH: usize = 40;
const MAX_LABEL_WIDTH: usize = 30;
const BAR_CHAR: char = '█';

/// Columns chosen to draw a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartColumns {
    /// `None` labels bars by row number
    pub label: Option<usize>,
    pub value: usize,
}

/// Pick the first numeric column as values and the first non-numeric column as labels.
///
/// A column is numeric when it has at least one non-null cell and every
/// non-null cell reads as a number.
pub fn chart_columns(result: &ResultSet) -> Option<ChartColumns> {
    let numeric: Vec<bool> = (0..result.columns.len())
        .map(|idx| is_numeric_column(result, idx))
        .collect();

    let value = numeric.iter().position(|n| *n)?;
    let label = numeric
        .iter()
        .enumerate()
        .find(|(idx, n)| *idx != value && !**n)
        .map(|(idx, _)| idx);

    Some(ChartColumns { label, value })
}

fn is_numeric_column(result: &ResultSet, idx: usize) -> bool {
    let mut seen = false;
    for row in &result.rows {
        match row.get(idx) {
            None | Some(serde_json::Value::Null) => continue,
            Some(value) => {
                if numeric_value(value).is_none() {
                    return false;
                }
                seen = true;
            }
        }
    }
    seen
}

/// Render a bar chart, or `None` when the result has no numeric column.
///
/// Negative values draw an empty bar. At most 50 rows are drawn.
pub fn render_bar_chart(result: &ResultSet) -> Option<String> {
    let columns = chart_columns(result)?;

    let bars: Vec<(String, f64, String)> = result
        .rows
        .iter()
        .enumerate()
        .take(MAX_BARS)
        .filter_map(|(row_idx, row)| {
            let cell = row.get(columns.value)?;
            let value = numeric_value(cell)?;
            let label = match columns.label {
                Some(idx) => row.get(idx).map(format_value).unwrap_or_default(),
                None => (row_idx + 1).to_string(),
            };
            let label = clip(&label.replace(['\n', '\r'], " "), MAX_LABEL_WIDTH);
            Some((label, value, format_value(cell)))
        })
        .collect();

    let max = bars.iter().map(|(_, v, _)| *v).fold(0.0_f64, f64::max);
    let label_width = bars.iter().map(|(l, _, _)| l.width()).max().unwrap_or(0);

    let value_name = &result.columns[columns.value].name;
    let mut output = match columns.label {
        Some(idx) => format!("{} by {}\n", value_name, result.columns[idx].name),
        None => format!("{} by row\n", value_name),
    };

    for (label, value, text) in &bars {
        let len = if max > 0.0 && *value > 0.0 {
            ((value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let bar: String = std::iter::repeat_n(BAR_CHAR, len).collect();
        output.push_str(&format!(
            "{} | {} {}\n",
            pad(label, label_width, Align::Left),
            bar,
            text
        ));
    }

    if result.row_count() > MAX_BARS {
        output.push_str(&format!(
            "(showing first {} of {} rows)\n",
            MAX_BARS,
            result.row_count()
        ));
    }

    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnMetadata;
    use serde_json::{Value as JsonValue, json};

    fn sales() -> ResultSet {
        ResultSet::new(
            vec![
                ColumnMetadata::new("region", "TEXT"),
                ColumnMetadata::new("total", "REAL"),
            ],
            vec![
                vec![json!("North"), json!(10)],
                vec![json!("South"), json!(5)],
                vec![json!("East"), JsonValue::Null],
            ],
        )
    }

    #[test]
    fn test_chart_columns() {
        assert_eq!(
            chart_columns(&sales()),
            Some(ChartColumns {
                label: Some(0),
                value: 1
            })
        );
    }

    #[test]
    fn test_decimal_strings_count_as_numeric() {
        let result = ResultSet::new(
            vec![
                ColumnMetadata::new("amount", "NUMERIC"),
                ColumnMetadata::new("name", "TEXT"),
            ],
            vec![vec![json!("12.50"), json!("a")]],
        );
        assert_eq!(
            chart_columns(&result),
            Some(ChartColumns {
                label: Some(1),
                value: 0
            })
        );
    }

    #[test]
    fn test_render_bar_chart() {
        let chart = render_bar_chart(&sales()).unwrap();
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "total by region");
        assert_eq!(lines[1], format!("North | {} 10", "█".repeat(40)));
        assert_eq!(lines[2], format!("South | {} 5", "█".repeat(20)));
        // null values are skipped
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_no_numeric_column() {
        let result = ResultSet::new(
            vec![ColumnMetadata::new("name", "TEXT")],
            vec![vec![json!("Alice")]],
        );
        assert!(render_bar_chart(&result).is_none());
        assert!(render_bar_chart(&ResultSet::default()).is_none());
    }

    #[test]
    fn test_row_number_labels() {
        let result = ResultSet::new(
            vec![ColumnMetadata::new("n", "INTEGER")],
            vec![vec![json!(0)], vec![json!(-3)]],
        );
        let chart = render_bar_chart(&result).unwrap();
        assert!(chart.starts_with("n by row\n"));
        assert!(chart.contains("1 |  0\n"));
        assert!(chart.contains("2 |  -3\n"));
    }
}
