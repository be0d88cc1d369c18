//! ASCII table rendering of result sets (like the MySQL CLI).

use crate::models::ResultSet;
use crate::models::query::format_value;
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Cells wider than this are clipped with an ellipsis.
const MAX_CELL_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
    Center,
}

/// Pad `text` to `width` display columns.
pub(crate) fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
        Align::Center => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(fill - left))
        }
    }
}

/// Clip to at most `max` display columns, marking the cut with `…`.
pub(crate) fn clip(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn cell_text(value: &JsonValue) -> String {
    // Keep one row per line
    clip(&format_value(value).replace(['\n', '\r'], " "), MAX_CELL_WIDTH)
}

pub fn format_as_table(result: &ResultSet) -> String {
    if result.columns.is_empty() {
        return "Empty set".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.width()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", pad(&col.name, *w, Align::Center)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for (row, texts) in result.rows.iter().zip(&cells) {
        let row_str: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let text = texts.get(i).map(String::as_str).unwrap_or("NULL");
                let align = if matches!(row.get(i), Some(JsonValue::Number(_))) {
                    Align::Right
                } else {
                    Align::Left
                };
                format!("| {} ", pad(text, *w, align))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    if !result.rows.is_empty() {
        output.push_str(&separator);
    }

    let row_count = result.row_count();
    if row_count == 0 {
        output.push_str(&format!(
            "Empty set ({:.2} sec)\n",
            result.execution_time_ms as f64 / 1000.0
        ));
    } else {
        let row_text = if row_count == 1 { "row" } else { "rows" };
        output.push_str(&format!(
            "{} {} in set ({:.2} sec)\n",
            row_count,
            row_text,
            result.execution_time_ms as f64 / 1000.0
        ));
    }
    if result.truncated {
        output.push_str("(result truncated at the row limit)\n");
    }

    output
}
