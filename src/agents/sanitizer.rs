//! Deterministic cleanup of generated SQL.
//!
//! In order: strip markdown code fences, qualify bare table names with their
//! schema, collapse whitespace runs and trim. Only whole words are qualified,
//! and text inside single-quoted literals is left alone. Running the sanitizer
//! on its own output changes nothing.

use crate::store::SchemaIndex;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

const FENCE_OPEN: &str = "```sql";
const FENCE: &str = "```";

#[derive(Debug, Clone)]
pub struct QuerySanitizer {
    index: SchemaIndex,
    /// Whitespace-collapsed name -> index key
    names: HashMap<String, String>,
    /// Whole-word alternation of every indexed table, longest first
    pattern: Option<Regex>,
}

impl QuerySanitizer {
    pub fn new(index: SchemaIndex) -> Self {
        let names = index
            .iter()
            .map(|(table, _)| (collapse(table), table.to_string()))
            .collect();
        let pattern = table_pattern(&index);
        Self {
            index,
            names,
            pattern,
        }
    }

    pub fn set_index(&mut self, index: SchemaIndex) {
        *self = Self::new(index);
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn sanitize(&self, raw: &str) -> String {
        let unfenced = strip_fences(raw);
        let qualified = match &self.pattern {
            Some(pattern) => self.qualify(&unfenced, pattern),
            None => unfenced,
        };
        let clean = collapse(&qualified);
        debug!(raw = %raw, clean = %clean, "Sanitized SQL");
        clean
    }

    fn qualify(&self, sql: &str, pattern: &Regex) -> String {
        let mut out = String::with_capacity(sql.len() + 16);
        let mut last = 0;

        for found in pattern.find_iter(sql) {
            let name = collapse(found.as_str());
            if in_string_literal(sql, found.start())
                || follows_dot(sql, found.start())
                || self.is_schema_prefix(sql, found.end(), &name)
            {
                continue;
            }
            let Some((table, schema)) = self
                .names
                .get(&name)
                .and_then(|key| Some((key.as_str(), self.index.schema_of(key)?)))
            else {
                continue;
            };
            if schema.is_empty() {
                continue;
            }

            match quotes_around(sql, found.start(), found.end()) {
                Quoting::Bare => {
                    out.push_str(&sql[last..found.start()]);
                    out.push_str(&format!("{}.{}", schema, table));
                    last = found.end();
                }
                Quoting::Quoted(open, close) => {
                    let start = found.start() - open.len_utf8();
                    out.push_str(&sql[last..start]);
                    out.push_str(&format!(
                        "{open}{schema}{close}.{open}{table}{close}",
                    ));
                    last = found.end() + close.len_utf8();
                }
                // Part of a longer quoted identifier
                Quoting::Partial => continue,
            }
        }

        out.push_str(&sql[last..]);
        out
    }

    /// True when `name` is followed by `.table` and is that table's schema.
    fn is_schema_prefix(&self, sql: &str, end: usize, name: &str) -> bool {
        let rest = sql[end..].trim_start_matches([']', '"', '`']);
        let Some(rest) = rest.strip_prefix('.') else {
            return false;
        };
        let rest = rest.trim_start_matches(['[', '"', '`']);
        let next: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        !next.is_empty() && self.index.schema_of(&next) == Some(name)
    }
}

enum Quoting {
    Bare,
    Quoted(char, char),
    Partial,
}

/// How the match at `start..end` sits relative to identifier quotes.
fn quotes_around(sql: &str, start: usize, end: usize) -> Quoting {
    let before = sql[..start].chars().next_back();
    let after = sql[end..].chars().next();
    match (before, after) {
        (Some('['), Some(']')) => Quoting::Quoted('[', ']'),
        (Some('"'), Some('"')) => Quoting::Quoted('"', '"'),
        (Some('`'), Some('`')) => Quoting::Quoted('`', '`'),
        (Some('[' | '"' | '`'), _) | (_, Some(']' | '"' | '`')) => Quoting::Partial,
        _ => Quoting::Bare,
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove every code fence marker, repeating until none is left.
fn strip_fences(raw: &str) -> String {
    let mut text = raw.to_string();
    while text.contains(FENCE) {
        text = text.replace(FENCE_OPEN, "").replace(FENCE, "");
    }
    text
}

fn in_string_literal(sql: &str, pos: usize) -> bool {
    sql[..pos].matches('\'').count() % 2 == 1
}

fn follows_dot(sql: &str, pos: usize) -> bool {
    sql[..pos]
        .trim_end_matches(['[', '"', '`'])
        .ends_with('.')
}

fn table_pattern(index: &SchemaIndex) -> Option<Regex> {
    let mut names: Vec<String> = index.iter().map(|(table, _)| collapse(table)).collect();
    names.retain(|name| !name.is_empty());
    if names.is_empty() {
        return None;
    }
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names.dedup();

    // Words of multi-word names match across any whitespace run
    let alternation = names
        .iter()
        .map(|name| {
            name.split(' ')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&format!(r"\b(?:{})\b", alternation)) {
        Ok(pattern) => Some(pattern),
        Err(error) => {
            warn!(error = %error, tables = names.len(), "Table names not qualified");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> QuerySanitizer {
        QuerySanitizer::new(SchemaIndex::parse(
            "Customers: Sales\nOrders: Sales\nOrder: dbo\n",
        ))
    }

    #[test]
    fn test_qualifies_bare_table() {
        assert_eq!(
            sanitizer().sanitize("SELECT * FROM Customers WHERE Id=1"),
            "SELECT * FROM Sales.Customers WHERE Id=1"
        );
    }

    #[test]
    fn test_strips_fences_and_whitespace() {
        let raw = "```sql\nSELECT TOP 5 *\n  FROM   Orders\n```";
        assert_eq!(sanitizer().sanitize(raw), "SELECT TOP 5 * FROM Sales.Orders");
    }

    #[test]
    fn test_whole_words_only() {
        assert_eq!(
            sanitizer().sanitize("SELECT * FROM Orders JOIN Order ON 1=1 JOIN OrderLines ON 1=1"),
            "SELECT * FROM Sales.Orders JOIN dbo.Order ON 1=1 JOIN OrderLines ON 1=1"
        );
    }

    #[test]
    fn test_already_qualified_untouched() {
        let sql = "SELECT * FROM Sales.Customers";
        assert_eq!(sanitizer().sanitize(sql), sql);
        assert_eq!(
            sanitizer().sanitize("SELECT * FROM [Sales].[Customers]"),
            "SELECT * FROM [Sales].[Customers]"
        );
    }

    #[test]
    fn test_string_literals_untouched() {
        assert_eq!(
            sanitizer().sanitize("SELECT * FROM Orders WHERE note = 'Customers'"),
            "SELECT * FROM Sales.Orders WHERE note = 'Customers'"
        );
    }

    #[test]
    fn test_schema_named_like_table() {
        let sanitizer = QuerySanitizer::new(SchemaIndex::parse("Customers: Sales\nSales: Sales\n"));
        let once = sanitizer.sanitize("SELECT * FROM Customers JOIN Sales ON 1=1");
        assert_eq!(once, "SELECT * FROM Sales.Customers JOIN Sales.Sales ON 1=1");
        assert_eq!(sanitizer.sanitize(&once), once);
    }

    #[test]
    fn test_idempotent() {
        let s = sanitizer();
        let once = s.sanitize("```sql SELECT Customers.Name FROM Customers```");
        assert_eq!(once, "SELECT Sales.Customers.Name FROM Sales.Customers");
        assert_eq!(s.sanitize(&once), once);
    }

    #[test]
    fn test_quoted_identifiers_keep_quotes() {
        let s = sanitizer();
        let once = s.sanitize("SELECT * FROM \"Customers\" JOIN [Orders] ON 1=1 JOIN `Order` ON 1=1");
        assert_eq!(
            once,
            "SELECT * FROM \"Sales\".\"Customers\" JOIN [Sales].[Orders] ON 1=1 JOIN `dbo`.`Order` ON 1=1"
        );
        assert_eq!(s.sanitize(&once), once);

        // Only part of a longer quoted name
        assert_eq!(
            s.sanitize("SELECT * FROM [Orders Archive]"),
            "SELECT * FROM [Orders Archive]"
        );
    }

    #[test]
    fn test_multi_word_table_across_line_break() {
        let s = QuerySanitizer::new(SchemaIndex::parse("Order Details: dbo\nOrder: dbo\n"));
        let once = s.sanitize("SELECT * FROM Order\nDetails JOIN Order ON 1=1");
        assert_eq!(once, "SELECT * FROM dbo.Order Details JOIN dbo.Order ON 1=1");
        assert_eq!(s.sanitize(&once), once);
        assert_eq!(
            s.sanitize("SELECT * FROM [Order Details]"),
            "SELECT * FROM [dbo].[Order Details]"
        );
    }

    #[test]
    fn test_empty_index_only_cleans() {
        let s = QuerySanitizer::new(SchemaIndex::new());
        assert_eq!(s.sanitize("  SELECT\t1 "), "SELECT 1");
    }

    #[test]
    fn test_nested_fence_markers() {
        assert_eq!(strip_fences("``````sql`"), "`");
        assert_eq!(strip_fences("`` ```sql x ``` ``"), "``  x  ``");
    }
}
