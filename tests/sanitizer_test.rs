//! Sanitizer behavior over randomized generated SQL.

use nlsql_agents::agents::QuerySanitizer;
use nlsql_agents::store::SchemaIndex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const TOKENS: &[&str] = &[
    "SELECT", "*", "FROM", "WHERE", "JOIN", "ON", "=", ",", ".", "(", ")", "Id", "Name",
    "Customers", "Orders", "Order", "Sales", "dbo", "Sales.Customers", "dbo.Order",
    "'Orders'", "'", "[Orders]", "\"Customers\"", "CustomerId", "OrderLines", "```sql", "```",
    "Details", "[Order Details]", "dbo.Order Details",
];

const SEPARATORS: &[&str] = &[" ", "  ", "\n", "\t", " \n  "];

fn sanitizer() -> QuerySanitizer {
    QuerySanitizer::new(SchemaIndex::parse(
        "Customers: Sales\nOrders: Sales\nOrder: dbo\nOrder Details: dbo\n",
    ))
}

fn random_sql(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..30);
    let mut sql = String::new();
    for _ in 0..len {
        sql.push_str(TOKENS.choose(rng).unwrap());
        sql.push_str(SEPARATORS.choose(rng).unwrap());
    }
    sql
}

#[test]
fn test_sanitize_is_idempotent() {
    let sanitizer = sanitizer();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..500 {
        let raw = random_sql(&mut rng);
        let once = sanitizer.sanitize(&raw);
        let twice = sanitizer.sanitize(&once);
        assert_eq!(once, twice, "raw input: {:?}", raw);

        assert!(!once.contains("```"));
        assert!(!once.contains("  "));
        assert_eq!(once, once.trim());
    }
}

#[test]
fn test_names_with_suffixes_are_not_qualified() {
    let sanitizer = sanitizer();
    let mut rng = StdRng::seed_from_u64(42);
    let alphabet: Vec<char> = "abcXYZ_019".chars().collect();

    for _ in 0..200 {
        let suffix: String = (0..rng.gen_range(1..6))
            .map(|_| *alphabet.choose(&mut rng).unwrap())
            .collect();
        let name = format!("Customers{}", suffix);
        let sql = format!("SELECT * FROM {}", name);
        assert_eq!(sanitizer.sanitize(&sql), sql);

        let prefixed = format!("SELECT * FROM {}Orders", suffix);
        assert_eq!(sanitizer.sanitize(&prefixed), prefixed);
    }
}

#[test]
fn test_multi_word_name_split_over_lines() {
    let sanitizer = sanitizer();
    for raw in [
        "SELECT * FROM Order\nDetails",
        "SELECT * FROM Order \t Details",
        "SELECT * FROM Order Details",
    ] {
        let once = sanitizer.sanitize(raw);
        assert_eq!(once, "SELECT * FROM dbo.Order Details");
        assert_eq!(sanitizer.sanitize(&once), once);
    }
}

#[test]
fn test_generated_query_cleanup() {
    let raw = "```sql\nSELECT TOP 5 c.Name, COUNT(*) AS OrderCount\nFROM Customers c\n    JOIN Orders o ON o.CustomerId = c.Id\nWHERE c.Name <> 'Orders'\nGROUP BY c.Name\n```";
    assert_eq!(
        sanitizer().sanitize(raw),
        "SELECT TOP 5 c.Name, COUNT(*) AS OrderCount FROM Sales.Customers c \
         JOIN Sales.Orders o ON o.CustomerId = c.Id WHERE c.Name <> 'Orders' GROUP BY c.Name"
    );
}
