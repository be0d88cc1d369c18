//! End-to-end runs against a real SQLite file.

mod common;

use common::ScriptedModel;
use nlsql_agents::agents::walker::NO_NESTED_RELATIONSHIPS;
use nlsql_agents::agents::{
    Agents, CatalogBuilder, Orchestrator, OrchestratorConfig, QueryComposer, QuerySanitizer,
    ResultFetcher, RuleSelector, SchemaWalker, TurnOutcome, Visualizer,
};
use nlsql_agents::db::{Database, DbPool, PoolOptions, QueryExecutor, SqlxDatabase};
use nlsql_agents::error::DbError;
use nlsql_agents::models::{AgentRole, ConstraintKind, TableRef};
use nlsql_agents::store::{SchemaIndex, SummaryStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

const FIXTURE: &[&str] = &[
    "CREATE TABLE Customers (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL)",
    "CREATE TABLE Orders (
        Id INTEGER PRIMARY KEY,
        CustomerId INTEGER REFERENCES Customers(Id),
        Total REAL
    )",
    "INSERT INTO Customers (Id, Name) VALUES (1, 'Alice'), (2, 'Bob')",
    "INSERT INTO Orders (Id, CustomerId, Total) VALUES (1, 1, 120.5), (2, 2, 80.0), (3, 1, 40.0)",
];

async fn fixture(dir: &TempDir) -> Arc<SqlxDatabase> {
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("shop.db").display());
    let db = SqlxDatabase::connect(&url, PoolOptions::default(), QueryExecutor::new())
        .await
        .unwrap();

    let DbPool::SQLite(pool) = db.pool() else {
        panic!("expected a SQLite pool");
    };
    for statement in FIXTURE {
        sqlx::query(statement).execute(pool).await.unwrap();
    }
    Arc::new(db)
}

/// Replies with a fixed summary per table, or echoes a canned query.
fn shop_model() -> ScriptedModel {
    ScriptedModel::new(|prompt| {
        if prompt.contains("'Customers'") {
            Ok("Table Description: one row per customer.".to_string())
        } else if prompt.contains("'Orders'") {
            Ok("Table Description: one row per order.".to_string())
        } else {
            Ok("SELECT Name FROM Customers ORDER BY Name".to_string())
        }
    })
}

#[tokio::test]
async fn test_metadata_queries() {
    let dir = TempDir::new().unwrap();
    let db = fixture(&dir).await;

    let tables = db.list_tables().await.unwrap();
    assert_eq!(
        tables,
        vec![TableRef::new("main", "Customers"), TableRef::new("main", "Orders")]
    );

    let usage = db.constraint_usage("Orders", Some("main")).await.unwrap();
    assert_eq!(usage.len(), 2);
    assert_eq!(usage[0].kind, ConstraintKind::PrimaryKey);
    assert_eq!(usage[0].column, "Id");
    assert_eq!(usage[1].kind, ConstraintKind::ForeignKey);
    assert_eq!(usage[1].column, "CustomerId");
    assert_eq!(usage[1].referenced_table.as_deref(), Some("Customers"));

    assert_eq!(
        db.linked_table("Id", "Orders").await.unwrap().as_deref(),
        Some("Customers")
    );
    assert_eq!(db.linked_table("Nope", "Orders").await.unwrap(), None);
}

#[tokio::test]
async fn test_relationship_report() {
    let dir = TempDir::new().unwrap();
    let db = fixture(&dir).await;

    let report = SchemaWalker::new(db)
        .discover_relationships(&TableRef::new("main", "Orders"))
        .await;

    assert_eq!(
        report.lines,
        vec![
            "Table Orders has a Primary Key on column Id.",
            "Table Orders has a Foreign Key on column CustomerId linked with table Customers.",
            NO_NESTED_RELATIONSHIPS,
        ]
    );
    assert!(report.issues.is_empty());
}

#[tokio::test]
async fn test_catalog_run() {
    let dir = TempDir::new().unwrap();
    let db = fixture(&dir).await;
    let llm = Arc::new(shop_model());
    let store = SummaryStore::new(dir.path().join("LLM_summaries"));
    let index_path = dir.path().join("schema_details/db_names.txt");

    let report = CatalogBuilder::new(db, llm.clone(), store.clone())
        .with_schema_index_path(&index_path)
        .summarize_all_tables()
        .await
        .unwrap();

    assert_eq!(
        report.summary_line(),
        "Processing complete: 2/2 tables processed successfully."
    );
    let loaded = store.load_all().await.unwrap();
    assert_eq!(
        loaded.get("Orders").map(String::as_str),
        Some("Table Description: one row per order.")
    );

    let index = SchemaIndex::load(&index_path).await.unwrap().unwrap();
    assert_eq!(index.qualify("Orders").as_deref(), Some("main.Orders"));

    let orders_prompt = llm
        .prompts()
        .into_iter()
        .find(|p| p.contains("'Orders'"))
        .unwrap();
    assert!(orders_prompt.contains("following columns: Id, CustomerId, Total."));
    assert!(orders_prompt.contains("1, 1, 120.5"));
    assert!(orders_prompt.contains("linked with table Customers."));
}

#[tokio::test]
async fn test_session_with_rule_selector() {
    let dir = TempDir::new().unwrap();
    let db = fixture(&dir).await;
    let dyn_db: Arc<dyn Database> = db.clone();
    let llm = Arc::new(shop_model());
    let index = SchemaIndex::from_database(dyn_db.as_ref()).await.unwrap();

    let agents = Agents {
        catalog: CatalogBuilder::new(
            dyn_db.clone(),
            llm.clone(),
            SummaryStore::new(dir.path().join("LLM_summaries")),
        ),
        composer: QueryComposer::new(llm.clone(), BTreeMap::new(), index.clone(), dyn_db.dialect()),
        sanitizer: QuerySanitizer::new(index),
        fetcher: ResultFetcher::new(dyn_db),
        visualizer: Visualizer::new(),
    };
    let mut orchestrator =
        Orchestrator::new(agents, Box::new(RuleSelector), OrchestratorConfig::default());

    let catalog = orchestrator.handle_turn("Refresh the catalog").await;
    assert_eq!(catalog.agent(), Some(AgentRole::Cataloging));

    let fetched = orchestrator
        .handle_turn(
            "SELECT c.Name, SUM(o.Total) AS Spend FROM Orders o \
             JOIN Customers c ON c.Id = o.CustomerId GROUP BY c.Name ORDER BY c.Name",
        )
        .await;
    let TurnOutcome::Replied { agent, content } = fetched else {
        panic!("expected a reply, got {:?}", fetched);
    };
    assert_eq!(agent, AgentRole::DataExtractor);
    assert!(content.contains("FROM main.Orders o JOIN main.Customers c"));
    assert!(content.contains("Alice"));
    assert_eq!(
        orchestrator.state().last_result().map(|r| r.row_count()),
        Some(2)
    );

    let chart = orchestrator.handle_turn("Plot that as a chart").await;
    let TurnOutcome::Replied { agent, content } = chart else {
        panic!("expected a reply, got {:?}", chart);
    };
    assert_eq!(agent, AgentRole::DataViz);
    assert!(content.starts_with("Spend by Name\n"));
    assert!(content.contains('█'));

    let generated = orchestrator.handle_turn("Write a query for customer names").await;
    let TurnOutcome::Replied { agent, content } = generated else {
        panic!("expected a reply, got {:?}", generated);
    };
    assert_eq!(agent, AgentRole::QueryGen);
    assert_eq!(content, "SELECT Name FROM main.Customers ORDER BY Name");

    // The composer prompt carries the freshly written summaries
    let compose_prompt = llm.prompts().last().cloned().unwrap();
    assert!(compose_prompt.contains("Table: main.Customers\nTable Description: one row per customer."));
}

#[tokio::test]
async fn test_write_is_refused_by_real_backend() {
    let dir = TempDir::new().unwrap();
    let db = fixture(&dir).await;
    let fetcher = ResultFetcher::new(db.clone());

    let err = fetcher.execute("DROP TABLE Orders").await.unwrap_err();
    assert!(matches!(err, DbError::Permission { .. }));
    assert_eq!(db.list_tables().await.unwrap().len(), 2);
}
