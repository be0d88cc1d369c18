//! nlsql-agents - Main entry point.
//!
//! Connects to one database, loads the table catalogue and runs the
//! interactive assistant on stdin/stdout. Logs go to stderr.

use clap::Parser;
use nlsql_agents::agents::{
    AgentSelector, Agents, CatalogBuilder, LlmSelector, Orchestrator, QueryComposer,
    QuerySanitizer, ResultFetcher, RuleSelector, Visualizer,
};
use nlsql_agents::config::{Config, SelectorMode};
use nlsql_agents::db::{Database, QueryExecutor, SqlxDatabase};
use nlsql_agents::llm::{LanguageModel, OpenAiClient};
use nlsql_agents::repl::run_session;
use nlsql_agents::store::{SchemaIndex, SummaryStore};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout belongs to the prompt
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();
    init_tracing(&config);
    config.validate()?;

    info!(
        selector = %config.selector,
        model = %config.llm_model,
        "Starting nlsql-agents v{}",
        env!("CARGO_PKG_VERSION")
    );

    let executor = QueryExecutor::with_defaults(config.query_timeout, config.row_limit);
    let sqlx_db = SqlxDatabase::connect(&config.database, config.pool_options(), executor).await?;
    let db: Arc<dyn Database> = Arc::new(sqlx_db.clone());

    if config.llm_api_key.is_none() {
        warn!("No API key configured; language model requests are sent without authorization");
    }
    let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(config.openai_config())?);

    let store = SummaryStore::new(&config.summaries_dir);
    let summaries = store.load_all().await?;
    let index = match SchemaIndex::load(&config.schema_index).await? {
        Some(index) => index,
        None => {
            info!(
                path = %config.schema_index.display(),
                "Schema index not found, building it from the database"
            );
            SchemaIndex::from_database(db.as_ref()).await?
        }
    };
    info!(
        summaries = summaries.len(),
        tables = index.len(),
        "Catalogue loaded"
    );

    let agents = Agents {
        catalog: CatalogBuilder::new(Arc::clone(&db), Arc::clone(&llm), store)
            .with_sample_rows(config.sample_rows)
            .with_schema_index_path(&config.schema_index),
        composer: QueryComposer::new(Arc::clone(&llm), summaries, index.clone(), db.dialect()),
        sanitizer: QuerySanitizer::new(index),
        fetcher: ResultFetcher::new(Arc::clone(&db)),
        visualizer: Visualizer::new(),
    };
    let selector: Box<dyn AgentSelector> = match config.selector {
        SelectorMode::Llm => Box::new(LlmSelector::new(Arc::clone(&llm))),
        SelectorMode::Rules => Box::new(RuleSelector),
    };
    let mut orchestrator = Orchestrator::new(agents, selector, config.orchestrator_config());

    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    tokio::select! {
        end = run_session(&mut orchestrator, reader, writer) => {
            end?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    sqlx_db.close().await;
    info!("Shutdown complete");
    Ok(())
}
