//! SQL Query Generator - Main entry point.
//!
//! Connects to one database, indexes its schema and answers plain-language
//! questions with generated SQL, either once (`-q`) or interactively.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use sql_query_generator::config::Config;
use sql_query_generator::db::{Database, SqlDatabase};
use sql_query_generator::embedding::EmbeddingProvider;
use sql_query_generator::error::{AppError, AppResult};
use sql_query_generator::format::format_result;
use sql_query_generator::llm::ChatCompletionsClient;
use sql_query_generator::models::{AttemptOutcome, QueryAttempt};
use sql_query_generator::orchestrator::{AttemptObserver, RetryOrchestrator};
use sql_query_generator::session::Session;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries attempts and results only.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Prints attempt progress to stdout.
struct ConsoleObserver;

impl AttemptObserver for ConsoleObserver {
    fn attempt_started(&self, number: u32, max_attempts: u32) {
        println!("Attempt {}/{}", number, max_attempts);
    }

    fn attempt_finished(&self, attempt: &QueryAttempt) {
        if let Some(sql) = &attempt.sql {
            println!("Generated SQL:\n{}", sql);
        }
        match &attempt.outcome {
            AttemptOutcome::Success { .. } => println!("Query executed successfully.\n"),
            AttemptOutcome::ExecutionFailed { message } => {
                println!("Query failed: {}\n", message)
            }
            AttemptOutcome::GenerationFailed { message } => {
                println!("Generation failed: {}\n", message)
            }
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::parse();
    init_tracing(&config);

    if let Err(e) = run(config).await {
        error!(error = %e, "Fatal error");
        eprintln!("Error: {}", e);
        if let Some(suggestion) = e.suggestion() {
            eprintln!("Hint: {}", suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(config: Config) -> AppResult<()> {
    config.validate()?;

    let connection = config.connection_config()?;
    info!(
        database = %connection.masked_connection_string(),
        db_type = %connection.db_type,
        "Connecting to database"
    );
    let db = Arc::new(SqlDatabase::connect(&connection, config.query_executor()).await?);
    info!(
        server_version = db.info().server_version.as_deref().unwrap_or("unknown"),
        "Connected"
    );

    let provider = config.embedding_provider().await?;
    info!(
        provider = provider.name(),
        dimensions = provider.dimensions(),
        "Embedding provider ready"
    );
    let mut session = Session::new(Arc::clone(&db) as Arc<dyn Database>, provider).await?;
    println!(
        "Connected to {} ({} tables indexed).",
        session.dialect(),
        session.schema().tables.len()
    );

    let generator = Arc::new(ChatCompletionsClient::new(config.chat_config())?);
    let orchestrator = RetryOrchestrator::new(generator, config.max_attempts, config.top_k)?
        .with_observer(Arc::new(ConsoleObserver));

    let result = match &config.question {
        Some(question) => answer(&orchestrator, &mut session, question, &config).await,
        None => interactive(&orchestrator, &mut session, &config).await,
    };

    db.close().await;
    info!("Shutdown complete");
    result
}

async fn answer(
    orchestrator: &RetryOrchestrator,
    session: &mut Session,
    question: &str,
    config: &Config,
) -> AppResult<()> {
    let outcome = orchestrator.run(session, question).await?;
    match &outcome.result {
        Some(result) => println!("{}", format_result(result, config.format)?),
        None => println!(
            "Maximum attempts ({}) reached. Could not generate a working query.",
            orchestrator.max_attempts()
        ),
    }
    Ok(())
}

const HELP: &str = "\
Type a question about the database, or one of:
  .schema   show the indexed schema
  .history  show the conversation so far
  .refresh  re-read the schema and rebuild the index
  .help     show this message
  .quit     exit";

async fn interactive(
    orchestrator: &RetryOrchestrator,
    session: &mut Session,
    config: &Config,
) -> AppResult<()> {
    println!("{}\n", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("question> ");
        std::io::stdout()
            .flush()
            .map_err(|e| AppError::internal(format!("Failed to write prompt: {}", e)))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AppError::internal(format!("Failed to read input: {}", e)))?
        else {
            break;
        };

        match line.trim() {
            "" => continue,
            ".quit" | ".exit" | "quit" | "exit" => break,
            ".help" => println!("{}", HELP),
            ".schema" => println!("{}", session.schema_text()),
            ".history" => {
                for turn in session.history() {
                    println!("[{}] {}", turn.role, turn.content);
                }
            }
            ".refresh" => match session.refresh().await {
                Ok(true) => println!("Schema changed; index rebuilt."),
                Ok(false) => println!("Schema unchanged."),
                Err(e) => println!("Refresh failed: {}", e),
            },
            question => {
                if let Err(e) = answer(orchestrator, session, question, config).await {
                    error!(error = %e, "Question aborted");
                    println!("Error: {}", e);
                }
            }
        }
    }
    Ok(())
}
