//! Courier CLI entry point.
//!
//! Provides `start` (an interactive chat harness that runs the full per-turn
//! pipeline against stdin) and `status` (print the stored contact record for
//! one user).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing::{info, warn};
use uuid::Uuid;

use courier::config::{self, CourierConfig};
use courier::contact::book::ContactBook;
use courier::contact::sqlite::SqliteStore;
use courier::contact::store::ContactStore;
use courier::dispatch::MaterialDispatch;
use courier::evaluator::CompletionEvaluator;
use courier::guidance::GuidanceProvider;
use courier::history::{ConversationTurn, HistorySource, InMemoryHistory, TurnContext};
use courier::logging;
use courier::oracle::ollama::OllamaOracle;
use courier::oracle::Oracle;
use courier::pipeline::TurnPipeline;
use courier::transport::emailjs::EmailJsTransport;
use courier::transport::MailTransport;

/// Courier — conversational email capture and material dispatch.
#[derive(Parser)]
#[command(name = "courier", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the interactive chat harness.
    Start {
        /// User identity the conversation is attributed to.
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Print the stored contact record for a user.
    Status {
        /// User identity to look up.
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Start { user } => handle_start(user).await,
        Command::Status { user } => handle_status(&user).await,
    }
}

/// Run the interactive chat harness: one turn per stdin line.
async fn handle_start(user: String) -> anyhow::Result<()> {
    let config = CourierConfig::load().context("failed to load configuration")?;

    // Set up production logging (JSON file + stderr).
    let logs_dir = config::data_dir()?.join("logs");
    let _logging_guard = logging::init_production(&logs_dir)?;
    info!(agent = %config.agent.name, user = %user, "courier starting");

    // Open the contact store.
    let db_path = config.resolve_db_path()?;
    let store: Arc<dyn ContactStore> = Arc::new(
        SqliteStore::open(&db_path)
            .await
            .with_context(|| format!("failed to open contact store at {}", db_path.display()))?,
    );
    info!(path = %db_path.display(), "contact store opened");

    let book = Arc::new(ContactBook::new(store, config.agent.name.clone()));

    // Wire the extraction oracle.
    let ollama = OllamaOracle::new(&config.oracle.base_url, &config.oracle.model);
    if !ollama.is_available().await {
        warn!(
            url = %config.oracle.base_url,
            "extraction oracle is unreachable; captures will fail until it comes up"
        );
    }
    let oracle: Arc<dyn Oracle> = Arc::new(ollama);

    // Wire the mail transport, if fully configured.
    let transport: Option<Arc<dyn MailTransport>> =
        match config.transport.resolve(|key| std::env::var(key).ok()) {
            Some(resolved) => {
                info!(service = %resolved.service_id, "mail transport configured");
                Some(Arc::new(EmailJsTransport::new(
                    resolved.service_id,
                    resolved.template_id,
                    resolved.public_key,
                )))
            }
            None => {
                info!("mail transport not configured; deliveries will be skipped");
                None
            }
        };

    let history = Arc::new(InMemoryHistory::new());
    let history_source: Arc<dyn HistorySource> = history.clone();

    let pipeline = TurnPipeline::new(
        GuidanceProvider::new(Arc::clone(&book)),
        CompletionEvaluator::new(Arc::clone(&book), Arc::clone(&oracle)),
        MaterialDispatch::new(book, oracle, history_source, transport),
    );

    let room_id = Uuid::new_v4();
    println!("courier chat harness -- type a message, Ctrl-D to quit");

    let stdin = tokio::io::stdin();
    let mut lines = tokio::io::BufReader::new(stdin).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        history
            .push(room_id, ConversationTurn::new(&user, text))
            .await;
        let turn = TurnContext {
            room_id,
            user_id: user.clone(),
            text: text.to_owned(),
        };

        let report = pipeline.run_turn(&turn).await;

        println!("\n{}", report.guidance);
        if let Some(outcome) = &report.delivery {
            println!("delivery: {}", outcome.as_str());
        }
        for failure in &report.failures {
            println!(
                "warning: {}.{} failed: {}",
                failure.component, failure.operation, failure.message
            );
        }
        println!();
    }

    info!("courier shutting down");
    Ok(())
}

/// Print the stored contact record for `user`.
async fn handle_status(user: &str) -> anyhow::Result<()> {
    logging::init_cli();

    let config = CourierConfig::load().context("failed to load configuration")?;
    let db_path = config.resolve_db_path()?;
    let store: Arc<dyn ContactStore> = Arc::new(
        SqliteStore::open(&db_path)
            .await
            .with_context(|| format!("failed to open contact store at {}", db_path.display()))?,
    );
    let book = ContactBook::new(store, config.agent.name.clone());

    let record = book.load(user).await?;

    println!("contact record for {user} (agent {}):", config.agent.name);
    match record.email {
        Some(ref address) => println!("  email: {address}"),
        None => println!("  email: (not captured)"),
    }
    match record.wants_material {
        Some(true) => println!("  wants material: yes"),
        Some(false) => println!("  wants material: no"),
        None => println!("  wants material: (not evaluated)"),
    }
    println!("  complete: {}", record.is_complete());
    println!("  send eligible: {}", record.is_send_eligible());
    Ok(())
}
