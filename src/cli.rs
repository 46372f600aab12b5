use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;

use diagora::catalog::QueryCatalog;
use diagora::config::Settings;
use diagora::pipeline::{AskOutcome, NOT_UNDERSTOOD_MESSAGE};
use diagora::telemetry::init_telemetry;
use diagora::{Capabilities, DEFAULT_PROMPT_PATH, build_assistant};

#[derive(Parser)]
#[command(
    name = "diagora-cli",
    about = "Ask Oracle EBS health questions from the terminal"
)]
struct Cli {
    /// Output machine-readable JSON (default: human-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Assistant persona prompt
    #[arg(long, global = true, env = "DIAGORA_PROMPT_PATH", default_value = DEFAULT_PROMPT_PATH)]
    prompt_path: PathBuf,

    /// Log level for diagnostics on stderr
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question (positional, collects remaining args)
    Ask { question: Vec<String> },
    /// List the supported health checks
    Intents,
    /// Show database and language model status
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_telemetry(&cli.log_level, false)?;

    match cli.command {
        Command::Ask { question } => {
            let question = question.join(" ");
            let question = question.trim();
            if question.is_empty() {
                eprintln!("Error: Soru boş olamaz");
                std::process::exit(1);
            }

            let capabilities = Capabilities::from_settings(&Settings::from_env());
            let assistant = build_assistant(&capabilities, &cli.prompt_path);

            match assistant.ask(question).await {
                AskOutcome::Answered(answer) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&answer)?);
                    } else {
                        println!("{}", answer.answer);
                        if answer.query_executed {
                            eprintln!();
                            eprintln!("[{}: {} kayıt]", answer.intent, answer.row_count);
                        }
                    }
                }
                AskOutcome::NotUnderstood => {
                    if cli.json {
                        let output = json!({
                            "answer": NOT_UNDERSTOOD_MESSAGE,
                            "intent": "unknown",
                            "query_executed": false,
                        });
                        println!("{}", serde_json::to_string_pretty(&output)?);
                    } else {
                        println!("{NOT_UNDERSTOOD_MESSAGE}");
                    }
                }
            }
        }
        Command::Intents => {
            let catalog = QueryCatalog::ebs();
            if cli.json {
                let entries: Vec<_> = catalog
                    .descriptors()
                    .map(|d| {
                        json!({
                            "intent": d.intent,
                            "name": d.name,
                            "description": d.description,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for d in catalog.descriptors() {
                    println!("{}: {} ({})", d.intent, d.name, d.description);
                }
            }
        }
        Command::Health => {
            let capabilities = Capabilities::from_settings(&Settings::from_env());
            let connected = capabilities.database.ping().await;
            let database = if connected { "connected" } else { "disconnected" };
            let llm = if capabilities.llm.is_some() {
                "configured"
            } else {
                "not configured"
            };

            if cli.json {
                let output = json!({ "status": "healthy", "database": database, "llm": llm });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Database: {database}");
                println!("LLM: {llm}");
            }
        }
    }

    Ok(())
}
