//! text2cypher - command-line entry point
//!
//! Asks a question against a Neo4j database, or prints the introspected schema.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use text2cypher::{
    schema::load_schema,
    text2cypher::{Outcome, Text2CypherOutput},
    AppState, Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "text2cypher")]
#[command(about = "Answer natural-language questions from a Neo4j graph")]
struct Cli {
    /// Path to the YAML config file (defaults to ./config.yaml)
    #[arg(short, long, global = true, env = "TEXT2CYPHER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, validate and execute a Cypher statement for a question
    Ask {
        /// The question to answer
        question: String,

        /// Print the full run output as JSON
        #[arg(long)]
        json: bool,

        /// Override the configured attempt limit
        #[arg(long)]
        max_attempts: Option<usize>,

        /// Use the static schema validators instead of model validation
        #[arg(long)]
        static_validation: bool,
    },

    /// Introspect the database and print the schema as the model sees it
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,text2cypher=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask {
            question,
            json,
            max_attempts,
            static_validation,
        } => {
            if let Some(max_attempts) = max_attempts {
                config.text2cypher.max_attempts = max_attempts;
            }
            if static_validation {
                config.text2cypher.llm_validation = false;
            }
            run_ask(config, &question, json).await
        }
        Commands::Schema => run_schema(config).await,
    }
}

async fn run_ask(config: Config, question: &str, json: bool) -> Result<()> {
    let state = AppState::new(config).await?;
    tracing::info!("Connected to Neo4j");

    let runner = state.text2cypher().await?;
    let output = runner.run(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_output(&output)?;
    }
    Ok(())
}

fn print_output(output: &Text2CypherOutput) -> Result<()> {
    println!("Cypher ({} attempt(s)):\n{}\n", output.attempts, output.statement);

    match (&output.outcome, &output.records) {
        (Outcome::Executed, Some(records)) => {
            println!("{}", serde_json::to_string_pretty(&records.to_value())?);
        }
        _ => {
            println!("No valid statement could be produced. Last errors:");
            for error in &output.errors {
                println!("  - {}", error);
            }
        }
    }
    Ok(())
}

async fn run_schema(config: Config) -> Result<()> {
    let state = AppState::new(config).await?;
    let schema = load_schema(state.neo4j.as_ref(), &state.config.schema).await?;
    println!("{}", schema.to_prompt_string());
    Ok(())
}
