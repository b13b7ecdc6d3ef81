//! Command-line front end: runs one structured call and prints the result as JSON.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use llm_requester::settings::Settings;
use llm_requester::{ask_checked, build_orchestrator, group_report_schema};
use llm_requester_core::{Message, SchemaDescriptor};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sends a conversation and prints `{result, usage, model_uri, attempts}`
    Run {
        /// JSON file holding an array of `{role, content}` messages
        #[arg(long)]
        messages: PathBuf,
        /// JSON file holding a `{name, schema}` descriptor
        #[arg(long, conflicts_with = "group_report")]
        schema: Option<PathBuf>,
        /// Request the built-in GroupReport schema
        #[arg(long)]
        group_report: bool,
        /// Model name or fully-qualified URI
        #[arg(long)]
        model: Option<String>,
    },
    /// Prints the backend and URI a model identifier resolves to
    Resolve {
        /// Model name or fully-qualified URI
        #[arg(long)]
        model: Option<String>,
    },
    /// Prints the GroupReport schema descriptor
    Schema,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            messages,
            schema,
            group_report,
            model,
        } => {
            let messages: Vec<Message> = read_json(&messages)?;
            let schema = match schema {
                Some(path) => Some(read_json::<SchemaDescriptor>(&path)?),
                None if group_report => Some(group_report_schema()),
                None => None,
            };

            let settings = Settings::from_env()?;
            let orchestrator = build_orchestrator(&settings)?;
            let result =
                ask_checked(&orchestrator, &messages, schema.as_ref(), model.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Resolve { model } => {
            let settings = Settings::from_env()?;
            let reference = settings.resolver().resolve(model.as_deref());
            println!("{}", serde_json::to_string_pretty(&reference)?);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&group_report_schema())?);
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
