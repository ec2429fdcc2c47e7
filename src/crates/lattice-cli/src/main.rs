//! # lattice-cli
//!
//! Command-line runner for a lattice orchestrator agent.
//!
//! `lattice run` assembles a ReAct agent whose orchestrator model can
//! delegate to two sub-models through tools (`ask_deepseek` for technical
//! reasoning, `ask_local_model` for creative explanations), runs one
//! prompt, and prints the final assistant message. Every step is
//! checkpointed to disk, so `--thread-id` resumes a conversation and
//! `lattice history` inspects it.
//!
//! Configuration is environment-based:
//!
//! - `OPENAI_API_KEY`, `OPENAI_MODEL` - orchestrator (default backend)
//! - `DEEPSEEK_API_KEY`, `DEEPSEEK_MODEL` - the `ask_deepseek` tool
//! - `LM_STUDIO_URL`, `LM_STUDIO_MODEL` - the `ask_local_model` tool
//! - `LATTICE_ORCHESTRATOR` - `openai` (default), `deepseek`, `lmstudio`

mod backends;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use lattice_agents::{create_react_agent, transcript_messages};
use lattice_checkpoint::{CheckpointConfig, CheckpointSaver, CheckpointSource, FileCheckpointSaver};
use lattice_core::Message;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

const ORCHESTRATOR_PROMPT: &str = "You orchestrate two specialist models. \
Use the ask_deepseek tool for technical reasoning and the ask_local_model \
tool for creative explanations. Combine their answers into one clear reply.";

#[derive(Parser)]
#[command(name = "lattice")]
#[command(about = "Run prompts through a checkpointed orchestrator agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a prompt through the orchestrator agent
    Run {
        /// The user prompt
        prompt: String,

        /// Thread to run on; a fresh thread is used when omitted
        #[arg(short, long, env = "LATTICE_THREAD_ID")]
        thread_id: Option<String>,

        /// Maximum graph steps before the run is aborted
        #[arg(short, long, default_value_t = 25)]
        recursion_limit: usize,

        /// Directory holding checkpoint files
        #[arg(long, env = "LATTICE_STATE_DIR", default_value = ".lattice")]
        state_dir: PathBuf,

        /// Log backend and graph activity to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// List saved checkpoints for a thread
    History {
        /// Thread to inspect
        #[arg(short, long, env = "LATTICE_THREAD_ID")]
        thread_id: String,

        /// Directory holding checkpoint files
        #[arg(long, env = "LATTICE_STATE_DIR", default_value = ".lattice")]
        state_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            prompt,
            thread_id,
            recursion_limit,
            state_dir,
            verbose,
        } => {
            init_tracing(verbose);
            handle_run(prompt, thread_id, recursion_limit, state_dir).await
        }
        Commands::History {
            thread_id,
            state_dir,
        } => {
            init_tracing(false);
            handle_history(thread_id, state_dir).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt().with_max_level(level).init();
}

async fn handle_run(
    prompt: String,
    thread_id: Option<String>,
    recursion_limit: usize,
    state_dir: PathBuf,
) -> Result<()> {
    let model = backends::orchestrator_from_env()?;
    let registry = tools::delegate_registry()?;
    let saver = Arc::new(FileCheckpointSaver::new(state_dir));

    let agent = create_react_agent(model, registry)
        .with_max_iterations(recursion_limit)
        .with_system_prompt(ORCHESTRATOR_PROMPT)
        .with_checkpointer(saver)
        .build()?;

    let thread_id = thread_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::info!(%thread_id, recursion_limit, "running agent");

    let state = agent
        .run(vec![Message::user(prompt)], thread_id.as_str())
        .await?;
    let messages = transcript_messages(&state)?;

    match messages.last() {
        Some(answer) => println!("Final Answer:\n{}", answer.content),
        None => println!("The run produced no messages"),
    }
    println!("\nThread: {}", thread_id);

    Ok(())
}

async fn handle_history(thread_id: String, state_dir: PathBuf) -> Result<()> {
    let saver = FileCheckpointSaver::new(state_dir);
    let config = CheckpointConfig::new().with_thread_id(thread_id.as_str());
    let mut stream = saver.list(Some(&config), None, None, None).await?;

    let mut rows = Vec::new();
    while let Some(tuple) = stream.next().await {
        let tuple = tuple?;
        rows.push((
            tuple.checkpoint.id.clone(),
            tuple
                .metadata
                .step
                .map(|step| step.to_string())
                .unwrap_or_else(|| "-".to_string()),
            source_label(tuple.metadata.source.as_ref()),
            message_count(tuple.checkpoint.channel_values.get("messages")),
            tuple.checkpoint.timestamp.to_rfc3339(),
        ));
    }

    if rows.is_empty() {
        println!("No checkpoints for thread '{}'", thread_id);
        return Ok(());
    }

    println!("Checkpoints for thread '{}' (newest first):", thread_id);
    println!(
        "{:<38} {:>4} {:<7} {:>8}  {}",
        "ID", "Step", "Source", "Messages", "Timestamp"
    );
    println!("{}", "-".repeat(92));
    for (id, step, source, messages, timestamp) in rows {
        println!(
            "{:<38} {:>4} {:<7} {:>8}  {}",
            id, step, source, messages, timestamp
        );
    }

    Ok(())
}

fn source_label(source: Option<&CheckpointSource>) -> &'static str {
    match source {
        Some(CheckpointSource::Input) => "input",
        Some(CheckpointSource::Loop) => "loop",
        Some(CheckpointSource::Update) => "update",
        Some(CheckpointSource::Fork) => "fork",
        None => "-",
    }
}

fn message_count(channel: Option<&Value>) -> usize {
    channel
        .and_then(Value::as_array)
        .map(|messages| messages.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_labels() {
        assert_eq!(source_label(Some(&CheckpointSource::Input)), "input");
        assert_eq!(source_label(Some(&CheckpointSource::Loop)), "loop");
        assert_eq!(source_label(None), "-");
    }

    #[test]
    fn test_message_count_handles_missing_channel() {
        let values = json!({"messages": [{"role": "user", "content": "hi"}]});
        assert_eq!(message_count(values.get("messages")), 1);
        assert_eq!(message_count(values.get("absent")), 0);
        let odd = json!({"messages": "not an array"});
        assert_eq!(message_count(odd.get("messages")), 0);
    }
}
