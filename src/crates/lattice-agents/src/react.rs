//! ReAct agent loop: reasoning and acting with tools.
//!
//! The agent alternates between **thinking** (one model call deciding what
//! to do next) and **acting** (executing the tool calls the model asked
//! for), feeding each observation back into the transcript until the model
//! answers without requesting tools.
//!
//! # Architecture
//!
//! ```text
//!               __start__
//!                   │
//!                   ↓
//!              ┌─────────┐   no tool calls
//!              │  agent  │ ──────────────────→ __end__
//!              └─────────┘
//!                   │ tool calls requested
//!                   ↓
//!              ┌─────────┐
//!              │  tools  │ ── one tool message per call ──┐
//!              └─────────┘                                │
//!                   ↑────────── loop back ────────────────┘
//! ```
//!
//! The `messages` channel accumulates the whole exchange through the
//! append-by-default reducer, so each node only returns the messages it
//! adds. Tool failures never abort the loop; they come back as error text
//! in a tool message for the model to read.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lattice_agents::create_react_agent;
//! use lattice_core::tool::{Tool, ToolRegistry};
//! use lattice_core::Message;
//! use lattice_llm::remote::DeepseekClient;
//!
//! let mut tools = ToolRegistry::new();
//! tools.register(my_search_tool())?;
//!
//! let agent = create_react_agent(Box::new(DeepseekClient::from_env()?), tools)
//!     .with_max_iterations(10)
//!     .with_system_prompt("You are a helpful research assistant")
//!     .build()?;
//!
//! let state = agent
//!     .run(vec![Message::user("What is the weather in SF?")], "thread-1")
//!     .await?;
//! ```
//!
//! # Configuration
//!
//! | Method | Description | Default |
//! |--------|-------------|---------|
//! | `with_max_iterations(n)` | Step budget for the run (each model call and each tool batch is one step) | 10 |
//! | `with_system_prompt(s)` | Instructions prepended to every model call | None |
//! | `with_checkpointer(saver)` | Persist state after every step | None |
//!
//! When the budget runs out with the model still requesting tools, the run
//! fails with a recursion-limit error; with a checkpointer configured the
//! transcript up to that point is already saved.

use crate::error::{AgentError, Result};
use lattice_checkpoint::CheckpointSaver;
use lattice_core::builder::StateGraph;
use lattice_core::executor::{CompiledGraph, RunConfig};
use lattice_core::graph::{END, START};
use lattice_core::llm::{ChatModel, ChatRequest};
use lattice_core::messages::{Message, MessageRole};
use lattice_core::tool::ToolRegistry;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration builder for a ReAct agent.
pub struct ReactAgentConfig {
    /// Model backend that drives the reasoning step
    model: Box<dyn ChatModel>,

    /// Tools available to the agent
    tools: ToolRegistry,

    /// Maximum number of graph steps per run (default: 10)
    max_iterations: usize,

    /// System prompt prepended to every model call
    system_prompt: Option<String>,

    /// Optional checkpointer for durable transcripts
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
}

impl ReactAgentConfig {
    /// Create a new ReAct agent configuration.
    pub fn new(model: Box<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            max_iterations: 10,
            system_prompt: None,
            checkpointer: None,
        }
    }

    /// Set the step budget for each run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Persist every step through the given checkpointer.
    pub fn with_checkpointer(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = Some(saver);
        self
    }

    /// Build the agent, compiling the underlying graph.
    pub fn build(self) -> Result<ReactAgent> {
        build_react_graph(self)
    }
}

/// Create a ReAct agent from a model backend and a tool registry.
///
/// # Arguments
///
/// * `model` - Any [`ChatModel`] implementation
/// * `tools` - Registry of tools the model may call
///
/// # Returns
///
/// [`ReactAgentConfig`] for further configuration
///
/// # Example
///
/// ```rust,ignore
/// let agent = create_react_agent(Box::new(client), tools)
///     .with_max_iterations(5)
///     .build()?;
/// ```
pub fn create_react_agent(model: Box<dyn ChatModel>, tools: ToolRegistry) -> ReactAgentConfig {
    ReactAgentConfig::new(model, tools)
}

/// A compiled ReAct agent.
///
/// Created through [`create_react_agent`]. The underlying graph is
/// reachable via [`graph`](Self::graph) for custom run configurations.
#[derive(Debug, Clone)]
pub struct ReactAgent {
    graph: CompiledGraph,
    max_iterations: usize,
}

impl ReactAgent {
    /// Run the loop to completion on the given transcript.
    ///
    /// The step budget configured at build time becomes the run's
    /// recursion limit. The returned value is the final graph state; use
    /// [`transcript_messages`] to pull the conversation out of it.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        thread_id: impl Into<String>,
    ) -> Result<Value> {
        let input = json!({ "messages": messages });
        let config = RunConfig::new()
            .with_thread_id(thread_id)
            .with_recursion_limit(self.max_iterations);

        Ok(self.graph.invoke_with_config(input, config).await?)
    }

    /// The compiled graph backing this agent.
    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    /// The step budget applied by [`run`](Self::run).
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

/// Parse the `messages` channel out of a state value.
///
/// A state without the channel is an empty transcript, not an error.
pub fn transcript_messages(state: &Value) -> Result<Vec<Message>> {
    match state.get("messages") {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(Vec::new()),
    }
}

/// Route taken after each reasoning step.
fn should_continue(state: &Value) -> String {
    let has_calls = state
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|messages| messages.last())
        .and_then(|last| last.get("tool_calls"))
        .and_then(Value::as_array)
        .map(|calls| !calls.is_empty())
        .unwrap_or(false);

    if has_calls {
        "tools".to_string()
    } else {
        END.to_string()
    }
}

fn build_react_graph(config: ReactAgentConfig) -> Result<ReactAgent> {
    if config.max_iterations == 0 {
        return Err(AgentError::Configuration(
            "max_iterations must be at least 1".to_string(),
        ));
    }

    let ReactAgentConfig {
        model,
        tools,
        max_iterations,
        system_prompt,
        checkpointer,
    } = config;

    let registry = Arc::new(tools);
    let definitions = registry.definitions();

    let mut builder = StateGraph::new().with_messages();

    // Reason: one model call over the transcript, tools advertised.
    builder.add_node("agent", move |state: Value| {
        let model = model.clone();
        let definitions = definitions.clone();
        let system_prompt = system_prompt.clone();

        Box::pin(async move {
            let mut messages: Vec<Message> = match state.get("messages") {
                Some(value) => serde_json::from_value(value.clone())?,
                None => Vec::new(),
            };

            // The prompt rides on the request only; the durable transcript
            // never contains it unless the caller put it there.
            if let Some(prompt) = system_prompt {
                let has_system = messages
                    .first()
                    .map(|m| m.role == MessageRole::System)
                    .unwrap_or(false);
                if !has_system {
                    messages.insert(0, Message::system(prompt));
                }
            }

            tracing::debug!(
                transcript_len = messages.len(),
                tools = definitions.len(),
                "calling model"
            );

            let request = ChatRequest::new(messages).with_tools(definitions);
            let response = model.chat(request).await?;

            Ok(json!({ "messages": [response.message] }))
        })
    });

    // Act: execute the requested calls, one tool message per call.
    let tool_registry = registry.clone();
    builder.add_node("tools", move |state: Value| {
        let registry = tool_registry.clone();

        Box::pin(async move {
            let messages: Vec<Message> = match state.get("messages") {
                Some(value) => serde_json::from_value(value.clone())?,
                None => Vec::new(),
            };

            let calls = messages
                .last()
                .and_then(|m| m.tool_calls.clone())
                .unwrap_or_default();

            tracing::debug!(count = calls.len(), "executing tool calls");

            let results = registry.execute_tool_calls(&calls).await;
            let replies: Vec<Message> = results
                .into_iter()
                .map(|result| {
                    Message::tool(result.output.observation(), result.id).with_name(result.name)
                })
                .collect();

            Ok(json!({ "messages": replies }))
        })
    });

    builder.add_edge(START, "agent");
    builder.add_conditional_edges(
        "agent",
        should_continue,
        HashMap::from([
            ("tools".to_string(), "tools".to_string()),
            (END.to_string(), END.to_string()),
        ]),
    );
    builder.add_edge("tools", "agent");

    let mut graph = builder.compile()?;
    if let Some(saver) = checkpointer {
        graph = graph.with_checkpointer(saver);
    }

    Ok(ReactAgent {
        graph,
        max_iterations,
    })
}
