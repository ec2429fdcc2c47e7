//! # lattice-core - Graph Execution Runtime for Agents
//!
//! Build stateful agent workflows as graphs of async nodes that share a
//! JSON state merged through per-channel reducers.
//!
//! ## Overview
//!
//! `lattice-core` is the foundation of the lattice runtime. It provides:
//!
//! - **Stateful graph execution** - One shared state object threaded through
//!   every node, merged channel by channel
//! - **Conditional routing** - The next node is a function of state, so
//!   agent loops are ordinary cycles with an exit route
//! - **Checkpoint/resume** - With a checkpointer attached, every step is
//!   durable and a thread can pick up where it left off
//! - **Bounded runs** - Recursion limit, cooperative cancellation, and
//!   per-node timeouts, all enforced on step boundaries
//! - **Model and tool plumbing** - [`ChatModel`], [`Tool`], and
//!   [`ToolRegistry`] abstractions the agent crates build on
//!
//! ## Core Concepts
//!
//! ### StateGraph
//!
//! [`StateGraph`] is the construction API: declare nodes, wire edges from
//! [`START`] to [`END`], register channel reducers, then
//! [`compile`](StateGraph::compile) into a [`CompiledGraph`]. Compilation
//! validates the topology once; runs never discover a dangling edge.
//!
//! ### Channels and Reducers
//!
//! Nodes return partial updates, not whole states. Each top-level key is a
//! channel; a [`Reducer`] decides how an update combines with the current
//! value. Unregistered channels are overwritten, `messages` appends by id
//! when built [`with_messages`](StateGraph::with_messages).
//!
//! ### Checkpointing
//!
//! Attach a [`CheckpointSaver`](lattice_checkpoint::CheckpointSaver) with
//! [`with_checkpointer`](CompiledGraph::with_checkpointer) and give each run
//! a `thread_id`. The run records the merged input, then one checkpoint per
//! step, each chained to its predecessor. [`get_state`](CompiledGraph::get_state)
//! and [`get_state_history`](CompiledGraph::get_state_history) read the
//! thread back as [`StateSnapshot`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use lattice_core::{StateGraph, START, END};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> lattice_core::Result<()> {
//!     let mut builder = StateGraph::new();
//!     builder
//!         .add_node("greet", |_| {
//!             Box::pin(async move { Ok(json!({ "reply": "hello" })) })
//!         })
//!         .add_edge(START, "greet")
//!         .add_edge("greet", END);
//!
//!     let graph = builder.compile()?;
//!     let out = graph.invoke(json!({ "user": "world" })).await?;
//!     assert_eq!(out["reply"], json!("hello"));
//!     Ok(())
//! }
//! ```
//!
//! ### With Checkpointing
//!
//! ```rust
//! use std::sync::Arc;
//! use lattice_core::{CheckpointConfig, RunConfig, StateGraph, START, END};
//! use lattice_checkpoint::InMemoryCheckpointSaver;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> lattice_core::Result<()> {
//!     let mut builder = StateGraph::new();
//!     builder
//!         .add_node("step", |_| {
//!             Box::pin(async move { Ok(json!({ "done": true })) })
//!         })
//!         .add_edge(START, "step")
//!         .add_edge("step", END);
//!
//!     let graph = builder
//!         .compile()?
//!         .with_checkpointer(Arc::new(InMemoryCheckpointSaver::new()));
//!
//!     graph
//!         .invoke_with_config(json!({}), RunConfig::new().with_thread_id("thread-1"))
//!         .await?;
//!
//!     // one snapshot for the input, one per node step, newest first
//!     let history = graph
//!         .get_state_history(&CheckpointConfig::new().with_thread_id("thread-1"))
//!         .await?;
//!     assert_eq!(history.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! ### Agent Loop with Tool Calling
//!
//! ```rust,ignore
//! let mut builder = StateGraph::new().with_messages();
//! builder
//!     .add_node("agent", call_model)
//!     .add_node("tools", run_tools)
//!     .add_edge(START, "agent")
//!     .add_conditional_edges(
//!         "agent",
//!         |state| {
//!             if last_message_has_tool_calls(state) {
//!                 "tools".to_string()
//!             } else {
//!                 END.to_string()
//!             }
//!         },
//!         HashMap::from([
//!             ("tools".to_string(), "tools".to_string()),
//!             (END.to_string(), END.to_string()),
//!         ]),
//!     )
//!     .add_edge("tools", "agent");
//! ```
//!
//! ## Module Organization
//!
//! - [`builder`] - [`StateGraph`] construction API
//! - [`executor`] - [`CompiledGraph`] runtime, [`RunConfig`], [`StateSnapshot`]
//! - [`graph`] - Low-level graph representation and validation
//! - [`channel`] - [`Reducer`] trait and the built-in reducers
//! - [`messages`] - Chat [`Message`] type and [`add_messages`] merge
//! - [`tool`] - [`Tool`], [`ToolCall`], and [`ToolRegistry`]
//! - [`llm`] - [`ChatModel`] trait and request/response types
//! - [`retry`] - [`RetryPolicy`] with exponential backoff
//! - [`error`] - [`GraphError`] and the crate [`Result`]
//!
//! ## See Also
//!
//! - [`lattice_checkpoint`] - Checkpoint trait and storage backends
//! - `lattice-llm` - Remote and local [`ChatModel`] backends
//! - `lattice-agents` - Pre-built agent patterns on top of this crate

pub mod builder;
pub mod channel;
pub mod error;
pub mod executor;
pub mod graph;
pub mod llm;
pub mod messages;
pub mod retry;
pub mod tool;

// Re-export main types
pub use builder::StateGraph;
pub use channel::{AppendReducer, ChannelSchema, MessagesReducer, OverwriteReducer, Reducer};
pub use error::{GraphError, Result};
pub use executor::{CompiledGraph, RunConfig, StateSnapshot, DEFAULT_RECURSION_LIMIT};
pub use graph::{
    Edge, Graph, NodeExecutor, NodeFuture, NodeId, NodeSpec, RouterFn, END, START,
};
pub use lattice_checkpoint::CheckpointConfig;
pub use llm::{ChatConfig, ChatModel, ChatRequest, ChatResponse, ToolDefinition, UsageMetadata};
pub use messages::{add_messages, Message, MessageRole};
pub use retry::RetryPolicy;
pub use tool::{
    Tool, ToolCall, ToolCallResult, ToolError, ToolOutput, ToolRegistry, ToolResult,
};
