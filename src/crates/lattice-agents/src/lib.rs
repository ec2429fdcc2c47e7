//! Prebuilt agent loops for lattice graphs.
//!
//! This crate packages common agent patterns as ready-made graphs so that
//! applications do not have to wire nodes, routers, and checkpointers by
//! hand. The only pattern today is the ReAct loop in [`react`]: a model
//! reasons over the transcript, requests tool calls, reads the
//! observations, and repeats until it can answer directly.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lattice_agents::create_react_agent;
//! use lattice_core::tool::ToolRegistry;
//! use lattice_core::Message;
//! use lattice_llm::remote::OpenAiClient;
//!
//! let agent = create_react_agent(Box::new(OpenAiClient::from_env()?), ToolRegistry::new())
//!     .with_system_prompt("Answer precisely")
//!     .build()?;
//!
//! let state = agent.run(vec![Message::user("2 + 2?")], "math").await?;
//! ```
//!
//! Anything the prebuilt loop cannot express is still available one layer
//! down: [`ReactAgent::graph`] exposes the compiled graph for custom run
//! configurations, and `lattice_core::builder::StateGraph` builds
//! arbitrary topologies from scratch.

pub mod error;
pub mod react;

// Re-export commonly used types
pub use error::{AgentError, Result};
pub use react::{create_react_agent, transcript_messages, ReactAgent, ReactAgentConfig};
