//! LLM backend clients for lattice.
//!
//! This crate provides concrete implementations of the `ChatModel` trait
//! from `lattice-core` for OpenAI-compatible backends, both local and
//! remote. The graph engine and agent loop only ever see the trait; any
//! client here (or one you write yourself) can be dropped in.
//!
//! # Remote Backends
//!
//! Remote backends connect to cloud-hosted APIs and need an API key:
//! - **OpenAI** - GPT-4o, GPT-4 Turbo, GPT-3.5 Turbo
//! - **DeepSeek** - deepseek-chat, deepseek-reasoner
//!
//! # Local Backends
//!
//! Local backends connect to servers on localhost, need no credential,
//! and keep data on the machine:
//! - **LM Studio** - OpenAI-compatible server for whatever model is loaded
//!
//! # Example Usage
//!
//! ## Remote Backend (DeepSeek)
//!
//! ```rust,ignore
//! use lattice_llm::remote::DeepseekClient;
//! use lattice_core::llm::{ChatModel, ChatRequest};
//! use lattice_core::Message;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DeepseekClient::from_env()?;
//!
//!     let request = ChatRequest::new(vec![Message::user("What is Rust?")])
//!         .with_temperature(0.7);
//!     let response = client.chat(request).await?;
//!     println!("{}", response.message.content);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Local Backend (LM Studio)
//!
//! ```rust,ignore
//! use lattice_llm::config::LocalLlmConfig;
//! use lattice_llm::local::{lmstudio, LmStudioClient};
//! use lattice_core::llm::{ChatModel, ChatRequest};
//! use lattice_core::Message;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LocalLlmConfig::new(lmstudio::DEFAULT_BASE_URL, "qwen2.5-7b-instruct");
//!     let client = LmStudioClient::new(config);
//!
//!     if client.is_available().await? {
//!         let request = ChatRequest::new(vec![Message::user("Hello!")]);
//!         let response = client.chat(request).await?;
//!         println!("{}", response.message.content);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Retries
//!
//! Every client retries retryable failures (connect errors, 5xx, rate
//! limits, elapsed deadlines) with bounded exponential backoff before
//! surfacing the last error. The budget comes from the configuration's
//! `max_retries`.

pub mod config;
pub mod error;

mod retry;
mod wire;

#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "remote")]
pub mod remote;

// Re-export commonly used types
pub use config::{LocalLlmConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};

// Re-export core model types for convenience
pub use lattice_core::llm::{
    ChatConfig, ChatModel, ChatRequest, ChatResponse, ToolDefinition, UsageMetadata,
};
pub use lattice_core::{Message, ToolCall};
