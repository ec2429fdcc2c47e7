//! Model backend abstraction.
//!
//! This module defines the provider-agnostic surface the graph engine and
//! agent loop program against. The core crate ships **traits and types**
//! only; concrete HTTP clients (OpenAI, DeepSeek, LM Studio) live in the
//! `lattice-llm` crate and any backend can be swapped in by implementing
//! [`ChatModel`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lattice_core::llm::{ChatModel, ChatRequest, ChatResponse};
//! use lattice_core::Message;
//! use async_trait::async_trait;
//!
//! struct MyBackend {
//!     model: String,
//! }
//!
//! #[async_trait]
//! impl ChatModel for MyBackend {
//!     async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
//!         // Convert messages to the provider's format, call it, convert back.
//!         todo!()
//!     }
//!
//!     fn clone_box(&self) -> Box<dyn ChatModel> {
//!         Box::new(MyBackend { model: self.model.clone() })
//!     }
//! }
//!
//! let request = ChatRequest::new(vec![Message::user("Hello!")])
//!     .with_temperature(0.7);
//! let response = backend.chat(request).await?;
//! println!("{}", response.message.content);
//! ```
//!
//! # See Also
//!
//! - [`ChatModel`] - The trait backends implement
//! - [`ChatRequest`] - Request with builder-style configuration
//! - [`ChatResponse`] - Response message plus usage accounting
//! - [`ToolDefinition`] - Function descriptors sent to the model

pub mod config;
pub mod response;
pub mod tools;
pub mod traits;

pub use config::{ChatConfig, ChatRequest};
pub use response::{ChatResponse, UsageMetadata};
pub use tools::ToolDefinition;
pub use traits::ChatModel;
