//! Local LLM backends.
//!
//! Servers running on localhost or the local network. These need no API
//! key, keep data on the machine, and work offline, while still speaking
//! the OpenAI-compatible chat-completions dialect.
//!
//! # Backends
//!
//! - **LM Studio** - desktop app serving whatever model is loaded

pub mod lmstudio;

pub use lmstudio::LmStudioClient;
