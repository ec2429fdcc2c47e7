//! Remote LLM backends.
//!
//! Cloud-hosted APIs that require an API key and offer managed
//! infrastructure and strong frontier models. Both speak the
//! OpenAI-compatible chat-completions dialect.
//!
//! # Backends
//!
//! - **OpenAI** - GPT-4o, GPT-4 Turbo, GPT-3.5 Turbo
//! - **DeepSeek** - deepseek-chat, deepseek-reasoner

pub mod deepseek;
pub mod openai;

pub use deepseek::DeepseekClient;
pub use openai::OpenAiClient;
