//! Response types for chat model backends.

use crate::messages::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A complete response from a chat model.
///
/// The assistant turn produced by the backend, plus token accounting and
/// any provider-specific extras a client wants to surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's message, including any requested tool calls.
    pub message: Message,

    /// Token usage for this round trip, when the provider reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,

    /// Provider-specific metadata (finish reason, model id, etc).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl ChatResponse {
    /// Create a response carrying just a message.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach usage accounting.
    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Token usage accounting for a single model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    /// Tokens consumed by the prompt.
    pub input_tokens: u32,

    /// Tokens generated in the response.
    pub output_tokens: u32,

    /// Total tokens for the round trip.
    pub total_tokens: u32,
}
