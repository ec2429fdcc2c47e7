//! Message types and the message-list reducer for conversational state
//!
//! This module provides the message vocabulary shared by the graph engine,
//! the model adapters, and the agent loop. A conversation transcript is a
//! `Vec<Message>` stored under the `messages` channel of the graph state and
//! merged across steps with [`add_messages`].
//!
//! # Core Types
//!
//! [`Message`] is the central type representing a single message in a
//! conversation:
//!
//! ```rust
//! use lattice_core::messages::Message;
//!
//! let user = Message::user("what is the weather in sf");
//! let reply = Message::assistant("It is sunny in San Francisco.");
//! let system = Message::system("You are a helpful assistant.");
//! ```
//!
//! [`MessageRole`] identifies the speaker and serializes to the lowercase
//! strings used on the wire: `"system"`, `"user"`, `"assistant"`, `"tool"`.
//!
//! # Merging with `add_messages`
//!
//! The [`add_messages`] reducer appends new messages to the transcript,
//! replacing in place when an incoming message carries the id of an existing
//! one:
//!
//! ```rust
//! use lattice_core::messages::{Message, add_messages};
//!
//! let history = vec![
//!     Message::user("Question 1").with_id("msg1"),
//!     Message::assistant("Answer 1").with_id("msg2"),
//! ];
//!
//! let merged = add_messages(history, vec![Message::user("Question 2").with_id("msg3")]);
//! assert_eq!(merged.len(), 3);
//!
//! // Same id replaces instead of appending
//! let corrected = add_messages(merged, vec![Message::assistant("Answer 1, revised").with_id("msg2")]);
//! assert_eq!(corrected.len(), 3);
//! assert_eq!(corrected[1].content, "Answer 1, revised");
//! ```
//!
//! Messages without an id are assigned a UUID during merging so that later
//! updates can target them.
//!
//! # See Also
//!
//! - [`channel`](crate::channel) - Registering `add_messages` as a channel reducer
//! - [`tool`](crate::tool) - Tool calls carried on assistant messages

use crate::tool::ToolCall;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the message sender in a conversation.
///
/// Serializes to lowercase strings compatible with OpenAI-style chat APIs:
/// `System` → `"system"`, `User` → `"user"`, `Assistant` → `"assistant"`,
/// `Tool` → `"tool"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message providing instructions, context, or constraints.
    System,

    /// End-user message containing input or queries.
    User,

    /// Model message containing generated responses and tool-call requests.
    Assistant,

    /// Tool execution result, correlated to a request via `tool_call_id`.
    Tool,
}

impl MessageRole {
    /// The lowercase wire form of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// A single message in a conversation transcript.
///
/// Optional fields are omitted from the serialized form when absent, so the
/// wire shape of a plain user message is just `{"role": "user", "content":
/// "..."}` (plus the id once one has been assigned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, used by [`add_messages`] for in-place replacement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Role of the message sender
    pub role: MessageRole,

    /// Message text
    pub content: String,

    /// Optional sender name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tool calls requested by the model (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Id of the tool call this message answers (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new message with the given role and content
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a tool result message answering the given tool call
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            role: MessageRole::Tool,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Set the message id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the sender name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach tool calls (for assistant messages)
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// Assign a UUID if this message has no id yet
    pub fn ensure_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(Uuid::new_v4().to_string());
        }
    }

    /// Whether this message carries at least one tool call
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|calls| !calls.is_empty())
            .unwrap_or(false)
    }
}

/// The `add_messages` reducer function
///
/// Merges a message-list update into the existing transcript:
/// - messages whose id matches an existing message replace it in place,
/// - all other messages are appended in update order,
/// - messages without an id are assigned one before merging.
///
/// Replacement keeps the original position, so correcting an earlier message
/// never reorders the transcript.
///
/// # Examples
///
/// ```rust
/// use lattice_core::messages::{Message, add_messages};
///
/// let merged = add_messages(
///     vec![Message::user("Hello").with_id("1")],
///     vec![Message::user("Hello again").with_id("1")],
/// );
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].content, "Hello again");
/// ```
pub fn add_messages(left: Vec<Message>, right: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = left
        .into_iter()
        .map(|mut m| {
            m.ensure_id();
            m
        })
        .collect();

    for mut message in right {
        message.ensure_id();
        let id = message.id.clone();
        let existing = merged
            .iter()
            .position(|m| m.id.is_some() && m.id == id);
        match existing {
            Some(idx) => merged[idx] = message,
            None => merged.push(message),
        }
    }

    merged
}
