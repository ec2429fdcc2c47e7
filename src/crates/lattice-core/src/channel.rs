//! Channels and reducers for graph state
//!
//! Graph state is a JSON object whose top-level keys are **channels**. When
//! a node returns an update, each updated channel is merged into the state
//! by its registered [`Reducer`]; channels without a registered reducer are
//! overwritten. The engine bumps a per-channel version for every channel a
//! step writes, which is how checkpoints track what changed when.
//!
//! # Built-in Reducers
//!
//! | Reducer | Behavior | Use Case |
//! |---------|----------|----------|
//! | [`OverwriteReducer`] | Last write wins | Scalars, flags, routing hints |
//! | [`AppendReducer`] | Concatenate arrays | Event logs, plain lists |
//! | [`MessagesReducer`] | [`add_messages`] merge | Conversation transcripts |
//!
//! # Example
//!
//! ```rust
//! use lattice_core::channel::{AppendReducer, ChannelSchema, OverwriteReducer};
//! use serde_json::json;
//!
//! let mut schema = ChannelSchema::new();
//! schema.add_channel("events", Box::new(AppendReducer));
//! schema.add_channel("status", Box::new(OverwriteReducer));
//!
//! let mut state = json!({"events": ["started"], "status": "running"});
//! let written = schema
//!     .apply(&mut state, &json!({"events": ["finished"], "status": "done"}))
//!     .unwrap();
//!
//! assert_eq!(state["events"], json!(["started", "finished"]));
//! assert_eq!(state["status"], "done");
//! assert_eq!(written, vec!["events".to_string(), "status".to_string()]);
//! ```

use crate::error::{GraphError, Result};
use crate::messages::{add_messages, Message};
use serde_json::Value;
use std::collections::HashMap;

/// Trait for merging a channel update into its current value
///
/// Reducers define how successive writes to the same channel combine.
/// `current` is `Value::Null` the first time a channel is written.
pub trait Reducer: Send + Sync {
    /// Merge `update` into `current`, producing the new channel value
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value>;

    /// Human-readable name for diagnostics
    fn name(&self) -> &str;
}

/// Replaces the current value with the update
///
/// The default behavior for channels without a registered reducer.
#[derive(Debug, Clone)]
pub struct OverwriteReducer;

impl Reducer for OverwriteReducer {
    fn reduce(&self, _current: &Value, update: &Value) -> Result<Value> {
        Ok(update.clone())
    }

    fn name(&self) -> &str {
        "overwrite"
    }
}

/// Concatenates the update onto the current array
///
/// A scalar update is appended as a single element; a null current value
/// initializes the channel.
#[derive(Debug, Clone)]
pub struct AppendReducer;

impl Reducer for AppendReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        match (current, update) {
            (Value::Array(curr), Value::Array(upd)) => {
                let mut result = curr.clone();
                result.extend_from_slice(upd);
                Ok(Value::Array(result))
            }
            (Value::Null, Value::Array(upd)) => Ok(Value::Array(upd.clone())),
            (Value::Array(curr), single) => {
                let mut result = curr.clone();
                result.push(single.clone());
                Ok(Value::Array(result))
            }
            (Value::Null, single) => Ok(Value::Array(vec![single.clone()])),
            _ => Err(GraphError::Execution(
                "append reducer requires array values".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "append"
    }
}

/// Merges message lists with [`add_messages`]
///
/// The update may be a message array or a single message object. Messages
/// whose id matches an existing transcript entry replace it in place;
/// everything else is appended in order.
#[derive(Debug, Clone)]
pub struct MessagesReducer;

impl MessagesReducer {
    fn parse(&self, value: &Value, side: &str) -> Result<Vec<Message>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(_) => serde_json::from_value(value.clone()).map_err(GraphError::from),
            Value::Object(_) => {
                let single: Message = serde_json::from_value(value.clone())?;
                Ok(vec![single])
            }
            _ => Err(GraphError::Execution(format!(
                "messages reducer requires a message or message array as {}",
                side
            ))),
        }
    }
}

impl Reducer for MessagesReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        let left = self.parse(current, "current value")?;
        let right = self.parse(update, "update")?;
        let merged = add_messages(left, right);
        serde_json::to_value(merged).map_err(GraphError::from)
    }

    fn name(&self) -> &str {
        "add_messages"
    }
}

/// Declares the channels of a graph and their reducers
///
/// Channels not declared here fall back to overwrite semantics.
#[derive(Default)]
pub struct ChannelSchema {
    reducers: HashMap<String, Box<dyn Reducer>>,
}

impl ChannelSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reducer for a channel
    pub fn add_channel(&mut self, name: impl Into<String>, reducer: Box<dyn Reducer>) {
        self.reducers.insert(name.into(), reducer);
    }

    /// Whether a channel has a registered reducer
    pub fn has_channel(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }

    /// Declared channel names, sorted
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.reducers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Merge an update object into the state, channel by channel
    ///
    /// Returns the names of the channels that were written, in the order
    /// they were applied. The engine bumps one version per returned name.
    pub fn apply(&self, state: &mut Value, update: &Value) -> Result<Vec<String>> {
        let update_obj = update.as_object().ok_or_else(|| {
            GraphError::Execution("state update must be a JSON object".to_string())
        })?;
        let state_obj = state
            .as_object_mut()
            .ok_or_else(|| GraphError::Execution("state must be a JSON object".to_string()))?;

        let mut written = Vec::with_capacity(update_obj.len());
        for (channel, update_value) in update_obj {
            let current = state_obj.get(channel).cloned().unwrap_or(Value::Null);
            let reduced = match self.reducers.get(channel) {
                Some(reducer) => reducer.reduce(&current, update_value)?,
                None => update_value.clone(),
            };
            state_obj.insert(channel.clone(), reduced);
            written.push(channel.clone());
        }

        Ok(written)
    }
}

impl std::fmt::Debug for ChannelSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSchema")
            .field("channels", &self.channel_names())
            .finish()
    }
}
