//! Tool descriptors for function-calling models.
//!
//! A [`ToolDefinition`] is the wire-facing description of a tool: name,
//! purpose, and a JSON Schema for its parameters. It deliberately carries
//! no executor; execution lives in [`tool`](crate::tool), and the two are
//! bridged by [`Tool::definition`](crate::tool::Tool::definition).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a tool/function that a model can call.
///
/// # Parameter Schema
///
/// The `parameters` field should be a JSON Schema object: `type: "object"`,
/// a `properties` map, and a `required` list. Models use the description
/// and schema to decide when and how to call the tool.
///
/// # Example
///
/// ```rust
/// use lattice_core::llm::ToolDefinition;
/// use serde_json::json;
///
/// let tool = ToolDefinition::new(
///     "get_weather",
///     "Get current weather for a location",
/// )
/// .with_parameters(json!({
///     "type": "object",
///     "properties": {
///         "location": {"type": "string", "description": "City name"}
///     },
///     "required": ["location"]
/// }));
///
/// assert_eq!(tool.name, "get_weather");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name, matched against tool call requests.
    pub name: String,

    /// Human-readable description the model uses to decide when to call.
    pub description: String,

    /// JSON Schema describing the parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDefinition {
    /// Create a new tool definition with name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
        }
    }

    /// Add a JSON Schema for the tool's parameters.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}
