//! Tool definitions, registration, and execution
//!
//! Tools are named async functions the model can request during a run. The
//! agent loop reads tool calls off assistant messages, executes them through
//! a [`ToolRegistry`], and feeds the results back as tool messages.
//!
//! # Quick Start
//!
//! ```rust
//! use lattice_core::tool::{Tool, ToolRegistry};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let weather = Tool::new(
//!         "get_weather",
//!         "Look up current weather for a city",
//!         json!({
//!             "type": "object",
//!             "properties": {"city": {"type": "string"}},
//!             "required": ["city"]
//!         }),
//!         Arc::new(|args: Value| {
//!             Box::pin(async move {
//!                 let city = args["city"].as_str().unwrap_or("somewhere");
//!                 Ok(json!(format!("72 and sunny in {}", city)))
//!             })
//!         }),
//!     );
//!
//!     let mut registry = ToolRegistry::new();
//!     registry.register(weather).unwrap();
//!
//!     let result = registry
//!         .invoke("get_weather", json!({"city": "sf"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(result, json!("72 and sunny in sf"));
//! }
//! ```
//!
//! # Error Folding
//!
//! [`ToolRegistry::invoke`] is strict: an unregistered name is an error.
//! [`ToolRegistry::execute_tool_call`] never fails the caller: unknown
//! tools, invalid arguments, and executor errors are all folded into a
//! [`ToolOutput::Error`] so the agent loop can hand the failure text back
//! to the model as an observation instead of aborting the run.
//!
//! # See Also
//!
//! - [`messages`](crate::messages) - Tool calls carried on assistant messages
//! - [`llm`](crate::llm) - Tool descriptors sent to model backends

use crate::llm::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Tool execution result
pub type ToolResult = Result<Value, ToolError>;

/// Future type for async tool execution
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Tool executor function type
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Errors that can occur during tool registration and execution
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum ToolError {
    /// Tool name not present in the registry
    #[error("Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool {
        /// The requested tool name
        name: String,
        /// Comma-separated registered names
        available: String,
    },

    /// Arguments rejected before execution
    #[error("Invalid arguments for tool '{tool}': {error}")]
    InvalidArguments { tool: String, error: String },

    /// Tool executor returned an error
    #[error("Tool '{tool}' execution failed: {error}")]
    Execution { tool: String, error: String },

    /// A tool with this name is already registered
    #[error("Tool '{name}' is already registered")]
    DuplicateTool { name: String },
}

/// Tool specification
pub struct Tool {
    /// Tool name, unique within a registry
    pub name: String,

    /// Human-readable description shown to the model
    pub description: String,

    /// Input schema (JSON Schema)
    pub input_schema: Value,

    /// Tool executor function
    pub executor: ToolExecutor,
}

impl Tool {
    /// Create a new tool
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            executor,
        }
    }

    /// Execute the tool with given arguments
    pub async fn execute(&self, args: Value) -> ToolResult {
        (self.executor)(args).await
    }

    /// Validate tool arguments before execution
    ///
    /// Arguments must be a JSON object; field-level constraints are the
    /// executor's responsibility.
    pub fn validate_args(&self, args: &Value) -> Result<(), ToolError> {
        if !args.is_object() {
            return Err(ToolError::InvalidArguments {
                tool: self.name.clone(),
                error: "Arguments must be an object".to_string(),
            });
        }
        Ok(())
    }

    /// The wire descriptor for this tool, without the executor
    pub fn definition(&self) -> ToolDefinition {
        let parameters = if self.input_schema.is_null() {
            None
        } else {
            Some(self.input_schema.clone())
        };
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters,
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Tool call request carried on an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call id, echoed back by the answering tool message
    pub id: String,

    /// Tool name to invoke
    pub name: String,

    /// Tool arguments (JSON object)
    pub arguments: Value,
}

impl ToolCall {
    /// Create a tool call with a generated id
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }

    /// Set the tool call id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Tool call id (matches the request)
    pub id: String,

    /// Tool name that was invoked
    pub name: String,

    /// Tool output (success or error)
    pub output: ToolOutput,
}

/// Tool execution output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutput {
    /// Successful execution
    Success { content: Value },

    /// Execution failed with error
    Error { error: String },
}

impl ToolOutput {
    /// Render this output as the observation text for a tool message
    ///
    /// String results pass through unquoted; other values are JSON-encoded.
    pub fn observation(&self) -> String {
        match self {
            Self::Success { content } => match content {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            Self::Error { error } => error.clone(),
        }
    }
}

/// Tool registry for managing available tools
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, rejecting duplicate names
    pub fn register(&mut self, tool: Tool) -> Result<(), ToolError> {
        if self.tools.contains_key(&tool.name) {
            return Err(ToolError::DuplicateTool { name: tool.name });
        }
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry holds no tools
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool names, sorted for stable error messages
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Wire descriptors for every registered tool, in name order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tool_names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(Tool::definition)
            .collect()
    }

    /// Invoke a tool by name
    ///
    /// Unlike [`execute_tool_call`](Self::execute_tool_call), an unknown
    /// name is an error here rather than a folded observation.
    pub async fn invoke(&self, name: &str, args: Value) -> ToolResult {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
            available: self.tool_names().join(", "),
        })?;
        tool.validate_args(&args)?;
        tool.execute(args).await
    }

    /// Execute a tool call, folding every failure into the output
    pub async fn execute_tool_call(&self, tool_call: &ToolCall) -> ToolCallResult {
        let output = match self.invoke(&tool_call.name, tool_call.arguments.clone()).await {
            Ok(content) => ToolOutput::Success { content },
            Err(e) => ToolOutput::Error {
                error: e.to_string(),
            },
        };
        ToolCallResult {
            id: tool_call.id.clone(),
            name: tool_call.name.clone(),
            output,
        }
    }

    /// Execute tool calls one at a time, in request order
    ///
    /// A run is strictly sequential; each call is awaited before the next
    /// starts, and results come back in the same order as the requests.
    pub async fn execute_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<ToolCallResult> {
        let mut results = Vec::with_capacity(tool_calls.len());
        for tool_call in tool_calls {
            results.push(self.execute_tool_call(tool_call).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool(name: &str) -> Tool {
        Tool::new(
            name,
            format!("Echo tool {}", name),
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            Arc::new(|args: Value| {
                Box::pin(async move { Ok(json!({"echo": args["text"].clone()})) })
            }),
        )
    }

    fn failing_tool(name: &str) -> Tool {
        let owned = name.to_string();
        Tool::new(
            name,
            "Always fails",
            json!({"type": "object"}),
            Arc::new(move |_args: Value| {
                let tool = owned.clone();
                Box::pin(async move {
                    Err(ToolError::Execution {
                        tool,
                        error: "simulated failure".to_string(),
                    })
                })
            }),
        )
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();
        let err = registry.register(echo_tool("echo")).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateTool { name } if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn invoke_runs_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();

        let result = registry.invoke("echo", json!({"text": "hi"})).await.unwrap();
        assert_eq!(result, json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_an_error() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("beta")).unwrap();
        registry.register(echo_tool("alpha")).unwrap();

        let err = registry.invoke("missing", json!({})).await.unwrap_err();
        match err {
            ToolError::UnknownTool { name, available } => {
                assert_eq!(name, "missing");
                assert_eq!(available, "alpha, beta");
            }
            other => panic!("expected UnknownTool, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn invoke_rejects_non_object_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("echo")).unwrap();

        let err = registry.invoke("echo", json!("just a string")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn execute_tool_call_folds_unknown_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall::new("missing", json!({})).with_id("call-7");

        let result = registry.execute_tool_call(&call).await;
        assert_eq!(result.id, "call-7");
        assert_eq!(result.name, "missing");
        match result.output {
            ToolOutput::Error { error } => assert!(error.contains("Unknown tool 'missing'")),
            other => panic!("expected folded error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn execute_tool_call_folds_executor_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(failing_tool("flaky")).unwrap();

        let call = ToolCall::new("flaky", json!({}));
        let result = registry.execute_tool_call(&call).await;
        match result.output {
            ToolOutput::Error { error } => {
                assert!(error.contains("simulated failure"));
            }
            other => panic!("expected folded error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn execute_tool_calls_preserves_request_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool("first")).unwrap();
        registry.register(echo_tool("second")).unwrap();

        let calls = vec![
            ToolCall::new("second", json!({"text": "b"})),
            ToolCall::new("first", json!({"text": "a"})),
        ];
        let results = registry.execute_tool_calls(&calls).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "second");
        assert_eq!(results[1].name, "first");
    }

    #[test]
    fn tool_output_serializes_with_status_tag() {
        let success = ToolOutput::Success {
            content: json!("done"),
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({"status": "success", "content": "done"})
        );

        let error = ToolOutput::Error {
            error: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"status": "error", "error": "boom"})
        );
    }

    #[test]
    fn observation_renders_strings_unquoted() {
        let text = ToolOutput::Success {
            content: json!("72 and sunny"),
        };
        assert_eq!(text.observation(), "72 and sunny");

        let structured = ToolOutput::Success {
            content: json!({"temp": 72}),
        };
        assert_eq!(structured.observation(), r#"{"temp":72}"#);

        let failed = ToolOutput::Error {
            error: "no such city".to_string(),
        };
        assert_eq!(failed.observation(), "no such city");
    }

    #[test]
    fn tool_call_ids_are_generated() {
        let call = ToolCall::new("echo", json!({}));
        assert!(call.id.starts_with("call_"));

        let value = serde_json::to_value(&call).unwrap();
        assert!(value.get("arguments").is_some());
    }

    #[test]
    fn definition_carries_schema() {
        let tool = echo_tool("echo");
        let def = tool.definition();
        assert_eq!(def.name, "echo");
        assert!(def.parameters.is_some());

        let bare = Tool::new(
            "bare",
            "No schema",
            Value::Null,
            Arc::new(|_args: Value| Box::pin(async { Ok(json!(null)) })),
        );
        assert!(bare.definition().parameters.is_none());
    }
}
