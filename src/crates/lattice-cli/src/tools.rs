//! Model-delegating tools.
//!
//! Each tool wraps a whole backend client: the orchestrator forwards a
//! question, the sub-model answers it in one round trip, and the answer
//! comes back as the tool observation.

use crate::backends;
use lattice_core::llm::{ChatModel, ChatRequest};
use lattice_core::tool::{Tool, ToolError, ToolRegistry};
use lattice_core::Message;
use serde_json::{json, Value};
use std::sync::Arc;

fn question_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "question": {
                "type": "string",
                "description": "The question to forward to the model"
            }
        },
        "required": ["question"]
    })
}

/// Wrap a backend as a single-question tool.
///
/// The sub-model sees only the forwarded question, never the
/// orchestrator's transcript.
fn delegate_tool(
    name: &'static str,
    description: &'static str,
    model: Box<dyn ChatModel>,
    temperature: Option<f32>,
) -> Tool {
    Tool::new(
        name,
        description,
        question_schema(),
        Arc::new(move |args: Value| {
            let model = model.clone();
            Box::pin(async move {
                let question = args
                    .get("question")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| ToolError::InvalidArguments {
                        tool: name.to_string(),
                        error: "missing string field 'question'".to_string(),
                    })?;

                tracing::debug!(tool = name, "delegating question");

                let mut request = ChatRequest::new(vec![Message::user(question)]);
                if let Some(temperature) = temperature {
                    request = request.with_temperature(temperature);
                }

                let response =
                    model
                        .chat(request)
                        .await
                        .map_err(|e| ToolError::Execution {
                            tool: name.to_string(),
                            error: e.to_string(),
                        })?;

                Ok(Value::String(response.message.content))
            })
        }),
    )
}

/// Tool that forwards a question to the DeepSeek backend.
pub fn ask_deepseek_tool() -> anyhow::Result<Tool> {
    let client = backends::deepseek_from_env()?;
    Ok(delegate_tool(
        "ask_deepseek",
        "Use the DeepSeek model for technical reasoning.",
        Box::new(client),
        None,
    ))
}

/// Tool that forwards a question to the local LM Studio server.
pub fn ask_local_model_tool() -> Tool {
    let client = backends::local_from_env();
    delegate_tool(
        "ask_local_model",
        "Use the local LM Studio model for creative explanations.",
        Box::new(client),
        Some(0.7),
    )
}

/// The orchestrator's registry: both delegate tools.
pub fn delegate_registry() -> anyhow::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(ask_deepseek_tool()?)?;
    registry.register(ask_local_model_tool())?;
    Ok(registry)
}
