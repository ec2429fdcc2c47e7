//! OpenAI-compatible chat-completions wire format.
//!
//! Every backend this crate ships speaks the same `/chat/completions`
//! dialect, so the request/response bodies, message conversion, and error
//! mapping live here once and each client only supplies its transport
//! details (base URL, auth headers).

use crate::error::{LlmError, Result};
use lattice_core::llm::{ChatRequest, ChatResponse, ToolDefinition, UsageMetadata};
use lattice_core::{Message, ToolCall};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Request body for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,
    pub stream: bool,
}

/// One message in the wire transcript, used in both directions.
///
/// `content` is nullable because assistant messages that only carry tool
/// calls come back with `"content": null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: String,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<MessageToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSchema,
}

/// Function descriptor inside a [`ToolSchema`].
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

/// Function name plus JSON-encoded argument string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Response body from `/chat/completions`. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Build the wire request for a chat round trip against `model`.
pub fn build_request(model: &str, request: &ChatRequest) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: request.messages.iter().map(encode_message).collect(),
        temperature: request.config.temperature,
        max_tokens: request.config.max_tokens,
        stop: request.config.stop_sequences.clone(),
        tools: encode_tools(&request.config.tools),
        stream: false,
    }
}

/// Convert a transcript message to its wire form.
///
/// Tool-call arguments travel as a JSON-encoded string, not a JSON object.
pub fn encode_message(message: &Message) -> ChatCompletionMessage {
    let tool_calls = message.tool_calls.as_ref().map(|calls| {
        calls
            .iter()
            .map(|call| MessageToolCall {
                id: call.id.clone(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.to_string(),
                },
            })
            .collect()
    });

    ChatCompletionMessage {
        role: message.role.as_str().to_string(),
        content: Some(message.content.clone()),
        name: message.name.clone(),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn encode_tools(tools: &[ToolDefinition]) -> Vec<ToolSchema> {
    tools
        .iter()
        .map(|tool| ToolSchema {
            kind: "function".to_string(),
            function: FunctionSchema {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool
                    .parameters
                    .clone()
                    .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
            },
        })
        .collect()
}

/// Convert a wire response into a [`ChatResponse`].
///
/// Takes the first choice; the provider's model name and finish reason are
/// kept in the response metadata under `"model"` and `"finish_reason"`.
pub fn decode_response(response: ChatCompletionResponse) -> Result<ChatResponse> {
    let ChatCompletionResponse {
        model,
        choices,
        usage,
    } = response;

    let choice = choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

    let mut reply = Message::assistant(choice.message.content.unwrap_or_default());
    if let Some(calls) = choice.message.tool_calls {
        if !calls.is_empty() {
            let calls = calls
                .into_iter()
                .map(decode_tool_call)
                .collect::<Result<Vec<_>>>()?;
            reply = reply.with_tool_calls(calls);
        }
    }

    let mut decoded = ChatResponse::new(reply);
    if let Some(usage) = usage {
        decoded = decoded.with_usage(UsageMetadata {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        });
    }
    if let Some(model) = model {
        decoded
            .metadata
            .insert("model".to_string(), Value::String(model));
    }
    if let Some(reason) = choice.finish_reason {
        decoded
            .metadata
            .insert("finish_reason".to_string(), Value::String(reason));
    }

    Ok(decoded)
}

fn decode_tool_call(call: MessageToolCall) -> Result<ToolCall> {
    // Some servers send "" instead of "{}" for a no-argument call.
    let arguments = if call.function.arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&call.function.arguments).map_err(|e| {
            LlmError::InvalidResponse(format!(
                "tool call '{}' carried malformed arguments: {}",
                call.function.name, e
            ))
        })?
    };

    Ok(ToolCall::new(call.function.name, arguments).with_id(call.id))
}

/// Map a non-success HTTP status onto an [`LlmError`].
pub fn map_status(provider: &str, status: StatusCode, body: &str) -> LlmError {
    match status.as_u16() {
        401 => LlmError::AuthenticationError(format!("{}: {}", provider, body)),
        404 => LlmError::ModelNotFound(format!("{}: {}", provider, body)),
        429 => LlmError::RateLimitExceeded(format!("{}: {}", provider, body)),
        500..=599 => {
            LlmError::ServiceUnavailable(format!("{} returned {}: {}", provider, status, body))
        }
        _ => LlmError::ProviderError(format!("{} returned {}: {}", provider, status, body)),
    }
}

/// Map a transport-level failure onto an [`LlmError`].
///
/// Elapsed deadlines become [`LlmError::Timeout`] and connect failures
/// become [`LlmError::ServiceUnavailable`]; anything else keeps the raw
/// `reqwest` error.
pub fn transport_error(provider: &str, err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(format!("{} request timed out: {}", provider, err))
    } else if err.is_connect() {
        LlmError::ServiceUnavailable(format!("{} unreachable: {}", provider, err))
    } else {
        LlmError::HttpError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_minimal() {
        let request = ChatRequest::new(vec![Message::user("Hello!")]);
        let wire = build_request("gpt-4o", &request);
        let body = serde_json::to_value(&wire).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hello!");
        assert_eq!(body["stream"], false);
        // Unset knobs stay off the wire entirely
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stop").is_none());
        assert!(body.get("tools").is_none());
        assert!(body["messages"][0].get("tool_calls").is_none());
    }

    #[test]
    fn test_build_request_with_sampling() {
        let request = ChatRequest::new(vec![Message::user("Hello!")])
            .with_temperature(0.5)
            .with_max_tokens(256)
            .with_stop_sequences(vec!["DONE".to_string()]);
        let body = serde_json::to_value(build_request("gpt-4o", &request)).unwrap();

        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stop"], json!(["DONE"]));
    }

    #[test]
    fn test_build_request_encodes_tools() {
        let schema = json!({
            "type": "object",
            "properties": {"question": {"type": "string"}},
            "required": ["question"]
        });
        let request = ChatRequest::new(vec![Message::user("weather?")]).with_tools(vec![
            ToolDefinition::new("ask_deepseek", "Ask the reasoning model")
                .with_parameters(schema.clone()),
            ToolDefinition::new("get_time", "Current UTC time"),
        ]);
        let body = serde_json::to_value(build_request("gpt-4o", &request)).unwrap();

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "ask_deepseek");
        assert_eq!(
            body["tools"][0]["function"]["description"],
            "Ask the reasoning model"
        );
        assert_eq!(body["tools"][0]["function"]["parameters"], schema);
        // A tool without parameters still advertises an object schema
        assert_eq!(
            body["tools"][1]["function"]["parameters"],
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn test_encode_assistant_tool_calls() {
        let message = Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "search",
            json!({"query": "rust"}),
        )
        .with_id("call_1")]);
        let wire = encode_message(&message);

        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].kind, "function");
        assert_eq!(calls[0].function.name, "search");
        // Arguments are a JSON-encoded string on the wire
        let parsed: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(parsed, json!({"query": "rust"}));
    }

    #[test]
    fn test_encode_tool_result_message() {
        let wire = encode_message(&Message::tool("72 and sunny", "call_1"));

        assert_eq!(wire.role, "tool");
        assert_eq!(wire.content, Some("72 and sunny".to_string()));
        assert_eq!(wire.tool_call_id, Some("call_1".to_string()));
    }

    #[test]
    fn test_decode_plain_response() {
        // Realistic body with fields we do not model; they must be ignored.
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1721000000,
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hi there!"},
                "logprobs": null,
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }))
        .unwrap();

        let decoded = decode_response(response).unwrap();
        assert_eq!(decoded.message.content, "Hi there!");
        assert!(decoded.message.tool_calls.is_none());

        let usage = decoded.usage.unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 4);
        assert_eq!(usage.total_tokens, 16);

        assert_eq!(decoded.metadata["model"], "gpt-4o-2024-08-06");
        assert_eq!(decoded.metadata["finish_reason"], "stop");
    }

    #[test]
    fn test_decode_tool_call_response() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "model": "deepseek-chat",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"city\": \"sf\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let decoded = decode_response(response).unwrap();
        // Null content becomes an empty string
        assert_eq!(decoded.message.content, "");

        let calls = decoded.message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_abc");
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, json!({"city": "sf"}));
    }

    #[test]
    fn test_decode_empty_arguments() {
        let call = MessageToolCall {
            id: "call_1".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "get_time".to_string(),
                arguments: "  ".to_string(),
            },
        };
        assert_eq!(decode_tool_call(call).unwrap().arguments, json!({}));
    }

    #[test]
    fn test_decode_malformed_arguments() {
        let call = MessageToolCall {
            id: "call_1".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "get_time".to_string(),
                arguments: "{not json".to_string(),
            },
        };
        let err = decode_tool_call(call).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
        assert!(err.to_string().contains("get_time"));
    }

    #[test]
    fn test_decode_no_choices() {
        let response: ChatCompletionResponse =
            serde_json::from_value(json!({"model": "gpt-4o", "choices": []})).unwrap();
        let err = decode_response(response).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_map_status_matrix() {
        let cases = [
            (401, "Authentication failed"),
            (404, "Model not found"),
            (429, "Rate limit exceeded"),
            (500, "Service unavailable"),
            (503, "Service unavailable"),
            (418, "Provider error"),
        ];
        for (code, prefix) in cases {
            let err = map_status("OpenAI", StatusCode::from_u16(code).unwrap(), "body");
            assert!(
                err.to_string().starts_with(prefix),
                "status {} mapped to {}",
                code,
                err
            );
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = map_status("LM Studio", StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(err.is_retryable());
        let err = map_status("OpenAI", StatusCode::UNAUTHORIZED, "bad key");
        assert!(!err.is_retryable());
    }
}
