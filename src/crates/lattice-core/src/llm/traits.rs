//! Core trait for chat model backends.
//!
//! The engine is an orchestration layer, not an LLM client library: it
//! programs against [`ChatModel`] and never against a concrete provider.
//! Implementations handle message conversion, transport, authentication,
//! and retry for their particular backend.

use crate::error::Result;
use crate::llm::config::ChatRequest;
use crate::llm::response::ChatResponse;
use crate::llm::tools::ToolDefinition;
use async_trait::async_trait;

/// Core trait for chat-based language models.
///
/// One `chat` round trip is the only suspension point a backend introduces
/// into a run: the engine awaits the full response before taking the next
/// graph transition.
///
/// # Tool Calling
///
/// Backends that support function calling should:
/// 1. Encode `ToolDefinition`s from `request.config.tools` on the wire
/// 2. Surface requested calls in `response.message.tool_calls`
/// 3. Accept tool-role result messages in subsequent requests
///
/// # Threading and Safety
///
/// Implementations must be `Send + Sync`; use `Arc<dyn ChatModel>` to share
/// one backend across graph nodes.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete chat response from messages.
    ///
    /// # Errors
    ///
    /// Implementations surface transport and provider failures through
    /// their own error type converted into [`GraphError`](crate::error::GraphError);
    /// transient failures should be retried inside the implementation
    /// before erroring out.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Check if the backend is reachable and healthy.
    ///
    /// Useful for local servers that might not be running. The default
    /// implementation assumes availability.
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    /// Tools bound directly to this model instance.
    ///
    /// Most backends take tools per request via
    /// [`ChatRequest::with_tools`](crate::llm::ChatRequest::with_tools);
    /// the default is no bound tools.
    fn bound_tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Clone this model into a boxed trait object.
    fn clone_box(&self) -> Box<dyn ChatModel>;
}

impl Clone for Box<dyn ChatModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ChatModel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::response::UsageMetadata;
    use crate::messages::Message;
    use std::sync::Arc;

    #[derive(Clone)]
    struct MockModel {
        response_text: String,
    }

    #[async_trait]
    impl ChatModel for MockModel {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse {
                message: Message::assistant(self.response_text.clone()),
                usage: Some(UsageMetadata {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 15,
                }),
                metadata: std::collections::HashMap::new(),
            })
        }

        fn clone_box(&self) -> Box<dyn ChatModel> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let model: Arc<dyn ChatModel> = Arc::new(MockModel {
            response_text: "Hello!".to_string(),
        });

        let request = ChatRequest::new(vec![Message::user("Hi")]);
        let response = model.chat(request).await.unwrap();

        assert_eq!(response.message.content, "Hello!");
    }

    #[tokio::test]
    async fn default_availability_is_true() {
        let model = MockModel {
            response_text: "test".to_string(),
        };
        assert!(model.is_available().await.unwrap());
        assert!(model.bound_tools().is_empty());
    }

    #[test]
    fn boxed_models_clone() {
        let model: Box<dyn ChatModel> = Box::new(MockModel {
            response_text: "clone me".to_string(),
        });
        let _cloned = model.clone();
    }
}
