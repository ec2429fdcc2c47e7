//! Configuration types for chat model requests.

use crate::llm::tools::ToolDefinition;
use crate::messages::Message;

/// A request to a chat model containing messages and configuration.
///
/// This is the input type for [`ChatModel::chat`](crate::llm::ChatModel::chat).
/// It bundles the transcript with generation parameters.
///
/// # Example
///
/// ```rust
/// use lattice_core::llm::ChatRequest;
/// use lattice_core::Message;
///
/// let request = ChatRequest::new(vec![
///     Message::system("You are a helpful assistant"),
///     Message::user("What is the capital of France?"),
/// ])
/// .with_temperature(0.7)
/// .with_max_tokens(1000);
///
/// assert_eq!(request.messages.len(), 2);
/// assert_eq!(request.config.temperature, Some(0.7));
/// ```
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The conversation messages to send to the model.
    pub messages: Vec<Message>,

    /// Generation parameters.
    pub config: ChatConfig,
}

impl ChatRequest {
    /// Create a new chat request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: ChatConfig::default(),
        }
    }

    /// Set the sampling temperature.
    ///
    /// Lower values are more deterministic; higher values more diverse.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Add stop sequences that halt generation.
    pub fn with_stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.config.stop_sequences = sequences;
        self
    }

    /// Bind tools the model may call.
    ///
    /// The model can then request execution via `tool_calls` on its
    /// response message.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.config.tools = tools;
        self
    }
}

/// Generation parameters for a chat request.
///
/// Not every backend honors every parameter; implementations document what
/// they pass through.
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Sampling temperature (provider-dependent range, usually 0.0-2.0).
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    pub max_tokens: Option<usize>,

    /// Sequences that stop generation when produced.
    pub stop_sequences: Vec<String>,

    /// Tool definitions for function-calling models.
    pub tools: Vec<ToolDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_config() {
        let request = ChatRequest::new(vec![Message::user("test")])
            .with_temperature(0.7)
            .with_max_tokens(100)
            .with_stop_sequences(vec!["###".to_string()]);

        assert_eq!(request.config.temperature, Some(0.7));
        assert_eq!(request.config.max_tokens, Some(100));
        assert_eq!(request.config.stop_sequences, vec!["###".to_string()]);
    }

    #[test]
    fn default_config_is_empty() {
        let config = ChatConfig::default();
        assert!(config.temperature.is_none());
        assert!(config.max_tokens.is_none());
        assert!(config.stop_sequences.is_empty());
        assert!(config.tools.is_empty());
    }

    #[test]
    fn tools_ride_along() {
        let request = ChatRequest::new(vec![Message::user("weather?")]).with_tools(vec![
            ToolDefinition::new("get_weather", "Look up current weather"),
        ]);
        assert_eq!(request.config.tools.len(), 1);
        assert_eq!(request.config.tools[0].name, "get_weather");
    }
}
