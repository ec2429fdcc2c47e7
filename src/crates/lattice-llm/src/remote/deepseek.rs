//! DeepSeek client implementation.
//!
//! Talks to DeepSeek's OpenAI-compatible API. `deepseek-chat` is the
//! general-purpose model; `deepseek-reasoner` trades latency for longer
//! chains of reasoning.
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_llm::remote::DeepseekClient;
//! use lattice_core::llm::{ChatModel, ChatRequest};
//! use lattice_core::Message;
//!
//! let client = DeepseekClient::from_env()?;
//!
//! let request = ChatRequest::new(vec![Message::user("What is Rust?")])
//!     .with_temperature(0.7);
//! let response = client.chat(request).await?;
//! println!("{}", response.message.content);
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::retry::with_retries;
use crate::wire;
use async_trait::async_trait;
use lattice_core::error::Result as GraphResult;
use lattice_core::llm::{ChatModel, ChatRequest, ChatResponse};
use reqwest::Client;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// DeepSeek API client.
#[derive(Clone)]
pub struct DeepseekClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl DeepseekClient {
    /// Create a new DeepSeek client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create a client from `DEEPSEEK_API_KEY` with the default endpoint
    /// and model.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RemoteLlmConfig::from_env(
            "DEEPSEEK_API_KEY",
            DEFAULT_BASE_URL,
            DEFAULT_MODEL,
        )?))
    }

    /// One round trip against `/chat/completions`, without retries.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = wire::build_request(&self.config.model, request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| wire::transport_error("DeepSeek", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(wire::map_status("DeepSeek", status, &text));
        }

        let payload: wire::ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("DeepSeek: {}", e)))?;

        wire::decode_response(payload)
    }
}

#[async_trait]
impl ChatModel for DeepseekClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let response = with_retries(self.config.max_retries, || self.send_chat(&request)).await?;
        Ok(response)
    }

    fn clone_box(&self) -> Box<dyn ChatModel> {
        Box::new(self.clone())
    }
}
