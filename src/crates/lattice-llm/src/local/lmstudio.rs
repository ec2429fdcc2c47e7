//! LM Studio client implementation.
//!
//! Talks to LM Studio's local server, which exposes an OpenAI-compatible
//! API for whatever model is currently loaded. No credential is required.
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_llm::local::{lmstudio, LmStudioClient};
//! use lattice_llm::config::LocalLlmConfig;
//! use lattice_core::llm::{ChatModel, ChatRequest};
//! use lattice_core::Message;
//!
//! let config = LocalLlmConfig::new(lmstudio::DEFAULT_BASE_URL, "qwen2.5-7b-instruct");
//! let client = LmStudioClient::new(config);
//!
//! if client.is_available().await? {
//!     let request = ChatRequest::new(vec![Message::user("Hello!")]);
//!     let response = client.chat(request).await?;
//!     println!("{}", response.message.content);
//! }
//! ```

use crate::config::LocalLlmConfig;
use crate::error::{LlmError, Result};
use crate::retry::with_retries;
use crate::wire;
use async_trait::async_trait;
use lattice_core::error::Result as GraphResult;
use lattice_core::llm::{ChatModel, ChatRequest, ChatResponse};
use reqwest::Client;

/// Default local server endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/v1";

/// LM Studio local server client.
#[derive(Clone)]
pub struct LmStudioClient {
    config: LocalLlmConfig,
    client: Client,
}

impl LmStudioClient {
    /// Create a new LM Studio client with the given configuration.
    pub fn new(config: LocalLlmConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Probe `GET {base_url}/models` to see whether the server is up.
    pub async fn check_health(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| wire::transport_error("LM Studio", e))?;

        Ok(response.status().is_success())
    }

    /// One round trip against `/chat/completions`, without retries.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = wire::build_request(&self.config.model, request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| wire::transport_error("LM Studio", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(wire::map_status("LM Studio", status, &text));
        }

        let payload: wire::ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("LM Studio: {}", e)))?;

        wire::decode_response(payload)
    }
}

#[async_trait]
impl ChatModel for LmStudioClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let response = with_retries(self.config.max_retries, || self.send_chat(&request)).await?;
        Ok(response)
    }

    async fn is_available(&self) -> GraphResult<bool> {
        Ok(self.check_health().await.unwrap_or(false))
    }

    fn clone_box(&self) -> Box<dyn ChatModel> {
        Box::new(self.clone())
    }
}
