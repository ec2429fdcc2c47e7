//! OpenAI client implementation.
//!
//! Talks to OpenAI's chat-completions API, supporting models like GPT-4o,
//! GPT-4 Turbo, and GPT-3.5 Turbo.
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_llm::remote::OpenAiClient;
//! use lattice_core::llm::{ChatModel, ChatRequest};
//! use lattice_core::Message;
//!
//! let client = OpenAiClient::from_env()?;
//!
//! let request = ChatRequest::new(vec![Message::user("Hello!")]);
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
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create a client from `OPENAI_API_KEY` with the default endpoint
    /// and model.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RemoteLlmConfig::from_env(
            "OPENAI_API_KEY",
            DEFAULT_BASE_URL,
            DEFAULT_MODEL,
        )?))
    }

    /// One round trip against `/chat/completions`, without retries.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = wire::build_request(&self.config.model, request);

        let mut http = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key));
        if let Some(organization) = &self.config.organization {
            http = http.header("OpenAI-Organization", organization);
        }

        let response = http
            .json(&body)
            .send()
            .await
            .map_err(|e| wire::transport_error("OpenAI", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(wire::map_status("OpenAI", status, &text));
        }

        let payload: wire::ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("OpenAI: {}", e)))?;

        wire::decode_response(payload)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let response = with_retries(self.config.max_retries, || self.send_chat(&request)).await?;
        Ok(response)
    }

    fn clone_box(&self) -> Box<dyn ChatModel> {
        Box::new(self.clone())
    }
}
