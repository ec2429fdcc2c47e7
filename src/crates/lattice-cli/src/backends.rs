//! Backend construction from environment variables.
//!
//! Credentials and model ids come from the environment so the binary runs
//! without a config file: `OPENAI_API_KEY`/`OPENAI_MODEL`,
//! `DEEPSEEK_API_KEY`/`DEEPSEEK_MODEL`, and `LM_STUDIO_URL`/
//! `LM_STUDIO_MODEL` for the local server.

use anyhow::bail;
use lattice_core::llm::ChatModel;
use lattice_llm::config::{LocalLlmConfig, RemoteLlmConfig};
use lattice_llm::local::{lmstudio, LmStudioClient};
use lattice_llm::remote::{deepseek, openai, DeepseekClient, OpenAiClient};

/// Selects the model that drives the orchestrator loop.
pub const ORCHESTRATOR_ENV: &str = "LATTICE_ORCHESTRATOR";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Build the orchestrator model named by `LATTICE_ORCHESTRATOR`.
///
/// Defaults to OpenAI; `deepseek` and `lmstudio` select the other
/// backends. The local server needs no credential.
pub fn orchestrator_from_env() -> anyhow::Result<Box<dyn ChatModel>> {
    let provider = env_or(ORCHESTRATOR_ENV, "openai").to_lowercase();

    match provider.as_str() {
        "openai" => Ok(Box::new(openai_from_env()?)),
        "deepseek" => Ok(Box::new(deepseek_from_env()?)),
        "lmstudio" | "local" => Ok(Box::new(local_from_env())),
        other => bail!(
            "Unsupported orchestrator '{}'. Available: openai, deepseek, lmstudio",
            other
        ),
    }
}

/// OpenAI client from `OPENAI_API_KEY`, model overridable via
/// `OPENAI_MODEL`.
pub fn openai_from_env() -> anyhow::Result<OpenAiClient> {
    let config = RemoteLlmConfig::from_env(
        "OPENAI_API_KEY",
        openai::DEFAULT_BASE_URL,
        env_or("OPENAI_MODEL", openai::DEFAULT_MODEL),
    )?;
    Ok(OpenAiClient::new(config))
}

/// DeepSeek client from `DEEPSEEK_API_KEY`, model overridable via
/// `DEEPSEEK_MODEL`.
pub fn deepseek_from_env() -> anyhow::Result<DeepseekClient> {
    let config = RemoteLlmConfig::from_env(
        "DEEPSEEK_API_KEY",
        deepseek::DEFAULT_BASE_URL,
        env_or("DEEPSEEK_MODEL", deepseek::DEFAULT_MODEL),
    )?;
    Ok(DeepseekClient::new(config))
}

/// LM Studio client pointed at `LM_STUDIO_URL` (default local port 8000).
///
/// LM Studio serves whichever model is loaded in the UI, so the model id
/// is a label more than a selector.
pub fn local_from_env() -> LmStudioClient {
    let config = LocalLlmConfig::new(
        env_or("LM_STUDIO_URL", lmstudio::DEFAULT_BASE_URL),
        env_or("LM_STUDIO_MODEL", "local-model"),
    );
    LmStudioClient::new(config)
}
