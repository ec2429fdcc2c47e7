//! Error types for prebuilt agent loops.

use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur when building or running an agent.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Agent configuration rejected at build time
    #[error("Agent configuration error: {0}")]
    Configuration(String),

    /// State (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying graph construction or execution error
    #[error("Graph error: {0}")]
    Graph(#[from] lattice_core::GraphError),
}
