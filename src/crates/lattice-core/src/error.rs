//! Error types and error handling for graph operations
//!
//! This module defines all error types that can occur during graph
//! construction, validation, and execution. All errors implement
//! `std::error::Error` via the `thiserror` crate.
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── Validation               - Graph structure errors
//! ├── NodeExecution            - Node execution failures
//! ├── Execution                - General execution errors
//! ├── RecursionLimitExceeded   - Step budget exhausted
//! ├── InvalidRoute             - Router returned an unknown target
//! ├── GraphStalled             - No outgoing edge to follow
//! ├── Cancelled                - Run aborted via cancellation token
//! ├── Timeout                  - Operation timeouts
//! ├── Checkpoint               - Persistence errors
//! ├── Serialization            - JSON errors
//! ├── Configuration            - Run configuration errors
//! └── Custom                   - Application-defined errors
//! ```
//!
//! # Error Handling Patterns
//!
//! ```rust
//! use lattice_core::error::GraphError;
//!
//! fn handle_error(err: GraphError) {
//!     match err {
//!         GraphError::Validation(msg) => {
//!             eprintln!("Graph structure invalid: {}", msg);
//!         }
//!         GraphError::NodeExecution { node, error } => {
//!             eprintln!("Node '{}' failed: {}", node, error);
//!         }
//!         GraphError::RecursionLimitExceeded { limit } => {
//!             eprintln!("Run exceeded {} steps; raise the limit or fix the loop", limit);
//!         }
//!         GraphError::Checkpoint(e) => {
//!             eprintln!("Failed to save checkpoint: {}", e);
//!         }
//!         _ => {
//!             eprintln!("Other error: {}", err);
//!         }
//!     }
//! }
//! ```
//!
//! Fatal control-flow errors (`RecursionLimitExceeded`, `InvalidRoute`,
//! `GraphStalled`) are never retried by the engine: they indicate a graph
//! that cannot make progress, not a transient condition. The transcript up
//! to the failing step is preserved in the last saved checkpoint, so a run
//! that hit the recursion limit can be inspected via `get_state_history`.
//!
//! # See Also
//!
//! - [`Result`] - Convenience type alias
//! - [`GraphError`] - Main error enum
//! - [`lattice_checkpoint::CheckpointError`] - Checkpoint-specific errors

use thiserror::Error;

/// Convenience result type using [`GraphError`]
///
/// # Examples
///
/// ```rust
/// use lattice_core::error::{Result, GraphError};
///
/// fn validate_input(data: &str) -> Result<()> {
///     if data.is_empty() {
///         return Err(GraphError::Validation("Input cannot be empty".to_string()));
///     }
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, GraphError>;

/// Comprehensive error type for all graph operations
///
/// `GraphError` represents all errors that can occur during graph
/// construction, validation, and execution. It uses `thiserror` for
/// automatic `Error` trait implementation and includes context where
/// helpful.
///
/// # Error Categories
///
/// - **Construction**: `Validation`, `Configuration`
/// - **Execution**: `NodeExecution`, `Execution`, `Timeout`
/// - **Control flow**: `RecursionLimitExceeded`, `InvalidRoute`, `GraphStalled`, `Cancelled`
/// - **Persistence**: `Checkpoint`
/// - **Serialization**: `Serialization`
/// - **Extension**: `Custom`
///
/// # Examples
///
/// ```rust
/// use lattice_core::error::GraphError;
///
/// // Validation error
/// let err = GraphError::Validation("Missing entry node".to_string());
///
/// // Node execution error with context
/// let err = GraphError::node_execution("llm", "API key not found");
/// assert_eq!(format!("{}", err), "Node 'llm' execution failed: API key not found");
/// ```
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure validation failed
    ///
    /// Occurs during graph compilation when the graph structure is invalid.
    ///
    /// **Common causes**:
    /// - Referenced node doesn't exist
    /// - No edge out of `__start__`
    /// - Unreachable nodes
    /// - Duplicate node names
    ///
    /// **Recovery**: Fix graph structure before compilation
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// Node execution failed with context
    ///
    /// Occurs when a node's executor function returns an error during
    /// execution, or when a node produces an update that is not a JSON
    /// object.
    ///
    /// **Recovery**: Fix node logic, add error handling inside the node
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed
        node: String,
        /// Error message from node execution
        error: String,
    },

    /// Generic execution error without specific node context
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Step budget exhausted before the graph reached `__end__`
    ///
    /// Each node execution counts as one step. When the count exceeds the
    /// configured limit the run aborts with this error; the state as of the
    /// last completed step is preserved in the latest checkpoint.
    ///
    /// **Common causes**:
    /// - Cyclic graph with a routing condition that never selects `__end__`
    /// - Limit set too low for a legitimately long workflow
    ///
    /// **Recovery**: Raise `RunConfig::recursion_limit`, or fix the routing
    /// condition that keeps the cycle alive
    #[error("Recursion limit of {limit} exceeded")]
    RecursionLimitExceeded {
        /// The configured step limit that was exceeded
        limit: usize,
    },

    /// A routing function returned a target that is neither a declared
    /// branch nor a known node
    ///
    /// Never retried: the same state would produce the same route.
    #[error("Invalid route '{route}' from node '{node}'")]
    InvalidRoute {
        /// Node whose router produced the route
        node: String,
        /// The unresolvable route value
        route: String,
    },

    /// Execution reached a node with no outgoing edge before `__end__`
    ///
    /// Compilation guarantees every node is reachable from `__start__`, but
    /// a node may still have no outgoing edge. Reaching such a node at
    /// runtime stalls the graph.
    #[error("Graph stalled at node '{node}': no outgoing edge to follow")]
    GraphStalled {
        /// The node execution stopped at
        node: String,
    },

    /// Run aborted via its cancellation token
    ///
    /// Cancellation is observed between steps, so a partially-applied
    /// update is never committed: the last checkpoint reflects the last
    /// fully completed step.
    #[error("Execution cancelled at node '{node}'")]
    Cancelled {
        /// The node that was about to run when cancellation was observed
        node: String,
    },

    /// Operation exceeded time limit
    ///
    /// Raised when a node runs longer than `RunConfig::node_timeout`.
    /// Distinct from backend call timeouts, which surface through the
    /// model adapter's own error type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lattice_core::error::GraphError;
    ///
    /// let err = GraphError::Timeout {
    ///     operation: "node 'agent'".to_string(),
    ///     duration_ms: 5000,
    /// };
    /// ```
    #[error("Operation timed out after {duration_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Checkpoint persistence error
    ///
    /// Occurs when saving or loading checkpoints fails.
    ///
    /// Wraps errors from `lattice_checkpoint::CheckpointError`.
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] lattice_checkpoint::CheckpointError),

    /// JSON serialization/deserialization error
    ///
    /// Occurs when state cannot be serialized to/from JSON.
    ///
    /// Wraps errors from `serde_json::Error`.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Run configuration error
    ///
    /// **Common causes**:
    /// - Checkpointer configured without a thread id
    /// - Recursion limit of zero
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Custom application-defined error
    #[error("{0}")]
    Custom(String),
}

impl GraphError {
    /// Create a node execution error with context
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lattice_core::error::GraphError;
    ///
    /// let err = GraphError::node_execution("llm_call", "API timeout");
    /// assert_eq!(format!("{}", err), "Node 'llm_call' execution failed: API timeout");
    /// ```
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }

    /// Create an invalid-route error for a routing function result
    pub fn invalid_route(node: impl Into<String>, route: impl Into<String>) -> Self {
        Self::InvalidRoute {
            node: node.into(),
            route: route.into(),
        }
    }

    /// Create a cancellation error for the node that was about to run
    pub fn cancelled(node: impl Into<String>) -> Self {
        Self::Cancelled { node: node.into() }
    }

    /// Whether this error is a control-flow stop rather than a fault in
    /// node logic or infrastructure
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Self::RecursionLimitExceeded { .. }
                | Self::InvalidRoute { .. }
                | Self::GraphStalled { .. }
                | Self::Cancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_carry_context() {
        let err = GraphError::node_execution("agent", "backend unavailable");
        assert_eq!(
            err.to_string(),
            "Node 'agent' execution failed: backend unavailable"
        );

        let err = GraphError::RecursionLimitExceeded { limit: 10 };
        assert_eq!(err.to_string(), "Recursion limit of 10 exceeded");

        let err = GraphError::invalid_route("agent", "unknown_branch");
        assert_eq!(
            err.to_string(),
            "Invalid route 'unknown_branch' from node 'agent'"
        );

        let err = GraphError::GraphStalled {
            node: "tools".to_string(),
        };
        assert!(err.to_string().contains("no outgoing edge"));
    }

    #[test]
    fn checkpoint_errors_convert() {
        let source = lattice_checkpoint::CheckpointError::NotFound("cp-1".to_string());
        let err: GraphError = source.into();
        assert!(matches!(err, GraphError::Checkpoint(_)));
    }

    #[test]
    fn serde_errors_convert() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: GraphError = source.into();
        assert!(matches!(err, GraphError::Serialization(_)));
    }

    #[test]
    fn control_flow_classification() {
        assert!(GraphError::RecursionLimitExceeded { limit: 5 }.is_control_flow());
        assert!(GraphError::cancelled("agent").is_control_flow());
        assert!(!GraphError::Execution("boom".to_string()).is_control_flow());
    }
}
