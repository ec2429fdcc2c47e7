//! Fluent builder for state graphs.
//!
//! [`StateGraph`] collects nodes, edges, and channel reducers, then
//! [`compile`](StateGraph::compile)s them into an executable
//! [`CompiledGraph`]. Construction never fails mid-chain: problems such as a
//! duplicate node name or a second outgoing edge are recorded and reported
//! together when `compile` runs, alongside the structural checks from
//! [`Graph::validate`].
//!
//! # Example
//!
//! ```
//! use lattice_core::{StateGraph, START, END};
//! use serde_json::json;
//!
//! let mut builder = StateGraph::new();
//! builder
//!     .add_node("greet", |mut state| {
//!         Box::pin(async move {
//!             state["greeting"] = json!("hello");
//!             Ok(state)
//!         })
//!     })
//!     .add_edge(START, "greet")
//!     .add_edge("greet", END);
//!
//! let compiled = builder.compile().unwrap();
//! # let _ = compiled;
//! ```

use std::collections::HashMap;

use serde_json::Value;

use crate::channel::{ChannelSchema, MessagesReducer, Reducer};
use crate::error::{GraphError, Result};
use crate::executor::CompiledGraph;
use crate::graph::{Graph, NodeExecutor, NodeFuture, NodeId, NodeSpec, RouterFn, END, START};

/// Builder for a graph of async nodes sharing a JSON state object.
///
/// Nodes return partial updates that are merged into the state through the
/// channel reducers registered with [`add_channel`](Self::add_channel);
/// channels without a reducer are overwritten. Each node gets at most one
/// outgoing edge, either direct or conditional.
#[derive(Debug, Default)]
pub struct StateGraph {
    graph: Graph,
    schema: ChannelSchema,
    build_errors: Vec<String>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the `messages` channel with append-by-id merge semantics,
    /// the conversation-shaped state used by chat agents.
    pub fn with_messages(mut self) -> Self {
        self.schema.add_channel("messages", Box::new(MessagesReducer));
        self
    }

    /// Register a reducer for a state channel.
    ///
    /// Updates to `name` are merged through `reducer` instead of replacing
    /// the current value.
    pub fn add_channel(&mut self, name: impl Into<String>, reducer: Box<dyn Reducer>) -> &mut Self {
        self.schema.add_channel(name, reducer);
        self
    }

    /// Add a node to the graph.
    ///
    /// The executor receives the full state and returns a partial update.
    /// Reusing a name, or using one of the reserved `__start__` / `__end__`
    /// markers, is recorded and fails [`compile`](Self::compile).
    ///
    /// # Arguments
    ///
    /// * `name` - Unique node identifier
    /// * `executor` - Async function from state to partial update
    ///
    /// # Example
    ///
    /// ```
    /// use lattice_core::StateGraph;
    /// use serde_json::json;
    ///
    /// let mut builder = StateGraph::new();
    /// builder.add_node("double", |state| {
    ///     Box::pin(async move {
    ///         let n = state.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
    ///         Ok(json!({ "n": n * 2 }))
    ///     })
    /// });
    /// ```
    pub fn add_node<F>(&mut self, name: impl Into<NodeId>, executor: F) -> &mut Self
    where
        F: Fn(Value) -> NodeFuture + Send + Sync + 'static,
    {
        let name = name.into();
        if name == START || name == END {
            self.build_errors
                .push(format!("node name '{}' is reserved", name));
            return self;
        }
        if self.graph.nodes.contains_key(&name) {
            self.build_errors
                .push(format!("node '{}' is already defined", name));
            return self;
        }

        let executor: NodeExecutor = std::sync::Arc::new(executor);
        let spec = NodeSpec::new(name.clone(), executor);
        self.graph.add_node(name, spec);
        self
    }

    /// Add an unconditional edge between two nodes.
    ///
    /// Use [`START`] as `from` to mark the entry point and [`END`] as `to`
    /// to terminate after `from`. A node may have only one outgoing edge; a
    /// second one is recorded and fails [`compile`](Self::compile).
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        let from = from.into();
        if self.graph.edges.contains_key(&from) {
            self.build_errors
                .push(format!("node '{}' already has an outgoing edge", from));
            return self;
        }
        self.graph.add_edge(from, to.into());
        self
    }

    /// Add a conditional edge that routes based on state.
    ///
    /// After `from` runs, `router` inspects the merged state and returns a
    /// route label. The label is resolved through `branches`; a label with no
    /// entry there is taken as a literal node name (or [`END`]).
    ///
    /// # Arguments
    ///
    /// * `from` - Source node
    /// * `router` - Function from state to route label
    /// * `branches` - Route label → target node, used for validation
    pub fn add_conditional_edges<R>(
        &mut self,
        from: impl Into<NodeId>,
        router: R,
        branches: HashMap<String, NodeId>,
    ) -> &mut Self
    where
        R: Fn(&Value) -> String + Send + Sync + 'static,
    {
        let from = from.into();
        if self.graph.edges.contains_key(&from) {
            self.build_errors
                .push(format!("node '{}' already has an outgoing edge", from));
            return self;
        }
        let router: RouterFn = std::sync::Arc::new(router);
        self.graph.add_conditional_edges(from, router, branches);
        self
    }

    /// Shorthand for `add_edge(START, node)`.
    pub fn set_entry_point(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.add_edge(START, node)
    }

    /// Shorthand for `add_edge(node, END)`.
    pub fn set_finish_point(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.add_edge(node, END)
    }

    /// Finalize the graph for execution.
    ///
    /// Reports every problem recorded during construction, then runs the
    /// structural checks in [`Graph::validate`]. After this point the
    /// topology is frozen; only execution-time configuration (checkpointer,
    /// run limits) can still vary.
    ///
    /// # Errors
    ///
    /// [`GraphError::Validation`] listing all recorded and structural
    /// problems.
    pub fn compile(self) -> Result<CompiledGraph> {
        if !self.build_errors.is_empty() {
            return Err(GraphError::Validation(self.build_errors.join("; ")));
        }
        self.graph.validate().map_err(GraphError::Validation)?;
        Ok(CompiledGraph::new(self.graph, self.schema))
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_graph_compiles() {
        let mut builder = StateGraph::new();
        builder
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_node("b", |state| Box::pin(async move { Ok(state) }))
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END);

        let compiled = builder.compile().unwrap();
        assert_eq!(compiled.graph().nodes.len(), 2);
    }

    #[test]
    fn test_compile_without_entry_edge_fails() {
        let mut builder = StateGraph::new();
        builder.add_node("a", |state| Box::pin(async move { Ok(state) }));

        let err = builder.compile().unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
        assert!(err.to_string().contains(START));
    }

    #[test]
    fn test_duplicate_node_fails_compile() {
        let mut builder = StateGraph::new();
        builder
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_edge(START, "a")
            .add_edge("a", END);

        let err = builder.compile().unwrap_err();
        assert!(err.to_string().contains("already defined"));
    }

    #[test]
    fn test_second_outgoing_edge_fails_compile() {
        let mut builder = StateGraph::new();
        builder
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_node("b", |state| Box::pin(async move { Ok(state) }))
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("a", END)
            .add_edge("b", END);

        let err = builder.compile().unwrap_err();
        assert!(err.to_string().contains("already has an outgoing edge"));
    }

    #[test]
    fn test_reserved_node_name_fails_compile() {
        let mut builder = StateGraph::new();
        builder
            .add_node(START, |state| Box::pin(async move { Ok(state) }))
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_edge(START, "a")
            .add_edge("a", END);

        let err = builder.compile().unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_unreachable_node_fails_compile() {
        let mut builder = StateGraph::new();
        builder
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_node("island", |state| Box::pin(async move { Ok(state) }))
            .add_edge(START, "a")
            .add_edge("a", END)
            .add_edge("island", END);

        let err = builder.compile().unwrap_err();
        assert!(err.to_string().contains("island"));
    }

    #[test]
    fn test_conditional_edges_compile() {
        let mut builder = StateGraph::new();
        builder
            .add_node("decide", |state| Box::pin(async move { Ok(state) }))
            .add_node("yes", |state| Box::pin(async move { Ok(state) }))
            .add_node("no", |state| Box::pin(async move { Ok(state) }))
            .add_edge(START, "decide")
            .add_conditional_edges(
                "decide",
                |state: &Value| {
                    if state.get("flag").and_then(|v| v.as_bool()).unwrap_or(false) {
                        "yes".to_string()
                    } else {
                        "no".to_string()
                    }
                },
                HashMap::from([
                    ("yes".to_string(), "yes".to_string()),
                    ("no".to_string(), "no".to_string()),
                ]),
            )
            .add_edge("yes", END)
            .add_edge("no", END);

        assert!(builder.compile().is_ok());
    }

    #[test]
    fn test_multiple_errors_reported_together() {
        let mut builder = StateGraph::new();
        builder
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_node("a", |state| Box::pin(async move { Ok(state) }))
            .add_edge(START, "a")
            .add_edge(START, "a");

        let err = builder.compile().unwrap_err().to_string();
        assert!(err.contains("already defined"));
        assert!(err.contains("already has an outgoing edge"));
    }

    #[test]
    fn test_with_messages_registers_channel() {
        let builder = StateGraph::new().with_messages();
        assert!(builder.schema.has_channel("messages"));
    }

    #[test]
    fn test_entry_and_finish_shorthands() {
        let mut builder = StateGraph::new();
        builder
            .add_node("only", |state| Box::pin(async move { Ok(state) }))
            .set_entry_point("only")
            .set_finish_point("only");

        assert!(builder.compile().is_ok());
    }
}
