//! Graph structure: nodes, edges, and structural validation.
//!
//! A [`Graph`] is the immutable definition a [`StateGraph`](crate::StateGraph)
//! builder produces: named nodes holding async executors, and at most one
//! outgoing [`Edge`] per node. Execution enters through the reserved
//! [`START`] marker and finishes when a route reaches [`END`]; neither marker
//! carries an executor.
//!
//! Structure is checked once, at compile time. [`Graph::validate`] rejects
//! edges whose endpoints are not declared nodes, a graph with no outgoing
//! edge from `START`, and nodes unreachable from `START`. Conditional routes
//! are re-checked per step at runtime because their targets depend on state.
//!
//! # Examples
//!
//! ```
//! use lattice_core::graph::{Graph, NodeSpec, START, END};
//! use std::sync::Arc;
//!
//! let mut graph = Graph::new();
//! graph.add_node(
//!     "echo".to_string(),
//!     NodeSpec::new("echo", Arc::new(|state| Box::pin(async move { Ok(state) }))),
//! );
//! graph.add_edge(START.to_string(), "echo".to_string());
//! graph.add_edge("echo".to_string(), END.to_string());
//!
//! assert!(graph.validate().is_ok());
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

/// Reserved name marking the graph entry. Not a real node.
pub const START: &str = "__start__";

/// Reserved name marking the graph exit. Routing to it ends the run.
pub const END: &str = "__end__";

/// Unique name of a node within one graph.
pub type NodeId = String;

/// Boxed future returned by a node executor.
pub type NodeFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Async node body: full state in, partial update out.
///
/// The executor receives a read-only copy of the current state and returns an
/// object touching only the channels it wants to update.
pub type NodeExecutor = Arc<dyn Fn(Value) -> NodeFuture + Send + Sync>;

/// Routing function for conditional edges: inspects state, returns a route
/// label.
pub type RouterFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// A named unit of computation.
#[derive(Clone)]
pub struct NodeSpec {
    pub name: String,
    pub executor: NodeExecutor,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, executor: NodeExecutor) -> Self {
        Self {
            name: name.into(),
            executor,
        }
    }
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("executor", &"<async fn>")
            .finish()
    }
}

/// Outgoing transition from a node.
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition to the named node.
    Direct(NodeId),

    /// State-dependent transition.
    ///
    /// The router's label is first resolved through `branches`; a label with
    /// no branch entry is taken as a literal node name. A target that is
    /// neither `END` nor a declared node fails the step with
    /// [`InvalidRoute`](crate::error::GraphError::InvalidRoute).
    Conditional {
        router: RouterFn,
        /// Route label → target node, for validation and introspection.
        branches: HashMap<String, NodeId>,
    },
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<fn>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Immutable graph definition: nodes plus one outgoing edge per node.
///
/// Built through [`StateGraph`](crate::StateGraph); the single-edge
/// restriction is what keeps execution sequential, with branching expressed
/// through conditional edges instead of parallel fan-out.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: HashMap<NodeId, NodeSpec>,
    pub edges: HashMap<NodeId, Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. A repeated id replaces the earlier spec; the builder
    /// layer reports duplicates before they get here.
    pub fn add_node(&mut self, id: NodeId, spec: NodeSpec) {
        self.nodes.insert(id, spec);
    }

    /// Set the unconditional outgoing edge for `from`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.insert(from, Edge::Direct(to));
    }

    /// Set a conditional outgoing edge for `from`.
    pub fn add_conditional_edges(
        &mut self,
        from: NodeId,
        router: RouterFn,
        branches: HashMap<String, NodeId>,
    ) {
        self.edges.insert(from, Edge::Conditional { router, branches });
    }

    /// Statically known targets of an edge. Conditional edges contribute
    /// their declared branches; router results outside the branch map are a
    /// runtime concern.
    fn edge_targets(edge: &Edge) -> Vec<&str> {
        match edge {
            Edge::Direct(to) => vec![to.as_str()],
            Edge::Conditional { branches, .. } => {
                branches.values().map(String::as_str).collect()
            }
        }
    }

    /// Check the graph is executable.
    ///
    /// Rejects edges whose source or target is not a declared node (reserved
    /// markers aside), a graph with no outgoing edge from [`START`], and any
    /// node with no path from [`START`]. Errors are plain strings; the
    /// builder wraps them in
    /// [`GraphError::Validation`](crate::error::GraphError::Validation).
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (from, edge) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(format!("edge source '{}' is not a declared node", from));
            }
            for to in Self::edge_targets(edge) {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(format!("edge target '{}' is not a declared node", to));
                }
            }
        }

        if !self.edges.contains_key(START) {
            return Err(format!("no outgoing edge from {}", START));
        }

        // Breadth-first walk over declared targets.
        let mut reached: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(START);
        while let Some(current) = queue.pop_front() {
            if let Some(edge) = self.edges.get(current) {
                for target in Self::edge_targets(edge) {
                    if target != END && reached.insert(target) {
                        queue.push_back(target);
                    }
                }
            }
        }

        for name in self.nodes.keys() {
            if !reached.contains(name.as_str()) {
                return Err(format!("node '{}' is not reachable from {}", name, START));
            }
        }

        Ok(())
    }
}
