//! Sequential executor for compiled graphs.
//!
//! [`CompiledGraph::invoke`] drives a run: starting from the entry edge it
//! repeatedly executes the current node, merges the node's partial update
//! into the state through the channel reducers, follows the node's outgoing
//! edge, and stops when a route reaches [`END`]. One node runs at a time;
//! branching is a routing decision, never a fork.
//!
//! With a checkpointer attached, every step is durable. The run writes an
//! `input` checkpoint after merging the caller's input, then one `loop`
//! checkpoint per node step, each chained to its predecessor. A later
//! invocation on the same thread resumes from the latest checkpoint instead
//! of starting fresh. Checkpoints are atomic or absent: a failed save aborts
//! the run rather than leaving a half-written history.
//!
//! Cancellation and the recursion limit are enforced between steps, so an
//! aborted run always stops on a checkpoint boundary.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use lattice_checkpoint::{
    next_version, ChannelVersions, Checkpoint, CheckpointConfig, CheckpointMetadata,
    CheckpointSaver, CheckpointSource, CheckpointTuple,
};

use crate::channel::ChannelSchema;
use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, END, START};

/// Steps a single run may take before erroring, unless overridden.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Per-invocation execution settings.
///
/// `recursion_limit` bounds the number of node executions in one run; a due
/// step beyond it fails with
/// [`RecursionLimitExceeded`](GraphError::RecursionLimitExceeded).
/// `cancel` is checked before every node, so triggering it stops the run at
/// the next step boundary with the last checkpoint intact. `node_timeout`
/// bounds each node execution individually.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Thread (and optionally checkpoint) the run loads from and saves to.
    pub checkpoint: CheckpointConfig,
    pub recursion_limit: usize,
    pub cancel: Option<CancellationToken>,
    pub node_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            checkpoint: CheckpointConfig::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            cancel: None,
            node_timeout: None,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.checkpoint = self.checkpoint.with_thread_id(thread_id);
        self
    }

    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint = self.checkpoint.with_checkpoint_id(checkpoint_id);
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }
}

/// Point-in-time view of a thread, read back from the checkpointer.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Channel values as one JSON object.
    pub values: Value,
    /// Config addressing this exact checkpoint.
    pub config: CheckpointConfig,
    pub metadata: CheckpointMetadata,
    /// Config of the checkpoint this one was built from, if any.
    pub parent_config: Option<CheckpointConfig>,
}

impl From<CheckpointTuple> for StateSnapshot {
    fn from(tuple: CheckpointTuple) -> Self {
        let values = Value::Object(tuple.checkpoint.channel_values.into_iter().collect());
        Self {
            values,
            config: tuple.config,
            metadata: tuple.metadata,
            parent_config: tuple.parent_config,
        }
    }
}

/// An executable graph with frozen topology.
///
/// Produced by [`StateGraph::compile`](crate::StateGraph::compile). Cloning
/// is cheap and clones share the channel schema and checkpointer, so one
/// compiled graph can serve concurrent runs on different threads.
#[derive(Clone)]
pub struct CompiledGraph {
    graph: Graph,
    schema: Arc<ChannelSchema>,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
}

impl fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("nodes", &self.graph.nodes.len())
            .field("channels", &self.schema.channel_names())
            .field("checkpointer", &self.checkpointer.is_some())
            .finish()
    }
}

impl CompiledGraph {
    pub(crate) fn new(graph: Graph, schema: ChannelSchema) -> Self {
        Self {
            graph,
            schema: Arc::new(schema),
            checkpointer: None,
        }
    }

    /// Attach a checkpoint store. Runs configured with a `thread_id` will
    /// persist every step and resume from the latest checkpoint.
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Get a reference to the underlying graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Run the graph to completion with default settings.
    ///
    /// `input` is a partial state object merged through the channel reducers
    /// before the first node runs, or `null` to start from the current
    /// (possibly restored) state unchanged. Returns the final state.
    pub async fn invoke(&self, input: Value) -> Result<Value> {
        self.invoke_with_config(input, RunConfig::default()).await
    }

    /// Run the graph to completion with explicit settings.
    ///
    /// # Errors
    ///
    /// Node failures come back as
    /// [`NodeExecution`](GraphError::NodeExecution) naming the node;
    /// [`InvalidRoute`](GraphError::InvalidRoute),
    /// [`GraphStalled`](GraphError::GraphStalled),
    /// [`RecursionLimitExceeded`](GraphError::RecursionLimitExceeded), and
    /// [`Cancelled`](GraphError::Cancelled) report control-flow failures
    /// unchanged. Checkpointer failures abort the run.
    #[tracing::instrument(skip(self, input, config), fields(thread_id = ?config.checkpoint.thread_id))]
    pub async fn invoke_with_config(&self, input: Value, config: RunConfig) -> Result<Value> {
        let mut run = RunState::restore(self, &config).await?;

        match &input {
            Value::Null => {}
            Value::Object(update) => {
                if !update.is_empty() {
                    let written = self.schema.apply(&mut run.state, &input)?;
                    run.bump_versions(&written);
                }
            }
            _ => {
                return Err(GraphError::Execution(
                    "graph input must be a JSON object or null".to_string(),
                ))
            }
        }
        run.save(CheckpointSource::Input, -1).await?;

        tracing::info!(recursion_limit = config.recursion_limit, "starting run");

        let mut current = self.next_node(START, &run.state)?;
        let mut steps: usize = 0;

        while current != END {
            if let Some(cancel) = &config.cancel {
                if cancel.is_cancelled() {
                    tracing::warn!(node = %current, steps, "run cancelled");
                    return Err(GraphError::cancelled(&current));
                }
            }
            if steps >= config.recursion_limit {
                tracing::warn!(steps, "recursion limit reached");
                return Err(GraphError::RecursionLimitExceeded {
                    limit: config.recursion_limit,
                });
            }

            let update = self
                .run_node(&current, run.state.clone(), config.node_timeout)
                .await?;

            // The raw update is buffered against the checkpoint the node saw,
            // then the merged result becomes the next checkpoint.
            run.record_writes(&current, steps, &update).await?;

            let written = self.schema.apply(&mut run.state, &update)?;
            run.bump_versions(&written);
            run.mark_seen(&current);

            steps += 1;
            run.save(CheckpointSource::Loop, (steps - 1) as i64).await?;

            current = self.next_node(&current, &run.state)?;
        }

        tracing::info!(steps, "run complete");
        Ok(run.state)
    }

    /// Latest snapshot of a thread, or the one addressed by
    /// `config.checkpoint_id`.
    pub async fn get_state(&self, config: &CheckpointConfig) -> Result<Option<StateSnapshot>> {
        let saver = self.require_checkpointer()?;
        let tuple = saver.get_tuple(config).await?;
        Ok(tuple.map(StateSnapshot::from))
    }

    /// Full snapshot history of a thread, newest first.
    pub async fn get_state_history(&self, config: &CheckpointConfig) -> Result<Vec<StateSnapshot>> {
        let saver = self.require_checkpointer()?;
        let mut stream = saver.list(Some(config), None, None, None).await?;
        let mut snapshots = Vec::new();
        while let Some(tuple) = stream.next().await {
            snapshots.push(StateSnapshot::from(tuple?));
        }
        Ok(snapshots)
    }

    fn require_checkpointer(&self) -> Result<&Arc<dyn CheckpointSaver>> {
        self.checkpointer
            .as_ref()
            .ok_or_else(|| GraphError::Configuration("no checkpointer configured".to_string()))
    }

    async fn run_node(
        &self,
        node: &str,
        state: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let spec = self.graph.nodes.get(node).ok_or_else(|| {
            GraphError::Execution(format!("node '{}' is not part of this graph", node))
        })?;

        tracing::debug!(node, "running node");
        let fut = (spec.executor)(state);
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(GraphError::Timeout {
                        operation: format!("node '{}'", node),
                        duration_ms: limit.as_millis() as u64,
                    })
                }
            },
            None => fut.await,
        };

        result.map_err(|e| {
            if e.is_control_flow() {
                e
            } else {
                tracing::error!(node, error = %e, "node failed");
                GraphError::node_execution(node, e.to_string())
            }
        })
    }

    /// Resolve the next node after `from`.
    ///
    /// Conditional routes resolve the router's label through the branch map
    /// first and fall back to treating it as a literal node name.
    fn next_node(&self, from: &str, state: &Value) -> Result<NodeId> {
        let edge = self
            .graph
            .edges
            .get(from)
            .ok_or_else(|| GraphError::GraphStalled {
                node: from.to_string(),
            })?;

        match edge {
            Edge::Direct(to) => Ok(to.clone()),
            Edge::Conditional { router, branches } => {
                let route = router(state);
                let target = branches.get(&route).cloned().unwrap_or(route);
                if target == END || self.graph.nodes.contains_key(&target) {
                    tracing::debug!(from, to = %target, "conditional route");
                    Ok(target)
                } else {
                    Err(GraphError::invalid_route(from, &target))
                }
            }
        }
    }
}

/// Persistence handle for one run.
struct Persist {
    saver: Arc<dyn CheckpointSaver>,
    thread: CheckpointConfig,
    /// Config of the most recently stored checkpoint; the next save chains
    /// to it.
    last: Option<CheckpointConfig>,
}

/// Mutable state threaded through one run of the step loop.
struct RunState {
    state: Value,
    versions: ChannelVersions,
    versions_seen: HashMap<String, ChannelVersions>,
    /// Channels bumped since the last save, reported to the saver.
    pending_versions: ChannelVersions,
    persist: Option<Persist>,
}

impl RunState {
    /// Start fresh, or from the thread's latest checkpoint when the graph
    /// has a checkpointer.
    async fn restore(graph: &CompiledGraph, config: &RunConfig) -> Result<Self> {
        let mut state = Value::Object(serde_json::Map::new());
        let mut versions: ChannelVersions = HashMap::new();
        let mut versions_seen: HashMap<String, ChannelVersions> = HashMap::new();
        let mut persist = None;

        if let Some(saver) = &graph.checkpointer {
            let thread = config.checkpoint.clone();
            if thread.thread_id.is_none() {
                return Err(GraphError::Configuration(
                    "a thread_id is required when a checkpointer is configured".to_string(),
                ));
            }

            let mut last = None;
            if let Some(tuple) = saver.get_tuple(&thread).await? {
                tracing::debug!(checkpoint_id = %tuple.checkpoint.id, "resuming from checkpoint");
                let CheckpointTuple {
                    config: stored,
                    checkpoint,
                    ..
                } = tuple;
                state = Value::Object(checkpoint.channel_values.into_iter().collect());
                versions = checkpoint.channel_versions;
                versions_seen = checkpoint.versions_seen;
                last = Some(stored);
            }
            persist = Some(Persist {
                saver: Arc::clone(saver),
                thread,
                last,
            });
        }

        Ok(Self {
            state,
            versions,
            versions_seen,
            pending_versions: HashMap::new(),
            persist,
        })
    }

    fn bump_versions(&mut self, channels: &[String]) {
        for channel in channels {
            let next = next_version(self.versions.get(channel));
            self.versions.insert(channel.clone(), next);
            self.pending_versions.insert(channel.clone(), next);
        }
    }

    /// Record that `node` has observed every channel version now current.
    fn mark_seen(&mut self, node: &str) {
        self.versions_seen.insert(node.to_string(), self.versions.clone());
    }

    /// Buffer a node's raw update against the checkpoint it executed from.
    async fn record_writes(&mut self, node: &str, step: usize, update: &Value) -> Result<()> {
        let Some(persist) = &self.persist else {
            return Ok(());
        };
        let Some(last) = &persist.last else {
            return Ok(());
        };
        let Some(update) = update.as_object() else {
            return Ok(());
        };
        if update.is_empty() {
            return Ok(());
        }

        let writes: Vec<(String, Value)> = update
            .iter()
            .map(|(channel, value)| (channel.clone(), value.clone()))
            .collect();
        let task_id = format!("{}:{}", node, step);
        persist.saver.put_writes(last, writes, task_id).await?;
        Ok(())
    }

    /// Store the current state as a checkpoint and chain it to the previous
    /// one. A storage failure propagates and aborts the run.
    async fn save(&mut self, source: CheckpointSource, step: i64) -> Result<()> {
        let Some(persist) = &mut self.persist else {
            return Ok(());
        };

        let channel_values: HashMap<String, Value> = match self.state.as_object() {
            Some(values) => values
                .iter()
                .map(|(channel, value)| (channel.clone(), value.clone()))
                .collect(),
            None => HashMap::new(),
        };
        let checkpoint = Checkpoint::new(
            Uuid::now_v7().to_string(),
            channel_values,
            self.versions.clone(),
            self.versions_seen.clone(),
        );
        let metadata = CheckpointMetadata::new().with_source(source).with_step(step);
        let new_versions = std::mem::take(&mut self.pending_versions);

        let config = persist
            .last
            .clone()
            .unwrap_or_else(|| persist.thread.clone());
        let stored = persist
            .saver
            .put(&config, checkpoint, metadata, new_versions)
            .await?;
        persist.last = Some(stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use crate::channel::AppendReducer;
    use lattice_checkpoint::InMemoryCheckpointSaver;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn passthrough() -> impl Fn(Value) -> crate::graph::NodeFuture + Send + Sync + 'static {
        |state| Box::pin(async move { Ok(state) })
    }

    #[tokio::test]
    async fn test_linear_run_merges_updates() {
        let mut builder = StateGraph::new();
        builder
            .add_node("first", |_| {
                Box::pin(async move { Ok(json!({ "a": 1 })) })
            })
            .add_node("second", |_| {
                Box::pin(async move { Ok(json!({ "b": 2 })) })
            })
            .add_edge(START, "first")
            .add_edge("first", "second")
            .add_edge("second", END);
        let graph = builder.compile().unwrap();

        let out = graph.invoke(json!({})).await.unwrap();
        assert_eq!(out, json!({ "a": 1, "b": 2 }));
    }

    #[tokio::test]
    async fn test_node_sees_prior_updates() {
        let mut builder = StateGraph::new();
        builder
            .add_node("writer", |_| {
                Box::pin(async move { Ok(json!({ "n": 20 })) })
            })
            .add_node("doubler", |state| {
                Box::pin(async move {
                    let n = state.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
                    Ok(json!({ "n": n * 2 }))
                })
            })
            .add_edge(START, "writer")
            .add_edge("writer", "doubler")
            .add_edge("doubler", END);
        let graph = builder.compile().unwrap();

        let out = graph.invoke(json!({ "n": 1 })).await.unwrap();
        assert_eq!(out["n"], json!(40));
    }

    #[tokio::test]
    async fn test_input_merges_through_reducers() {
        let mut builder = StateGraph::new();
        builder
            .add_channel("log", Box::new(AppendReducer))
            .add_node("noop", passthrough())
            .add_edge(START, "noop")
            .add_edge("noop", END);
        let graph = builder.compile().unwrap();

        let out = graph.invoke(json!({ "log": ["hello"] })).await.unwrap();
        assert_eq!(out["log"], json!(["hello"]));
    }

    #[tokio::test]
    async fn test_start_to_end_short_circuit() {
        let mut builder = StateGraph::new();
        builder.add_edge(START, END);
        let graph = builder.compile().unwrap();

        let out = graph.invoke(json!({ "x": 1 })).await.unwrap();
        assert_eq!(out, json!({ "x": 1 }));
    }

    #[tokio::test]
    async fn test_conditional_routing_follows_state() {
        let mut builder = StateGraph::new();
        builder
            .add_node("decide", passthrough())
            .add_node("high", |_| {
                Box::pin(async move { Ok(json!({ "took": "high" })) })
            })
            .add_node("low", |_| {
                Box::pin(async move { Ok(json!({ "took": "low" })) })
            })
            .add_edge(START, "decide")
            .add_conditional_edges(
                "decide",
                |state: &Value| {
                    if state.get("n").and_then(|v| v.as_i64()).unwrap_or(0) > 10 {
                        "high".to_string()
                    } else {
                        "low".to_string()
                    }
                },
                HashMap::from([
                    ("high".to_string(), "high".to_string()),
                    ("low".to_string(), "low".to_string()),
                ]),
            )
            .add_edge("high", END)
            .add_edge("low", END);
        let graph = builder.compile().unwrap();

        let out = graph.invoke(json!({ "n": 42 })).await.unwrap();
        assert_eq!(out["took"], json!("high"));
        let out = graph.invoke(json!({ "n": 3 })).await.unwrap();
        assert_eq!(out["took"], json!("low"));
    }

    #[tokio::test]
    async fn test_branch_map_takes_precedence_over_literal() {
        // A route label that is both a branch key and a node name must
        // resolve through the branch map.
        let mut builder = StateGraph::new();
        builder
            .add_node("decide", passthrough())
            .add_node("loop", |_| {
                Box::pin(async move { Ok(json!({ "took": "node-loop" })) })
            })
            .add_node("mapped", |_| {
                Box::pin(async move { Ok(json!({ "took": "mapped" })) })
            })
            .add_edge(START, "decide")
            .add_conditional_edges(
                "decide",
                |_: &Value| "loop".to_string(),
                HashMap::from([
                    ("loop".to_string(), "mapped".to_string()),
                    ("other".to_string(), "loop".to_string()),
                ]),
            )
            .add_edge("mapped", END)
            .add_edge("loop", END);
        let graph = builder.compile().unwrap();

        let out = graph.invoke(json!({})).await.unwrap();
        assert_eq!(out["took"], json!("mapped"));
    }

    #[tokio::test]
    async fn test_literal_route_without_branch_entry() {
        let mut builder = StateGraph::new();
        builder
            .add_node("decide", passthrough())
            .add_node("target", |_| {
                Box::pin(async move { Ok(json!({ "took": "target" })) })
            })
            .add_edge(START, "decide")
            .add_conditional_edges(
                "decide",
                |_: &Value| "target".to_string(),
                HashMap::from([("go".to_string(), "target".to_string())]),
            )
            .add_edge("target", END);
        let graph = builder.compile().unwrap();

        let out = graph.invoke(json!({})).await.unwrap();
        assert_eq!(out["took"], json!("target"));
    }

    #[tokio::test]
    async fn test_unresolvable_route_errors() {
        let mut builder = StateGraph::new();
        builder
            .add_node("decide", passthrough())
            .add_node("a", passthrough())
            .add_edge(START, "decide")
            .add_conditional_edges(
                "decide",
                |_: &Value| "nowhere".to_string(),
                HashMap::from([("go".to_string(), "a".to_string())]),
            )
            .add_edge("a", END);
        let graph = builder.compile().unwrap();

        let err = graph.invoke(json!({})).await.unwrap_err();
        match err {
            GraphError::InvalidRoute { node, route } => {
                assert_eq!(node, "decide");
                assert_eq!(route, "nowhere");
            }
            other => panic!("expected InvalidRoute, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_node_without_edge_stalls() {
        let mut builder = StateGraph::new();
        builder
            .add_node("dead-end", passthrough())
            .add_edge(START, "dead-end");
        let graph = builder.compile().unwrap();

        let err = graph.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::GraphStalled { node } if node == "dead-end"));
    }

    #[tokio::test]
    async fn test_recursion_limit_allows_exactly_limit_steps() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);

        let mut builder = StateGraph::new();
        builder
            .add_node("spin", move |state| {
                let seen = Arc::clone(&seen);
                Box::pin(async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(state)
                })
            })
            .add_edge(START, "spin")
            .add_edge("spin", "spin");
        let graph = builder.compile().unwrap();

        let err = graph
            .invoke_with_config(json!({}), RunConfig::new().with_recursion_limit(3))
            .await
            .unwrap_err();

        assert!(matches!(err, GraphError::RecursionLimitExceeded { limit: 3 }));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancellation_stops_at_step_boundary() {
        let first_ran = Arc::new(AtomicUsize::new(0));
        let second_ran = Arc::new(AtomicUsize::new(0));
        let first_seen = Arc::clone(&first_ran);
        let second_seen = Arc::clone(&second_ran);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let mut builder = StateGraph::new();
        builder
            .add_node("first", move |state| {
                let first_seen = Arc::clone(&first_seen);
                let trigger = trigger.clone();
                Box::pin(async move {
                    first_seen.fetch_add(1, Ordering::SeqCst);
                    trigger.cancel();
                    Ok(state)
                })
            })
            .add_node("second", move |state| {
                let second_seen = Arc::clone(&second_seen);
                Box::pin(async move {
                    second_seen.fetch_add(1, Ordering::SeqCst);
                    Ok(state)
                })
            })
            .add_edge(START, "first")
            .add_edge("first", "second")
            .add_edge("second", END);
        let graph = builder.compile().unwrap();

        let err = graph
            .invoke_with_config(json!({}), RunConfig::new().with_cancel(cancel))
            .await
            .unwrap_err();

        assert!(matches!(err, GraphError::Cancelled { node } if node == "second"));
        assert_eq!(first_ran.load(Ordering::SeqCst), 1);
        assert_eq!(second_ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_runs_no_nodes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut builder = StateGraph::new();
        builder
            .add_node("only", move |state| {
                let seen = Arc::clone(&seen);
                Box::pin(async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok(state)
                })
            })
            .add_edge(START, "only")
            .add_edge("only", END);
        let graph = builder.compile().unwrap();

        let err = graph
            .invoke_with_config(json!({}), RunConfig::new().with_cancel(cancel))
            .await
            .unwrap_err();

        assert!(matches!(err, GraphError::Cancelled { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_timeout() {
        let mut builder = StateGraph::new();
        builder
            .add_node("slow", |state| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(state)
                })
            })
            .add_edge(START, "slow")
            .add_edge("slow", END);
        let graph = builder.compile().unwrap();

        let err = graph
            .invoke_with_config(
                json!({}),
                RunConfig::new().with_node_timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();

        match err {
            GraphError::Timeout {
                operation,
                duration_ms,
            } => {
                assert!(operation.contains("slow"));
                assert_eq!(duration_ms, 50);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_node_error_wrapped_with_node_name() {
        let mut builder = StateGraph::new();
        builder
            .add_node("flaky", |_| {
                Box::pin(async move {
                    Err(GraphError::Execution("backend unavailable".to_string()))
                })
            })
            .add_edge(START, "flaky")
            .add_edge("flaky", END);
        let graph = builder.compile().unwrap();

        let err = graph.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::NodeExecution { ref node, .. } if node == "flaky"));
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_non_object_input_rejected() {
        let mut builder = StateGraph::new();
        builder
            .add_node("noop", passthrough())
            .add_edge(START, "noop")
            .add_edge("noop", END);
        let graph = builder.compile().unwrap();

        let err = graph.invoke(json!("not an object")).await.unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[tokio::test]
    async fn test_checkpointer_requires_thread_id() {
        let mut builder = StateGraph::new();
        builder
            .add_node("noop", passthrough())
            .add_edge(START, "noop")
            .add_edge("noop", END);
        let graph = builder
            .compile()
            .unwrap()
            .with_checkpointer(Arc::new(InMemoryCheckpointSaver::new()));

        let err = graph.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_get_state_requires_checkpointer() {
        let mut builder = StateGraph::new();
        builder
            .add_node("noop", passthrough())
            .add_edge(START, "noop")
            .add_edge("noop", END);
        let graph = builder.compile().unwrap();

        let config = CheckpointConfig::new().with_thread_id("t");
        let err = graph.get_state(&config).await.unwrap_err();
        assert!(matches!(err, GraphError::Configuration(_)));
    }

    fn logging_graph(saver: Arc<InMemoryCheckpointSaver>) -> CompiledGraph {
        let mut builder = StateGraph::new();
        builder
            .add_channel("log", Box::new(AppendReducer))
            .add_node("first", |_| {
                Box::pin(async move { Ok(json!({ "log": ["first"] })) })
            })
            .add_node("second", |_| {
                Box::pin(async move { Ok(json!({ "log": ["second"] })) })
            })
            .add_edge(START, "first")
            .add_edge("first", "second")
            .add_edge("second", END);
        builder.compile().unwrap().with_checkpointer(saver)
    }

    #[tokio::test]
    async fn test_checkpoints_written_per_step() {
        let saver = Arc::new(InMemoryCheckpointSaver::new());
        let graph = logging_graph(Arc::clone(&saver));
        let config = RunConfig::new().with_thread_id("thread-1");

        graph
            .invoke_with_config(json!({ "log": ["input"] }), config)
            .await
            .unwrap();

        let thread = CheckpointConfig::new().with_thread_id("thread-1");
        let history = graph.get_state_history(&thread).await.unwrap();

        // input + one checkpoint per node, newest first
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].metadata.source, Some(CheckpointSource::Input));
        assert_eq!(history[2].metadata.step, Some(-1));
        assert_eq!(history[1].metadata.source, Some(CheckpointSource::Loop));
        assert_eq!(history[1].metadata.step, Some(0));
        assert_eq!(history[0].metadata.step, Some(1));

        assert_eq!(history[2].values["log"], json!(["input"]));
        assert_eq!(history[0].values["log"], json!(["input", "first", "second"]));

        // each checkpoint chains to its predecessor
        assert_eq!(history[2].parent_config, None);
        assert_eq!(
            history[1].parent_config.as_ref().and_then(|c| c.checkpoint_id.as_ref()),
            history[2].config.checkpoint_id.as_ref()
        );
        assert_eq!(
            history[0].parent_config.as_ref().and_then(|c| c.checkpoint_id.as_ref()),
            history[1].config.checkpoint_id.as_ref()
        );
    }

    #[tokio::test]
    async fn test_node_writes_buffered_against_previous_checkpoint() {
        let saver = Arc::new(InMemoryCheckpointSaver::new());
        let graph = logging_graph(Arc::clone(&saver));

        graph
            .invoke_with_config(json!({}), RunConfig::new().with_thread_id("thread-1"))
            .await
            .unwrap();

        let thread = CheckpointConfig::new().with_thread_id("thread-1");
        let history = graph.get_state_history(&thread).await.unwrap();

        // the input checkpoint carries the first node's raw update
        let input_tuple = saver.get_tuple(&history[2].config).await.unwrap().unwrap();
        assert_eq!(input_tuple.pending_writes.len(), 1);
        let (task_id, channel, value) = &input_tuple.pending_writes[0];
        assert_eq!(task_id, "first:0");
        assert_eq!(channel, "log");
        assert_eq!(value, &json!(["first"]));
    }

    #[tokio::test]
    async fn test_resume_continues_from_latest_checkpoint() {
        let saver = Arc::new(InMemoryCheckpointSaver::new());
        let graph = logging_graph(Arc::clone(&saver));

        graph
            .invoke_with_config(json!({}), RunConfig::new().with_thread_id("thread-1"))
            .await
            .unwrap();
        let out = graph
            .invoke_with_config(Value::Null, RunConfig::new().with_thread_id("thread-1"))
            .await
            .unwrap();

        // second run restored the log and appended to it
        assert_eq!(out["log"], json!(["first", "second", "first", "second"]));

        // separate threads stay isolated
        let other = graph
            .invoke_with_config(json!({}), RunConfig::new().with_thread_id("thread-2"))
            .await
            .unwrap();
        assert_eq!(other["log"], json!(["first", "second"]));
    }

    #[tokio::test]
    async fn test_get_state_returns_latest_snapshot() {
        let saver = Arc::new(InMemoryCheckpointSaver::new());
        let graph = logging_graph(Arc::clone(&saver));

        graph
            .invoke_with_config(json!({}), RunConfig::new().with_thread_id("thread-1"))
            .await
            .unwrap();

        let thread = CheckpointConfig::new().with_thread_id("thread-1");
        let snapshot = graph.get_state(&thread).await.unwrap().unwrap();
        assert_eq!(snapshot.values["log"], json!(["first", "second"]));
        assert_eq!(snapshot.metadata.step, Some(1));

        let missing = CheckpointConfig::new().with_thread_id("never-ran");
        assert!(graph.get_state(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_channel_versions_bump_per_write() {
        let saver = Arc::new(InMemoryCheckpointSaver::new());
        let graph = logging_graph(Arc::clone(&saver));

        graph
            .invoke_with_config(json!({}), RunConfig::new().with_thread_id("thread-1"))
            .await
            .unwrap();

        let thread = CheckpointConfig::new().with_thread_id("thread-1");
        let tuple = saver.get_tuple(&thread).await.unwrap().unwrap();

        // both nodes wrote "log", so the final version is 2
        assert_eq!(tuple.checkpoint.channel_versions.get("log"), Some(&2));
        // each node's seen snapshot reflects the versions after its own write
        assert_eq!(
            tuple
                .checkpoint
                .versions_seen
                .get("first")
                .and_then(|seen| seen.get("log")),
            Some(&1)
        );
        assert_eq!(
            tuple
                .checkpoint
                .versions_seen
                .get("second")
                .and_then(|seen| seen.get("log")),
            Some(&2)
        );
    }
}
