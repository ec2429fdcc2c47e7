//! Checkpoint record and addressing types.
//!
//! A [`Checkpoint`] is an immutable, versioned snapshot of graph state taken
//! after each execution step. Its serialized shape is the durable contract
//! between the engine and every saver implementation:
//!
//! ```json
//! {
//!   "version": 1,
//!   "timestamp": "2024-07-31T20:14:19.804150Z",
//!   "id": "0190d5c3-...",
//!   "channel_values": { "messages": [...] },
//!   "channel_versions": { "messages": 3 },
//!   "versions_seen": { "agent": { "messages": 2 } },
//!   "pending_sends": []
//! }
//! ```
//!
//! Channel versions are monotonically increasing integers, bumped on every
//! reducer write; `versions_seen` records, per node, the channel versions that
//! node consumed when it last ran. `pending_sends` is the queue slot for
//! deferred node invocations; the sequential engine never populates it, but
//! the field round-trips so a fan-out scheduler has a well-defined place to
//! put work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier of a single checkpoint.
///
/// Ids are time-sortable (UUIDv7), so lexicographic order within a thread
/// matches creation order.
pub type CheckpointId = String;

/// Monotonically increasing version of one channel.
pub type ChannelVersion = i64;

/// Map of channel name to its current version.
pub type ChannelVersions = HashMap<String, ChannelVersion>;

/// A buffered node write: `(task id, channel, value)`.
///
/// Writes are attached to the checkpoint that was current when the node ran,
/// before the merged result is committed as the next checkpoint.
pub type PendingWrite = (String, String, serde_json::Value);

/// Returns the version that follows `current` for a channel.
pub fn next_version(current: Option<&ChannelVersion>) -> ChannelVersion {
    current.copied().unwrap_or(0) + 1
}

/// What produced a checkpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Written after applying caller input, before any node ran.
    Input,
    /// Written by the step loop after a node's update was merged.
    Loop,
    /// Written by a manual state update.
    Update,
    /// Written when a thread history was forked.
    Fork,
}

/// Execution context stored alongside a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckpointMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CheckpointSource>,

    /// Step counter: -1 for the input checkpoint, 0.. for loop steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<HashMap<String, String>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CheckpointMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: CheckpointSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_parents(mut self, parents: HashMap<String, String>) -> Self {
        self.parents = Some(parents);
        self
    }

    pub fn with_extra(mut self, key: String, value: serde_json::Value) -> Self {
        self.extra.insert(key, value);
        self
    }
}

/// A full snapshot of graph state at one point in execution.
///
/// Never mutated after being written; a run produces a chain of these,
/// newest-last, under its thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version, [`Checkpoint::CURRENT_VERSION`].
    pub version: i32,

    /// Creation time, serialized as an ISO-8601 string.
    pub timestamp: DateTime<Utc>,

    pub id: CheckpointId,

    /// Current value of every channel.
    pub channel_values: HashMap<String, serde_json::Value>,

    /// Per-channel write counters.
    pub channel_versions: ChannelVersions,

    /// Per-node record of the channel versions it consumed when it last ran.
    pub versions_seen: HashMap<String, ChannelVersions>,

    /// Deferred node invocations queued for a future step.
    pub pending_sends: Vec<serde_json::Value>,
}

impl Checkpoint {
    pub const CURRENT_VERSION: i32 = 1;

    pub fn new(
        id: CheckpointId,
        channel_values: HashMap<String, serde_json::Value>,
        channel_versions: ChannelVersions,
        versions_seen: HashMap<String, ChannelVersions>,
    ) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            timestamp: Utc::now(),
            id,
            channel_values,
            channel_versions,
            versions_seen,
            pending_sends: Vec::new(),
        }
    }

    /// Create an empty checkpoint with a fresh time-sortable id.
    pub fn empty() -> Self {
        Self::new(
            Uuid::now_v7().to_string(),
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
        )
    }

    /// Boundary validation run by every saver before accepting a checkpoint.
    ///
    /// Rejects unknown format versions, empty ids, and non-positive channel
    /// versions. Content of `channel_values` is not inspected; channels are
    /// opaque to the store.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::CheckpointError;

        if self.version != Self::CURRENT_VERSION {
            return Err(CheckpointError::Invalid(format!(
                "unsupported checkpoint version {} (expected {})",
                self.version,
                Self::CURRENT_VERSION
            )));
        }
        if self.id.is_empty() {
            return Err(CheckpointError::Invalid(
                "checkpoint id must not be empty".to_string(),
            ));
        }
        for (channel, version) in &self.channel_versions {
            if *version < 1 {
                return Err(CheckpointError::Invalid(format!(
                    "channel '{}' has non-positive version {}",
                    channel, version
                )));
            }
        }
        for (node, seen) in &self.versions_seen {
            for (channel, version) in seen {
                if *version < 1 {
                    return Err(CheckpointError::Invalid(format!(
                        "node '{}' recorded non-positive version {} for channel '{}'",
                        node, version, channel
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Addresses a thread, a namespace within it, and optionally one checkpoint.
///
/// Thread identities are owned by the caller; savers never invent them.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CheckpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_ns: Option<String>,
}

impl CheckpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<CheckpointId>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    pub fn with_checkpoint_ns(mut self, checkpoint_ns: impl Into<String>) -> Self {
        self.checkpoint_ns = Some(checkpoint_ns.into());
        self
    }

    /// Namespace, defaulting to the root namespace `""`.
    pub fn namespace(&self) -> &str {
        self.checkpoint_ns.as_deref().unwrap_or("")
    }
}

/// A checkpoint together with its addressing and lineage.
#[derive(Debug, Clone)]
pub struct CheckpointTuple {
    pub config: CheckpointConfig,

    pub checkpoint: Checkpoint,

    pub metadata: CheckpointMetadata,

    /// Config of the checkpoint this one was derived from, if any.
    pub parent_config: Option<CheckpointConfig>,

    /// Node writes buffered against this checkpoint via `put_writes`.
    pub pending_writes: Vec<PendingWrite>,
}

impl CheckpointTuple {
    pub fn new(
        config: CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Self {
        Self {
            config,
            checkpoint,
            metadata,
            parent_config: None,
            pending_writes: Vec::new(),
        }
    }

    pub fn with_parent_config(mut self, parent_config: CheckpointConfig) -> Self {
        self.parent_config = Some(parent_config);
        self
    }
}
