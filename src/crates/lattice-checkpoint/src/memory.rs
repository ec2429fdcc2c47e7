//! In-memory checkpoint storage.
//!
//! [`InMemoryCheckpointSaver`] is the reference [`CheckpointSaver`]: all
//! history lives in a process-local map keyed by (thread, namespace), with no
//! durability across restarts. Suitable for tests, development, and
//! single-process runs; the file and any external savers must preserve the
//! same observable contract, duplicate-id rejection included.
//!
//! A single `tokio::sync::RwLock` guards the map. Taking the write lock for
//! every `put` serializes writes across all threads, which subsumes the
//! per-thread ordering the contract requires, and makes each append atomic
//! with respect to readers.

use crate::{
    checkpoint::{
        ChannelVersions, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple,
        PendingWrite,
    },
    error::{CheckpointError, Result},
    traits::{CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use futures::stream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One stored checkpoint with its addressing and buffered writes.
#[derive(Debug, Clone)]
struct CheckpointEntry {
    checkpoint: Checkpoint,
    metadata: CheckpointMetadata,
    config: CheckpointConfig,
    parent_config: Option<CheckpointConfig>,
    writes: Vec<PendingWrite>,
}

impl CheckpointEntry {
    fn to_tuple(&self) -> CheckpointTuple {
        CheckpointTuple {
            config: self.config.clone(),
            checkpoint: self.checkpoint.clone(),
            metadata: self.metadata.clone(),
            parent_config: self.parent_config.clone(),
            pending_writes: self.writes.clone(),
        }
    }
}

/// (thread id, namespace) → append-ordered history.
type CheckpointStorage = Arc<RwLock<HashMap<(String, String), Vec<CheckpointEntry>>>>;

/// In-memory implementation of [`CheckpointSaver`].
///
/// Cloning is cheap and shares the underlying storage.
///
/// # Example
///
/// ```rust
/// use lattice_checkpoint::{
///     Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver,
///     InMemoryCheckpointSaver,
/// };
/// use std::collections::HashMap;
///
/// #[tokio::main]
/// async fn main() -> lattice_checkpoint::Result<()> {
///     let saver = InMemoryCheckpointSaver::new();
///     let config = CheckpointConfig::new().with_thread_id("session-1");
///
///     let stored = saver
///         .put(
///             &config,
///             Checkpoint::empty(),
///             CheckpointMetadata::new(),
///             HashMap::new(),
///         )
///         .await?;
///
///     assert!(saver.get(&stored).await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointSaver {
    storage: CheckpointStorage,
}

impl InMemoryCheckpointSaver {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of (thread, namespace) histories being tracked.
    pub async fn thread_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Total number of checkpoints across all threads.
    pub async fn checkpoint_count(&self) -> usize {
        self.storage
            .read()
            .await
            .values()
            .map(|entries| entries.len())
            .sum()
    }

    /// Drop everything. Useful for test isolation.
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

fn require_thread_id(config: &CheckpointConfig) -> Result<&String> {
    config
        .thread_id
        .as_ref()
        .ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let storage = self.storage.read().await;
        let thread_id = require_thread_id(config)?;
        let key = (thread_id.clone(), config.namespace().to_string());

        if let Some(entries) = storage.get(&key) {
            if let Some(checkpoint_id) = &config.checkpoint_id {
                if let Some(entry) = entries.iter().find(|e| &e.checkpoint.id == checkpoint_id) {
                    return Ok(Some(entry.to_tuple()));
                }
            } else if let Some(entry) = entries.last() {
                return Ok(Some(entry.to_tuple()));
            }
        }

        Ok(None)
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        let storage = self.storage.read().await;

        // Scope the scan to one (thread, ns) when a thread is named.
        let keys: Vec<(String, String)> = match config.and_then(|c| c.thread_id.as_ref()) {
            Some(thread_id) => {
                let ns = config.map(|c| c.namespace().to_string()).unwrap_or_default();
                vec![(thread_id.clone(), ns)]
            }
            None => storage.keys().cloned().collect(),
        };

        let mut results = Vec::new();

        'threads: for key in keys {
            let Some(entries) = storage.get(&key) else {
                continue;
            };

            for entry in entries.iter().rev() {
                // Ids are time-sortable, so id order is creation order.
                if let Some(before_id) = before.and_then(|b| b.checkpoint_id.as_ref()) {
                    if entry.checkpoint.id >= *before_id {
                        continue;
                    }
                }

                if let Some(filter_map) = &filter {
                    let metadata = serde_json::to_value(&entry.metadata)?;
                    let matches = filter_map
                        .iter()
                        .all(|(k, v)| metadata.get(k) == Some(v));
                    if !matches {
                        continue;
                    }
                }

                results.push(Ok(entry.to_tuple()));

                if limit.is_some_and(|lim| results.len() >= lim) {
                    break 'threads;
                }
            }
        }

        Ok(Box::pin(stream::iter(results)))
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
        _new_versions: ChannelVersions,
    ) -> Result<CheckpointConfig> {
        let thread_id = require_thread_id(config)?.clone();
        checkpoint.validate()?;

        let key = (thread_id.clone(), config.namespace().to_string());
        let mut storage = self.storage.write().await;
        let entries = storage.entry(key).or_default();

        if entries.iter().any(|e| e.checkpoint.id == checkpoint.id) {
            return Err(CheckpointError::DuplicateCheckpoint {
                thread_id,
                checkpoint_id: checkpoint.id,
            });
        }

        let checkpoint_config = CheckpointConfig {
            thread_id: Some(thread_id),
            checkpoint_id: Some(checkpoint.id.clone()),
            checkpoint_ns: config.checkpoint_ns.clone(),
        };

        entries.push(CheckpointEntry {
            checkpoint,
            metadata,
            config: checkpoint_config.clone(),
            parent_config: config.checkpoint_id.as_ref().map(|_| config.clone()),
            writes: Vec::new(),
        });

        Ok(checkpoint_config)
    }

    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()> {
        let thread_id = require_thread_id(config)?;
        let checkpoint_id = config
            .checkpoint_id
            .as_ref()
            .ok_or_else(|| CheckpointError::Invalid("checkpoint_id is required".to_string()))?;

        let key = (thread_id.clone(), config.namespace().to_string());
        let mut storage = self.storage.write().await;

        if let Some(entries) = storage.get_mut(&key) {
            if let Some(entry) = entries
                .iter_mut()
                .find(|e| &e.checkpoint.id == checkpoint_id)
            {
                for (channel, value) in writes {
                    entry.writes.push((task_id.clone(), channel, value));
                }
                return Ok(());
            }
        }

        Err(CheckpointError::NotFound(format!(
            "checkpoint '{}' for thread '{}'",
            checkpoint_id, thread_id
        )))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage.retain(|(tid, _), _| tid != thread_id);
        Ok(())
    }
}
