//! The checkpoint storage trait.
//!
//! [`CheckpointSaver`] is the contract every storage backend implements:
//! [`InMemoryCheckpointSaver`](crate::InMemoryCheckpointSaver) and
//! [`FileCheckpointSaver`](crate::FileCheckpointSaver) here, or a database
//! saver downstream. The engine only ever talks to `Arc<dyn CheckpointSaver>`;
//! savers are constructed explicitly by the caller and passed in, never held
//! in process-wide state.
//!
//! Contract summary:
//!
//! - history is append-only per (thread, namespace); a duplicate checkpoint
//!   id fails with [`DuplicateCheckpoint`](crate::CheckpointError::DuplicateCheckpoint)
//!   and must leave prior state untouched
//! - `get`/`get_tuple` on a never-written thread return `Ok(None)`, never an
//!   error
//! - `list` yields newest-first and is restartable (each call re-scans)
//! - writes for one thread are serialized; a checkpoint is stored atomically
//!   or not at all

use crate::{
    checkpoint::{
        ChannelVersions, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple,
    },
    error::Result,
};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Async stream of checkpoint tuples, newest first.
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointTuple>> + Send + 'static>>;

/// Storage backend for checkpoint persistence.
///
/// Implementations must be `Send + Sync`; distinct threads may be written
/// concurrently, and the saver is responsible for serializing writes so no
/// partially-applied checkpoint is ever observable.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Fetch just the checkpoint for `config`.
    ///
    /// Resolves the checkpoint named by `config.checkpoint_id`, or the latest
    /// for the thread when no id is given. `Ok(None)` when the thread has
    /// never been written.
    async fn get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        if let Some(tuple) = self.get_tuple(config).await? {
            Ok(Some(tuple.checkpoint))
        } else {
            Ok(None)
        }
    }

    /// Fetch the checkpoint for `config` together with its metadata, lineage,
    /// and any writes buffered against it.
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// Stream checkpoints in reverse chronological order.
    ///
    /// `config` scopes the scan to one thread (all threads when `None`);
    /// `filter` matches against metadata fields; `before` excludes the named
    /// checkpoint and everything at or after it; `limit` truncates the
    /// stream. The sequence is finite and each call re-scans from the latest.
    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<std::collections::HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream>;

    /// Append `checkpoint` to the (thread, namespace) history named in
    /// `config`.
    ///
    /// Implementations validate the checkpoint at this boundary
    /// ([`Checkpoint::validate`]) and reject an id already present in the
    /// same history with `DuplicateCheckpoint`, leaving the store unchanged.
    /// Returns a config addressing the stored checkpoint; `new_versions`
    /// carries the channel versions bumped since the parent checkpoint, for
    /// backends that index by version.
    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
        new_versions: ChannelVersions,
    ) -> Result<CheckpointConfig>;

    /// Buffer intermediate node writes against the checkpoint named in
    /// `config`.
    ///
    /// Called after a node runs and before its merged result is committed as
    /// the next checkpoint, so an aborted run leaves an inspectable record
    /// without a partially-applied state.
    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()>;

    /// Delete every namespace and checkpoint for `thread_id`.
    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _ = thread_id;
        Ok(())
    }
}
