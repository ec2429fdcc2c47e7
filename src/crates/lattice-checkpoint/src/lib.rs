//! # lattice-checkpoint - Durable State for Graph Execution
//!
//! Trait-based checkpoint persistence for the lattice runtime. The execution
//! engine snapshots graph state after every step; this crate defines what a
//! snapshot is and where it goes, so a crashed or restarted process can pick
//! a thread back up exactly where it left off.
//!
//! ## Core Concepts
//!
//! ### CheckpointSaver
//!
//! [`CheckpointSaver`] is the storage interface. Backends implement:
//!
//! - **`put()`** - Append a checkpoint to a thread's history
//! - **`get_tuple()`** - Load the latest checkpoint, or one by id
//! - **`list()`** - Walk a thread's history, newest first
//! - **`put_writes()`** - Attach per-task writes to a stored checkpoint
//!
//! Histories are append-only. A `put` that reuses an existing checkpoint id
//! on the same thread fails with [`CheckpointError::DuplicateCheckpoint`]
//! and leaves the stored history untouched. Reading a thread nothing was
//! written to yields `Ok(None)`, never an error.
//!
//! ### Checkpoint
//!
//! A [`Checkpoint`] captures the channel values of a graph run together with
//! per-channel versions and the versions each node has seen. Ids are
//! time-ordered UUIDs, so sorting by id is sorting by creation.
//!
//! ### Backends
//!
//! Two savers ship with the crate:
//!
//! - [`InMemoryCheckpointSaver`] - process-local, for tests and development
//! - [`FileCheckpointSaver`] - one document per thread on local disk
//!
//! Other backends (Postgres, Redis, object stores) implement the same trait.
//!
//! ## Quick Start
//!
//! ```rust
//! use lattice_checkpoint::{
//!     Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver,
//!     InMemoryCheckpointSaver,
//! };
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> lattice_checkpoint::Result<()> {
//!     let saver = InMemoryCheckpointSaver::new();
//!     let config = CheckpointConfig::new().with_thread_id("thread-123");
//!
//!     let stored = saver
//!         .put(
//!             &config,
//!             Checkpoint::empty(),
//!             CheckpointMetadata::new(),
//!             HashMap::new(),
//!         )
//!         .await?;
//!
//!     if let Some(tuple) = saver.get_tuple(&stored).await? {
//!         println!("latest checkpoint: {}", tuple.checkpoint.id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`checkpoint`] - [`Checkpoint`], [`CheckpointConfig`], [`CheckpointMetadata`], [`CheckpointTuple`]
//! - [`traits`] - [`CheckpointSaver`] and [`CheckpointStream`]
//! - [`memory`] - [`InMemoryCheckpointSaver`]
//! - [`file`] - [`FileCheckpointSaver`]
//! - [`serializer`] - [`SerializerProtocol`] and its JSON/bincode implementations
//! - [`error`] - [`CheckpointError`]

pub mod checkpoint;
pub mod error;
pub mod file;
pub mod memory;
pub mod serializer;
pub mod traits;

pub use checkpoint::{
    next_version, ChannelVersion, ChannelVersions, Checkpoint, CheckpointConfig, CheckpointId,
    CheckpointMetadata, CheckpointSource, CheckpointTuple, PendingWrite,
};
pub use error::{CheckpointError, Result};
pub use file::FileCheckpointSaver;
pub use memory::InMemoryCheckpointSaver;
pub use serializer::{BincodeSerializer, JsonSerializer, SerializerProtocol};
pub use traits::{CheckpointSaver, CheckpointStream};
