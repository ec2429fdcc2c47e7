//! File-backed checkpoint storage.
//!
//! [`FileCheckpointSaver`] persists each thread as one document under a base
//! directory, so histories survive process restarts. Documents are written
//! through a [`SerializerProtocol`]; the default [`JsonSerializer`] keeps
//! them readable with standard tools. Checkpoint payloads carry untyped JSON
//! values, which self-describing formats handle and bincode does not, so the
//! default is also the practical choice.
//!
//! Writes go to a temporary file that is synced and renamed over the target,
//! so a crash mid-write leaves the previous document intact. A shared lock
//! serializes read-modify-write cycles between clones of the saver; it does
//! not coordinate separate processes pointed at the same directory.

use crate::{
    checkpoint::{
        ChannelVersions, Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple,
        PendingWrite,
    },
    error::{CheckpointError, Result},
    serializer::{JsonSerializer, SerializerProtocol},
    traits::{CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// On-disk document holding every namespace of one thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThreadDocument {
    thread_id: String,
    namespaces: HashMap<String, Vec<StoredEntry>>,
}

impl ThreadDocument {
    fn new(thread_id: String) -> Self {
        Self {
            thread_id,
            namespaces: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    checkpoint: Checkpoint,
    metadata: CheckpointMetadata,
    config: CheckpointConfig,
    parent_config: Option<CheckpointConfig>,
    writes: Vec<PendingWrite>,
}

impl StoredEntry {
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

/// [`CheckpointSaver`] that stores one document per thread on local disk.
///
/// # Example
///
/// ```rust,no_run
/// use lattice_checkpoint::FileCheckpointSaver;
///
/// let saver = FileCheckpointSaver::new("/var/lib/lattice/checkpoints");
/// ```
#[derive(Debug, Clone)]
pub struct FileCheckpointSaver<S: SerializerProtocol = JsonSerializer> {
    base_path: PathBuf,
    serializer: Arc<S>,
    // Guards load-modify-save cycles across clones of this saver.
    lock: Arc<Mutex<()>>,
}

impl FileCheckpointSaver<JsonSerializer> {
    /// Create a saver rooted at `base_path`, storing JSON documents.
    ///
    /// The directory is created on first write, not here.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self::with_serializer(base_path, JsonSerializer::new())
    }
}

impl<S: SerializerProtocol> FileCheckpointSaver<S> {
    /// Create a saver with a custom document encoding.
    pub fn with_serializer(base_path: impl Into<PathBuf>, serializer: S) -> Self {
        Self {
            base_path: base_path.into(),
            serializer: Arc::new(serializer),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Directory the saver writes under.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn thread_path(&self, thread_id: &str) -> Result<PathBuf> {
        validate_thread_id(thread_id)?;
        Ok(self.base_path.join(format!("{thread_id}.json")))
    }

    async fn load_document(&self, thread_id: &str) -> Result<Option<ThreadDocument>> {
        let path = self.thread_path(thread_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok(Some(self.serializer.loads(&bytes)?))
    }

    async fn save_document(&self, document: &ThreadDocument) -> Result<()> {
        if !self.base_path.exists() {
            tokio::fs::create_dir_all(&self.base_path).await?;
        }
        let path = self.thread_path(&document.thread_id)?;
        let bytes = self.serializer.dumps(document)?;

        let tmp_path = self.base_path.join(format!(
            ".{}.{}.tmp",
            document.thread_id,
            Uuid::new_v4().simple()
        ));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            match tokio::fs::rename(&tmp_path, &path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tokio::fs::remove_file(&path).await?;
                    tokio::fs::rename(&tmp_path, &path).await?;
                }
                Err(e) => return Err(e),
            }
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CheckpointError::Io(e));
        }
        Ok(())
    }

    async fn thread_ids(&self) -> Result<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Thread ids become filenames; reject anything that could escape the
/// base directory.
fn validate_thread_id(thread_id: &str) -> Result<()> {
    if thread_id.is_empty() {
        return Err(CheckpointError::Invalid(
            "thread_id cannot be empty".to_string(),
        ));
    }
    if thread_id.contains('/')
        || thread_id.contains('\\')
        || thread_id.contains("..")
        || thread_id.contains('\0')
        || thread_id.chars().any(|c| c.is_control())
    {
        return Err(CheckpointError::Invalid(format!(
            "thread_id contains invalid characters: {thread_id:?}"
        )));
    }
    Ok(())
}

fn require_thread_id(config: &CheckpointConfig) -> Result<&String> {
    config
        .thread_id
        .as_ref()
        .ok_or_else(|| CheckpointError::Invalid("thread_id is required".to_string()))
}

#[async_trait]
impl<S: SerializerProtocol + 'static> CheckpointSaver for FileCheckpointSaver<S> {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = require_thread_id(config)?;
        let Some(document) = self.load_document(thread_id).await? else {
            return Ok(None);
        };
        let Some(entries) = document.namespaces.get(config.namespace()) else {
            return Ok(None);
        };

        let entry = match &config.checkpoint_id {
            Some(checkpoint_id) => entries.iter().find(|e| &e.checkpoint.id == checkpoint_id),
            None => entries.last(),
        };
        Ok(entry.map(StoredEntry::to_tuple))
    }

    async fn list(
        &self,
        config: Option<&CheckpointConfig>,
        filter: Option<HashMap<String, serde_json::Value>>,
        before: Option<&CheckpointConfig>,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        // (document, namespace) pairs to scan, one per (thread, ns).
        let mut scans: Vec<(ThreadDocument, String)> = Vec::new();
        match config.and_then(|c| c.thread_id.as_ref()) {
            Some(thread_id) => {
                let ns = config.map(|c| c.namespace().to_string()).unwrap_or_default();
                if let Some(document) = self.load_document(thread_id).await? {
                    scans.push((document, ns));
                }
            }
            None => {
                for thread_id in self.thread_ids().await? {
                    if let Some(document) = self.load_document(&thread_id).await? {
                        let mut namespaces: Vec<String> =
                            document.namespaces.keys().cloned().collect();
                        namespaces.sort();
                        for ns in namespaces {
                            scans.push((document.clone(), ns));
                        }
                    }
                }
            }
        }

        let mut results = Vec::new();

        'scans: for (document, ns) in &scans {
            let Some(entries) = document.namespaces.get(ns) else {
                continue;
            };

            for entry in entries.iter().rev() {
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
                    break 'scans;
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

        let _guard = self.lock.lock().await;

        let mut document = self
            .load_document(&thread_id)
            .await?
            .unwrap_or_else(|| ThreadDocument::new(thread_id.clone()));
        let entries = document
            .namespaces
            .entry(config.namespace().to_string())
            .or_default();

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

        entries.push(StoredEntry {
            checkpoint,
            metadata,
            config: checkpoint_config.clone(),
            parent_config: config.checkpoint_id.as_ref().map(|_| config.clone()),
            writes: Vec::new(),
        });

        self.save_document(&document).await?;
        Ok(checkpoint_config)
    }

    async fn put_writes(
        &self,
        config: &CheckpointConfig,
        writes: Vec<(String, serde_json::Value)>,
        task_id: String,
    ) -> Result<()> {
        let thread_id = require_thread_id(config)?.clone();
        let checkpoint_id = config
            .checkpoint_id
            .as_ref()
            .ok_or_else(|| CheckpointError::Invalid("checkpoint_id is required".to_string()))?;

        let _guard = self.lock.lock().await;

        let mut document = self.load_document(&thread_id).await?.ok_or_else(|| {
            CheckpointError::NotFound(format!("thread '{thread_id}'"))
        })?;

        let entry = document
            .namespaces
            .get_mut(config.namespace())
            .and_then(|entries| {
                entries
                    .iter_mut()
                    .find(|e| &e.checkpoint.id == checkpoint_id)
            })
            .ok_or_else(|| {
                CheckpointError::NotFound(format!(
                    "checkpoint '{checkpoint_id}' for thread '{thread_id}'"
                ))
            })?;

        for (channel, value) in writes {
            entry.writes.push((task_id.clone(), channel, value));
        }

        self.save_document(&document).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.thread_path(thread_id)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}
