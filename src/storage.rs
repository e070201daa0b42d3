//! Blob persistence for the note collection.
//!
//! The whole collection is stored as one JSON array under a named key. A
//! `BlobStore` only knows how to read and write opaque bytes per key.
use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, error, info, trace, warn};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use crate::{NotasError, Note, Result};

/// Key/value storage for serialized blobs
pub trait BlobStore: Send + Sync {
    /// Returns the blob stored under `key`, or `None` if nothing was saved yet
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replaces the blob stored under `key`
    fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        (**self).save(key, bytes)
    }
}

/// Serializes the collection in the persisted layout
pub fn encode_notes(notes: &[Note]) -> Result<Vec<u8>> {
    trace!("Serializing {} notes to JSON", notes.len());
    serde_json::to_vec_pretty(notes).map_err(|e| {
        error!("Failed to serialize notes: {}", e);
        NotasError::Serialization(e)
    })
}

/// A persisted collection after decoding
#[derive(Debug, Default)]
pub struct DecodedNotes {
    pub notes: Vec<Note>,
    /// Records that could not be read and were left out
    pub skipped: usize,
}

/// Reads a persisted collection; missing optional fields take their defaults.
///
/// Each record is decoded on its own. A record that fails to decode or has a
/// nil id is logged and skipped so the rest of the collection survives. Only
/// a blob that is not a JSON array at all is an error.
pub fn decode_notes(bytes: &[u8]) -> Result<DecodedNotes> {
    let records: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    let mut decoded = DecodedNotes {
        notes: Vec::with_capacity(records.len()),
        skipped: 0,
    };

    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Note>(record) {
            Ok(note) if note.id.is_nil() => {
                warn!("Skipping record {}: note '{}' has a nil ID", index, note.title);
                decoded.skipped += 1;
            }
            Ok(note) => decoded.notes.push(note),
            Err(e) => {
                warn!("Skipping unreadable record {}: {}", index, e);
                decoded.skipped += 1;
            }
        }
    }

    trace!(
        "Decoded {} notes, skipped {}",
        decoded.notes.len(),
        decoded.skipped
    );
    Ok(decoded)
}

/// Key the raw bytes of a blob are copied to when part of it could not be read
pub fn unreadable_key(key: &str) -> String {
    format!("{}.unreadable", key)
}

/// Stores each key as `<dir>/<key>.json`, replacing files atomically
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Helper method to get the file path for a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Signals on `changes` whenever the file behind `key` is written.
    ///
    /// The parent directory is watched rather than the file, since atomic
    /// saves replace the file. Signals stop when the returned watcher is
    /// dropped.
    pub fn watch(&self, key: &str, changes: mpsc::Sender<()>) -> Result<RecommendedWatcher> {
        self.ensure_dir()?;
        let file_name = self.path_for(key).file_name().map(|name| name.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if event.kind.is_access() {
                        return;
                    }
                    if event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == file_name.as_deref())
                    {
                        trace!("Blob changed on disk: {:?}", event.kind);
                        // A full channel already holds a pending signal
                        let _ = changes.try_send(());
                    }
                }
                Err(e) => error!("File system watcher error: {}", e),
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| {
            NotasError::Io(std::io::Error::other(format!(
                "Failed to create file watcher: {}",
                e
            )))
        })?;

        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                NotasError::Io(std::io::Error::other(format!(
                    "Failed to watch directory {}: {}",
                    self.dir.display(),
                    e
                )))
            })?;

        info!("Watching {} for changes", self.path_for(key).display());
        Ok(watcher)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            debug!("Creating data directory: {}", self.dir.display());
            fs::create_dir_all(&self.dir).map_err(|e| {
                error!("Failed to create data directory {}: {}", self.dir.display(), e);
                NotasError::DirectoryError {
                    path: self.dir.clone(),
                }
            })?;
        }
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("No blob stored at {}", path.display());
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            NotasError::Io(e)
        })?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Some(bytes))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path_for(key);

        // Write next to the target so the final rename stays on one filesystem
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            NotasError::Io(e)
        })?;

        temp_file.write_all(bytes).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            NotasError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            NotasError::Io(e)
        })?;

        temp_file.persist(&path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            NotasError::Io(e.error)
        })?;

        info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Process-local blob store, used for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs.lock().map_err(|_| NotasError::ApplicationError {
            message: "Failed to acquire lock on in-memory blob store".to_string(),
        })
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
