//! Orchestration around `NoteStore`.
//!
//! A `Notebook` loads the collection once, forwards every mutation to the
//! store, carries out the reminder effects the store asks for and writes the
//! whole collection back after each change. Side effects are best effort:
//! failures are logged and published as events, never returned.
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    decode_notes, encode_notes, unreadable_key, BlobStore, NewNote, Note, NoteStore,
    NotebookEvent, NotePatch, ReminderEffect, ReminderScheduler,
};

const EVENT_CAPACITY: usize = 64;

/// Manages the note collection together with its persistence and reminders.
pub struct Notebook {
    store: NoteStore,

    /// Backend the collection is written through to
    backend: Box<dyn BlobStore>,

    /// Name of the blob holding the collection
    storage_key: String,

    scheduler: Arc<dyn ReminderScheduler>,

    events: broadcast::Sender<NotebookEvent>,
}

impl Notebook {
    /// Opens a notebook, loading whatever is stored under `storage_key`.
    ///
    /// A missing, unreadable or corrupt blob yields an empty notebook.
    pub fn open(
        backend: Box<dyn BlobStore>,
        storage_key: impl Into<String>,
        scheduler: Arc<dyn ReminderScheduler>,
    ) -> Self {
        let storage_key = storage_key.into();
        let notes = load_or_empty(&*backend, &storage_key);
        info!("Opened notebook '{}' with {} notes", storage_key, notes.len());

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: NoteStore::from_notes(notes),
            backend,
            storage_key,
            scheduler,
            events,
        }
    }

    /// Read access to the collection and its derived views
    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Subscribes to change notifications published after each mutation
    pub fn subscribe(&self) -> broadcast::Receiver<NotebookEvent> {
        self.events.subscribe()
    }

    pub fn create(&mut self, new_note: NewNote) -> Note {
        let (note, effects) = self.store.create(new_note);
        self.apply_effects(effects);
        self.publish(NotebookEvent::NoteCreated(note.id));
        self.persist();
        note
    }

    /// Returns `false` when no note has `id`; nothing changes in that case
    pub fn update(&mut self, id: Uuid, patch: NotePatch) -> bool {
        match self.store.update(id, patch) {
            Some(effects) => {
                self.apply_effects(effects);
                self.publish(NotebookEvent::NoteUpdated(id));
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Deletes the listed notes and returns how many existed
    pub fn delete(&mut self, ids: &[Uuid]) -> usize {
        let mut existing: Vec<Uuid> = Vec::new();
        for id in ids {
            if self.store.get(*id).is_some() && !existing.contains(id) {
                existing.push(*id);
            }
        }

        let (removed, effects) = self.store.delete(ids);
        self.apply_effects(effects);
        if removed > 0 {
            self.publish(NotebookEvent::NotesDeleted(existing));
        }
        self.persist();
        removed
    }

    /// Returns `false` when no note has `id`
    pub fn toggle_reminder_enabled(&mut self, id: Uuid) -> bool {
        match self.store.toggle_reminder_enabled(id) {
            Some(effects) => {
                self.apply_effects(effects);
                self.publish(NotebookEvent::NoteUpdated(id));
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Arms every reminder that should be pending; returns how many were requested
    pub fn resync_reminders(&self) -> usize {
        let effects = self.store.resync_reminders();
        let count = effects.len();
        self.apply_effects(effects);
        info!("Re-armed {} reminder(s)", count);
        count
    }

    /// Re-reads the collection after another process changed the blob.
    ///
    /// Alerts armed for the previous contents are cancelled first, then
    /// everything pending in the fresh contents is armed again. Returns how
    /// many reminders were requested.
    pub fn reload(&mut self) -> usize {
        let cancels: Vec<ReminderEffect> = self
            .store
            .notes()
            .iter()
            .filter(|note| note.is_reminder_armed())
            .map(|note| ReminderEffect::Cancel {
                note_id: note.reminder_key(),
            })
            .collect();
        self.apply_effects(cancels);

        let notes = load_or_empty(&*self.backend, &self.storage_key);
        info!("Reloaded {} notes from '{}'", notes.len(), self.storage_key);
        self.store = NoteStore::from_notes(notes);
        self.publish(NotebookEvent::Reloaded {
            notes: self.store.len(),
        });

        self.resync_reminders()
    }

    /// Writes the whole collection through to the backend.
    ///
    /// Failures leave the in-memory collection authoritative and are
    /// published as `PersistFailed`.
    pub fn persist(&self) {
        let result = encode_notes(self.store.notes())
            .and_then(|bytes| self.backend.save(&self.storage_key, &bytes));

        match result {
            Ok(()) => {
                debug!("Persisted {} notes", self.store.len());
                self.publish(NotebookEvent::Persisted {
                    notes: self.store.len(),
                });
            }
            Err(e) => {
                warn!("Failed to persist notes under '{}': {}", self.storage_key, e);
                self.publish(NotebookEvent::PersistFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    fn apply_effects(&self, effects: Vec<ReminderEffect>) {
        for effect in effects {
            let result = match &effect {
                ReminderEffect::Schedule(request) => self.scheduler.schedule(request),
                ReminderEffect::Cancel { note_id } => self.scheduler.cancel(note_id),
            };

            if let Err(e) = result {
                warn!("Reminder call for note {} failed: {}", effect.note_id(), e);
                self.publish(NotebookEvent::ReminderFailed {
                    note_id: effect.note_id().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn publish(&self, event: NotebookEvent) {
        // Sending only fails when nobody is subscribed
        let _ = self.events.send(event);
    }
}

fn load_or_empty(backend: &dyn BlobStore, key: &str) -> Vec<Note> {
    let bytes = match backend.load(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!("Nothing stored under '{}' yet", key);
            return Vec::new();
        }
        Err(e) => {
            error!("Failed to load notes under '{}', starting empty: {}", key, e);
            return Vec::new();
        }
    };

    match decode_notes(&bytes) {
        Ok(decoded) => {
            if decoded.skipped > 0 {
                warn!(
                    "Left out {} unreadable record(s) under '{}'",
                    decoded.skipped, key
                );
                preserve_unreadable(backend, key, &bytes);
            }
            decoded.notes
        }
        Err(e) => {
            error!("Stored notes under '{}' are unreadable, starting empty: {}", key, e);
            preserve_unreadable(backend, key, &bytes);
            Vec::new()
        }
    }
}

/// Copies the raw blob aside before a later write-through replaces it
fn preserve_unreadable(backend: &dyn BlobStore, key: &str, bytes: &[u8]) {
    let copy_key = unreadable_key(key);
    match backend.save(&copy_key, bytes) {
        Ok(()) => warn!("Kept a copy of the raw blob under '{}'", copy_key),
        Err(e) => error!("Failed to keep a copy of '{}': {}", key, e),
    }
}
