use std::sync::{Arc, Mutex};

use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use notas::{
    BlobStore, FileBlobStore, MemoryBlobStore, NewNote, NotasError, NoteCategory, NoteFilter,
    NotePatch, Notebook, NotebookEvent, ReminderRequest, ReminderScheduler, Result,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Schedule(String),
    Cancel(String),
}

#[derive(Default)]
struct RecordingScheduler {
    calls: Mutex<Vec<Call>>,
    fail: bool,
}

impl RecordingScheduler {
    fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

impl ReminderScheduler for RecordingScheduler {
    fn schedule(&self, request: &ReminderRequest) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Schedule(request.note_id.clone()));
        if self.fail {
            return Err(NotasError::SchedulerError {
                message: "notifications are off".to_string(),
            });
        }
        Ok(())
    }

    fn cancel(&self, note_id: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Cancel(note_id.to_string()));
        Ok(())
    }
}

struct BrokenStore;

impl BlobStore for BrokenStore {
    fn load(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(NotasError::ApplicationError {
            message: "disk unavailable".to_string(),
        })
    }

    fn save(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
        Err(NotasError::ApplicationError {
            message: "disk unavailable".to_string(),
        })
    }
}

fn open_memory() -> (Notebook, Arc<MemoryBlobStore>, Arc<RecordingScheduler>) {
    let backend = Arc::new(MemoryBlobStore::new());
    let scheduler = Arc::new(RecordingScheduler::default());
    let notebook = Notebook::open(Box::new(backend.clone()), "notes_key", scheduler.clone());
    (notebook, backend, scheduler)
}

#[test]
fn collection_reflects_creates_updates_and_deletes() {
    let (mut notebook, _, _) = open_memory();

    let a = notebook.create(NewNote::new("A", "first"));
    let b = notebook.create(NewNote::new("B", "second"));
    let c = notebook.create(NewNote::new("C", "third"));

    assert!(notebook.update(
        b.id,
        NotePatch {
            title: Some("B2".into()),
            ..NotePatch::default()
        }
    ));
    assert_eq!(notebook.delete(&[a.id]), 1);

    let store = notebook.store();
    assert_eq!(store.len(), 2);
    assert!(store.get(a.id).is_none());
    assert_eq!(store.get(b.id).unwrap().title, "B2");
    assert_eq!(store.get(c.id).unwrap().title, "C");
}

#[test]
fn update_and_toggle_of_unknown_ids_report_not_found() {
    let (mut notebook, _, scheduler) = open_memory();
    notebook.create(NewNote::new("A", "first"));

    assert!(!notebook.update(Uuid::new_v4(), NotePatch::default()));
    assert!(!notebook.toggle_reminder_enabled(Uuid::new_v4()));
    assert_eq!(notebook.delete(&[Uuid::new_v4()]), 0);
    assert!(scheduler.take().is_empty());
}

#[test]
fn deleting_an_armed_note_cancels_exactly_once() {
    let (mut notebook, _, scheduler) = open_memory();
    let note = notebook.create(
        NewNote::new("Dentist", "Call the clinic").reminder_date(Utc::now() + Duration::days(1)),
    );
    assert_eq!(scheduler.take(), vec![Call::Schedule(note.id.to_string())]);

    notebook.delete(&[note.id]);

    assert_eq!(scheduler.take(), vec![Call::Cancel(note.id.to_string())]);
}

#[test]
fn rescheduling_cancels_old_alert_first() {
    let (mut notebook, _, scheduler) = open_memory();
    let note = notebook
        .create(NewNote::new("Call", "mom").reminder_date(Utc::now() + Duration::hours(2)));
    scheduler.take();
    let key = note.id.to_string();

    notebook.update(
        note.id,
        NotePatch {
            reminder_date: Some(Some(Utc::now() + Duration::days(3))),
            ..NotePatch::default()
        },
    );
    assert_eq!(
        scheduler.take(),
        vec![Call::Cancel(key.clone()), Call::Schedule(key.clone())]
    );

    notebook.update(
        note.id,
        NotePatch {
            reminder_date: Some(Some(Utc::now() - Duration::days(3))),
            ..NotePatch::default()
        },
    );
    assert_eq!(scheduler.take(), vec![Call::Cancel(key)]);
}

#[test]
fn toggling_disables_and_re_enables_the_alert() {
    let (mut notebook, _, scheduler) = open_memory();
    let note = notebook
        .create(NewNote::new("Call", "mom").reminder_date(Utc::now() + Duration::hours(2)));
    scheduler.take();
    let key = note.id.to_string();

    assert!(notebook.toggle_reminder_enabled(note.id));
    assert_eq!(scheduler.take(), vec![Call::Cancel(key.clone())]);
    let disabled = notebook.store().get(note.id).unwrap();
    assert!(disabled.has_reminder);
    assert!(disabled.reminder_date.is_some());

    assert!(notebook.toggle_reminder_enabled(note.id));
    assert_eq!(scheduler.take(), vec![Call::Schedule(key)]);
}

#[test]
fn reopening_restores_the_same_collection() {
    let (mut notebook, backend, _) = open_memory();
    notebook.create(
        NewNote::new("Groceries", "Buy milk")
            .category(NoteCategory::Shopping)
            .tags(["home", "food"]),
    );
    notebook.create(
        NewNote::new("Trip", "Pack bags")
            .category(NoteCategory::Travel)
            .reminder_date(Utc::now() + Duration::days(10)),
    );
    let mut original = notebook.store().notes().to_vec();
    drop(notebook);

    let reopened = Notebook::open(
        Box::new(backend),
        "notes_key",
        Arc::new(RecordingScheduler::default()),
    );
    let mut restored = reopened.store().notes().to_vec();

    original.sort_by_key(|note| note.id);
    restored.sort_by_key(|note| note.id);
    assert_eq!(restored, original);
}

#[test]
fn records_missing_newer_fields_load_with_defaults() {
    let backend = Arc::new(MemoryBlobStore::new());
    let legacy = r#"[{
        "id": "0b6f1f0e-8a57-4c1e-9d55-2f3a8a9e1c01",
        "title": "Before categories",
        "content": "Old format",
        "date": "2025-08-19T10:00:00Z"
    }]"#;
    backend.save("notes_key", legacy.as_bytes()).unwrap();

    let notebook = Notebook::open(
        Box::new(backend),
        "notes_key",
        Arc::new(RecordingScheduler::default()),
    );

    let note = &notebook.store().notes()[0];
    assert_eq!(note.category, NoteCategory::General);
    assert!(note.tags.is_empty());
    assert!(!note.has_reminder);
    assert_eq!(notebook.store().counts_by_category()[&NoteCategory::General], 1);
}

#[test]
fn corrupt_blob_opens_empty_and_keeps_a_copy() {
    let backend = Arc::new(MemoryBlobStore::new());
    backend.save("notes_key", b"{ not a list").unwrap();

    let mut notebook = Notebook::open(
        Box::new(backend.clone()),
        "notes_key",
        Arc::new(RecordingScheduler::default()),
    );
    assert!(notebook.store().is_empty());

    notebook.create(NewNote::new("new", "after the damage"));
    assert_eq!(
        backend.load("notes_key.unreadable").unwrap(),
        Some(b"{ not a list".to_vec())
    );
}

#[test]
fn one_bad_record_does_not_cost_the_rest() {
    let backend = Arc::new(MemoryBlobStore::new());
    let blob = r#"[
        {"id":"0b6f1f0e-8a57-4c1e-9d55-2f3a8a9e1c01","title":"Keep me","content":"good","createdAt":"2025-08-19T10:00:00Z"},
        {"id":"1c7a2a1f-9b68-4d2f-8e66-3a4b9bae2d12","title":"Odd","content":"bad","createdAt":"2025-08-19T10:00:00Z","category":"Papelera"}
    ]"#;
    backend.save("notes_key", blob.as_bytes()).unwrap();

    let mut notebook = Notebook::open(
        Box::new(backend.clone()),
        "notes_key",
        Arc::new(RecordingScheduler::default()),
    );
    assert_eq!(notebook.store().len(), 1);

    notebook.create(NewNote::new("new", "written through"));

    let reopened = Notebook::open(
        Box::new(backend.clone()),
        "notes_key",
        Arc::new(RecordingScheduler::default()),
    );
    let mut titles: Vec<&str> = reopened
        .store()
        .notes()
        .iter()
        .map(|note| note.title.as_str())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Keep me", "new"]);
    assert_eq!(
        backend.load("notes_key.unreadable").unwrap(),
        Some(blob.as_bytes().to_vec())
    );
}

#[test]
fn reload_follows_changes_made_by_another_writer() {
    let backend = Arc::new(MemoryBlobStore::new());
    let soon = Utc::now() + Duration::hours(2);

    let mut writer = Notebook::open(
        Box::new(backend.clone()),
        "notes_key",
        Arc::new(RecordingScheduler::default()),
    );
    let deleted = writer.create(NewNote::new("Deleted", "x").reminder_date(soon));
    let disabled = writer.create(NewNote::new("Disabled", "y").reminder_date(soon));

    let watcher_scheduler = Arc::new(RecordingScheduler::default());
    let mut watcher = Notebook::open(
        Box::new(backend.clone()),
        "notes_key",
        watcher_scheduler.clone(),
    );
    assert_eq!(watcher.resync_reminders(), 2);
    watcher_scheduler.take();

    writer.delete(&[deleted.id]);
    writer.toggle_reminder_enabled(disabled.id);
    let added = writer.create(NewNote::new("Added", "z").reminder_date(soon));

    let mut events = watcher.subscribe();
    assert_eq!(watcher.reload(), 1);

    let calls = watcher_scheduler.take();
    assert_eq!(calls.len(), 3);
    assert!(calls[..2].contains(&Call::Cancel(deleted.id.to_string())));
    assert!(calls[..2].contains(&Call::Cancel(disabled.id.to_string())));
    assert_eq!(calls[2], Call::Schedule(added.id.to_string()));

    assert!(watcher.store().get(deleted.id).is_none());
    assert!(!watcher.store().get(disabled.id).unwrap().reminder_enabled);
    assert_eq!(events.try_recv().unwrap(), NotebookEvent::Reloaded { notes: 2 });
}

#[test]
fn persistence_failures_do_not_lose_in_memory_state() {
    let mut notebook = Notebook::open(
        Box::new(BrokenStore),
        "notes_key",
        Arc::new(RecordingScheduler::default()),
    );
    let mut events = notebook.subscribe();

    let note = notebook.create(NewNote::new("Still here", "even without a disk"));

    assert_eq!(notebook.store().get(note.id).unwrap().title, "Still here");
    assert_eq!(events.try_recv().unwrap(), NotebookEvent::NoteCreated(note.id));
    assert!(matches!(
        events.try_recv().unwrap(),
        NotebookEvent::PersistFailed { .. }
    ));
}

#[test]
fn scheduler_failures_do_not_block_creation() {
    let scheduler = Arc::new(RecordingScheduler::failing());
    let mut notebook = Notebook::open(
        Box::new(MemoryBlobStore::new()),
        "notes_key",
        scheduler.clone(),
    );
    let mut events = notebook.subscribe();

    let note = notebook
        .create(NewNote::new("Call", "mom").reminder_date(Utc::now() + Duration::hours(1)));

    assert!(notebook.store().get(note.id).is_some());
    assert_eq!(
        events.try_recv().unwrap(),
        NotebookEvent::ReminderFailed {
            note_id: note.id.to_string(),
            message: "Reminder scheduling failed: notifications are off".to_string(),
        }
    );
    assert_eq!(events.try_recv().unwrap(), NotebookEvent::NoteCreated(note.id));
    assert_eq!(events.try_recv().unwrap(), NotebookEvent::Persisted { notes: 1 });
}

#[test]
fn subscribers_see_every_mutation() {
    let (mut notebook, _, _) = open_memory();
    let mut events = notebook.subscribe();

    let a = notebook.create(NewNote::new("A", "a"));
    notebook.update(
        a.id,
        NotePatch {
            is_bold: Some(true),
            ..NotePatch::default()
        },
    );
    notebook.delete(&[a.id, Uuid::new_v4()]);

    let received: Vec<NotebookEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(
        received,
        vec![
            NotebookEvent::NoteCreated(a.id),
            NotebookEvent::Persisted { notes: 1 },
            NotebookEvent::NoteUpdated(a.id),
            NotebookEvent::Persisted { notes: 1 },
            NotebookEvent::NotesDeleted(vec![a.id]),
            NotebookEvent::Persisted { notes: 0 },
        ]
    );
}

#[test]
fn resync_arms_only_future_enabled_reminders() {
    let (mut notebook, _, scheduler) = open_memory();
    let future = notebook
        .create(NewNote::new("Future", "x").reminder_date(Utc::now() + Duration::days(2)));
    notebook.create(NewNote::new("Past", "y").reminder_date(Utc::now() - Duration::days(2)));
    notebook.create(NewNote::new("None", "z"));
    scheduler.take();

    assert_eq!(notebook.resync_reminders(), 1);
    assert_eq!(scheduler.take(), vec![Call::Schedule(future.id.to_string())]);
}

#[test]
fn calendar_views_group_by_local_day() {
    let (mut notebook, _, _) = open_memory();
    let at = |h: u32| {
        Local
            .with_ymd_and_hms(2030, 1, 15, h, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    };
    notebook.create(NewNote::new("Morning", "a").reminder_date(at(8)));
    notebook.create(NewNote::new("Evening", "b").reminder_date(at(20)));

    let day = NaiveDate::from_ymd_opt(2030, 1, 15).unwrap();
    assert_eq!(
        notebook.store().dates_with_reminders().into_iter().collect::<Vec<_>>(),
        vec![day]
    );
    assert_eq!(notebook.store().reminders_on(day).len(), 2);
}

#[test]
fn file_backend_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let scheduler = Arc::new(RecordingScheduler::default());

    let mut notebook = Notebook::open(
        Box::new(FileBlobStore::new(temp.path())),
        "notes_key",
        scheduler.clone(),
    );
    let note = notebook.create(NewNote::new("Persisted", "on disk").tags(["disk"]));
    drop(notebook);

    assert!(temp.path().join("notes_key.json").exists());

    let reopened = Notebook::open(
        Box::new(FileBlobStore::new(temp.path())),
        "notes_key",
        scheduler,
    );
    let found = reopened.store().filtered_notes(&NoteFilter::new().tag("disk"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, note.id);
}
