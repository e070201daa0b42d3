//! In-memory note collection and its derived views.
//!
//! `NoteStore` performs no I/O. Mutations return the reminder side effects
//! they require and leave executing them (and persisting the collection) to
//! the caller, see `Notebook`.
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, trace};
use uuid::Uuid;

use crate::{
    dedup_tags, local_day, NewNote, Note, NoteCategory, NoteFilter, NotePatch, NotasError,
    ReminderEffect, ReminderRequest, Result,
};

/// Single source of truth for the note collection.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    /// Notes in insertion order; display order is always derived
    notes: Vec<Note>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from an already loaded collection
    pub fn from_notes(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Resolves a full id or a unique leading fragment of one
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&Note> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(NotasError::NoteNotFound { id: prefix });
        }

        let mut matches = self
            .notes
            .iter()
            .filter(|note| note.id.to_string().starts_with(&prefix));

        match (matches.next(), matches.count()) {
            (Some(note), 0) => Ok(note),
            (Some(_), others) => Err(NotasError::AmbiguousId {
                prefix,
                matches: others + 1,
            }),
            (None, _) => Err(NotasError::NoteNotFound { id: prefix }),
        }
    }

    /// Creates a note, applying defaults for everything `new_note` leaves out.
    ///
    /// A supplied reminder date arms the reminder; a `Schedule` effect is
    /// returned when that date is still ahead.
    pub fn create(&mut self, new_note: NewNote) -> (Note, Vec<ReminderEffect>) {
        let mut note = Note::new(new_note.title, new_note.content);

        if let Some(formatting) = new_note.formatting {
            note.set_formatting(formatting);
        }
        if let Some(category) = new_note.category {
            note.category = category;
        }
        if let Some(tags) = new_note.tags {
            note.tags = dedup_tags(tags);
        }
        if let Some(priority) = new_note.reminder_priority {
            note.reminder_priority = priority;
        }

        let mut effects = Vec::new();
        if let Some(date) = new_note.reminder_date {
            note.has_reminder = true;
            note.reminder_enabled = true;
            note.reminder_date = Some(date);
            effects.extend(schedule_effect(&note, Utc::now()));
        }

        info!("Created note {} in category {:?}", note.id, note.category);
        self.notes.push(note.clone());
        (note, effects)
    }

    /// Applies a partial update. Returns `None` when no note has `id`.
    ///
    /// An armed reminder is cancelled before reminder fields change and
    /// re-armed afterwards if the note still qualifies.
    pub fn update(&mut self, id: Uuid, patch: NotePatch) -> Option<Vec<ReminderEffect>> {
        let now = Utc::now();
        let Some(note) = self.notes.iter_mut().find(|note| note.id == id) else {
            debug!("Update ignored, note {} not found", id);
            return None;
        };

        let was_armed = note.is_reminder_armed();
        let reschedule =
            patch.touches_reminder() || (was_armed && patch.touches_alert_text());

        let mut effects = Vec::new();
        if reschedule && was_armed {
            effects.push(ReminderEffect::Cancel {
                note_id: note.reminder_key(),
            });
        }

        apply_patch(note, patch);

        if reschedule {
            effects.extend(schedule_effect(note, now));
        }

        debug!("Updated note {} with {} reminder effect(s)", id, effects.len());
        Some(effects)
    }

    /// Removes every note whose id is listed. Unknown ids are ignored.
    pub fn delete(&mut self, ids: &[Uuid]) -> (usize, Vec<ReminderEffect>) {
        let mut effects = Vec::new();
        let before = self.notes.len();

        self.notes.retain(|note| {
            if !ids.contains(&note.id) {
                return true;
            }
            if note.has_reminder && note.reminder_enabled {
                effects.push(ReminderEffect::Cancel {
                    note_id: note.reminder_key(),
                });
            }
            trace!("Removing note {}", note.id);
            false
        });

        let removed = before - self.notes.len();
        info!("Deleted {} of {} requested note(s)", removed, ids.len());
        (removed, effects)
    }

    /// Flips `reminder_enabled`. Returns `None` when no note has `id`.
    pub fn toggle_reminder_enabled(&mut self, id: Uuid) -> Option<Vec<ReminderEffect>> {
        let note = self.notes.iter_mut().find(|note| note.id == id)?;
        note.reminder_enabled = !note.reminder_enabled;
        debug!(
            "Reminder for note {} is now {}",
            id,
            if note.reminder_enabled { "enabled" } else { "disabled" }
        );

        let effect = schedule_effect(note, Utc::now()).unwrap_or_else(|| ReminderEffect::Cancel {
            note_id: note.reminder_key(),
        });
        Some(vec![effect])
    }

    /// A `Schedule` effect for every note whose alert should be pending now
    pub fn resync_reminders(&self) -> Vec<ReminderEffect> {
        let now = Utc::now();
        self.notes
            .iter()
            .filter_map(|note| schedule_effect(note, now))
            .collect()
    }

    /// Notes matching `filter`, most recently created first.
    ///
    /// Category, search text and tag filters are combined with AND. The
    /// search text matches title, content or any tag ignoring case; the tag
    /// filter matches notes carrying any of the requested tags.
    pub fn filtered_notes(&self, filter: &NoteFilter) -> Vec<&Note> {
        let needle = filter.search_text.to_lowercase();

        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|note| filter.category.map_or(true, |c| note.category == c))
            .filter(|note| needle.is_empty() || matches_search(note, &needle))
            .filter(|note| {
                filter.tags.is_empty() || note.tags.iter().any(|t| filter.tags.contains(t))
            })
            .collect();

        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes
    }

    /// Every tag in use, alphabetically
    pub fn available_tags(&self) -> Vec<String> {
        self.notes
            .iter()
            .flat_map(|note| note.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of notes per category, including empty categories
    pub fn counts_by_category(&self) -> BTreeMap<NoteCategory, usize> {
        let mut counts: BTreeMap<NoteCategory, usize> =
            NoteCategory::ALL.into_iter().map(|c| (c, 0)).collect();
        for note in &self.notes {
            *counts.entry(note.category).or_insert(0) += 1;
        }
        counts
    }

    /// Enabled reminders falling on `day` in the local calendar, earliest first
    pub fn reminders_on(&self, day: NaiveDate) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .active_reminders()
            .filter(|(_, date)| local_day(*date) == day)
            .map(|(note, _)| note)
            .collect();
        notes.sort_by_key(|note| note.reminder_date);
        notes
    }

    /// Distinct local days carrying at least one enabled reminder
    pub fn dates_with_reminders(&self) -> BTreeSet<NaiveDate> {
        self.active_reminders()
            .map(|(_, date)| local_day(date))
            .collect()
    }

    fn active_reminders(&self) -> impl Iterator<Item = (&Note, DateTime<Utc>)> {
        self.notes.iter().filter_map(|note| {
            if note.has_reminder && note.reminder_enabled {
                note.reminder_date.map(|date| (note, date))
            } else {
                None
            }
        })
    }
}

fn matches_search(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle)
        || note.content.to_lowercase().contains(needle)
        || note.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

fn schedule_effect(note: &Note, now: DateTime<Utc>) -> Option<ReminderEffect> {
    note.pending_reminder_at(now).map(|fire_at| {
        ReminderEffect::Schedule(ReminderRequest {
            note_id: note.reminder_key(),
            fire_at,
            title: note.title.clone(),
            body: note.content.clone(),
        })
    })
}

fn apply_patch(note: &mut Note, patch: NotePatch) {
    if let Some(title) = patch.title {
        note.title = title;
    }
    if let Some(content) = patch.content {
        note.content = content;
    }
    if let Some(is_bold) = patch.is_bold {
        note.is_bold = is_bold;
    }
    if let Some(is_italic) = patch.is_italic {
        note.is_italic = is_italic;
    }
    if let Some(font_style) = patch.font_style {
        note.font_style = font_style;
    }
    if let Some(category) = patch.category {
        note.category = category;
    }
    if let Some(tags) = patch.tags {
        note.tags = dedup_tags(tags);
    }
    if let Some(priority) = patch.reminder_priority {
        note.reminder_priority = priority;
    }

    // A new date always arms the reminder; an enabled flag sent alongside it
    // is not consulted.
    match patch.reminder_date {
        Some(Some(date)) => {
            if patch.reminder_enabled.is_some() {
                debug!("Ignoring reminder_enabled for note {}: a date was supplied", note.id);
            }
            note.has_reminder = true;
            note.reminder_enabled = true;
            note.reminder_date = Some(date);
        }
        Some(None) => {
            note.has_reminder = false;
            note.reminder_enabled = false;
            note.reminder_date = None;
        }
        None => {
            if let Some(enabled) = patch.reminder_enabled {
                note.reminder_enabled = enabled;
            }
        }
    }
}
