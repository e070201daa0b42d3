//! Shared value types for the notas application.
//!
//! This module contains the inputs and outputs of store operations (new
//! notes, patches, filters, reminder effects, change events) and the CLI
//! subcommands.
use std::{collections::BTreeSet, path::PathBuf};

use chrono::{DateTime, Utc};
use clap::Subcommand;
use uuid::Uuid;

use crate::{FontStyle, NotasError, NoteCategory, NoteFormatting, ReminderPriority};

/// A specialized Result type for notas operations.
pub type Result<T> = std::result::Result<T, NotasError>;

/// Everything needed to create a note. Only title and content are required.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub formatting: Option<NoteFormatting>,
    pub reminder_date: Option<DateTime<Utc>>,
    pub reminder_priority: Option<ReminderPriority>,
    pub category: Option<NoteCategory>,
    pub tags: Option<Vec<String>>,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn formatting(mut self, formatting: NoteFormatting) -> Self {
        self.formatting = Some(formatting);
        self
    }

    pub fn reminder_date(mut self, date: DateTime<Utc>) -> Self {
        self.reminder_date = Some(date);
        self
    }

    pub fn reminder_priority(mut self, priority: ReminderPriority) -> Self {
        self.reminder_priority = Some(priority);
        self
    }

    pub fn category(mut self, category: NoteCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// A partial update of a note. `None` leaves a field untouched.
///
/// `reminder_date` is doubly optional: `Some(None)` clears the reminder,
/// `Some(Some(date))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_bold: Option<bool>,
    pub is_italic: Option<bool>,
    pub font_style: Option<FontStyle>,
    pub category: Option<NoteCategory>,
    pub tags: Option<Vec<String>>,
    pub reminder_date: Option<Option<DateTime<Utc>>>,
    pub reminder_enabled: Option<bool>,
    pub reminder_priority: Option<ReminderPriority>,
}

impl NotePatch {
    pub fn is_empty(&self) -> bool {
        *self == NotePatch::default()
    }

    /// True when the patch changes anything that decides whether or when an
    /// alert fires
    pub fn touches_reminder(&self) -> bool {
        self.reminder_date.is_some() || self.reminder_enabled.is_some()
    }

    /// True when the patch changes the text carried by a pending alert
    pub fn touches_alert_text(&self) -> bool {
        self.title.is_some() || self.content.is_some()
    }
}

/// Filters applied by `NoteStore::filtered_notes`. Empty fields are inactive.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub search_text: String,
    pub category: Option<NoteCategory>,
    pub tags: BTreeSet<String>,
}

impl NoteFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn category(mut self, category: NoteCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// A one-shot alert request handed to a reminder scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    /// The note id rendered as a string
    pub note_id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// A reminder side effect requested by a store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderEffect {
    Schedule(ReminderRequest),
    Cancel { note_id: String },
}

impl ReminderEffect {
    pub fn note_id(&self) -> &str {
        match self {
            ReminderEffect::Schedule(request) => &request.note_id,
            ReminderEffect::Cancel { note_id } => note_id,
        }
    }
}

/// Change notifications published by a `Notebook`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookEvent {
    NoteCreated(Uuid),
    NoteUpdated(Uuid),
    NotesDeleted(Vec<Uuid>),
    /// The whole collection was written to the blob store
    Persisted { notes: usize },
    /// Write-through failed; the in-memory collection is still authoritative
    PersistFailed { message: String },
    /// A schedule or cancel call was rejected by the scheduler
    ReminderFailed { note_id: String, message: String },
    /// The collection was re-read from the blob store
    Reloaded { notes: usize },
}

/// Available subcommands for the notas application
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: String,

        /// Content of the note
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the note's content
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Category of the note
        #[clap(short = 'k', long)]
        category: Option<String>,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,

        /// Reminder time in local time, "YYYY-MM-DD HH:MM"
        #[clap(short, long)]
        remind: Option<String>,

        /// Reminder priority (high, medium, low)
        #[clap(short, long)]
        priority: Option<String>,

        /// Font style (system, serif, monospace, rounded, comic)
        #[clap(long)]
        font: Option<String>,

        /// Render the note in bold
        #[clap(long)]
        bold: bool,

        /// Render the note in italics
        #[clap(long)]
        italic: bool,
    },

    /// View a note by ID
    View {
        /// ID (or unique prefix) of the note to view
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List notes with optional filtering
    List {
        /// Case-insensitive text searched in titles, content and tags
        #[clap(short, long)]
        search: Option<String>,

        /// Only show notes of this category
        #[clap(short = 'k', long)]
        category: Option<String>,

        /// Only show notes carrying any of these tags (comma-separated)
        #[clap(short, long)]
        tags: Option<String>,

        /// Limit the number of notes returned (0 for no limit)
        #[clap(short = 'n', long, default_value_t = 0)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Show full content instead of a preview
        #[clap(short, long)]
        detailed: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID (or unique prefix) of the note to edit
        id: String,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// New category for the note
        #[clap(short = 'k', long)]
        category: Option<String>,

        /// Tags to add (comma-separated)
        #[clap(short, long)]
        add_tags: Option<String>,

        /// Tags to remove (comma-separated)
        #[clap(short, long)]
        remove_tags: Option<String>,

        /// Font style (system, serif, monospace, rounded, comic)
        #[clap(long)]
        font: Option<String>,

        /// Set bold rendering on or off
        #[clap(long)]
        bold: Option<bool>,

        /// Set italic rendering on or off
        #[clap(long)]
        italic: Option<bool>,
    },

    /// Delete one or more notes
    Delete {
        /// IDs (or unique prefixes) of the notes to delete
        #[clap(required = true)]
        ids: Vec<String>,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Set, clear or toggle the reminder of a note
    Remind {
        /// ID (or unique prefix) of the note
        id: String,

        /// New reminder time in local time, "YYYY-MM-DD HH:MM"
        #[clap(short, long, conflicts_with_all = ["clear", "toggle"])]
        at: Option<String>,

        /// Remove the reminder entirely
        #[clap(short, long, conflicts_with = "toggle")]
        clear: bool,

        /// Enable or disable the reminder while keeping its date
        #[clap(short, long)]
        toggle: bool,

        /// Reminder priority (high, medium, low)
        #[clap(short, long)]
        priority: Option<String>,
    },

    /// List every tag in use
    Tags,

    /// Show how many notes each category holds
    Categories,

    /// Show days with reminders, or the reminders of one day
    Calendar {
        /// Local day to inspect, "YYYY-MM-DD"
        #[clap(short, long)]
        day: Option<String>,
    },

    /// Keep running and deliver reminders as they come due
    Watch,

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Reset configuration to defaults
        #[clap(short, long)]
        reset: bool,
    },
}
