//! Core data structures for the notas application.
//!
//! This module contains the `Note` entity along with the small enums that
//! describe its formatting, category and reminder priority. Display metadata
//! for those enums is provided through lookups so the note itself stays a
//! plain record.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: Uuid,
    /// Note title
    pub title: String,
    /// Note body
    pub content: String,
    /// When the note was created
    #[serde(alias = "date", deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub font_style: FontStyle,
    /// Whether a reminder was ever configured for this note
    #[serde(default)]
    pub has_reminder: bool,
    /// When the reminder fires; only meaningful while `has_reminder` is set
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub reminder_date: Option<DateTime<Utc>>,
    /// Whether an alert should currently be armed for this note
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default)]
    pub reminder_priority: ReminderPriority,
    #[serde(default)]
    pub category: NoteCategory,
    /// Tags for organization, deduplicated and kept in insertion order
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    /// Creates a new note with the given title and content and default settings
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Note {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
            is_bold: false,
            is_italic: false,
            font_style: FontStyle::default(),
            has_reminder: false,
            reminder_date: None,
            reminder_enabled: false,
            reminder_priority: ReminderPriority::default(),
            category: NoteCategory::default(),
            tags: Vec::new(),
        }
    }

    /// A note is valid for saving when both title and content carry text.
    /// The store itself never enforces this; front ends check it first.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }

    /// Returns the formatting hints of the note as one value
    pub fn formatting(&self) -> NoteFormatting {
        NoteFormatting {
            is_bold: self.is_bold,
            is_italic: self.is_italic,
            font_style: self.font_style,
        }
    }

    pub fn set_formatting(&mut self, formatting: NoteFormatting) {
        self.is_bold = formatting.is_bold;
        self.is_italic = formatting.is_italic;
        self.font_style = formatting.font_style;
    }

    /// True when the note wants an alert: reminder configured, enabled and dated.
    pub fn is_reminder_armed(&self) -> bool {
        self.has_reminder && self.reminder_enabled && self.reminder_date.is_some()
    }

    /// Returns the fire time if an alert should be pending at `now`
    pub fn pending_reminder_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.has_reminder || !self.reminder_enabled {
            return None;
        }
        self.reminder_date.filter(|date| *date > now)
    }

    /// Stable string form of the id, used as the reminder key
    pub fn reminder_key(&self) -> String {
        self.id.to_string()
    }
}

/// Bold/italic/font hints supplied together when creating or editing a note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteFormatting {
    pub is_bold: bool,
    pub is_italic: bool,
    pub font_style: FontStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    #[serde(alias = "System")]
    System,
    #[serde(alias = "Times New Roman")]
    Serif,
    #[serde(alias = "Courier")]
    Monospace,
    #[serde(alias = "San Francisco Rounded")]
    Rounded,
    #[serde(alias = "Comic Sans MS")]
    Comic,
}

impl FontStyle {
    pub const ALL: [FontStyle; 5] = [
        FontStyle::System,
        FontStyle::Serif,
        FontStyle::Monospace,
        FontStyle::Rounded,
        FontStyle::Comic,
    ];

    /// Name of the typeface this style renders with
    pub fn display_name(self) -> &'static str {
        match self {
            FontStyle::System => "System",
            FontStyle::Serif => "Times New Roman",
            FontStyle::Monospace => "Courier",
            FontStyle::Rounded => "San Francisco Rounded",
            FontStyle::Comic => "Comic Sans MS",
        }
    }
}

/// Cosmetic urgency of a reminder. It has no effect on scheduling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl ReminderPriority {
    pub const ALL: [ReminderPriority; 3] = [
        ReminderPriority::High,
        ReminderPriority::Medium,
        ReminderPriority::Low,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ReminderPriority::High => "High",
            ReminderPriority::Medium => "Medium",
            ReminderPriority::Low => "Low",
        }
    }
}

/// The fixed set of classifications a note can belong to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    #[default]
    #[serde(alias = "General")]
    General,
    #[serde(alias = "Trabajo")]
    Work,
    #[serde(alias = "Personal")]
    Personal,
    #[serde(alias = "Estudio")]
    Study,
    #[serde(alias = "Salud")]
    Health,
    #[serde(alias = "Finanzas")]
    Finance,
    #[serde(alias = "Viajes")]
    Travel,
    #[serde(alias = "Ideas")]
    Ideas,
    #[serde(alias = "Compras")]
    Shopping,
    #[serde(alias = "Proyectos")]
    Projects,
}

/// Presentation metadata attached to a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMeta {
    pub name: &'static str,
    /// Symbol name of the icon shown next to the category
    pub icon: &'static str,
    /// Accent color name
    pub color: &'static str,
}

impl NoteCategory {
    pub const ALL: [NoteCategory; 10] = [
        NoteCategory::General,
        NoteCategory::Work,
        NoteCategory::Personal,
        NoteCategory::Study,
        NoteCategory::Health,
        NoteCategory::Finance,
        NoteCategory::Travel,
        NoteCategory::Ideas,
        NoteCategory::Shopping,
        NoteCategory::Projects,
    ];

    pub fn meta(self) -> CategoryMeta {
        let (name, icon, color) = match self {
            NoteCategory::General => ("General", "note.text", "gray"),
            NoteCategory::Work => ("Work", "briefcase.fill", "blue"),
            NoteCategory::Personal => ("Personal", "person.fill", "green"),
            NoteCategory::Study => ("Study", "book.fill", "purple"),
            NoteCategory::Health => ("Health", "heart.fill", "red"),
            NoteCategory::Finance => ("Finance", "dollarsign.circle.fill", "orange"),
            NoteCategory::Travel => ("Travel", "airplane", "cyan"),
            NoteCategory::Ideas => ("Ideas", "lightbulb.fill", "yellow"),
            NoteCategory::Shopping => ("Shopping", "cart.fill", "pink"),
            NoteCategory::Projects => ("Projects", "folder.fill", "indigo"),
        };
        CategoryMeta { name, icon, color }
    }

    pub fn display_name(self) -> &'static str {
        self.meta().name
    }
}

/// Timestamps are written as RFC 3339 strings. Records written by the
/// mobile app store plain seconds since 2001-01-01 UTC, which are accepted
/// on read.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    /// Seconds between the Unix epoch and 2001-01-01T00:00:00Z
    const REFERENCE_DATE_OFFSET: f64 = 978_307_200.0;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(DateTime<Utc>),
        ReferenceSeconds(f64),
    }

    fn resolve<E: Error>(raw: RawTimestamp) -> Result<DateTime<Utc>, E> {
        match raw {
            RawTimestamp::Text(date) => Ok(date),
            RawTimestamp::ReferenceSeconds(seconds) => {
                let millis = ((seconds + REFERENCE_DATE_OFFSET) * 1000.0).round() as i64;
                DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| E::custom(format!("timestamp {} is out of range", seconds)))
            }
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        resolve(RawTimestamp::deserialize(deserializer)?)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawTimestamp>::deserialize(deserializer)?
            .map(resolve)
            .transpose()
    }
}
