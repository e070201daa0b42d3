use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;

use crate::{FontStyle, NotasError, NoteCategory, ReminderPriority, Result};

pub const REMINDER_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DAY_INPUT_FORMAT: &str = "%Y-%m-%d";

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        dedup_tags(
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        )
    })
    .unwrap_or_default()
}

/// Drops repeated tags, keeping the first occurrence of each (case-sensitive)
pub fn dedup_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut unique: Vec<String> = Vec::new();
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

/// The local calendar day a timestamp falls on
pub fn local_day(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

/// Parses "YYYY-MM-DD HH:MM" in local time into a UTC timestamp
pub fn parse_local_datetime(input: &str) -> Result<DateTime<Utc>> {
    let invalid = || NotasError::InvalidDate {
        input: input.to_string(),
        expected: "YYYY-MM-DD HH:MM".to_string(),
    };

    let naive = NaiveDateTime::parse_from_str(input.trim(), REMINDER_INPUT_FORMAT)
        .map_err(|_| invalid())?;

    // Skipped wall-clock times (DST gaps) have no local instant; ambiguous
    // ones resolve to the earlier instant.
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(invalid)?;

    debug!("Parsed reminder time '{}' as {}", input, local);
    Ok(local.with_timezone(&Utc))
}

/// Parses a "YYYY-MM-DD" calendar day
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DAY_INPUT_FORMAT).map_err(|_| NotasError::InvalidDate {
        input: input.to_string(),
        expected: "YYYY-MM-DD".to_string(),
    })
}

pub fn parse_category(input: &str) -> Result<NoteCategory> {
    let wanted = input.trim().to_lowercase();
    NoteCategory::ALL
        .into_iter()
        .find(|category| category.display_name().to_lowercase() == wanted)
        .ok_or_else(|| NotasError::InvalidFormat {
            message: format!(
                "Unknown category '{}'. Expected one of: {}",
                input,
                NoteCategory::ALL
                    .iter()
                    .map(|c| c.display_name().to_lowercase())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
}

pub fn parse_priority(input: &str) -> Result<ReminderPriority> {
    let wanted = input.trim().to_lowercase();
    ReminderPriority::ALL
        .into_iter()
        .find(|priority| priority.display_name().to_lowercase() == wanted)
        .ok_or_else(|| NotasError::InvalidFormat {
            message: format!("Unknown priority '{}'. Expected high, medium or low", input),
        })
}

pub fn parse_font_style(input: &str) -> Result<FontStyle> {
    match input.trim().to_lowercase().as_str() {
        "system" => Ok(FontStyle::System),
        "serif" => Ok(FontStyle::Serif),
        "monospace" => Ok(FontStyle::Monospace),
        "rounded" => Ok(FontStyle::Rounded),
        "comic" => Ok(FontStyle::Comic),
        _ => Err(NotasError::InvalidFormat {
            message: format!(
                "Unknown font style '{}'. Expected system, serif, monospace, rounded or comic",
                input
            ),
        }),
    }
}

/// First non-empty line of `content`, cut to `max_chars` characters
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
