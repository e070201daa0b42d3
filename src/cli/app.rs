//! CLI module for the notas application
//!
//! This module handles the command-line interface for interacting with the
//! notebook.
use std::{
    fs::read_to_string,
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Local, Utc};
use console::Style;
use log::{debug, info};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::{
    content_preview, parse_category, parse_day, parse_font_style, parse_local_datetime,
    parse_priority, parse_tags, Commands, Config, FileBlobStore, LocalReminderScheduler, NewNote,
    NotasError, Note, NoteCategory, NoteFilter, NoteFormatting, NotePatch, Notebook,
    ReminderPriority, ReminderRequest, Result,
};

/// CLI Application handler - processes CLI commands and interfaces with the notebook
pub struct App {
    /// The notebook, behind a single-writer lock
    notebook: Arc<Mutex<Notebook>>,

    /// Scheduler delivering reminders while the process runs
    scheduler: Arc<LocalReminderScheduler>,

    /// Application configuration
    config: Config,

    /// Where `config --reset` writes to
    config_path: Option<PathBuf>,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given notebook and config
    pub fn new(
        notebook: Arc<Mutex<Notebook>>,
        scheduler: Arc<LocalReminderScheduler>,
        config: Config,
        config_path: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        Self {
            notebook,
            scheduler,
            config,
            config_path,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                content,
                file,
                category,
                tags,
                remind,
                priority,
                font,
                bold,
                italic,
            } => {
                let content = match (content, file) {
                    (Some(_), Some(_)) => {
                        return Err(NotasError::ApplicationError {
                            message: "Cannot specify both --content and --file options"
                                .to_string(),
                        })
                    }
                    (Some(c), None) => c,
                    (None, Some(path)) => self.read_content_from_file(&path)?,
                    (None, None) => String::new(),
                };

                let mut new_note = NewNote::new(title, content).tags(parse_tags(tags));
                if let Some(category) = category {
                    new_note = new_note.category(parse_category(&category)?);
                }
                if let Some(remind) = remind {
                    new_note = new_note.reminder_date(parse_local_datetime(&remind)?);
                }
                if let Some(priority) = priority {
                    new_note = new_note.reminder_priority(parse_priority(&priority)?);
                }
                if font.is_some() || bold || italic {
                    new_note = new_note.formatting(NoteFormatting {
                        is_bold: bold,
                        is_italic: italic,
                        font_style: font
                            .as_deref()
                            .map(parse_font_style)
                            .transpose()?
                            .unwrap_or_default(),
                    });
                }

                self.create_note(new_note).await?
            }

            Commands::View { id, json } => self.view_note(&id, json).await?,

            Commands::List {
                search,
                category,
                tags,
                limit,
                json,
                detailed,
            } => {
                let mut filter = NoteFilter::new().search(search.unwrap_or_default());
                if let Some(category) = category {
                    filter = filter.category(parse_category(&category)?);
                }
                for tag in parse_tags(tags) {
                    filter = filter.tag(tag);
                }
                self.list_notes(&filter, limit, json, detailed).await?
            }

            Commands::Edit {
                id,
                title,
                content,
                category,
                add_tags,
                remove_tags,
                font,
                bold,
                italic,
            } => {
                let note = self.resolve(&id).await?;

                let mut patch = NotePatch {
                    title,
                    content,
                    is_bold: bold,
                    is_italic: italic,
                    font_style: font.as_deref().map(parse_font_style).transpose()?,
                    category: category.as_deref().map(parse_category).transpose()?,
                    ..NotePatch::default()
                };

                if add_tags.is_some() || remove_tags.is_some() {
                    let remove = parse_tags(remove_tags);
                    let mut tags = note.tags.clone();
                    tags.extend(parse_tags(add_tags));
                    tags.retain(|tag| !remove.contains(tag));
                    patch.tags = Some(tags);
                }

                self.edit_note(note, patch).await?
            }

            Commands::Delete { ids, force } => self.handle_delete(&ids, force).await?,

            Commands::Remind {
                id,
                at,
                clear,
                toggle,
                priority,
            } => {
                let note = self.resolve(&id).await?;
                let mut patch = NotePatch {
                    reminder_priority: priority.as_deref().map(parse_priority).transpose()?,
                    ..NotePatch::default()
                };

                if let Some(at) = at {
                    let date = parse_local_datetime(&at)?;
                    if date <= Utc::now() {
                        println!(
                            "{}",
                            Style::new()
                                .yellow()
                                .apply_to("That time has already passed; no alert will fire.")
                        );
                    }
                    patch.reminder_date = Some(Some(date));
                } else if clear {
                    patch.reminder_date = Some(None);
                }

                self.handle_remind(note, patch, toggle).await?
            }

            Commands::Tags => self.list_tags().await,

            Commands::Categories => self.list_categories().await,

            Commands::Calendar { day } => match day {
                Some(day) => self.show_day(&day).await?,
                None => self.show_calendar().await,
            },

            Commands::Watch => self.watch().await?,

            Commands::Config { show, reset } => self.handle_config(show, reset)?,
        }

        Ok(())
    }

    async fn create_note(&self, new_note: NewNote) -> Result<()> {
        if new_note.title.trim().is_empty() || new_note.content.trim().is_empty() {
            return Err(NotasError::InvalidFormat {
                message: "A note needs both a title and some content".to_string(),
            });
        }

        let note = self.notebook.lock().await.create(new_note);
        println!("Note created with ID: {}", note.id);

        if let Some(date) = note.reminder_date {
            println!("Reminder set for {}", self.format_date(date));
            println!("Run `notas watch` to receive reminders as they come due.");
        }
        Ok(())
    }

    async fn resolve(&self, id: &str) -> Result<Note> {
        self.notebook.lock().await.store().find_by_prefix(id).cloned()
    }

    async fn view_note(&self, id: &str, json: bool) -> Result<()> {
        let note = self.resolve(id).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&note)?);
        } else {
            self.display_notes_text(&[&note], true);
        }
        Ok(())
    }

    /// List notes according to provided filters and options
    async fn list_notes(
        &self,
        filter: &NoteFilter,
        limit: usize,
        json: bool,
        detailed: bool,
    ) -> Result<()> {
        let notebook = self.notebook.lock().await;
        let mut notes = notebook.store().filtered_notes(filter);
        debug!("Filter matched {} notes", notes.len());

        if limit > 0 && notes.len() > limit {
            notes.truncate(limit);
        }

        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return Ok(());
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&notes)?);
        } else {
            self.display_notes_text(&notes, detailed);
            println!(
                "\nFound {} note{}",
                notes.len(),
                if notes.len() == 1 { "" } else { "s" }
            );
        }
        Ok(())
    }

    /// Display notes in text format
    fn display_notes_text(&self, notes: &[&Note], detailed: bool) {
        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let meta = note.category.meta();
            println!(
                "ID: {} | Created: {} | {}",
                note.id,
                self.format_date(note.created_at),
                category_style(note.category).apply_to(meta.name)
            );
            println!("Title: {}", title_style(note).apply_to(&note.title));

            if !note.tags.is_empty() {
                let tags = note
                    .tags
                    .iter()
                    .map(|tag| format!("#{}", tag))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("Tags: {}", Style::new().cyan().apply_to(tags));
            }

            if let (true, Some(date)) = (note.has_reminder, note.reminder_date) {
                let state = if note.reminder_enabled { "on" } else { "off" };
                println!(
                    "Reminder: {} ({}, {})",
                    self.format_date(date),
                    priority_style(note.reminder_priority)
                        .apply_to(note.reminder_priority.display_name()),
                    state
                );
            }

            if detailed {
                if self.verbose {
                    println!("Font: {}", note.font_style.display_name());
                }
                println!("\n{}", note.content);
            } else {
                let preview = content_preview(&note.content, 100);
                if !preview.is_empty() {
                    println!("\n{}", preview);
                }
            }
        }
    }

    async fn edit_note(&self, note: Note, patch: NotePatch) -> Result<()> {
        if patch.is_empty() {
            println!("Nothing to change for note {}", note.id);
            return Ok(());
        }

        let blank = |value: &Option<String>| value.as_ref().is_some_and(|v| v.trim().is_empty());
        if blank(&patch.title) || blank(&patch.content) {
            return Err(NotasError::InvalidFormat {
                message: "Title and content cannot be empty".to_string(),
            });
        }

        if !self.notebook.lock().await.update(note.id, patch) {
            return Err(NotasError::NoteNotFound {
                id: note.id.to_string(),
            });
        }

        println!("Note {} updated successfully", note.id);
        Ok(())
    }

    async fn handle_delete(&self, ids: &[String], force: bool) -> Result<()> {
        let mut notes = Vec::with_capacity(ids.len());
        for id in ids {
            notes.push(self.resolve(id).await?);
        }

        if !force {
            println!("You are about to delete the following note(s):");
            for note in &notes {
                println!("  {}  {}", note.id, note.title);
                if note.is_reminder_armed() {
                    println!("      its reminder will be cancelled");
                }
            }

            println!("\nThis action cannot be undone!");
            print!("Are you sure? [y/N]: ");
            stdout().flush().map_err(NotasError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(NotasError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let note_ids: Vec<Uuid> = notes.iter().map(|note| note.id).collect();
        let removed = self.notebook.lock().await.delete(&note_ids);
        println!(
            "{} note{} permanently deleted.",
            removed,
            if removed == 1 { "" } else { "s" }
        );
        Ok(())
    }

    async fn handle_remind(&self, note: Note, patch: NotePatch, toggle: bool) -> Result<()> {
        let mut notebook = self.notebook.lock().await;

        if !patch.is_empty() && !notebook.update(note.id, patch) {
            return Err(NotasError::NoteNotFound {
                id: note.id.to_string(),
            });
        }
        if toggle && !notebook.toggle_reminder_enabled(note.id) {
            return Err(NotasError::NoteNotFound {
                id: note.id.to_string(),
            });
        }

        match notebook.store().get(note.id) {
            Some(updated) if updated.has_reminder => {
                let date = updated
                    .reminder_date
                    .map(|date| self.format_date(date))
                    .unwrap_or_else(|| "no date".to_string());
                println!(
                    "Reminder for '{}' is {} ({})",
                    updated.title,
                    if updated.reminder_enabled { "enabled" } else { "disabled" },
                    date
                );
            }
            Some(updated) => println!("'{}' has no reminder", updated.title),
            None => {}
        }
        Ok(())
    }

    async fn list_tags(&self) {
        let tags = self.notebook.lock().await.store().available_tags();
        if tags.is_empty() {
            println!("No tags in use.");
            return;
        }
        for tag in tags {
            println!("{}", Style::new().cyan().apply_to(format!("#{}", tag)));
        }
    }

    async fn list_categories(&self) {
        let counts = self.notebook.lock().await.store().counts_by_category();
        for (category, count) in counts {
            let meta = category.meta();
            println!(
                "{:<12} {:>4}   {}",
                category_style(category).apply_to(meta.name),
                count,
                Style::new().dim().apply_to(meta.icon)
            );
        }
    }

    async fn show_calendar(&self) {
        let days = self.notebook.lock().await.store().dates_with_reminders();
        if days.is_empty() {
            println!("No reminders scheduled.");
            return;
        }

        let today = Local::now().date_naive();
        for day in days {
            let label = day.format("%a %Y-%m-%d").to_string();
            if day < today {
                println!("{}", Style::new().dim().apply_to(label));
            } else {
                println!("{}", Style::new().bold().apply_to(label));
            }
        }
    }

    async fn show_day(&self, day: &str) -> Result<()> {
        let day = parse_day(day)?;
        let notebook = self.notebook.lock().await;
        let notes = notebook.store().reminders_on(day);

        if notes.is_empty() {
            println!("No reminders on {}", day);
            return Ok(());
        }

        for note in notes {
            let time = note
                .reminder_date
                .map(|date| date.with_timezone(&Local).format("%H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{}  {}  {}",
                time,
                priority_style(note.reminder_priority).apply_to(note.reminder_priority.display_name()),
                note.title
            );
        }
        Ok(())
    }

    /// Arms all pending reminders and waits for ctrl-c
    async fn watch(&self) -> Result<()> {
        // Other notas processes write the same blob; reload whenever they do
        let (changes_tx, mut changes) = mpsc::channel(1);
        let blobs = FileBlobStore::new(self.config.data_dir.clone());
        let _watcher = blobs.watch(&self.config.storage_key, changes_tx)?;

        let armed = self.notebook.lock().await.resync_reminders();
        println!(
            "Watching {} reminder{}. Press Ctrl-C to stop.",
            armed,
            if armed == 1 { "" } else { "s" }
        );

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    break;
                }
                Some(()) = changes.recv() => {
                    let armed = self.notebook.lock().await.reload();
                    info!("Notes changed on disk, {} reminder(s) armed", armed);
                    if self.verbose {
                        println!("Notes changed, now watching {} reminder(s)", armed);
                    }
                }
            }
        }

        let status = self.scheduler.get_status();
        info!(
            "Stopping with {} pending reminder(s), last delivery: {:?}",
            status.pending, status.last_delivery_time
        );
        self.scheduler.stop();
        Ok(())
    }

    fn handle_config(&self, show: bool, reset: bool) -> Result<()> {
        if reset {
            let path = self
                .config_path
                .clone()
                .or_else(Config::default_path)
                .ok_or_else(|| NotasError::ConfigError {
                    message: "No configuration location available".to_string(),
                })?;
            Config::default().save(&path)?;
            println!("Configuration reset at {}", path.display());
        }

        if show || !reset {
            println!("{}", serde_json::to_string_pretty(&self.config)?);
        }
        Ok(())
    }

    // Helper function for reading content from a file
    fn read_content_from_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(NotasError::ApplicationError {
                message: format!("Not a readable file: {}", path.display()),
            });
        }
        read_to_string(path).map_err(NotasError::Io)
    }

    fn format_date(&self, date: DateTime<Utc>) -> String {
        date.with_timezone(&Local)
            .format(&self.config.date_format)
            .to_string()
    }
}

/// Prints a due reminder to the terminal
pub fn print_reminder(request: &ReminderRequest) {
    println!(
        "\n{} {}",
        Style::new().magenta().bold().apply_to("Reminder:"),
        Style::new().bold().apply_to(&request.title)
    );
    let preview = content_preview(&request.body, 200);
    if !preview.is_empty() {
        println!("{}", preview);
    }
}

fn category_style(category: NoteCategory) -> Style {
    match category.meta().color {
        "blue" => Style::new().blue(),
        "green" => Style::new().green(),
        "purple" => Style::new().magenta(),
        "red" => Style::new().red(),
        "orange" => Style::new().color256(208),
        "cyan" => Style::new().cyan(),
        "yellow" => Style::new().yellow(),
        "pink" => Style::new().color256(205),
        "indigo" => Style::new().color256(54),
        _ => Style::new().color256(245),
    }
}

fn priority_style(priority: ReminderPriority) -> Style {
    match priority {
        ReminderPriority::High => Style::new().red().bold(),
        ReminderPriority::Medium => Style::new().yellow(),
        ReminderPriority::Low => Style::new().dim(),
    }
}

fn title_style(note: &Note) -> Style {
    let mut style = Style::new();
    if note.is_bold {
        style = style.bold();
    }
    if note.is_italic {
        style = style.italic();
    }
    style
}
