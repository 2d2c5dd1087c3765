// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! `Record` adapters for each browsable entity, plus the detail formatters
//! the browsers show on enter. Each adapter owns its full mapping from
//! model fields to generic field names.

use std::fmt::Write as _;

use crate::{Article, Book, FieldValue, Note, ProjectSummary, Record, TagSummary, Task};

pub const TASK_FIELDS: &[&str] = &[
    "id",
    "description",
    "status",
    "priority",
    "project",
    "tags",
    "due",
    "created",
    "completed",
];
pub const NOTE_FIELDS: &[&str] = &["id", "title", "tags", "archived", "created", "modified"];
pub const BOOK_FIELDS: &[&str] = &[
    "id", "title", "author", "status", "progress", "rating", "added", "started", "finished",
];
pub const ARTICLE_FIELDS: &[&str] = &["id", "title", "author", "url", "published", "created"];
pub const TAG_FIELDS: &[&str] = &["name", "tasks", "notes", "total"];
pub const PROJECT_FIELDS: &[&str] = &["name", "tasks", "completed", "open"];

impl Record for Task {
    fn id(&self) -> i64 {
        self.id.get()
    }

    fn title(&self) -> String {
        self.description.clone()
    }

    fn description(&self) -> String {
        let mut parts = vec![self.status.as_str().to_owned()];
        if !self.priority.as_str().is_empty() {
            parts.push(format!("priority {}", self.priority.as_str()));
        }
        if !self.project.is_empty() {
            parts.push(format!("project {}", self.project));
        }
        if let Some(due) = self.due {
            parts.push(format!("due {due}"));
        }
        if !self.tags.is_empty() {
            parts.push(format_tags(&self.tags));
        }
        parts.join(" · ")
    }

    fn filter_value(&self) -> String {
        let mut value = format!("{} {}", self.description, self.project);
        for tag in &self.tags {
            value.push(' ');
            value.push_str(tag);
        }
        value
    }

    fn field_value(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Integer(self.id.get()),
            "description" => FieldValue::from(self.description.as_str()),
            "status" => FieldValue::from(self.status.as_str()),
            "priority" => FieldValue::from(self.priority.as_str()),
            "project" => FieldValue::from(self.project.as_str()),
            "tags" => FieldValue::List(self.tags.clone()),
            "due" => FieldValue::Date(self.due),
            "created" => FieldValue::DateTime(Some(self.created_at)),
            "completed" => FieldValue::DateTime(self.completed_at),
            _ => FieldValue::Empty,
        }
    }
}

impl Record for Note {
    fn id(&self) -> i64 {
        self.id.get()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn description(&self) -> String {
        let preview = first_line(&self.content, 60);
        match (self.archived, self.tags.is_empty()) {
            (true, _) => format!("archived · {preview}"),
            (false, true) => preview,
            (false, false) => format!("{} · {preview}", format_tags(&self.tags)),
        }
    }

    fn filter_value(&self) -> String {
        format!("{} {} {}", self.title, self.content, self.tags.join(" "))
    }

    fn field_value(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Integer(self.id.get()),
            "title" => FieldValue::from(self.title.as_str()),
            "tags" => FieldValue::List(self.tags.clone()),
            "archived" => FieldValue::Bool(self.archived),
            "created" => FieldValue::DateTime(Some(self.created_at)),
            "modified" => FieldValue::DateTime(Some(self.updated_at)),
            _ => FieldValue::Empty,
        }
    }
}

impl Record for Book {
    fn id(&self) -> i64 {
        self.id.get()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn description(&self) -> String {
        let mut description = if self.author.is_empty() {
            self.status.as_str().to_owned()
        } else {
            format!("by {} · {}", self.author, self.status.as_str())
        };
        if self.progress > 0 {
            let _ = write!(description, " · {}%", self.progress);
        }
        if let Some(rating) = self.rating {
            let _ = write!(description, " · {}", stars(rating));
        }
        description
    }

    fn filter_value(&self) -> String {
        format!("{} {} {}", self.title, self.author, self.notes)
    }

    fn field_value(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Integer(self.id.get()),
            "title" => FieldValue::from(self.title.as_str()),
            "author" => FieldValue::from(self.author.as_str()),
            "status" => FieldValue::from(self.status.as_str()),
            "progress" => FieldValue::Text(format!("{}%", self.progress)),
            "rating" => self.rating.map_or(FieldValue::Empty, FieldValue::Integer),
            "added" => FieldValue::DateTime(Some(self.added_at)),
            "started" => FieldValue::DateTime(self.started_at),
            "finished" => FieldValue::DateTime(self.finished_at),
            _ => FieldValue::Empty,
        }
    }
}

impl Record for Article {
    fn id(&self) -> i64 {
        self.id.get()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn description(&self) -> String {
        match (self.author.is_empty(), self.published) {
            (false, Some(date)) => format!("by {} · {date}", self.author),
            (false, None) => format!("by {}", self.author),
            (true, Some(date)) => date.to_string(),
            (true, None) => self.url.clone(),
        }
    }

    fn filter_value(&self) -> String {
        format!("{} {} {}", self.title, self.author, self.url)
    }

    fn field_value(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Integer(self.id.get()),
            "title" => FieldValue::from(self.title.as_str()),
            "author" => FieldValue::from(self.author.as_str()),
            "url" => FieldValue::from(self.url.as_str()),
            "published" => FieldValue::Date(self.published),
            "created" => FieldValue::DateTime(Some(self.created_at)),
            _ => FieldValue::Empty,
        }
    }
}

impl Record for TagSummary {
    fn id(&self) -> i64 {
        0
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!(
            "{} task{} · {} note{}",
            self.task_count,
            plural(self.task_count),
            self.note_count,
            plural(self.note_count)
        )
    }

    fn filter_value(&self) -> String {
        self.name.clone()
    }

    fn field_value(&self, name: &str) -> FieldValue {
        match name {
            "name" => FieldValue::from(self.name.as_str()),
            "tasks" => FieldValue::Integer(self.task_count),
            "notes" => FieldValue::Integer(self.note_count),
            "total" => FieldValue::Integer(self.task_count + self.note_count),
            _ => FieldValue::Empty,
        }
    }
}

impl Record for ProjectSummary {
    fn id(&self) -> i64 {
        0
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!(
            "{} task{} · {} done",
            self.task_count,
            plural(self.task_count),
            self.completed_count
        )
    }

    fn filter_value(&self) -> String {
        self.name.clone()
    }

    fn field_value(&self, name: &str) -> FieldValue {
        match name {
            "name" => FieldValue::from(self.name.as_str()),
            "tasks" => FieldValue::Integer(self.task_count),
            "completed" => FieldValue::Integer(self.completed_count),
            "open" => FieldValue::Integer(self.task_count - self.completed_count),
            _ => FieldValue::Empty,
        }
    }
}

pub fn task_detail(task: &Task) -> String {
    let mut out = format!("# {}\n\n", task.description);
    push_field(&mut out, "ID", &task.id.get().to_string());
    push_field(&mut out, "UUID", &task.uuid);
    push_field(&mut out, "Status", task.status.as_str());
    push_field(&mut out, "Priority", task.priority.as_str());
    push_field(&mut out, "Project", &task.project);
    push_field(&mut out, "Tags", &format_tags(&task.tags));
    push_field(
        &mut out,
        "Due",
        &task.due.map(|due| due.to_string()).unwrap_or_default(),
    );
    push_field(&mut out, "Created", &task.created_at.date().to_string());
    push_field(&mut out, "Modified", &task.updated_at.date().to_string());
    if let Some(completed) = task.completed_at {
        push_field(&mut out, "Completed", &completed.date().to_string());
    }
    out
}

pub fn note_detail(note: &Note) -> String {
    let mut out = format!("# {}\n\n", note.title);
    if !note.tags.is_empty() {
        push_field(&mut out, "Tags", &format_tags(&note.tags));
    }
    if note.archived {
        push_field(&mut out, "Archived", "yes");
    }
    push_field(&mut out, "Modified", &note.updated_at.date().to_string());
    out.push('\n');
    out.push_str(note.content.trim_end());
    out.push('\n');
    out
}

pub fn book_detail(book: &Book) -> String {
    let mut out = format!("# {}\n\n", book.title);
    push_field(&mut out, "Author", &book.author);
    push_field(&mut out, "Status", book.status.as_str());
    push_field(&mut out, "Progress", &format!("{}%", book.progress));
    if let Some(rating) = book.rating {
        push_field(&mut out, "Rating", &stars(rating));
    }
    push_field(&mut out, "Added", &book.added_at.date().to_string());
    if let Some(started) = book.started_at {
        push_field(&mut out, "Started", &started.date().to_string());
    }
    if let Some(finished) = book.finished_at {
        push_field(&mut out, "Finished", &finished.date().to_string());
    }
    if !book.notes.trim().is_empty() {
        out.push_str("\n## Notes\n\n");
        out.push_str(book.notes.trim_end());
        out.push('\n');
    }
    out
}

pub fn article_detail(article: &Article) -> String {
    let mut out = format!("# {}\n\n", article.title);
    push_field(&mut out, "Author", &article.author);
    push_field(&mut out, "URL", &article.url);
    push_field(
        &mut out,
        "Published",
        &article
            .published
            .map(|date| date.to_string())
            .unwrap_or_default(),
    );
    push_field(&mut out, "Saved to", &article.source_path);
    out
}

fn push_field(out: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = writeln!(out, "**{label}:** {value}");
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_line(value: &str, max_chars: usize) -> String {
    let line = value
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    let mut chars = line.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

fn stars(rating: i64) -> String {
    let filled = rating.clamp(0, 5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

const fn plural(count: i64) -> &'static str {
    if count == 1 { "" } else { "s" }
}
