// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod query;
pub mod validation;

use anyhow::{Context, Result, anyhow, bail};
use noteleaf_app::{
    Article, ArticleId, Book, BookId, BookStatus, FilterState, Note, NoteId, ProjectSummary,
    TagSummary, Task, TaskId, TaskPriority, TaskStatus,
};
use query::{EntityQuery, FilterColumn, bool_value, text_value};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info};
use validation::{
    check_progress, check_rating, normalize_tags, parse_optional_date, require_title,
};

pub const APP_NAME: &str = "noteleaf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial",
        sql: include_str!("sql/0001_initial.sql"),
    },
    Migration {
        version: 2,
        name: "indexes",
        sql: include_str!("sql/0002_indexes.sql"),
    },
];

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "tasks",
        &[
            "id",
            "uuid",
            "description",
            "status",
            "priority",
            "project",
            "tags",
            "due",
            "created_at",
            "updated_at",
            "completed_at",
        ],
    ),
    (
        "notes",
        &[
            "id",
            "title",
            "content",
            "tags",
            "archived",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "books",
        &[
            "id",
            "title",
            "author",
            "status",
            "progress",
            "rating",
            "notes",
            "added_at",
            "started_at",
            "finished_at",
        ],
    ),
    (
        "articles",
        &[
            "id",
            "title",
            "url",
            "author",
            "published",
            "source_path",
            "created_at",
        ],
    ),
];

const TASK_FILTERS: &[FilterColumn] = &[
    FilterColumn {
        key: "status",
        clause: "status = ?",
        normalize: task_status_value,
        hint: "use pending, active, waiting, done or deleted",
    },
    FilterColumn {
        key: "priority",
        clause: "priority = ?",
        normalize: task_priority_value,
        hint: "use none, low, medium or high",
    },
    FilterColumn {
        key: "project",
        clause: "project = ? COLLATE NOCASE",
        normalize: text_value,
        hint: "use a project name",
    },
    FilterColumn {
        key: "tag",
        clause: "EXISTS (SELECT 1 FROM json_each(tasks.tags) AS tag WHERE tag.value = ?)",
        normalize: tag_value,
        hint: "use a single tag word",
    },
    FilterColumn {
        key: "due",
        clause: "due IS NOT NULL AND due <= ?",
        normalize: date_value,
        hint: "use YYYY-MM-DD to list tasks due on or before that day",
    },
];

const TASKS: EntityQuery = EntityQuery {
    entity: "task",
    columns: "id, uuid, description, status, priority, project, tags, due, \
              created_at, updated_at, completed_at",
    from: "tasks",
    default_scope: Some(("status", "status != 'deleted'")),
    search_columns: &["description", "project", "tags"],
    filters: TASK_FILTERS,
    sorts: &[
        ("id", "id"),
        ("description", "description COLLATE NOCASE"),
        ("status", "status"),
        ("priority", "priority"),
        ("project", "project COLLATE NOCASE"),
        ("due", "due"),
        ("created", "created_at"),
        ("modified", "updated_at"),
    ],
    default_order: "due IS NULL, due ASC, priority DESC, id ASC",
};

const NOTE_FILTERS: &[FilterColumn] = &[
    FilterColumn {
        key: "tag",
        clause: "EXISTS (SELECT 1 FROM json_each(notes.tags) AS tag WHERE tag.value = ?)",
        normalize: tag_value,
        hint: "use a single tag word",
    },
    FilterColumn {
        key: "archived",
        clause: "archived = ?",
        normalize: bool_value,
        hint: "use true or false",
    },
];

const NOTES: EntityQuery = EntityQuery {
    entity: "note",
    columns: "id, title, content, tags, archived, created_at, updated_at",
    from: "notes",
    default_scope: Some(("archived", "archived = 0")),
    search_columns: &["title", "content", "tags"],
    filters: NOTE_FILTERS,
    sorts: &[
        ("id", "id"),
        ("title", "title COLLATE NOCASE"),
        ("created", "created_at"),
        ("modified", "updated_at"),
    ],
    default_order: "updated_at DESC, id DESC",
};

const BOOK_FILTERS: &[FilterColumn] = &[
    FilterColumn {
        key: "status",
        clause: "status = ?",
        normalize: book_status_value,
        hint: "use queued, reading, finished or removed",
    },
    FilterColumn {
        key: "author",
        clause: "author = ? COLLATE NOCASE",
        normalize: text_value,
        hint: "use an author name",
    },
];

const BOOKS: EntityQuery = EntityQuery {
    entity: "book",
    columns: "id, title, author, status, progress, rating, notes, added_at, started_at, \
              finished_at",
    from: "books",
    default_scope: Some(("status", "status != 'removed'")),
    search_columns: &["title", "author", "notes"],
    filters: BOOK_FILTERS,
    sorts: &[
        ("id", "id"),
        ("title", "title COLLATE NOCASE"),
        ("author", "author COLLATE NOCASE"),
        ("status", "status"),
        ("progress", "progress"),
        ("rating", "rating"),
        ("added", "added_at"),
    ],
    default_order: "added_at DESC, id DESC",
};

const ARTICLES: EntityQuery = EntityQuery {
    entity: "article",
    columns: "id, title, url, author, published, source_path, created_at",
    from: "articles",
    default_scope: None,
    search_columns: &["title", "author", "url"],
    filters: &[FilterColumn {
        key: "author",
        clause: "author = ? COLLATE NOCASE",
        normalize: text_value,
        hint: "use an author name",
    }],
    sorts: &[
        ("id", "id"),
        ("title", "title COLLATE NOCASE"),
        ("author", "author COLLATE NOCASE"),
        ("published", "published"),
        ("created", "created_at"),
    ],
    default_order: "published IS NULL, published DESC, id DESC",
};

const TAGS: EntityQuery = EntityQuery {
    entity: "tag",
    columns: "name, task_count, note_count",
    from: "(
        SELECT name, SUM(task_count) AS task_count, SUM(note_count) AS note_count
        FROM (
          SELECT tag.value AS name, 1 AS task_count, 0 AS note_count
          FROM tasks, json_each(tasks.tags) AS tag
          WHERE tasks.status != 'deleted'
          UNION ALL
          SELECT tag.value, 0, 1
          FROM notes, json_each(notes.tags) AS tag
        )
        GROUP BY name
      ) AS tag_summary",
    default_scope: None,
    search_columns: &["name"],
    filters: &[],
    sorts: &[
        ("name", "name"),
        ("tasks", "task_count"),
        ("notes", "note_count"),
        ("total", "task_count + note_count"),
    ],
    default_order: "name ASC",
};

const PROJECTS: EntityQuery = EntityQuery {
    entity: "project",
    columns: "name, task_count, completed_count",
    from: "(
        SELECT
          project AS name,
          COUNT(*) AS task_count,
          SUM(CASE WHEN status = 'done' THEN 1 ELSE 0 END) AS completed_count
        FROM tasks
        WHERE project != '' AND status != 'deleted'
        GROUP BY project
      ) AS project_summary",
    default_scope: None,
    search_columns: &["name"],
    filters: &[],
    sorts: &[
        ("name", "name COLLATE NOCASE"),
        ("tasks", "task_count"),
        ("completed", "completed_count"),
        ("open", "task_count - completed_count"),
    ],
    default_order: "name COLLATE NOCASE ASC",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project: String,
    pub tags: Vec<String>,
    pub due: Option<Date>,
}

impl NewTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: TaskStatus::Pending,
            priority: TaskPriority::None,
            project: String::new(),
            tags: Vec::new(),
            due: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub rating: Option<i64>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub author: String,
    pub published: Option<Date>,
    pub source_path: String,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Applies pending migrations, then checks the tables the queries rely
    /// on are all present.
    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? && !table_exists(&self.conn, "migrations")? {
            bail!(
                "database has tables but no migrations table; it was not created by {APP_NAME} -- \
                 point [storage].db_path or NOTELEAF_DB_PATH at a different file"
            );
        }

        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS migrations (
                  version INTEGER PRIMARY KEY,
                  name TEXT NOT NULL,
                  applied_at TEXT NOT NULL
                );
                ",
            )
            .context("create migrations table")?;

        let applied = self.applied_migrations()?;
        if let Some(latest) = applied.last()
            && let Some(known) = MIGRATIONS.last()
            && *latest > known.version
        {
            bail!(
                "database schema version {latest} is newer than this build supports ({}); \
                 upgrade {APP_NAME}",
                known.version
            );
        }

        for migration in MIGRATIONS {
            if applied.contains(&migration.version) {
                continue;
            }
            let tx = self
                .conn
                .unchecked_transaction()
                .context("begin migration transaction")?;
            tx.execute_batch(migration.sql).with_context(|| {
                format!(
                    "apply migration {} ({})",
                    migration.version, migration.name
                )
            })?;
            tx.execute(
                "INSERT INTO migrations (version, name, applied_at) VALUES (?, ?, ?)",
                params![migration.version, migration.name, now_rfc3339()?],
            )
            .with_context(|| format!("record migration {}", migration.version))?;
            tx.commit()
                .with_context(|| format!("commit migration {}", migration.version))?;
            info!(version = migration.version, name = migration.name, "applied migration");
        }

        validate_schema(&self.conn)
    }

    pub fn applied_migrations(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT version FROM migrations ORDER BY version ASC")
            .context("prepare migrations query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .context("query migrations")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect migrations")
    }

    pub fn create_task(&self, task: &NewTask) -> Result<TaskId> {
        let description = require_title(&task.description).context("create task")?;
        let tags = normalize_tags(&task.tags).context("create task")?;
        let now = now_rfc3339()?;
        let completed_at = (task.status == TaskStatus::Done).then(|| now.clone());
        self.conn
            .execute(
                "
                INSERT INTO tasks (
                  description, status, priority, project, tags, due,
                  created_at, updated_at, completed_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    description,
                    task.status.as_str(),
                    task.priority.rank(),
                    task.project.trim(),
                    encode_tags(&tags)?,
                    task.due.map(format_date),
                    now,
                    now,
                    completed_at,
                ],
            )
            .context("insert task")?;
        Ok(TaskId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<Task> {
        self.get_row(&TASKS, task_id.get(), task_from_row)
    }

    pub fn list_tasks(&self, filter: &FilterState) -> Result<Vec<Task>> {
        self.list_rows(&TASKS, filter, task_from_row)
    }

    pub fn count_tasks(&self, filter: &FilterState) -> Result<usize> {
        self.count_rows(&TASKS, filter)
    }

    pub fn search_tasks(&self, query: &str, filter: &FilterState) -> Result<Vec<Task>> {
        self.list_tasks(&filter.clone().with_query(query))
    }

    /// Moves a task to `status`, stamping or clearing its completion time.
    pub fn set_task_status(&self, task_id: TaskId, status: TaskStatus) -> Result<()> {
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE tasks
                SET
                  status = ?,
                  completed_at = CASE WHEN ? THEN COALESCE(completed_at, ?) ELSE NULL END,
                  updated_at = ?
                WHERE id = ?
                ",
                params![
                    status.as_str(),
                    status == TaskStatus::Done,
                    now,
                    now,
                    task_id.get()
                ],
            )
            .context("update task status")?;
        if rows_affected == 0 {
            bail!(
                "task {} not found -- refresh the list and retry",
                task_id.get()
            );
        }
        debug!(task = task_id.get(), status = status.as_str(), "task status changed");
        Ok(())
    }

    pub fn create_note(&self, note: &NewNote) -> Result<NoteId> {
        let title = require_title(&note.title).context("create note")?;
        let tags = normalize_tags(&note.tags).context("create note")?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO notes (title, content, tags, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ",
                params![title, note.content, encode_tags(&tags)?, now, now],
            )
            .context("insert note")?;
        Ok(NoteId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_note(&self, note_id: NoteId) -> Result<Note> {
        self.get_row(&NOTES, note_id.get(), note_from_row)
    }

    pub fn list_notes(&self, filter: &FilterState) -> Result<Vec<Note>> {
        self.list_rows(&NOTES, filter, note_from_row)
    }

    pub fn count_notes(&self, filter: &FilterState) -> Result<usize> {
        self.count_rows(&NOTES, filter)
    }

    pub fn search_notes(&self, query: &str, filter: &FilterState) -> Result<Vec<Note>> {
        self.list_notes(&filter.clone().with_query(query))
    }

    /// Flips the archived flag and returns the new value.
    pub fn toggle_note_archived(&self, note_id: NoteId) -> Result<bool> {
        let now = now_rfc3339()?;
        let archived = self
            .conn
            .query_row(
                "
                UPDATE notes
                SET archived = NOT archived, updated_at = ?
                WHERE id = ?
                RETURNING archived
                ",
                params![now, note_id.get()],
                |row| row.get::<_, bool>(0),
            )
            .optional()
            .context("toggle note archive")?
            .ok_or_else(|| {
                anyhow!(
                    "note {} not found -- refresh the list and retry",
                    note_id.get()
                )
            })?;
        debug!(note = note_id.get(), archived, "note archive toggled");
        Ok(archived)
    }

    pub fn create_book(&self, book: &NewBook) -> Result<BookId> {
        let title = require_title(&book.title).context("create book")?;
        let rating = check_rating(book.rating).context("create book")?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO books (title, author, status, rating, notes, added_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![
                    title,
                    book.author.trim(),
                    BookStatus::Queued.as_str(),
                    rating,
                    book.notes,
                    now
                ],
            )
            .context("insert book")?;
        Ok(BookId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_book(&self, book_id: BookId) -> Result<Book> {
        self.get_row(&BOOKS, book_id.get(), book_from_row)
    }

    pub fn list_books(&self, filter: &FilterState) -> Result<Vec<Book>> {
        self.list_rows(&BOOKS, filter, book_from_row)
    }

    pub fn count_books(&self, filter: &FilterState) -> Result<usize> {
        self.count_rows(&BOOKS, filter)
    }

    pub fn search_books(&self, query: &str, filter: &FilterState) -> Result<Vec<Book>> {
        self.list_books(&filter.clone().with_query(query))
    }

    /// Moves a book through its reading lifecycle. Starting keeps an
    /// earlier start date; finishing sets progress to 100; queueing resets
    /// both dates and progress.
    pub fn set_book_status(&self, book_id: BookId, status: BookStatus) -> Result<()> {
        let now = now_rfc3339()?;
        let sql = match status {
            BookStatus::Queued => {
                "UPDATE books SET status = ?1, progress = 0, started_at = NULL, \
                 finished_at = NULL WHERE id = ?3"
            }
            BookStatus::Reading => {
                "UPDATE books SET status = ?1, started_at = COALESCE(started_at, ?2), \
                 finished_at = NULL WHERE id = ?3"
            }
            BookStatus::Finished => {
                "UPDATE books SET status = ?1, progress = 100, \
                 started_at = COALESCE(started_at, ?2), finished_at = ?2 WHERE id = ?3"
            }
            BookStatus::Removed => "UPDATE books SET status = ?1 WHERE id = ?3",
        };
        let rows_affected = self
            .conn
            .execute(sql, params![status.as_str(), now, book_id.get()])
            .context("update book status")?;
        if rows_affected == 0 {
            bail!(
                "book {} not found -- refresh the list and retry",
                book_id.get()
            );
        }
        debug!(book = book_id.get(), status = status.as_str(), "book status changed");
        Ok(())
    }

    pub fn set_book_progress(&self, book_id: BookId, progress: i64) -> Result<()> {
        let progress = check_progress(progress).context("update book progress")?;
        let rows_affected = self
            .conn
            .execute(
                "UPDATE books SET progress = ? WHERE id = ?",
                params![progress, book_id.get()],
            )
            .context("update book progress")?;
        if rows_affected == 0 {
            bail!(
                "book {} not found -- refresh the list and retry",
                book_id.get()
            );
        }
        Ok(())
    }

    pub fn create_article(&self, article: &NewArticle) -> Result<ArticleId> {
        let title = require_title(&article.title).context("create article")?;
        let url = article.url.trim();
        if url.is_empty() {
            bail!("article {title:?} needs a URL");
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO articles (title, url, author, published, source_path, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                params![
                    title,
                    url,
                    article.author.trim(),
                    article.published.map(format_date),
                    article.source_path,
                    now
                ],
            )
            .with_context(|| format!("insert article {url}; each URL can only be saved once"))?;
        Ok(ArticleId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_article(&self, article_id: ArticleId) -> Result<Article> {
        self.get_row(&ARTICLES, article_id.get(), article_from_row)
    }

    pub fn list_articles(&self, filter: &FilterState) -> Result<Vec<Article>> {
        self.list_rows(&ARTICLES, filter, article_from_row)
    }

    pub fn count_articles(&self, filter: &FilterState) -> Result<usize> {
        self.count_rows(&ARTICLES, filter)
    }

    pub fn search_articles(&self, query: &str, filter: &FilterState) -> Result<Vec<Article>> {
        self.list_articles(&filter.clone().with_query(query))
    }

    pub fn list_tags(&self, filter: &FilterState) -> Result<Vec<TagSummary>> {
        self.list_rows(&TAGS, filter, |row| {
            Ok(TagSummary {
                name: row.get(0)?,
                task_count: row.get(1)?,
                note_count: row.get(2)?,
            })
        })
    }

    pub fn count_tags(&self, filter: &FilterState) -> Result<usize> {
        self.count_rows(&TAGS, filter)
    }

    pub fn list_projects(&self, filter: &FilterState) -> Result<Vec<ProjectSummary>> {
        self.list_rows(&PROJECTS, filter, |row| {
            Ok(ProjectSummary {
                name: row.get(0)?,
                task_count: row.get(1)?,
                completed_count: row.get(2)?,
            })
        })
    }

    pub fn count_projects(&self, filter: &FilterState) -> Result<usize> {
        self.count_rows(&PROJECTS, filter)
    }

    /// Fills an empty database with a small sample library. Does nothing
    /// when any task already exists.
    pub fn seed_demo_data(&self) -> Result<()> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .context("count existing tasks")?;
        if existing > 0 {
            debug!(existing, "skipping demo seed");
            return Ok(());
        }

        let today = OffsetDateTime::now_utc().date();
        for (offset, (description, priority, project, tags)) in DEMO_TASKS.iter().enumerate() {
            let due = i64::try_from(offset)
                .ok()
                .filter(|offset| offset % 2 == 0)
                .and_then(|offset| today.checked_add(time::Duration::days(offset)));
            self.create_task(&NewTask {
                priority: TaskPriority::parse(priority).unwrap_or(TaskPriority::None),
                project: (*project).to_owned(),
                tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
                due,
                ..NewTask::new(*description)
            })?;
        }
        if let Some(first) = self.list_tasks(&FilterState::new().with_limit(1))?.first() {
            self.set_task_status(first.id, TaskStatus::Active)?;
        }
        let done = self.create_task(&NewTask {
            project: "home".to_owned(),
            ..NewTask::new("Replace smoke detector batteries")
        })?;
        self.set_task_status(done, TaskStatus::Done)?;

        for (title, content, tags) in DEMO_NOTES {
            self.create_note(&NewNote {
                title: (*title).to_owned(),
                content: (*content).to_owned(),
                tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
            })?;
        }

        for (title, author, status, rating) in DEMO_BOOKS {
            let book = self.create_book(&NewBook {
                title: (*title).to_owned(),
                author: (*author).to_owned(),
                rating: *rating,
                notes: String::new(),
            })?;
            if let Some(status) = BookStatus::parse(status)
                && status != BookStatus::Queued
            {
                self.set_book_status(book, status)?;
            }
        }
        if let Some(reading) = self
            .list_books(&FilterState::new().with_filter("status", "reading"))?
            .first()
        {
            self.set_book_progress(reading.id, 35)?;
        }

        for (title, url, author, published) in DEMO_ARTICLES {
            self.create_article(&NewArticle {
                title: (*title).to_owned(),
                url: (*url).to_owned(),
                author: (*author).to_owned(),
                published: parse_optional_date(published).context("parse demo article date")?,
                source_path: String::new(),
            })?;
        }

        info!("seeded demo data");
        Ok(())
    }

    fn get_row<T>(
        &self,
        query: &EntityQuery,
        id: i64,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?", query.columns, query.from);
        self.conn
            .query_row(&sql, params![id], map)
            .optional()
            .with_context(|| format!("load {} {id}", query.entity))?
            .ok_or_else(|| {
                anyhow!(
                    "{} {id} not found -- refresh the list and retry",
                    query.entity
                )
            })
    }

    fn list_rows<T>(
        &self,
        query: &EntityQuery,
        filter: &FilterState,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let tail = query.tail(filter)?;
        let sql = query.select_sql(&tail);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("prepare {} query", query.entity))?;
        let rows = stmt
            .query_map(params_from_iter(tail.params.iter()), map)
            .with_context(|| format!("query {}s", query.entity))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect {}s", query.entity))
    }

    fn count_rows(&self, query: &EntityQuery, filter: &FilterState) -> Result<usize> {
        let tail = query.tail(&FilterState {
            sort: None,
            limit: None,
            ..filter.clone()
        })?;
        let count: i64 = self
            .conn
            .query_row(
                &query.count_sql(&tail),
                params_from_iter(tail.params.iter()),
                |row| row.get(0),
            )
            .with_context(|| format!("count {}s", query.entity))?;
        usize::try_from(count).with_context(|| format!("{} count {count} is negative", query.entity))
    }
}

const DEMO_TASKS: &[(&str, &str, &str, &[&str])] = &[
    ("Draft quarterly review", "high", "work", &["writing"]),
    ("Renew library card", "", "errands", &["admin"]),
    ("Prune the tomatoes", "medium", "garden", &["outdoors"]),
    ("Call the plumber about the drip", "high", "home", &["admin", "urgent"]),
    ("Sketch blog post outline", "low", "writing", &["writing"]),
    ("Order seed catalog", "", "garden", &[]),
    ("Back up photo library", "medium", "", &["computer"]),
];

const DEMO_NOTES: &[(&str, &str, &[&str])] = &[
    (
        "Garden plan",
        "Tomatoes along the south fence.\nBasil between them.",
        &["outdoors"],
    ),
    (
        "Meeting notes",
        "Agreed to ship the importer first.\nRevisit search ranking next sprint.",
        &["work"],
    ),
    ("Gift ideas", "Field guide to mushrooms\nA good pocket knife", &[]),
    (
        "Writing prompts",
        "A lighthouse keeper who collects lost letters.",
        &["writing"],
    ),
];

const DEMO_BOOKS: &[(&str, &str, &str, Option<i64>)] = &[
    ("The Left Hand of Darkness", "Ursula K. Le Guin", "finished", Some(5)),
    ("Piranesi", "Susanna Clarke", "reading", None),
    ("The Name of the Rose", "Umberto Eco", "queued", None),
    ("Braiding Sweetgrass", "Robin Wall Kimmerer", "queued", None),
];

const DEMO_ARTICLES: &[(&str, &str, &str, &str)] = &[
    (
        "Notes on structured concurrency",
        "https://example.com/structured-concurrency",
        "N. Smith",
        "2018-04-25",
    ),
    (
        "The cost of small files",
        "https://example.com/small-files",
        "",
        "2023-11-02",
    ),
    (
        "Why plain text lasts",
        "https://example.com/plain-text",
        "A. Writer",
        "",
    ),
];

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("NOTELEAF_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set NOTELEAF_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("noteleaf.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status_raw: String = row.get(3)?;
    let status = TaskStatus::parse(&status_raw)
        .ok_or_else(|| invalid_column(3, format!("unknown task status {status_raw}")))?;
    let tags_raw: String = row.get(6)?;
    let due_raw: Option<String> = row.get(7)?;
    let created_at_raw: String = row.get(8)?;
    let updated_at_raw: String = row.get(9)?;
    let completed_at_raw: Option<String> = row.get(10)?;

    Ok(Task {
        id: TaskId::new(row.get(0)?),
        uuid: row.get(1)?,
        description: row.get(2)?,
        status,
        priority: TaskPriority::from_rank(row.get(4)?),
        project: row.get(5)?,
        tags: decode_tags(&tags_raw).map_err(to_sql_error)?,
        due: parse_opt_date(due_raw).map_err(to_sql_error)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
        completed_at: parse_opt_datetime(completed_at_raw).map_err(to_sql_error)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let tags_raw: String = row.get(3)?;
    let created_at_raw: String = row.get(5)?;
    let updated_at_raw: String = row.get(6)?;

    Ok(Note {
        id: NoteId::new(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        tags: decode_tags(&tags_raw).map_err(to_sql_error)?,
        archived: row.get(4)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
        updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
    })
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    let status_raw: String = row.get(3)?;
    let status = BookStatus::parse(&status_raw)
        .ok_or_else(|| invalid_column(3, format!("unknown book status {status_raw}")))?;
    let added_at_raw: String = row.get(7)?;
    let started_at_raw: Option<String> = row.get(8)?;
    let finished_at_raw: Option<String> = row.get(9)?;

    Ok(Book {
        id: BookId::new(row.get(0)?),
        title: row.get(1)?,
        author: row.get(2)?,
        status,
        progress: row.get(4)?,
        rating: row.get(5)?,
        notes: row.get(6)?,
        added_at: parse_datetime(&added_at_raw).map_err(to_sql_error)?,
        started_at: parse_opt_datetime(started_at_raw).map_err(to_sql_error)?,
        finished_at: parse_opt_datetime(finished_at_raw).map_err(to_sql_error)?,
    })
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    let published_raw: Option<String> = row.get(4)?;
    let created_at_raw: String = row.get(6)?;

    Ok(Article {
        id: ArticleId::new(row.get(0)?),
        title: row.get(1)?,
        url: row.get(2)?,
        author: row.get(3)?,
        published: parse_opt_date(published_raw).map_err(to_sql_error)?,
        source_path: row.get(5)?,
        created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
    })
}

fn task_status_value(raw: &str) -> Option<Value> {
    TaskStatus::parse(raw.trim()).map(|status| Value::Text(status.as_str().to_owned()))
}

fn task_priority_value(raw: &str) -> Option<Value> {
    TaskPriority::parse(raw).map(|priority| Value::Integer(priority.rank()))
}

fn book_status_value(raw: &str) -> Option<Value> {
    BookStatus::parse(raw.trim()).map(|status| Value::Text(status.as_str().to_owned()))
}

fn tag_value(raw: &str) -> Option<Value> {
    normalize_tags(&[raw.to_owned()])
        .ok()?
        .into_iter()
        .next()
        .map(Value::Text)
}

fn date_value(raw: &str) -> Option<Value> {
    parse_optional_date(raw)
        .ok()
        .flatten()
        .map(|date| Value::Text(format_date(date)))
}

fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags).context("encode tags")
}

fn decode_tags(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("decode tags {raw:?}"))
}

fn invalid_column(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a {APP_NAME} database or delete the file to start fresh"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; the database was modified outside {APP_NAME}",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Ok(value.assume_utc());
    }

    bail!("unsupported datetime format {raw:?}")
}

fn parse_date(raw: &str) -> Result<Date> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(value);
    }

    let date_time = parse_datetime(raw)?;
    Ok(date_time.date())
}

fn parse_opt_datetime(raw: Option<String>) -> Result<Option<OffsetDateTime>> {
    raw.as_deref().map(parse_datetime).transpose()
}

fn parse_opt_date(raw: Option<String>) -> Result<Option<Date>> {
    raw.as_deref().map(parse_date).transpose()
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    invalid_column(0, format!("{error:#}"))
}

fn format_date(value: Date) -> String {
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "1970-01-01".to_owned())
}
