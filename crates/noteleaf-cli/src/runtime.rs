// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use noteleaf_app::{
    Article, Book, BookStatus, DataSource, FilterState, Note, ProjectSummary, Record, TagSummary,
    Task, TaskStatus, article_detail, book_detail, note_detail, task_detail,
};
use noteleaf_db::Store;
use noteleaf_tui::{Browser, Column};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One SQLite connection shared by every worker thread.
pub type SharedStore = Arc<Mutex<Store>>;

type LoadFn<R> = fn(&Store, &FilterState) -> Result<Vec<R>>;
type CountFn = fn(&Store, &FilterState) -> Result<usize>;
type SearchFn<R> = fn(&Store, &str, &FilterState) -> Result<Vec<R>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Tasks,
    Notes,
    Books,
    Articles,
    Tags,
    Projects,
}

impl Entity {
    pub const ALL: [Self; 6] = [
        Self::Tasks,
        Self::Notes,
        Self::Books,
        Self::Articles,
        Self::Tags,
        Self::Projects,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Notes => "notes",
            Self::Books => "books",
            Self::Articles => "articles",
            Self::Tags => "tags",
            Self::Projects => "projects",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Tasks => "Tasks",
            Self::Notes => "Notes",
            Self::Books => "Books",
            Self::Articles => "Articles",
            Self::Tags => "Tags",
            Self::Projects => "Projects",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|entity| {
                entity.as_str() == wanted || entity.as_str().trim_end_matches('s') == wanted
            })
            .ok_or_else(|| {
                let names = Self::ALL.map(Self::as_str).join(", ");
                anyhow!("unknown list {raw:?}; choose one of: {names}")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub filter: FilterState,
    pub static_mode: bool,
    pub searchable: bool,
}

pub fn shared(store: Store) -> SharedStore {
    Arc::new(Mutex::new(store))
}

pub fn with_store<T>(store: &SharedStore, f: impl FnOnce(&Store) -> Result<T>) -> Result<T> {
    let guard = store.lock().map_err(|_| {
        anyhow!("database handle is unusable after a worker crashed; restart noteleaf")
    })?;
    f(&guard)
}

/// [`DataSource`] over one entity's store queries.
pub struct StoreSource<R> {
    entity: &'static str,
    store: SharedStore,
    load: LoadFn<R>,
    count: CountFn,
    search: Option<SearchFn<R>>,
}

impl StoreSource<Task> {
    pub fn tasks(store: SharedStore) -> Self {
        Self {
            entity: "tasks",
            store,
            load: Store::list_tasks,
            count: Store::count_tasks,
            search: Some(Store::search_tasks),
        }
    }
}

impl StoreSource<Note> {
    pub fn notes(store: SharedStore) -> Self {
        Self {
            entity: "notes",
            store,
            load: Store::list_notes,
            count: Store::count_notes,
            search: Some(Store::search_notes),
        }
    }
}

impl StoreSource<Book> {
    pub fn books(store: SharedStore) -> Self {
        Self {
            entity: "books",
            store,
            load: Store::list_books,
            count: Store::count_books,
            search: Some(Store::search_books),
        }
    }
}

impl StoreSource<Article> {
    pub fn articles(store: SharedStore) -> Self {
        Self {
            entity: "articles",
            store,
            load: Store::list_articles,
            count: Store::count_articles,
            search: Some(Store::search_articles),
        }
    }
}

impl StoreSource<TagSummary> {
    pub fn tags(store: SharedStore) -> Self {
        Self {
            entity: "tags",
            store,
            load: Store::list_tags,
            count: Store::count_tags,
            search: None,
        }
    }
}

impl StoreSource<ProjectSummary> {
    pub fn projects(store: SharedStore) -> Self {
        Self {
            entity: "projects",
            store,
            load: Store::list_projects,
            count: Store::count_projects,
            search: None,
        }
    }
}

impl<R: Record> DataSource<R> for StoreSource<R> {
    fn load(&self, filter: &FilterState) -> Result<Vec<R>> {
        let records = with_store(&self.store, |store| (self.load)(store, filter))?;
        debug!(entity = self.entity, rows = records.len(), "loaded");
        Ok(records)
    }

    fn count(&self, filter: &FilterState) -> Result<usize> {
        with_store(&self.store, |store| (self.count)(store, filter))
    }

    fn search(&self, query: &str, filter: &FilterState) -> Result<Vec<R>> {
        let records = with_store(&self.store, |store| match self.search {
            Some(search) => search(store, query, filter),
            None => (self.load)(store, &filter.clone().with_query(query)),
        })?;
        debug!(entity = self.entity, query, rows = records.len(), "searched");
        Ok(records)
    }
}

pub fn browse(entity: Entity, store: SharedStore, options: &LaunchOptions) -> Result<()> {
    match entity {
        Entity::Tasks => task_browser(store, options).run(),
        Entity::Notes => note_browser(store, options).run(),
        Entity::Books => book_browser(store, options).run(),
        Entity::Articles => article_browser(store, options).run(),
        Entity::Tags => tag_browser(store, options).run(),
        Entity::Projects => project_browser(store, options).run(),
    }
}

fn configure<R: Record>(
    source: StoreSource<R>,
    entity: Entity,
    options: &LaunchOptions,
) -> Browser<R> {
    Browser::new(Arc::new(source))
        .title(entity.title())
        .searchable(options.searchable)
        .filter(options.filter.clone())
        .static_mode(options.static_mode)
}

pub fn task_browser(store: SharedStore, options: &LaunchOptions) -> Browser<Task> {
    let done = Arc::clone(&store);
    let start = Arc::clone(&store);
    configure(StoreSource::tasks(store), Entity::Tasks, options)
        .columns(vec![
            Column::new("id", "ID", 4),
            Column::new("description", "Description", 32),
            Column::new("status", "Status", 8),
            Column::new("priority", "Pri", 6),
            Column::new("project", "Project", 10),
            Column::new("due", "Due", 10),
        ])
        .detail_view(|task: &Task| Ok(task_detail(task)))
        .action('d', "done", move |task: &Task| complete_task(&done, task))
        .action('s', "start", move |task: &Task| start_task(&start, task))
}

pub fn note_browser(store: SharedStore, options: &LaunchOptions) -> Browser<Note> {
    let archive = Arc::clone(&store);
    configure(StoreSource::notes(store), Entity::Notes, options)
        .detail_view(|note: &Note| Ok(note_detail(note)))
        .action('a', "archive", move |note: &Note| {
            toggle_archive(&archive, note).map(|_| ())
        })
}

pub fn book_browser(store: SharedStore, options: &LaunchOptions) -> Browser<Book> {
    let reading = Arc::clone(&store);
    let finish = Arc::clone(&store);
    configure(StoreSource::books(store), Entity::Books, options)
        .detail_view(|book: &Book| Ok(book_detail(book)))
        .action('s', "start reading", move |book: &Book| {
            start_reading(&reading, book)
        })
        .action('f', "finish", move |book: &Book| finish_book(&finish, book))
}

pub fn article_browser(store: SharedStore, options: &LaunchOptions) -> Browser<Article> {
    configure(StoreSource::articles(store), Entity::Articles, options)
        .detail_view(|article: &Article| Ok(article_detail(article)))
}

pub fn tag_browser(store: SharedStore, options: &LaunchOptions) -> Browser<TagSummary> {
    configure(StoreSource::tags(store), Entity::Tags, options).columns(vec![
        Column::new("name", "Tag", 20),
        Column::new("tasks", "Tasks", 6),
        Column::new("notes", "Notes", 6),
        Column::new("total", "Total", 6),
    ])
}

pub fn project_browser(store: SharedStore, options: &LaunchOptions) -> Browser<ProjectSummary> {
    configure(StoreSource::projects(store), Entity::Projects, options).columns(vec![
        Column::new("name", "Project", 20),
        Column::new("tasks", "Tasks", 6),
        Column::new("completed", "Done", 6),
        Column::new("open", "Open", 6),
    ])
}

pub fn complete_task(store: &SharedStore, task: &Task) -> Result<()> {
    if task.status == TaskStatus::Done {
        bail!("task {} is already done", task.id.get());
    }
    with_store(store, |store| store.set_task_status(task.id, TaskStatus::Done))
}

pub fn start_task(store: &SharedStore, task: &Task) -> Result<()> {
    if task.status.is_closed() {
        bail!(
            "task {} is {}; only open tasks can be started",
            task.id.get(),
            task.status.as_str()
        );
    }
    with_store(store, |store| store.set_task_status(task.id, TaskStatus::Active))
}

/// Returns the note's new archived flag.
pub fn toggle_archive(store: &SharedStore, note: &Note) -> Result<bool> {
    with_store(store, |store| store.toggle_note_archived(note.id))
}

pub fn start_reading(store: &SharedStore, book: &Book) -> Result<()> {
    if book.status == BookStatus::Finished {
        bail!("{:?} is already finished", book.title);
    }
    with_store(store, |store| store.set_book_status(book.id, BookStatus::Reading))
}

pub fn finish_book(store: &SharedStore, book: &Book) -> Result<()> {
    with_store(store, |store| store.set_book_status(book.id, BookStatus::Finished))
}
