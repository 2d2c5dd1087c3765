// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use noteleaf_app::{
    DataSource, FilterState, Note, NoteId, Record, Task, TaskId, TaskPriority, TaskStatus,
};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::{Date, Duration, Month, OffsetDateTime, Time};

const TASK_VERBS: [&str; 12] = [
    "Draft", "Review", "Schedule", "Call", "Email", "Fix", "Plan", "Order", "Clean", "Renew",
    "Update", "Sort",
];
const TASK_OBJECTS: [&str; 14] = [
    "the quarterly report",
    "dentist appointment",
    "library books",
    "garden beds",
    "insurance paperwork",
    "bike tires",
    "conference talk",
    "pantry shelves",
    "passport",
    "team retro notes",
    "photo backups",
    "gift list",
    "tax receipts",
    "reading group invite",
];
const PROJECTS: [&str; 6] = ["home", "work", "garden", "errands", "writing", ""];
const TAGS: [&str; 10] = [
    "admin", "urgent", "outdoors", "reading", "health", "money", "family", "computer", "writing",
    "someday",
];

const NOTE_TITLES: [&str; 10] = [
    "Meeting notes",
    "Recipe ideas",
    "Trip packing list",
    "Book quotes",
    "Garden log",
    "Weekly review",
    "Gift ideas",
    "Talk outline",
    "Reading list",
    "Project retro",
];
const NOTE_LINES: [&str; 8] = [
    "Follow up next week.",
    "Ask about the timeline.",
    "Remember to bring the charger.",
    "Worth rereading in spring.",
    "Compare against last year.",
    "Three options, pick one by Friday.",
    "Keep it short.",
    "Check the library first.",
];

const BOOK_TITLES: [&str; 12] = [
    "The Dispossessed",
    "Piranesi",
    "Middlemarch",
    "The Overstory",
    "Kindred",
    "A Wizard of Earthsea",
    "The Remains of the Day",
    "Station Eleven",
    "The Name of the Rose",
    "Gilead",
    "Invisible Cities",
    "The Master and Margarita",
];
const AUTHORS: [&str; 12] = [
    "Ursula K. Le Guin",
    "Susanna Clarke",
    "George Eliot",
    "Richard Powers",
    "Octavia E. Butler",
    "Kazuo Ishiguro",
    "Emily St. John Mandel",
    "Umberto Eco",
    "Marilynne Robinson",
    "Italo Calvino",
    "Mikhail Bulgakov",
    "Toni Morrison",
];

const ARTICLE_TOPICS: [&str; 8] = [
    "plain text",
    "structured concurrency",
    "sqlite in production",
    "terminal interfaces",
    "spaced repetition",
    "note taking",
    "error messages",
    "small tools",
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTask {
    pub description: String,
    pub priority: TaskPriority,
    pub project: String,
    pub tags: Vec<String>,
    pub due: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeBook {
    pub title: String,
    pub author: String,
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeArticle {
    pub title: String,
    pub url: String,
    pub author: String,
    pub published: Option<Date>,
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for plausible personal-library data. The same seed
/// always yields the same sequence.
#[derive(Debug, Clone)]
pub struct LeafFaker {
    rng: DeterministicRng,
}

impl LeafFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn task(&mut self) -> FakeTask {
        let description = format!("{} {}", self.pick(&TASK_VERBS), self.pick(&TASK_OBJECTS));
        let priority = TaskPriority::from_rank(self.rng.int_n(4) as i64);
        let due = if self.rng.bool() {
            Some(self.date_in_year(REFERENCE_YEAR))
        } else {
            None
        };
        FakeTask {
            description,
            priority,
            project: self.pick(&PROJECTS).to_owned(),
            tags: self.tags(2),
            due,
        }
    }

    pub fn note(&mut self) -> FakeNote {
        let line_count = 1 + self.rng.int_n(3);
        let lines = (0..line_count)
            .map(|_| self.pick(&NOTE_LINES))
            .collect::<Vec<_>>();
        FakeNote {
            title: self.pick(&NOTE_TITLES).to_owned(),
            content: lines.join("\n"),
            tags: self.tags(2),
        }
    }

    pub fn book(&mut self) -> FakeBook {
        let index = self.rng.int_n(BOOK_TITLES.len());
        let rating = if self.rng.bool() {
            Some(1 + self.rng.int_n(5) as i64)
        } else {
            None
        };
        FakeBook {
            title: BOOK_TITLES[index].to_owned(),
            author: AUTHORS[index % AUTHORS.len()].to_owned(),
            rating,
        }
    }

    pub fn article(&mut self) -> FakeArticle {
        let topic = self.pick(&ARTICLE_TOPICS);
        let slug = format!("{}-{}", topic.replace(' ', "-"), self.rng.int_n(10_000));
        let author = if self.rng.bool() {
            self.pick(&AUTHORS).to_owned()
        } else {
            String::new()
        };
        FakeArticle {
            title: format!("Notes on {topic}"),
            url: format!("https://example.com/{slug}"),
            author,
            published: Some(self.date_in_year(REFERENCE_YEAR - 1)),
        }
    }

    /// A fully populated task model, for code that never touches storage.
    pub fn task_record(&mut self, id: i64) -> Task {
        let fake = self.task();
        let created_at = reference_now() + Duration::hours(id);
        Task {
            id: TaskId::new(id),
            uuid: format!("{id:032x}"),
            description: fake.description,
            status: TaskStatus::Pending,
            priority: fake.priority,
            project: fake.project,
            tags: fake.tags,
            due: fake.due,
            created_at,
            updated_at: created_at,
            completed_at: None,
        }
    }

    pub fn note_record(&mut self, id: i64) -> Note {
        let fake = self.note();
        let created_at = reference_now() + Duration::hours(id);
        Note {
            id: NoteId::new(id),
            title: fake.title,
            content: fake.content,
            tags: fake.tags,
            archived: false,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn date_in_year(&mut self, year: i32) -> Date {
        let day = self.rng.int_n(365) as i64;
        let start = Date::from_calendar_date(year, Month::January, 1).unwrap_or(Date::MIN);
        start.checked_add(Duration::days(day)).unwrap_or(start)
    }

    fn tags(&mut self, max: usize) -> Vec<String> {
        let count = self.rng.int_n(max + 1);
        let mut tags: Vec<String> = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = self.pick(&TAGS).to_owned();
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// One call observed by a [`MemorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Load(FilterState),
    Count(FilterState),
    Search(String, FilterState),
}

#[derive(Debug, Default)]
struct Failures {
    load: Option<String>,
    count: Option<String>,
    search: Option<String>,
}

/// In-memory [`DataSource`] with switchable failures and a call log.
/// Queries match case-insensitively against `Record::filter_value`, every
/// whitespace-separated term required.
#[derive(Debug)]
pub struct MemorySource<R> {
    records: Mutex<Vec<R>>,
    failures: Mutex<Failures>,
    calls: Mutex<Vec<SourceCall>>,
}

impl<R: Record> MemorySource<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records: Mutex::new(records),
            failures: Mutex::new(Failures::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_records(&self, records: Vec<R>) {
        *lock(&self.records) = records;
    }

    pub fn fail_loads(&self, error: Option<&str>) {
        lock(&self.failures).load = error.map(str::to_owned);
    }

    pub fn fail_counts(&self, error: Option<&str>) {
        lock(&self.failures).count = error.map(str::to_owned);
    }

    pub fn fail_searches(&self, error: Option<&str>) {
        lock(&self.failures).search = error.map(str::to_owned);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.calls).clone()
    }

    fn matching(&self, filter: &FilterState) -> Vec<R> {
        let terms = filter
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>();
        let records = lock(&self.records);
        let matched = records.iter().filter(|record| {
            let haystack = record.filter_value().to_lowercase();
            terms.iter().all(|term| haystack.contains(term))
        });
        match filter.limit {
            Some(limit) => matched.take(limit).cloned().collect(),
            None => matched.cloned().collect(),
        }
    }
}

impl<R: Record> DataSource<R> for MemorySource<R> {
    fn load(&self, filter: &FilterState) -> Result<Vec<R>> {
        lock(&self.calls).push(SourceCall::Load(filter.clone()));
        if let Some(error) = &lock(&self.failures).load {
            bail!("{error}");
        }
        Ok(self.matching(filter))
    }

    fn count(&self, filter: &FilterState) -> Result<usize> {
        lock(&self.calls).push(SourceCall::Count(filter.clone()));
        if let Some(error) = &lock(&self.failures).count {
            bail!("{error}");
        }
        let unlimited = FilterState {
            limit: None,
            ..filter.clone()
        };
        Ok(self.matching(&unlimited).len())
    }

    fn search(&self, query: &str, filter: &FilterState) -> Result<Vec<R>> {
        lock(&self.calls).push(SourceCall::Search(query.to_owned(), filter.clone()));
        if let Some(error) = &lock(&self.failures).search {
            bail!("{error}");
        }
        Ok(self.matching(&filter.clone().with_query(query)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("noteleaf.db");
    Ok((dir, db_path))
}

fn reference_now() -> OffsetDateTime {
    let date = Date::from_calendar_date(REFERENCE_YEAR, Month::January, 1).unwrap_or(Date::MIN);
    date.with_time(Time::MIDNIGHT).assume_utc()
}
