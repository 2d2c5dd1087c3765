// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use time::{Date, OffsetDateTime};

use crate::FilterState;

/// A value the browser renders without knowing its domain type.
pub trait Record: Clone + Send + 'static {
    /// Stable identity; used for display only, never for diffing.
    fn id(&self) -> i64;

    fn title(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }

    /// Text that search should match against.
    fn filter_value(&self) -> String;

    fn field_value(&self, _name: &str) -> FieldValue {
        FieldValue::Empty
    }
}

/// Plain strings browse as untitled one-line records.
impl Record for String {
    fn id(&self) -> i64 {
        0
    }

    fn title(&self) -> String {
        self.clone()
    }

    fn filter_value(&self) -> String {
        self.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Empty,
    Text(String),
    Integer(i64),
    Bool(bool),
    Date(Option<Date>),
    DateTime(Option<OffsetDateTime>),
    List(Vec<String>),
}

impl FieldValue {
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Bool(true) => "yes".to_owned(),
            Self::Bool(false) => "no".to_owned(),
            Self::Date(Some(value)) => value.to_string(),
            Self::Date(None) => String::new(),
            Self::DateTime(Some(value)) => value.date().to_string(),
            Self::DateTime(None) => String::new(),
            Self::List(values) => values.join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty | Self::Date(None) | Self::DateTime(None) => true,
            Self::Text(value) => value.is_empty(),
            Self::List(values) => values.is_empty(),
            Self::Integer(_) | Self::Bool(_) | Self::Date(Some(_)) | Self::DateTime(Some(_)) => {
                false
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Where records come from. Implementations must tolerate concurrent,
/// independent calls from worker threads.
pub trait DataSource<R>: Send + Sync {
    fn load(&self, filter: &FilterState) -> Result<Vec<R>>;

    fn count(&self, filter: &FilterState) -> Result<usize>;

    fn search(&self, query: &str, filter: &FilterState) -> Result<Vec<R>> {
        let filter = filter.clone().with_query(query);
        self.load(&filter)
    }
}

pub type DetailFormatter<R> = Arc<dyn Fn(&R) -> Result<String> + Send + Sync>;

pub type ActionHandler<R> = Arc<dyn Fn(&R) -> Result<()> + Send + Sync>;

/// A domain action bound to a key in navigation mode, such as "mark done".
pub struct ActionBinding<R> {
    pub key: char,
    pub description: String,
    pub handler: ActionHandler<R>,
}

impl<R> ActionBinding<R> {
    pub fn new<F>(key: char, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&R) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            key,
            description: description.into(),
            handler: Arc::new(handler),
        }
    }
}

impl<R> Clone for ActionBinding<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            description: self.description.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<R> fmt::Debug for ActionBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionBinding")
            .field("key", &self.key)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
