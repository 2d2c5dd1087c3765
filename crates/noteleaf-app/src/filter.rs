// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};

use crate::SortDirection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    /// Parses `key`, `key:asc` or `key:desc`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (key, direction) = match raw.split_once(':') {
            Some((key, direction)) => {
                let direction = SortDirection::parse(direction).ok_or_else(|| {
                    anyhow!("sort direction {direction:?} is invalid; use asc or desc")
                })?;
                (key, direction)
            }
            None => (raw, SortDirection::Asc),
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("sort key must not be empty; use key[:asc|desc]");
        }
        Ok(Self::new(key, direction))
    }
}

/// Snapshot of the query parameters behind one load. Every dispatched
/// command owns its own clone, so a snapshot is never changed after it has
/// been handed out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub query: String,
    pub limit: Option<usize>,
    pub sort: Option<SortSpec>,
    pub filters: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    pub fn has_query(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

/// Parses a `key=value` filter argument.
pub fn parse_filter_arg(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("filter {raw:?} must look like key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("filter {raw:?} has an empty key; use key=value");
    }
    Ok((key.to_owned(), value.trim().to_owned()))
}
