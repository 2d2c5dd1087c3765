// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Turns a [`FilterState`] into a parameterised `WHERE ... ORDER BY ...
//! LIMIT` tail. Only whitelisted filter and sort keys ever reach SQL text;
//! every user value is bound as a parameter.

use anyhow::{Result, bail};
use noteleaf_app::FilterState;
use rusqlite::types::Value;

pub(crate) type Normalize = fn(&str) -> Option<Value>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct FilterColumn {
    pub key: &'static str,
    /// SQL predicate with exactly one `?` placeholder.
    pub clause: &'static str,
    pub normalize: Normalize,
    pub hint: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EntityQuery {
    pub entity: &'static str,
    pub columns: &'static str,
    pub from: &'static str,
    /// Predicate applied unless the named filter is set explicitly.
    pub default_scope: Option<(&'static str, &'static str)>,
    pub search_columns: &'static [&'static str],
    pub filters: &'static [FilterColumn],
    pub sorts: &'static [(&'static str, &'static str)],
    pub default_order: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryTail {
    pub where_sql: String,
    pub order_sql: String,
    pub limit_sql: String,
    pub params: Vec<Value>,
}

impl EntityQuery {
    pub fn tail(&self, filter: &FilterState) -> Result<QueryTail> {
        let mut predicates = Vec::new();
        let mut params = Vec::new();

        for (key, raw) in &filter.filters {
            let Some(column) = self.filters.iter().find(|column| column.key == key) else {
                bail!(
                    "unknown {} filter {key:?}; supported filters: {}",
                    self.entity,
                    self.filter_keys()
                );
            };
            let Some(value) = (column.normalize)(raw) else {
                bail!(
                    "invalid value {raw:?} for {} filter {key}; {}",
                    self.entity,
                    column.hint
                );
            };
            predicates.push(column.clause.to_owned());
            params.push(value);
        }

        if let Some((key, scope)) = self.default_scope
            && filter.filter(key).is_none()
        {
            predicates.push(scope.to_owned());
        }

        for term in filter.query.split_whitespace() {
            let pattern = Value::Text(format!("%{}%", escape_like(term)));
            let matches = self
                .search_columns
                .iter()
                .map(|column| format!("{column} LIKE ? ESCAPE '\\'"))
                .collect::<Vec<_>>();
            predicates.push(format!("({})", matches.join(" OR ")));
            params.extend(std::iter::repeat_n(pattern, self.search_columns.len()));
        }

        let where_sql = if predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicates.join(" AND "))
        };

        let order_sql = match &filter.sort {
            Some(sort) => {
                let Some((_, expr)) = self.sorts.iter().find(|(key, _)| *key == sort.key) else {
                    bail!(
                        "unknown {} sort key {:?}; supported keys: {}",
                        self.entity,
                        sort.key,
                        self.sort_keys()
                    );
                };
                format!(" ORDER BY {expr} {}, {}", sort.direction.as_sql(), self.default_order)
            }
            None => format!(" ORDER BY {}", self.default_order),
        };

        let limit_sql = filter
            .limit
            .map(|limit| format!(" LIMIT {limit}"))
            .unwrap_or_default();

        Ok(QueryTail {
            where_sql,
            order_sql,
            limit_sql,
            params,
        })
    }

    pub fn select_sql(&self, tail: &QueryTail) -> String {
        format!(
            "SELECT {} FROM {}{}{}{}",
            self.columns, self.from, tail.where_sql, tail.order_sql, tail.limit_sql
        )
    }

    pub fn count_sql(&self, tail: &QueryTail) -> String {
        format!("SELECT COUNT(*) FROM {}{}", self.from, tail.where_sql)
    }

    fn filter_keys(&self) -> String {
        if self.filters.is_empty() {
            return "none".to_owned();
        }
        self.filters
            .iter()
            .map(|column| column.key)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn sort_keys(&self) -> String {
        self.sorts
            .iter()
            .map(|(key, _)| *key)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub(crate) fn text_value(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(Value::Text(trimmed.to_owned()))
}

pub(crate) fn bool_value(raw: &str) -> Option<Value> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(Value::Integer(1)),
        "false" | "no" | "0" => Some(Value::Integer(0)),
        _ => None,
    }
}
