// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    EmptyTitle,
    InvalidProgress,
    InvalidRating,
    InvalidTag,
    InvalidDate,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => f.write_str("title must not be empty"),
            Self::InvalidProgress => f.write_str("progress must be between 0 and 100"),
            Self::InvalidRating => f.write_str("rating must be between 1 and 5"),
            Self::InvalidTag => f.write_str("tags must be single words"),
            Self::InvalidDate => write!(f, "dates must look like {DATE_LAYOUT}"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub fn require_title(input: &str) -> ValidationResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

pub fn check_progress(progress: i64) -> ValidationResult<i64> {
    if (0..=100).contains(&progress) {
        Ok(progress)
    } else {
        Err(ValidationError::InvalidProgress)
    }
}

pub fn check_rating(rating: Option<i64>) -> ValidationResult<Option<i64>> {
    match rating {
        Some(value) if !(1..=5).contains(&value) => Err(ValidationError::InvalidRating),
        other => Ok(other),
    }
}

/// Trims, drops a leading `#`, lowercases and dedupes, keeping first-seen
/// order.
pub fn normalize_tags(tags: &[String]) -> ValidationResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        let tag = tag.strip_prefix('#').unwrap_or(tag).to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidTag);
        }
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    Ok(normalized)
}

pub fn parse_optional_date(input: &str) -> ValidationResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Date::parse(trimmed, &format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate)
}

#[cfg(test)]
mod tests {
    use super::{
        ValidationError, check_progress, check_rating, normalize_tags, parse_optional_date,
        require_title,
    };
    use time::{Date, Month};

    #[test]
    fn require_title_trims() {
        assert_eq!(require_title("  Dune \n").as_deref(), Ok("Dune"));
        assert_eq!(require_title("   "), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn progress_and_rating_ranges() {
        assert_eq!(check_progress(0), Ok(0));
        assert_eq!(check_progress(100), Ok(100));
        assert_eq!(check_progress(101), Err(ValidationError::InvalidProgress));
        assert_eq!(check_rating(None), Ok(None));
        assert_eq!(check_rating(Some(5)), Ok(Some(5)));
        assert_eq!(check_rating(Some(0)), Err(ValidationError::InvalidRating));
    }

    #[test]
    fn normalize_tags_dedupes_and_strips_hash() {
        let tags = ["#Home", "home", " urgent ", ""].map(str::to_owned);
        assert_eq!(
            normalize_tags(&tags),
            Ok(vec!["home".to_owned(), "urgent".to_owned()])
        );
        assert_eq!(
            normalize_tags(&["two words".to_owned()]),
            Err(ValidationError::InvalidTag)
        );
    }

    #[test]
    fn parse_optional_date_test() {
        assert_eq!(parse_optional_date(""), Ok(None));
        assert_eq!(
            parse_optional_date("2026-02-28"),
            Ok(Some(
                Date::from_calendar_date(2026, Month::February, 28).expect("valid date")
            ))
        );
        assert_eq!(
            parse_optional_date("02/28/2026"),
            Err(ValidationError::InvalidDate)
        );
    }

    #[test]
    fn errors_read_as_instructions() {
        assert_eq!(
            ValidationError::InvalidDate.to_string(),
            "dates must look like YYYY-MM-DD"
        );
    }
}
