//! Delimited string splitting

use crate::error::{Result, StacError};
use std::fmt::Display;
use std::str::FromStr;

/// Split on commas, trimming items and dropping empty ones
///
/// `None` and blank input give an empty list.
pub fn listify(value: Option<&str>) -> Vec<String> {
    Listify::new().split(value)
}

/// Configurable splitter with typed parsing
#[derive(Debug, Clone)]
pub struct Listify {
    separator: String,
    keep_empty: bool,
    ignore_errors: bool,
}

impl Default for Listify {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            keep_empty: false,
            ignore_errors: false,
        }
    }
}

impl Listify {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Keep empty items instead of dropping them
    pub fn keep_empty(mut self, keep_empty: bool) -> Self {
        self.keep_empty = keep_empty;
        self
    }

    /// Skip items that fail to parse instead of failing the whole list
    pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Split into trimmed strings
    pub fn split(&self, value: Option<&str>) -> Vec<String> {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            return Vec::new();
        };

        value
            .split(self.separator.as_str())
            .map(str::trim)
            .filter(|item| self.keep_empty || !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Split and parse each item
    ///
    /// Empty items become `None` when `keep_empty` is set. With
    /// `ignore_errors`, unparseable items are skipped, or become `None` when
    /// `keep_empty` is also set.
    pub fn parse<T>(&self, value: Option<&str>) -> Result<Vec<Option<T>>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let mut parsed = Vec::new();

        for item in self.split(value) {
            if item.is_empty() {
                parsed.push(None);
                continue;
            }

            match item.parse::<T>() {
                Ok(v) => parsed.push(Some(v)),
                Err(_) if self.ignore_errors => {
                    if self.keep_empty {
                        parsed.push(None);
                    }
                }
                Err(e) => {
                    return Err(StacError::Parse(format!("'{}': {}", item, e)));
                }
            }
        }

        Ok(parsed)
    }

    /// Split and parse, dropping any `None` entries
    pub fn parse_all<T>(&self, value: Option<&str>) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.parse(value)?.into_iter().flatten().collect())
    }
}
