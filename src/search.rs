// Copyright (c) 2025 Photosync Contributors
// Licensed under the MIT License. See LICENSE file for details.

//! Search keys.
//!
//! A search key combines month, day and client name. Its string form (the
//! "search id", e.g. `09.05王小明`) doubles as the remote folder suffix and
//! the local cache subdirectory name.

use serde::Serialize;

use crate::config::NameAlias;
use crate::error::SyncError;

/// A validated month/day/name triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchKey {
    /// Two-digit month, "01".."12".
    pub month: String,
    /// Two-digit day, "01".."31".
    pub day: String,
    /// Client name exactly as requested.
    pub name: String,
}

impl SearchKey {
    /// Validate and zero-pad the raw request parameters.
    pub fn new(
        month: impl AsRef<str>,
        day: impl AsRef<str>,
        name: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let month = pad_two(month.as_ref())?;
        let day = pad_two(day.as_ref())?;
        let name = name.into();

        let month_num: u32 = month
            .parse()
            .map_err(|_| SyncError::InvalidRequest(format!("month is not a number: {month}")))?;
        if !(1..=12).contains(&month_num) {
            return Err(SyncError::InvalidRequest(format!("month out of range: {month}")));
        }
        let day_num: u32 = day
            .parse()
            .map_err(|_| SyncError::InvalidRequest(format!("day is not a number: {day}")))?;
        if !(1..=31).contains(&day_num) {
            return Err(SyncError::InvalidRequest(format!("day out of range: {day}")));
        }
        if name.trim().is_empty() {
            return Err(SyncError::InvalidRequest("name is empty".to_string()));
        }

        Ok(Self { month, day, name })
    }

    /// The combined id, e.g. `09.05王小明`.
    pub fn search_id(&self) -> String {
        format!("{}.{}{}", self.month, self.day, self.name)
    }

    /// The remote folder name for this key; identical to the search id.
    pub fn folder_name(&self) -> String {
        self.search_id()
    }

    /// The same key with a substituted client name. Used for alias
    /// fallback lookups; the original key keeps naming the cache.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self { month: self.month.clone(), day: self.day.clone(), name: name.into() }
    }
}

/// Apply the first matching alias to `name`, if any substring matches.
pub fn apply_alias(name: &str, aliases: &[NameAlias]) -> Option<String> {
    aliases
        .iter()
        .find(|alias| name.contains(alias.from.as_str()))
        .map(|alias| name.replace(alias.from.as_str(), alias.to.as_str()))
}

fn pad_two(value: &str) -> Result<String, SyncError> {
    let value = value.trim();
    if value.is_empty() || value.len() > 2 {
        return Err(SyncError::InvalidRequest(format!("expected a 1-2 digit value, got {value:?}")));
    }
    Ok(format!("{:0>2}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_id_zero_pads() {
        let key = SearchKey::new("9", "5", "王小明").unwrap();
        assert_eq!(key.search_id(), "09.05王小明");
        assert_eq!(key.folder_name(), "09.05王小明");
    }

    #[test]
    fn rejects_out_of_range_dates() {
        assert!(SearchKey::new("13", "01", "王小明").is_err());
        assert!(SearchKey::new("00", "01", "王小明").is_err());
        assert!(SearchKey::new("12", "32", "王小明").is_err());
        assert!(SearchKey::new("12", "0", "王小明").is_err());
        assert!(SearchKey::new("12", "31", "王小明").is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(SearchKey::new("01", "01", "  ").is_err());
    }

    #[test]
    fn alias_substitution() {
        let aliases = vec![NameAlias::new("叔華", "淑華")];
        assert_eq!(apply_alias("陳叔華", &aliases), Some("陳淑華".to_string()));
        assert_eq!(apply_alias("王小明", &aliases), None);
    }

    #[test]
    fn with_name_keeps_date() {
        let key = SearchKey::new("09", "05", "陳叔華").unwrap();
        let alt = key.with_name("陳淑華");
        assert_eq!(alt.search_id(), "09.05陳淑華");
        assert_eq!(key.search_id(), "09.05陳叔華");
    }
}
