//! Core record model: task keys, day records, and the record map.
//!
//! The whole dataset is one mapping from calendar dates to per-day task
//! flags. Absent entries mean false everywhere, so toggling a task on an
//! untouched date turns it on.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// The four tracked habits. A closed set; nothing else is a valid key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKey {
    EarlyWake,
    EarlySleep,
    Takeout,
    EatOut,
}

/// Whether checking a task celebrates a win or confesses a slip.
/// Presentation only; sync and storage never branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    Positive,
    Negative,
}

impl TaskKey {
    pub const ALL: [TaskKey; 4] = [
        TaskKey::EarlyWake,
        TaskKey::EarlySleep,
        TaskKey::Takeout,
        TaskKey::EatOut,
    ];

    /// Wire name, matching the JSON representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKey::EarlyWake => "earlyWake",
            TaskKey::EarlySleep => "earlySleep",
            TaskKey::Takeout => "takeout",
            TaskKey::EatOut => "eatOut",
        }
    }

    /// Human label for calendars and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKey::EarlyWake => "early wake",
            TaskKey::EarlySleep => "early sleep",
            TaskKey::Takeout => "takeout",
            TaskKey::EatOut => "eat out",
        }
    }

    pub fn category(&self) -> TaskCategory {
        match self {
            TaskKey::EarlyWake | TaskKey::EarlySleep => TaskCategory::Positive,
            TaskKey::Takeout | TaskKey::EatOut => TaskCategory::Negative,
        }
    }

    /// One-character mark used in calendar cells.
    pub fn mark(&self) -> char {
        match self {
            TaskKey::EarlyWake => 'W',
            TaskKey::EarlySleep => 'S',
            TaskKey::Takeout => 'T',
            TaskKey::EatOut => 'E',
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "earlyWake" => Ok(TaskKey::EarlyWake),
            "earlySleep" => Ok(TaskKey::EarlySleep),
            "takeout" => Ok(TaskKey::Takeout),
            "eatOut" => Ok(TaskKey::EatOut),
            other => Err(Error::InvalidArgument(format!(
                "unknown task '{other}': expected one of earlyWake, earlySleep, takeout, eatOut"
            ))),
        }
    }
}

/// Task flags for a single date. Missing keys read as false.
pub type DayRecord = BTreeMap<TaskKey, bool>;

/// Every recorded day, keyed by `YYYY-MM-DD`.
pub type RecordMap = BTreeMap<String, DayRecord>;

/// Check the `YYYY-MM-DD` shape: four digits, dash, two digits, dash, two
/// digits. Zero padding is required; `2024-1-5` is not a valid key.
pub fn is_valid_date_key(key: &str) -> bool {
    let b = key.as_bytes();
    b.len() == 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

/// Canonical date key for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Apply one task mutation and return the updated map plus the affected
/// day. `value` of `None` flips the current flag, with absent read as false.
pub fn next_records(
    records: &RecordMap,
    date: &str,
    task: TaskKey,
    value: Option<bool>,
) -> (RecordMap, DayRecord) {
    let mut next = records.clone();
    let mut day = next.get(date).cloned().unwrap_or_default();
    let target = value.unwrap_or_else(|| !day.get(&task).copied().unwrap_or(false));
    day.insert(task, target);
    next.insert(date.to_string(), day.clone());
    (next, day)
}

/// Parse an untyped JSON value into a record map, rejecting anything outside
/// the date-key pattern, the four task keys, or boolean flags. One bad entry
/// fails the whole map.
pub fn parse_record_map(value: &Value) -> Result<RecordMap> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::Validation("records must be an object".to_string()))?;

    let mut records = RecordMap::new();
    for (date, day_value) in map {
        if !is_valid_date_key(date) {
            return Err(Error::Validation(format!(
                "invalid date key '{date}': expected YYYY-MM-DD"
            )));
        }
        let day_map = day_value.as_object().ok_or_else(|| {
            Error::Validation(format!("record for {date} must be an object"))
        })?;
        let mut day = DayRecord::new();
        for (task_name, flag) in day_map {
            let task: TaskKey = task_name
                .parse()
                .map_err(|_| Error::Validation(format!("invalid task '{task_name}' for {date}")))?;
            let flag = flag.as_bool().ok_or_else(|| {
                Error::Validation(format!("task '{task_name}' for {date} must be a boolean"))
            })?;
            day.insert(task, flag);
        }
        records.insert(date.clone(), day);
    }
    Ok(records)
}
