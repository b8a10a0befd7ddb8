use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::Error;

// Self documenting alias
pub type TimeStamp = OffsetDateTime;

/// Due dates are plain calendar dates, written and parsed as YYYY-MM-DD.
const DUE_DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

pub fn parse_due_date(input: &str) -> Result<Date, Error> {
    Date::parse(input.trim(), DUE_DATE_FORMAT)
        .map_err(|_| Error::Validation(format!("due date must be YYYY-MM-DD, got {input:?}")))
}

// --- Priority ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(Error::Validation(format!(
                "priority must be low, medium or high, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

// --- Task Object ---
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Task {
    /** Immutable primary key, unique within its collection */
    pub id: u64,

    /** Required short summary */
    pub title: String,

    /** Completion flag; coupled to `completed_at` */
    pub done: bool,

    /** Labels for filtering; insertion order, no duplicates */
    #[serde(default)]
    pub tags: Vec<String>,

    /** Urgency level */
    #[serde(default)]
    pub priority: Priority,

    /** Optional calendar due date (no time component) */
    #[serde(default)]
    pub due_date: Option<Date>,

    /** Optional free-text note */
    #[serde(default)]
    pub note: Option<String>,

    /** Created at UTC time (immutable once set) */
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: TimeStamp,

    /** Set exactly when `done` flips to true, cleared on reopen */
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub completed_at: Option<TimeStamp>,

    /** Stamped when the task is moved into the archive file */
    #[serde(
        with = "time::serde::rfc3339::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub archived_at: Option<TimeStamp>,
}

impl Task {
    /// Flip the done flag, keeping `completed_at` in lockstep.
    /// Setting the state it already has is a no-op.
    pub fn set_done(&mut self, done: bool, now: TimeStamp) {
        if self.done == done {
            return;
        }
        self.done = done;
        self.completed_at = if done { Some(now) } else { None };
    }

    /// Replace the full tag set (empty input clears all tags).
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = normalize_tags(tags);
    }
}

/// Trim entries, drop empties, collapse exact duplicates keeping first
/// occurrence so display order matches what the user typed.
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

// --- Field-by-field update for `edit` ---
// `None` leaves the field unchanged. `done`, `id` and `created_at` are
// deliberately absent: completion goes through `set_done`, the rest is
// immutable.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<Date>,
    pub note: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.due_date.is_none()
            && self.note.is_none()
    }
}

// --- Top level container ---
// Transparent so the persisted document is a bare JSON array of tasks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// One past the largest id still present; 1 for an empty list.
    /// Deleting the newest task can re-issue its id, but ids stay unique
    /// within the live collection and strictly above the current max.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().map_or(1, |max| max + 1)
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
