//! Flat tabular view of a task sequence for the `export` subcommand.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};
use crate::model::{Task, TimeStamp};

/// Tags are joined into one column with this delimiter.
pub const TAG_DELIMITER: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(Error::Validation(format!(
                "export format must be json or csv, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// One task flattened to scalar columns; dates and timestamps become
/// ISO 8601 strings, absent values stay null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub id: u64,
    pub title: String,
    pub done: bool,
    pub tags: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

const CSV_HEADER: &str = "id,title,done,tags,priority,due_date,note,created_at,completed_at";

impl ExportRow {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            done: task.done,
            tags: task.tags.join(TAG_DELIMITER),
            priority: task.priority.to_string(),
            due_date: task.due_date.map(|d| d.to_string()),
            note: task.note.clone(),
            created_at: rfc3339(&task.created_at),
            completed_at: task.completed_at.as_ref().map(rfc3339),
        }
    }
}

pub fn rows(tasks: &[Task]) -> Vec<ExportRow> {
    tasks.iter().map(ExportRow::from_task).collect()
}

pub fn render(tasks: &[Task], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(tasks),
        ExportFormat::Csv => Ok(to_csv(tasks)),
    }
}

/// Pretty-printed JSON array of row objects.
pub fn to_json(tasks: &[Task]) -> Result<String> {
    serde_json::to_string_pretty(&rows(tasks)).map_err(|e| {
        Error::io("serializing export rows", std::io::Error::other(e))
    })
}

/// Header plus one RFC 4180 record per task, newline terminated.
pub fn to_csv(tasks: &[Task]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows(tasks) {
        let fields = [
            row.id.to_string(),
            row.title,
            row.done.to_string(),
            row.tags,
            row.priority,
            row.due_date.unwrap_or_default(),
            row.note.unwrap_or_default(),
            row.created_at,
            row.completed_at.unwrap_or_default(),
        ];
        let record: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&record.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field when it contains the delimiter, a quote, or a newline;
/// embedded quotes are doubled.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn rfc3339(ts: &TimeStamp) -> String {
    // Rfc3339 formatting only fails for years outside 0..=9999; fall back
    // to the default rendering rather than erroring an export over it.
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}
