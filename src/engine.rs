//! Task-level operations over an in-memory [`TaskList`].
//!
//! Everything here is a pure function of the collection plus its
//! parameters; nothing touches disk. Input is validated before any
//! mutation, so a failed call leaves the collection exactly as it was.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use time::{Date, Duration};

use crate::error::{Error, Result};
use crate::model::{Priority, Task, TaskList, TaskPatch, TimeStamp, normalize_tags};

/// How far ahead "upcoming" looks when no horizon is given.
pub const DEFAULT_UPCOMING_DAYS: u16 = 7;

/// Fields for a task that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub due_date: Option<Date>,
    pub note: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: Vec::new(),
            priority: Priority::default(),
            due_date: None,
            note: None,
        }
    }
}

/// Validate, assign the next id, and append. Returns the created task.
pub fn add(list: &mut TaskList, new: NewTask) -> Result<Task> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(Error::Validation("title must not be empty".to_string()));
    }

    let task = Task {
        id: list.next_id(),
        title: title.to_string(),
        done: false,
        tags: normalize_tags(new.tags),
        priority: new.priority,
        due_date: new.due_date,
        note: new.note,
        created_at: TimeStamp::now_utc(),
        completed_at: None,
        archived_at: None,
    };
    list.tasks.push(task.clone());
    Ok(task)
}

/// Apply only the fields the patch supplies. Completion state, id and
/// creation time are not editable here.
pub fn edit(list: &mut TaskList, id: u64, patch: TaskPatch) -> Result<Task> {
    // Reject bad input before touching the task.
    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".to_string()));
        }
    }

    let task = list.get_mut(id).ok_or(Error::NotFound(id))?;
    if let Some(title) = patch.title {
        task.title = title.trim().to_string();
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(tags) = patch.tags {
        task.set_tags(tags);
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = Some(due_date);
    }
    if let Some(note) = patch.note {
        task.note = Some(note);
    }
    Ok(task.clone())
}

/// Set or clear the done flag; `completed_at` follows. Succeeds even when
/// the task is already in the requested state.
pub fn set_done(list: &mut TaskList, id: u64, done: bool) -> Result<Task> {
    let task = list.get_mut(id).ok_or(Error::NotFound(id))?;
    task.set_done(done, TimeStamp::now_utc());
    Ok(task.clone())
}

/// Replace the full tag set; an empty list clears all tags.
pub fn set_tags(list: &mut TaskList, id: u64, tags: Vec<String>) -> Result<Task> {
    let task = list.get_mut(id).ok_or(Error::NotFound(id))?;
    task.set_tags(tags);
    Ok(task.clone())
}

/// Remove a task permanently, returning it.
pub fn delete(list: &mut TaskList, id: u64) -> Result<Task> {
    let index = list
        .tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or(Error::NotFound(id))?;
    Ok(list.tasks.remove(index))
}

/// Remove all tasks, or only the done ones. Returns how many were removed.
pub fn clear(list: &mut TaskList, done_only: bool) -> usize {
    let before = list.len();
    if done_only {
        list.tasks.retain(|t| !t.done);
    } else {
        list.tasks.clear();
    }
    before - list.len()
}

/// Move every done task out of the active collection, stamping it for the
/// archive. Ids and timestamps are preserved. Returns the moved tasks;
/// empty when nothing is done.
pub fn archive(list: &mut TaskList) -> Vec<Task> {
    let now = TimeStamp::now_utc();
    let (mut done, pending): (Vec<Task>, Vec<Task>) =
        list.tasks.drain(..).partition(|t| t.done);
    list.tasks = pending;
    for task in &mut done {
        task.archived_at = Some(now);
    }
    done
}

// --- Filtering ---

/// Named date-range predicate relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueWindow {
    /// Due before today and not done.
    Overdue,
    /// Due exactly today.
    Today,
    /// Due after today, within the filter's horizon.
    Upcoming,
}

impl FromStr for DueWindow {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overdue" => Ok(DueWindow::Overdue),
            "today" => Ok(DueWindow::Today),
            "upcoming" => Ok(DueWindow::Upcoming),
            _ => Err(Error::Validation(format!(
                "due window must be overdue, today or upcoming, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for DueWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueWindow::Overdue => write!(f, "overdue"),
            DueWindow::Today => write!(f, "today"),
            DueWindow::Upcoming => write!(f, "upcoming"),
        }
    }
}

/// All predicates are ANDed; an unset predicate matches everything.
#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub tag: Option<String>,
    pub priority: Option<Priority>,
    pub due: Option<DueWindow>,
    pub include_done: bool,
    pub upcoming_days: u16,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            tag: None,
            priority: None,
            due: None,
            include_done: false,
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }
}

impl TaskFilter {
    fn matches(&self, task: &Task, today: Date) -> bool {
        if !self.include_done && task.done {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !task.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(window) = self.due {
            if !in_due_window(task, window, today, self.upcoming_days) {
                return false;
            }
        }
        true
    }
}

fn in_due_window(task: &Task, window: DueWindow, today: Date, horizon_days: u16) -> bool {
    let Some(due) = task.due_date else {
        return false;
    };
    match window {
        DueWindow::Overdue => due < today && !task.done,
        DueWindow::Today => due == today,
        DueWindow::Upcoming => due > today && due <= today + Duration::days(i64::from(horizon_days)),
    }
}

/// Tasks matching every supplied predicate, ascending by id.
pub fn filter<'a>(list: &'a TaskList, filter: &TaskFilter, today: Date) -> Vec<&'a Task> {
    let mut out: Vec<&Task> = list
        .tasks
        .iter()
        .filter(|t| filter.matches(t, today))
        .collect();
    out.sort_by_key(|t| t.id);
    out
}

/// Case-insensitive substring match against title or note.
pub fn search<'a>(list: &'a TaskList, keyword: &str, include_done: bool) -> Vec<&'a Task> {
    let needle = keyword.to_lowercase();
    let mut out: Vec<&Task> = list
        .tasks
        .iter()
        .filter(|t| include_done || !t.done)
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.note
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .collect();
    out.sort_by_key(|t| t.id);
    out
}

// --- Statistics ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total: usize,
    pub done: usize,
    pub pending: usize,
    /// done / total × 100, rounded to one decimal place with ties going
    /// away from zero; 0.0 for an empty collection.
    pub completion_pct: f64,
    /// Pending tasks only.
    pub pending_by_priority: PriorityCounts,
    /// Due-window counts consider pending tasks only.
    pub overdue: usize,
    pub due_today: usize,
    pub upcoming: usize,
    /// Every distinct tag in use, sorted.
    pub tags: Vec<String>,
}

/// Aggregate the collection. Upcoming uses the default horizon.
pub fn stats(list: &TaskList, today: Date) -> Stats {
    let total = list.len();
    let done = list.tasks.iter().filter(|t| t.done).count();
    let pending = total - done;

    let completion_pct = if total == 0 {
        0.0
    } else {
        (done as f64 * 1000.0 / total as f64).round() / 10.0
    };

    let mut pending_by_priority = PriorityCounts::default();
    let mut overdue = 0;
    let mut due_today = 0;
    let mut upcoming = 0;
    for task in list.tasks.iter().filter(|t| !t.done) {
        match task.priority {
            Priority::Low => pending_by_priority.low += 1,
            Priority::Medium => pending_by_priority.medium += 1,
            Priority::High => pending_by_priority.high += 1,
        }
        if in_due_window(task, DueWindow::Overdue, today, DEFAULT_UPCOMING_DAYS) {
            overdue += 1;
        }
        if in_due_window(task, DueWindow::Today, today, DEFAULT_UPCOMING_DAYS) {
            due_today += 1;
        }
        if in_due_window(task, DueWindow::Upcoming, today, DEFAULT_UPCOMING_DAYS) {
            upcoming += 1;
        }
    }

    let tags: BTreeSet<String> = list
        .tasks
        .iter()
        .flat_map(|t| t.tags.iter().cloned())
        .collect();

    Stats {
        total,
        done,
        pending,
        completion_pct,
        pending_by_priority,
        overdue,
        due_today,
        upcoming,
        tags: tags.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn draft(title: &str) -> NewTask {
        NewTask::new(title)
    }

    fn ids(tasks: &[&Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn add_assigns_monotonic_ids() {
        let mut list = TaskList::new();
        let a = add(&mut list, draft("first")).unwrap();
        let b = add(&mut list, draft("second")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        delete(&mut list, 1).unwrap();
        let c = add(&mut list, draft("third")).unwrap();
        assert_eq!(c.id, 3);

        let all: Vec<u64> = list.tasks.iter().map(|t| t.id).collect();
        assert_eq!(all, vec![2, 3]);
    }

    #[test]
    fn add_trims_title_and_rejects_empty() {
        let mut list = TaskList::new();
        let task = add(&mut list, draft("  buy milk  ")).unwrap();
        assert_eq!(task.title, "buy milk");

        let err = add(&mut list, draft("   ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn add_collapses_duplicate_tags() {
        let mut list = TaskList::new();
        let mut new = draft("tagged");
        new.tags = vec!["home".into(), "home".into(), "errand".into()];
        let task = add(&mut list, new).unwrap();
        assert_eq!(task.tags, vec!["home", "errand"]);
    }

    #[test]
    fn set_done_couples_completed_at_both_ways() {
        let mut list = TaskList::new();
        add(&mut list, draft("work")).unwrap();

        let task = set_done(&mut list, 1, true).unwrap();
        assert!(task.done && task.completed_at.is_some());

        // Idempotent: already-done stays done and still succeeds.
        let again = set_done(&mut list, 1, true).unwrap();
        assert_eq!(again.completed_at, task.completed_at);

        let reopened = set_done(&mut list, 1, false).unwrap();
        assert!(!reopened.done && reopened.completed_at.is_none());

        assert!(matches!(
            set_done(&mut list, 42, true),
            Err(Error::NotFound(42))
        ));
    }

    #[test]
    fn edit_applies_only_supplied_fields() {
        let mut list = TaskList::new();
        let mut new = draft("draft title");
        new.note = Some("keep me".into());
        add(&mut list, new).unwrap();

        let patch = TaskPatch {
            title: Some("final title".into()),
            priority: Some(Priority::High),
            ..TaskPatch::default()
        };
        let task = edit(&mut list, 1, patch).unwrap();
        assert_eq!(task.title, "final title");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.note.as_deref(), Some("keep me"));
        assert!(!task.done);
    }

    #[test]
    fn edit_rejects_empty_title_without_mutating() {
        let mut list = TaskList::new();
        add(&mut list, draft("original")).unwrap();

        let patch = TaskPatch {
            title: Some("  ".into()),
            priority: Some(Priority::Low),
            ..TaskPatch::default()
        };
        let err = edit(&mut list, 1, patch).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        // Nothing applied, not even the valid priority.
        let task = list.get(1).unwrap();
        assert_eq!(task.title, "original");
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn edit_of_missing_id_is_not_found() {
        let mut list = TaskList::new();
        let err = edit(&mut list, 1, TaskPatch::default()).unwrap_err();
        assert!(matches!(err, Error::NotFound(1)));
    }

    #[test]
    fn set_tags_replaces_and_empty_clears() {
        let mut list = TaskList::new();
        let mut new = draft("tagged");
        new.tags = vec!["old".into()];
        add(&mut list, new).unwrap();

        let task = set_tags(&mut list, 1, vec!["work".into(), "urgent".into()]).unwrap();
        assert_eq!(task.tags, vec!["work", "urgent"]);

        let task = set_tags(&mut list, 1, Vec::new()).unwrap();
        assert!(task.tags.is_empty());
    }

    #[test]
    fn delete_of_missing_id_leaves_collection_unchanged() {
        let mut list = TaskList::new();
        add(&mut list, draft("keep")).unwrap();
        let before = list.clone();

        assert!(matches!(
            delete(&mut list, 999),
            Err(Error::NotFound(999))
        ));
        assert_eq!(list, before);

        let removed = delete(&mut list, 1).unwrap();
        assert_eq!(removed.title, "keep");
        assert!(list.is_empty());
    }

    #[test]
    fn clear_done_only_keeps_pending_with_ids_intact() {
        let mut list = TaskList::new();
        add(&mut list, draft("a")).unwrap();
        add(&mut list, draft("b")).unwrap();
        add(&mut list, draft("c")).unwrap();
        set_done(&mut list, 1, true).unwrap();
        set_done(&mut list, 3, true).unwrap();

        assert_eq!(clear(&mut list, true), 2);
        assert_eq!(list.len(), 1);
        assert_eq!(list.tasks[0].id, 2);

        assert_eq!(clear(&mut list, false), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn archive_moves_done_tasks_and_is_idempotent() {
        let mut list = TaskList::new();
        add(&mut list, draft("pending")).unwrap();
        add(&mut list, draft("finished")).unwrap();
        let completed = set_done(&mut list, 2, true).unwrap();

        let moved = archive(&mut list);
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, 2);
        assert!(moved[0].archived_at.is_some());
        // Original id and timestamps survive the move.
        assert_eq!(moved[0].created_at, completed.created_at);
        assert_eq!(moved[0].completed_at, completed.completed_at);

        // Second call with no new completions archives nothing.
        let before = list.clone();
        assert!(archive(&mut list).is_empty());
        assert_eq!(list, before);
    }

    #[test]
    fn unfiltered_filter_returns_everything_in_id_order() {
        let mut list = TaskList::new();
        add(&mut list, draft("a")).unwrap();
        add(&mut list, draft("b")).unwrap();
        set_done(&mut list, 1, true).unwrap();

        let all = filter(
            &list,
            &TaskFilter {
                include_done: true,
                ..TaskFilter::default()
            },
            date!(2025 - 01 - 15),
        );
        assert_eq!(ids(&all), vec![1, 2]);

        // Default filter hides done tasks.
        let open = filter(&list, &TaskFilter::default(), date!(2025 - 01 - 15));
        assert_eq!(ids(&open), vec![2]);
    }

    #[test]
    fn filter_predicates_are_anded() {
        let mut list = TaskList::new();
        let mut a = draft("pay rent");
        a.tags = vec!["home".into()];
        a.priority = Priority::High;
        add(&mut list, a).unwrap();

        let mut b = draft("mow lawn");
        b.tags = vec!["home".into()];
        add(&mut list, b).unwrap();

        let hits = filter(
            &list,
            &TaskFilter {
                tag: Some("home".into()),
                priority: Some(Priority::High),
                ..TaskFilter::default()
            },
            date!(2025 - 01 - 15),
        );
        assert_eq!(ids(&hits), vec![1]);

        let none = filter(
            &list,
            &TaskFilter {
                tag: Some("work".into()),
                priority: Some(Priority::High),
                ..TaskFilter::default()
            },
            date!(2025 - 01 - 15),
        );
        assert!(none.is_empty());
    }

    #[test]
    fn due_windows_split_on_today_and_horizon() {
        let today = date!(2025 - 01 - 15);
        let mut list = TaskList::new();

        let mut overdue = draft("overdue");
        overdue.due_date = Some(date!(2025 - 01 - 10));
        add(&mut list, overdue).unwrap();

        let mut due_today = draft("due today");
        due_today.due_date = Some(today);
        add(&mut list, due_today).unwrap();

        let mut inside = draft("inside horizon");
        inside.due_date = Some(date!(2025 - 01 - 22)); // today + 7
        add(&mut list, inside).unwrap();

        let mut outside = draft("outside horizon");
        outside.due_date = Some(date!(2025 - 01 - 23)); // today + 8
        add(&mut list, outside).unwrap();

        add(&mut list, draft("no due date")).unwrap();

        let window = |due| TaskFilter {
            due: Some(due),
            ..TaskFilter::default()
        };
        assert_eq!(ids(&filter(&list, &window(DueWindow::Overdue), today)), vec![1]);
        assert_eq!(ids(&filter(&list, &window(DueWindow::Today), today)), vec![2]);
        assert_eq!(ids(&filter(&list, &window(DueWindow::Upcoming), today)), vec![3]);

        // A completed task is never overdue.
        set_done(&mut list, 1, true).unwrap();
        let hits = filter(
            &list,
            &TaskFilter {
                due: Some(DueWindow::Overdue),
                include_done: true,
                ..TaskFilter::default()
            },
            today,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn upcoming_horizon_is_configurable() {
        let today = date!(2025 - 01 - 15);
        let mut list = TaskList::new();
        let mut far = draft("far out");
        far.due_date = Some(date!(2025 - 02 - 01));
        add(&mut list, far).unwrap();

        let near = TaskFilter {
            due: Some(DueWindow::Upcoming),
            ..TaskFilter::default()
        };
        assert!(filter(&list, &near, today).is_empty());

        let wide = TaskFilter {
            due: Some(DueWindow::Upcoming),
            upcoming_days: 30,
            ..TaskFilter::default()
        };
        assert_eq!(ids(&filter(&list, &wide, today)), vec![1]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_note() {
        let mut list = TaskList::new();
        add(&mut list, draft("Write REPORT")).unwrap();
        let mut noted = draft("misc");
        noted.note = Some("attach the report draft".into());
        add(&mut list, noted).unwrap();
        add(&mut list, draft("unrelated")).unwrap();

        let upper = search(&list, "REPORT", false);
        let lower = search(&list, "report", false);
        assert_eq!(ids(&upper), vec![1, 2]);
        assert_eq!(ids(&upper), ids(&lower));

        // Done tasks drop out unless asked for.
        set_done(&mut list, 1, true).unwrap();
        assert_eq!(ids(&search(&list, "report", false)), vec![2]);
        assert_eq!(ids(&search(&list, "report", true)), vec![1, 2]);
    }

    #[test]
    fn stats_counts_overdue_high_priority_task() {
        let mut list = TaskList::new();
        let mut milk = draft("Buy milk");
        milk.priority = Priority::High;
        milk.due_date = Some(date!(2025 - 01 - 10));
        add(&mut list, milk).unwrap();

        let summary = stats(&list, date!(2025 - 01 - 15));
        assert_eq!(summary.total, 1);
        assert_eq!(summary.done, 0);
        assert_eq!(summary.overdue, 1);
        assert_eq!(
            summary.pending_by_priority,
            PriorityCounts {
                high: 1,
                ..PriorityCounts::default()
            }
        );
    }

    #[test]
    fn stats_percentage_is_rounded_to_one_decimal() {
        let mut list = TaskList::new();
        assert_eq!(stats(&list, date!(2025 - 01 - 15)).completion_pct, 0.0);

        add(&mut list, draft("a")).unwrap();
        add(&mut list, draft("b")).unwrap();
        add(&mut list, draft("c")).unwrap();
        set_done(&mut list, 1, true).unwrap();

        // 1/3 = 33.333…% -> 33.3
        let summary = stats(&list, date!(2025 - 01 - 15));
        assert_eq!(summary.completion_pct, 33.3);
        assert_eq!(summary.pending, 2);
    }

    #[test]
    fn stats_collects_sorted_distinct_tags() {
        let mut list = TaskList::new();
        let mut a = draft("a");
        a.tags = vec!["work".into(), "urgent".into()];
        add(&mut list, a).unwrap();
        let mut b = draft("b");
        b.tags = vec!["home".into(), "work".into()];
        add(&mut list, b).unwrap();

        let summary = stats(&list, date!(2025 - 01 - 15));
        assert_eq!(summary.tags, vec!["home", "urgent", "work"]);
    }
}
