//! tasklite — a tiny local task tracker.
//!
//! The crate splits into a file-backed [`storage::Store`] and a pure
//! [`engine`]. Functions here sit at the command boundary: each performs
//! one load, runs the engine, and saves at most once, which is the whole
//! persistence story for a single CLI invocation.

pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod storage;

pub use error::{Error, Result};

use crate::engine::{NewTask, Stats, TaskFilter};
use crate::model::{Task, TaskPatch, TimeStamp};
use crate::storage::Store;

pub fn add_task(store: &Store, new: NewTask) -> Result<Task> {
    let mut list = store.load_tasks()?;
    let task = engine::add(&mut list, new)?;
    store.save_tasks(&list)?;
    Ok(task)
}

pub fn edit_task(store: &Store, id: u64, patch: TaskPatch) -> Result<Task> {
    let mut list = store.load_tasks()?;
    let task = engine::edit(&mut list, id, patch)?;
    store.save_tasks(&list)?;
    Ok(task)
}

/// Mark a task done or reopen it.
pub fn set_task_done(store: &Store, id: u64, done: bool) -> Result<Task> {
    let mut list = store.load_tasks()?;
    let task = engine::set_done(&mut list, id, done)?;
    store.save_tasks(&list)?;
    Ok(task)
}

/// Replace a task's tag set; no tags clears it.
pub fn set_task_tags(store: &Store, id: u64, tags: Vec<String>) -> Result<Task> {
    let mut list = store.load_tasks()?;
    let task = engine::set_tags(&mut list, id, tags)?;
    store.save_tasks(&list)?;
    Ok(task)
}

/// Remove a task permanently (returns the removed task).
pub fn delete_task(store: &Store, id: u64) -> Result<Task> {
    let mut list = store.load_tasks()?;
    let task = engine::delete(&mut list, id)?;
    store.save_tasks(&list)?;
    Ok(task)
}

/// Remove all tasks, or only the done ones. Returns the removed count.
pub fn clear_tasks(store: &Store, done_only: bool) -> Result<usize> {
    let mut list = store.load_tasks()?;
    let removed = engine::clear(&mut list, done_only);
    if removed > 0 {
        store.save_tasks(&list)?;
    }
    Ok(removed)
}

/// Move done tasks from the active file into the archive file.
/// The archive is written before the trimmed active list, so a crash in
/// between can duplicate a task across the files but never lose one.
pub fn archive_done(store: &Store) -> Result<usize> {
    let mut list = store.load_tasks()?;
    let archived = engine::archive(&mut list);
    if archived.is_empty() {
        return Ok(0);
    }
    let count = archived.len();
    store.append_archive(archived)?;
    store.save_tasks(&list)?;
    Ok(count)
}

/// Tasks matching the filter, ascending by id.
pub fn list_tasks(store: &Store, filter: &TaskFilter) -> Result<Vec<Task>> {
    let list = store.load_tasks()?;
    let today = TimeStamp::now_utc().date();
    Ok(engine::filter(&list, filter, today)
        .into_iter()
        .cloned()
        .collect())
}

pub fn search_tasks(store: &Store, keyword: &str, include_done: bool) -> Result<Vec<Task>> {
    let list = store.load_tasks()?;
    Ok(engine::search(&list, keyword, include_done)
        .into_iter()
        .cloned()
        .collect())
}

pub fn task_stats(store: &Store) -> Result<Stats> {
    let list = store.load_tasks()?;
    Ok(engine::stats(&list, TimeStamp::now_utc().date()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use tempfile::TempDir;

    fn store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("data"));
        (dir, store)
    }

    #[test]
    fn commands_persist_between_invocations() {
        let (_tmp, store) = store();

        let mut new = NewTask::new("buy milk");
        new.priority = Priority::High;
        let task = add_task(&store, new).unwrap();
        assert_eq!(task.id, 1);

        // A fresh load (as the next invocation would do) sees the task.
        let listed = list_tasks(&store, &TaskFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "buy milk");

        set_task_done(&store, 1, true).unwrap();
        assert!(list_tasks(&store, &TaskFilter::default()).unwrap().is_empty());

        let all = TaskFilter {
            include_done: true,
            ..TaskFilter::default()
        };
        assert_eq!(list_tasks(&store, &all).unwrap().len(), 1);
    }

    #[test]
    fn archive_moves_tasks_across_files() {
        let (_tmp, store) = store();
        add_task(&store, NewTask::new("stay")).unwrap();
        add_task(&store, NewTask::new("go")).unwrap();
        set_task_done(&store, 2, true).unwrap();

        assert_eq!(archive_done(&store).unwrap(), 1);
        assert_eq!(store.load_tasks().unwrap().len(), 1);

        let archive = store.load_archive().unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.tasks[0].id, 2);
        assert!(archive.tasks[0].archived_at.is_some());

        // Nothing left to archive; files untouched.
        assert_eq!(archive_done(&store).unwrap(), 0);
        assert_eq!(store.load_archive().unwrap().len(), 1);
    }

    #[test]
    fn failed_mutation_does_not_touch_the_file() {
        let (_tmp, store) = store();
        add_task(&store, NewTask::new("only")).unwrap();
        let before = store.load_tasks().unwrap();

        assert!(matches!(
            delete_task(&store, 999),
            Err(Error::NotFound(999))
        ));
        assert!(matches!(
            edit_task(
                &store,
                1,
                TaskPatch {
                    title: Some(String::new()),
                    ..TaskPatch::default()
                }
            ),
            Err(Error::Validation(_))
        ));
        assert_eq!(store.load_tasks().unwrap(), before);
    }

    #[test]
    fn clear_without_matches_skips_the_save() {
        let (_tmp, store) = store();
        add_task(&store, NewTask::new("pending")).unwrap();
        assert_eq!(clear_tasks(&store, true).unwrap(), 0);
        assert_eq!(clear_tasks(&store, false).unwrap(), 1);
        assert!(store.load_tasks().unwrap().is_empty());
    }
}
