// --- Atomic JSON persistence for the active and archive collections ---

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::model::{Task, TaskList, TimeStamp};

const TASKS_FILE: &str = "tasks.json";
const ARCHIVE_FILE: &str = "archive.json";
const DISABLED_MARKER: &str = ".disabled";

/// Contents of the disabled marker, kept for reference when re-enabling.
#[derive(Debug, Deserialize, Serialize)]
struct DisabledMarker {
    #[serde(with = "time::serde::rfc3339")]
    disabled_at: TimeStamp,
    reason: String,
}

/// Owns the data directory holding the two task files and the marker.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.tasklite` unless overridden on the command line.
    pub fn default_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".tasklite"))
            .ok_or_else(|| {
                Error::io(
                    "locating home directory",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory"),
                )
            })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.dir.join(TASKS_FILE)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(ARCHIVE_FILE)
    }

    pub fn load_tasks(&self) -> Result<TaskList> {
        load_list(&self.tasks_path())
    }

    pub fn load_archive(&self) -> Result<TaskList> {
        load_list(&self.archive_path())
    }

    pub fn save_tasks(&self, list: &TaskList) -> Result<()> {
        self.ensure_dir()?;
        atomic_write(&self.tasks_path(), list)
    }

    pub fn save_archive(&self, list: &TaskList) -> Result<()> {
        self.ensure_dir()?;
        atomic_write(&self.archive_path(), list)
    }

    /// Merge tasks into the archive file, preserving their ids and
    /// timestamps. Existing archive entries stay in place.
    pub fn append_archive(&self, tasks: Vec<Task>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let mut archive = self.load_archive()?;
        archive.tasks.extend(tasks);
        self.save_archive(&archive)
    }

    // --- Lifecycle helpers ---

    fn marker_path(&self) -> PathBuf {
        self.dir.join(DISABLED_MARKER)
    }

    pub fn is_disabled(&self) -> bool {
        self.marker_path().exists()
    }

    pub fn disable(&self, reason: Option<&str>) -> Result<()> {
        self.ensure_dir()?;
        let marker = DisabledMarker {
            disabled_at: TimeStamp::now_utc(),
            reason: reason.unwrap_or("manually disabled").to_string(),
        };
        atomic_write(&self.marker_path(), &marker)
    }

    pub fn enable(&self) -> Result<()> {
        let path = self.marker_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("removing {}", path.display()), e)),
        }
    }

    /// Delete the whole data directory, tasks and archive included.
    pub fn uninstall(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("removing {}", self.dir.display()), e)),
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::io(format!("creating {}", self.dir.display()), e))
    }
}

/// A missing file is an empty collection; an unreadable or unparseable one
/// is an error the caller must see, never "no tasks".
fn load_list(path: &Path) -> Result<TaskList> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TaskList::new()),
        Err(e) => return Err(Error::io(format!("reading {}", path.display()), e)),
    };

    serde_json::from_slice(&bytes).map_err(|source| Error::CorruptData {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically replace `path` with the JSON form of `value`: write into a
/// temp file in the same directory, flush, fsync, then rename over the
/// target. A crash mid-write leaves the previous file intact.
fn atomic_write<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::io(format!("creating temp file in {}", dir.display()), e))?;

    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| {
        Error::io(
            format!("serializing {}", path.display()),
            std::io::Error::other(e),
        )
    })?;

    // push os buffers, then make sure the bytes hit the disk
    tmp.flush()
        .map_err(|e| Error::io(format!("flushing {}", path.display()), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io(format!("syncing {}", path.display()), e))?;

    tmp.persist(path)
        .map_err(|e| Error::io(format!("replacing {}", path.display()), e.error))?;

    Ok(())
}
