use std::path::PathBuf;

use thiserror::Error;

/// Everything the core can fail with. The CLI decides how to print these;
/// nothing below `main` catches or retries.
#[derive(Debug, Error)]
pub enum Error {
    /// User input failed validation (bad priority, bad date, empty title).
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced task id does not exist in the collection.
    #[error("no such task: {0}")]
    NotFound(u64),

    /// A data file exists but is not parseable. The file is left untouched
    /// so it can be inspected or restored by hand.
    #[error(
        "task file {} is corrupt ({source}); inspect or restore it manually, it was not modified",
        .path.display()
    )]
    CorruptData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A read, write, or rename failed. No partial state was committed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
