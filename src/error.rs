use std::path::PathBuf;

use thiserror::Error;

/// Run-level error type covering every condition that stops a run
#[derive(Error, Debug)]
pub enum ArchiveStatsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No archives found in {}", path.display())]
    NoArchivesFound { path: PathBuf },

    #[error("Cannot open output {}: {source}", path.display())]
    OutputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Runtime error: {details}")]
    WorkerPool { details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system traversal error: {} - {reason}", path.display())]
    FileSystemTraversal { path: PathBuf, reason: String },
}

/// Recoverable per-archive and per-document diagnostics.
///
/// These never abort a run. Workers render them with `to_string()` and keep
/// the text in their `ArchiveResult`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Cannot open archive {archive}: {details}")]
    ArchiveOpen { archive: String, details: String },

    #[error("XML Parse error at {archive}/{entry}: {details}")]
    Parse {
        archive: String,
        entry: String,
        details: String,
    },

    #[error("Unreadable entry at {archive}/{entry}: {details}")]
    Unreadable {
        archive: String,
        entry: String,
        details: String,
    },

    #[error("Unexpected XML file at {archive}/{entry}")]
    Unexpected { archive: String, entry: String },
}

impl DocumentError {
    /// Whether this diagnostic degrades the owning archive to partial
    pub fn degrades_archive(&self) -> bool {
        matches!(
            self,
            DocumentError::Parse { .. } | DocumentError::Unreadable { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ArchiveStatsError>;
