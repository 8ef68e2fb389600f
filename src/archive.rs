//! Archive worker
//!
//! Opens one archive, runs the document extractor over every entry and folds
//! the outcomes into a single [`ArchiveResult`]. Nothing here is shared
//! between archives, so any number of workers can run side by side.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::document::{DocumentResult, extract_document};
use crate::error::DocumentError;

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_ENTRY_PREALLOCATION: u64 = 8 * 1024 * 1024;

/// Outcome of processing a whole archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveStatus {
    /// Every entry parsed
    Success,
    /// The archive opened but at least one entry failed to parse
    Partial,
    /// The archive could not be opened
    Error,
}

impl ArchiveStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ArchiveStatus::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ArchiveStatus::Error)
    }
}

/// Result of processing a single archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveResult {
    /// Path to the archive
    pub path: PathBuf,
    pub status: ArchiveStatus,
    /// Valid documents, in archive entry order
    pub document_results: Vec<DocumentResult>,
    /// Diagnostics gathered while processing this archive
    pub errors: Vec<String>,
}

impl ArchiveResult {
    /// Result for an archive that could not be opened
    pub fn open_failed(path: PathBuf, error: DocumentError) -> Self {
        Self {
            path,
            status: ArchiveStatus::Error,
            document_results: Vec::new(),
            errors: vec![error.to_string()],
        }
    }
}

/// Folds per-entry outcomes of an opened archive into its final status.
///
/// Only parse failures (and unreadable entries) move the archive to
/// `Partial`. Documents that parse but miss a required field are recorded as
/// diagnostics and dropped, while the status stays `Success`.
#[derive(Debug, Default)]
pub struct StatusAccumulator {
    documents: Vec<DocumentResult>,
    errors: Vec<String>,
    parse_failures: usize,
}

impl StatusAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_document(&mut self, document: DocumentResult) {
        self.documents.push(document);
    }

    pub fn record_error(&mut self, error: DocumentError) {
        if error.degrades_archive() {
            self.parse_failures += 1;
        }
        self.errors.push(error.to_string());
    }

    pub fn status(&self) -> ArchiveStatus {
        if self.parse_failures > 0 {
            ArchiveStatus::Partial
        } else {
            ArchiveStatus::Success
        }
    }

    pub fn finish(self, path: PathBuf) -> ArchiveResult {
        let status = self.status();
        ArchiveResult {
            path,
            status,
            document_results: self.documents,
            errors: self.errors,
        }
    }
}

/// Turns an archive on disk into an [`ArchiveResult`]
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveReader: Send + Sync {
    fn read_archive(&self, path: &Path) -> ArchiveResult;
}

/// Reads zip archives from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ZipArchiveReader {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveReader for ZipArchiveReader {
    fn read_archive(&self, path: &Path) -> ArchiveResult {
        read_archive(path)
    }
}

/// Process one zip archive.
///
/// Never fails: open errors yield an `Error` result, entry errors are
/// recorded in the result.
pub fn read_archive(path: &Path) -> ArchiveResult {
    let archive_name = path.display().to_string();

    let mut archive = match open_zip(path) {
        Ok(archive) => archive,
        Err(details) => {
            warn!(archive = %archive_name, error = %details, "Cannot open archive");
            return ArchiveResult::open_failed(
                path.to_path_buf(),
                DocumentError::ArchiveOpen {
                    archive: archive_name,
                    details,
                },
            );
        }
    };

    let mut accumulator = StatusAccumulator::new();

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                accumulator.record_error(DocumentError::Unreadable {
                    archive: archive_name.clone(),
                    entry: format!("#{}", index),
                    details: e.to_string(),
                });
                continue;
            }
        };

        if entry.is_dir() {
            continue;
        }

        let entry_name = entry.name().to_string();
        // The declared size comes from the archive itself and may be corrupt
        let mut data = Vec::with_capacity(entry.size().min(MAX_ENTRY_PREALLOCATION) as usize);
        if let Err(e) = entry.read_to_end(&mut data) {
            accumulator.record_error(DocumentError::Unreadable {
                archive: archive_name.clone(),
                entry: entry_name,
                details: e.to_string(),
            });
            continue;
        }

        match extract_document(&entry_name, &data) {
            Ok(document) if document.is_valid() => accumulator.record_document(document),
            Ok(_) => {
                debug!(archive = %archive_name, entry = %entry_name, "Unexpected XML file");
                accumulator.record_error(DocumentError::Unexpected {
                    archive: archive_name.clone(),
                    entry: entry_name,
                });
            }
            Err(e) => {
                debug!(archive = %archive_name, entry = %entry_name, error = %e, "XML parse error");
                accumulator.record_error(DocumentError::Parse {
                    archive: archive_name.clone(),
                    entry: entry_name,
                    details: e.to_string(),
                });
            }
        }
    }

    accumulator.finish(path.to_path_buf())
}

fn open_zip(path: &Path) -> Result<ZipArchive<BufReader<File>>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| e.to_string())
}
