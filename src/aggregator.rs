//! Aggregation of archive results into the two output tables
//!
//! The aggregator is the only component writing output. It consumes archive
//! results in completion order, so row order across archives is not stable
//! between runs; rows of one document are always written together.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::archive::{ArchiveResult, ArchiveStatus};
use crate::dispatcher::Dispatcher;
use crate::document::DocumentResult;
use crate::error::{ArchiveStatsError, Result};

/// Locations of the two output tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    /// `id;level` rows
    pub levels: PathBuf,
    /// `id;objectId` rows
    pub objects: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            levels: PathBuf::from("levels.csv"),
            objects: PathBuf::from("objects.csv"),
        }
    }
}

/// Writes level and object rows to two sinks
pub struct StatsWriter<L, O> {
    levels: BufWriter<L>,
    objects: BufWriter<O>,
    level_rows: usize,
    object_rows: usize,
}

impl<L, O> StatsWriter<L, O>
where
    L: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    pub fn new(levels: L, objects: O) -> Self {
        Self {
            levels: BufWriter::new(levels),
            objects: BufWriter::new(objects),
            level_rows: 0,
            object_rows: 0,
        }
    }

    /// Write the `id;level` row of a document.
    ///
    /// Only valid documents reach this point; fields are never absent.
    pub async fn write_level(&mut self, document: &DocumentResult) -> std::io::Result<()> {
        let id = document.id.as_deref().unwrap_or_default();
        let level = document.level.as_deref().unwrap_or_default();

        self.levels
            .write_all(format!("{};{}\n", id, level).as_bytes())
            .await?;
        self.level_rows += 1;
        Ok(())
    }

    /// Write one `id;objectId` row per object of a document
    pub async fn write_objects(&mut self, document: &DocumentResult) -> std::io::Result<()> {
        let id = document.id.as_deref().unwrap_or_default();

        for object_id in &document.object_ids {
            self.objects
                .write_all(format!("{};{}\n", id, object_id).as_bytes())
                .await?;
            self.object_rows += 1;
        }
        Ok(())
    }

    pub fn level_rows(&self) -> usize {
        self.level_rows
    }

    pub fn object_rows(&self) -> usize {
        self.object_rows
    }

    pub async fn flush_levels(&mut self) -> std::io::Result<()> {
        self.levels.flush().await
    }

    pub async fn flush_objects(&mut self) -> std::io::Result<()> {
        self.objects.flush().await
    }

    /// Hand back both sinks; unflushed rows are lost
    pub fn into_inner(self) -> (L, O) {
        (self.levels.into_inner(), self.objects.into_inner())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_archives: usize,
    pub successful_archives: usize,
    pub partial_archives: usize,
    pub failed_archives: usize,
    /// Rows written to the levels table
    pub documents_written: usize,
    /// Rows written to the objects table
    pub object_rows_written: usize,
    /// Diagnostics of every archive that did not fully succeed
    pub errors: Vec<String>,
    pub discovery_duration: Duration,
    pub processing_duration: Duration,
    pub total_duration: Duration,
    pub concurrent_archives: usize,
}

impl RunSummary {
    /// Fold one archive result into the counters and error list
    pub fn record(&mut self, result: &ArchiveResult) {
        self.total_archives += 1;
        match result.status {
            ArchiveStatus::Success => self.successful_archives += 1,
            ArchiveStatus::Partial => self.partial_archives += 1,
            ArchiveStatus::Error => self.failed_archives += 1,
        }

        if !result.status.is_success() {
            self.errors.extend(result.errors.iter().cloned());
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All diagnostics, one per line
    pub fn message(&self) -> String {
        self.errors.join("\n")
    }

    /// Archives processed per second
    pub fn throughput(&self) -> f64 {
        let secs = self.processing_duration.as_secs_f64();
        if secs > 0.0 {
            self.total_archives as f64 / secs
        } else {
            0.0
        }
    }
}

/// Consumes dispatcher results and writes the output tables
pub struct Aggregator {
    outputs: OutputPaths,
}

impl Aggregator {
    pub fn new(outputs: OutputPaths) -> Self {
        Self { outputs }
    }

    /// Process `archives` and write both tables.
    ///
    /// `source` only names the searched location in the "no archives" error.
    /// Nothing is created when `archives` is empty.
    pub async fn run(
        &self,
        source: &Path,
        archives: Vec<PathBuf>,
        dispatcher: &Dispatcher,
    ) -> Result<RunSummary> {
        if archives.is_empty() {
            return Err(ArchiveStatsError::NoArchivesFound {
                path: source.to_path_buf(),
            });
        }

        let levels = create_output(&self.outputs.levels).await?;
        let objects = create_output(&self.outputs.objects).await?;
        let mut writer = StatsWriter::new(levels, objects);

        let start = Instant::now();
        let mut summary = RunSummary {
            concurrent_archives: dispatcher.config().max_concurrent_archives,
            ..RunSummary::default()
        };

        let mut results = dispatcher.dispatch(archives);
        while let Some(outcome) = results.next().await {
            let result = outcome?;
            debug!(
                archive = %result.path.display(),
                status = ?result.status,
                documents = result.document_results.len(),
                "Archive finished"
            );

            summary.record(&result);
            for document in &result.document_results {
                writer
                    .write_level(document)
                    .await
                    .map_err(|e| write_error(&self.outputs.levels, e))?;
                writer
                    .write_objects(document)
                    .await
                    .map_err(|e| write_error(&self.outputs.objects, e))?;
            }
        }

        summary.documents_written = writer.level_rows();
        summary.object_rows_written = writer.object_rows();
        writer
            .flush_levels()
            .await
            .map_err(|e| write_error(&self.outputs.levels, e))?;
        writer
            .flush_objects()
            .await
            .map_err(|e| write_error(&self.outputs.objects, e))?;
        summary.processing_duration = start.elapsed();

        info!(
            archives = summary.total_archives,
            partial = summary.partial_archives,
            failed = summary.failed_archives,
            documents = summary.documents_written,
            "Aggregation completed"
        );

        Ok(summary)
    }
}

fn write_error(path: &Path, source: std::io::Error) -> ArchiveStatsError {
    ArchiveStatsError::OutputUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

async fn create_output(path: &Path) -> Result<File> {
    File::create(path)
        .await
        .map_err(|source| ArchiveStatsError::OutputUnavailable {
            path: path.to_path_buf(),
            source,
        })
}
