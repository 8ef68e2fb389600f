//! Parallel dispatcher
//!
//! Every archive becomes one tokio task. A semaphore bounds how many archives
//! are read at once, and the blocking zip/XML work runs on the blocking
//! thread pool. Results come back in completion order through
//! [`ArchiveResults`].

use std::path::PathBuf;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::archive::{ArchiveReader, ArchiveResult, ZipArchiveReader};
use crate::error::{ArchiveStatsError, Result};

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Maximum number of archives processed at the same time
    pub max_concurrent_archives: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_archives: num_cpus::get(),
        }
    }
}

/// Runs an [`ArchiveReader`] over a set of archives with bounded parallelism
pub struct Dispatcher {
    reader: Arc<dyn ArchiveReader>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Dispatcher reading zip archives from disk
    pub fn new(config: DispatchConfig) -> Self {
        Self::with_reader(Arc::new(ZipArchiveReader::new()), config)
    }

    pub fn with_reader(reader: Arc<dyn ArchiveReader>, config: DispatchConfig) -> Self {
        let max_concurrent_archives = config.max_concurrent_archives.max(1);
        Self {
            reader,
            config: DispatchConfig {
                max_concurrent_archives,
            },
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Submit every archive for processing.
    ///
    /// Must be called from within a tokio runtime. Each archive is yielded
    /// exactly once by the returned [`ArchiveResults`].
    pub fn dispatch(&self, archives: Vec<PathBuf>) -> ArchiveResults {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_archives));
        let total = archives.len();
        let mut tasks = JoinSet::new();

        for path in archives {
            let reader = Arc::clone(&self.reader);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|_| {
                    ArchiveStatsError::WorkerPool {
                        details: "worker semaphore closed".to_string(),
                    }
                })?;

                debug!(archive = %path.display(), "Reading archive");
                tokio::task::spawn_blocking(move || reader.read_archive(&path))
                    .await
                    .map_err(|e| ArchiveStatsError::WorkerPool {
                        details: format!("Join error: {}", e),
                    })
            });
        }

        ArchiveResults {
            tasks,
            total,
            completed: 0,
            failed: false,
        }
    }
}

/// Archive results in completion order
pub struct ArchiveResults {
    tasks: JoinSet<Result<ArchiveResult>>,
    total: usize,
    completed: usize,
    failed: bool,
}

impl ArchiveResults {
    /// Wait for the next finished archive.
    ///
    /// A crashed worker yields one `Err(WorkerPool)`; the remaining work is
    /// aborted and every later call returns `None`.
    pub async fn next(&mut self) -> Option<Result<ArchiveResult>> {
        if self.failed {
            return None;
        }

        let joined = self.tasks.join_next().await?;
        let outcome = joined
            .map_err(|e| ArchiveStatsError::WorkerPool {
                details: format!("Task join error: {}", e),
            })
            .and_then(|result| result);

        match outcome {
            Ok(result) => {
                self.completed += 1;
                Some(Ok(result))
            }
            Err(e) => {
                error!(error = %e, "Worker pool failure, aborting remaining archives");
                self.failed = true;
                self.tasks.abort_all();
                Some(Err(e))
            }
        }
    }

    /// Number of archives submitted
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of archives yielded so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Adapt into a `futures::Stream`
    pub fn into_stream(self) -> impl Stream<Item = Result<ArchiveResult>> {
        futures::stream::unfold(self, |mut results| async move {
            let item = results.next().await?;
            Some((item, results))
        })
    }
}
