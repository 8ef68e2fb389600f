//! End-to-end run: discover archives, dispatch them to workers and aggregate
//! the results into the output tables.

use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::aggregator::{Aggregator, RunSummary};
use crate::config::{Config, ConfigManager};
use crate::dispatcher::{DispatchConfig, Dispatcher};
use crate::error::Result;
use crate::file_discovery::FileDiscovery;

/// Exit code of a run that completed, possibly with recorded diagnostics
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code of a run that could not complete
pub const EXIT_FAILURE: u8 = 1;

pub struct Pipeline {
    path: PathBuf,
    discovery: FileDiscovery,
    dispatcher: Dispatcher,
    aggregator: Aggregator,
}

impl Pipeline {
    /// Build a pipeline over `path` from a loaded configuration
    pub fn new(path: impl Into<PathBuf>, config: &Config) -> Result<Self> {
        let discovery = FileDiscovery::new()
            .with_extensions(config.files.extensions.clone())
            .with_max_depth(config.files.max_depth)
            .with_follow_symlinks(config.files.follow_symlinks)
            .with_include_patterns(config.files.include_patterns.clone())?
            .with_exclude_patterns(config.files.exclude_patterns.clone())?;

        let dispatcher = Dispatcher::new(DispatchConfig {
            max_concurrent_archives: ConfigManager::get_thread_count(config),
        });

        Ok(Self::from_parts(
            path,
            discovery,
            dispatcher,
            Aggregator::new(config.output_paths()),
        ))
    }

    pub fn from_parts(
        path: impl Into<PathBuf>,
        discovery: FileDiscovery,
        dispatcher: Dispatcher,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            path: path.into(),
            discovery,
            dispatcher,
            aggregator,
        }
    }

    /// Run all phases
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();

        info!(path = %self.path.display(), "Starting archive discovery");
        let archives = self.discovery.discover_files(&self.path).await?;
        let discovery_duration = start.elapsed();
        info!(
            archives = archives.len(),
            duration_ms = discovery_duration.as_millis() as u64,
            "Discovery completed"
        );

        let mut summary = self
            .aggregator
            .run(&self.path, archives, &self.dispatcher)
            .await?;

        summary.discovery_duration = discovery_duration;
        summary.total_duration = start.elapsed();
        info!(
            duration_ms = summary.total_duration.as_millis() as u64,
            errors = summary.errors.len(),
            "Run completed"
        );

        Ok(summary)
    }
}

/// Map a run outcome to the process exit code
pub fn exit_code(outcome: &Result<RunSummary>) -> u8 {
    match outcome {
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveStatsError;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.output.levels = dir.path().join("out-levels.csv");
        config.output.objects = dir.path().join("out-objects.csv");
        config.processing.threads = Some(2);
        config
    }

    #[tokio::test]
    async fn test_empty_directory_is_fatal() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let config = config_for(&out);

        let pipeline = Pipeline::new(input.path(), &config).unwrap();
        let outcome = pipeline.run().await;

        assert!(matches!(
            outcome,
            Err(ArchiveStatsError::NoArchivesFound { .. })
        ));
        assert_eq!(exit_code(&outcome), EXIT_FAILURE);
        assert!(!config.output.levels.exists());
        assert!(!config.output.objects.exists());
    }

    #[tokio::test]
    async fn test_unreadable_archive_still_exits_zero() {
        let input = TempDir::new().unwrap();
        std::fs::write(input.path().join("archive_0bytes.zip"), b"").unwrap();
        let out = TempDir::new().unwrap();
        let config = config_for(&out);

        let outcome = Pipeline::new(input.path(), &config).unwrap().run().await;

        assert_eq!(exit_code(&outcome), EXIT_SUCCESS);
        let summary = outcome.unwrap();
        assert_eq!(summary.failed_archives, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(std::fs::read_to_string(&config.output.levels).unwrap(), "");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut config = Config::default();
        config.files.include_patterns = vec!["[".to_string()];

        assert!(matches!(
            Pipeline::new(".", &config),
            Err(ArchiveStatsError::Config(_))
        ));
    }
}
