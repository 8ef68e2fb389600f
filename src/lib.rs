//! # archive-stats Library
//!
//! Extracts `id`, `level` and object names from XML documents stored in zip
//! archives, processing archives concurrently and writing two flat tables:
//! `id;level` and `id;objectId`.

pub mod aggregator;
pub mod archive;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod file_discovery;
pub mod output;
pub mod pipeline;

pub use aggregator::{Aggregator, OutputPaths, RunSummary, StatsWriter};
pub use archive::{
    ArchiveReader, ArchiveResult, ArchiveStatus, StatusAccumulator, ZipArchiveReader,
    read_archive,
};
pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use dispatcher::{ArchiveResults, DispatchConfig, Dispatcher};
pub use document::{DocumentResult, ExtractError, extract_document};
pub use error::{ArchiveStatsError, DocumentError};
pub use file_discovery::FileDiscovery;
pub use output::Output;
pub use pipeline::{EXIT_FAILURE, EXIT_SUCCESS, Pipeline, exit_code};
