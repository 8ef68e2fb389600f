use crate::aggregator::OutputPaths;
use crate::cli::{Cli, VerbosityLevel};
use crate::error::ArchiveStatsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigError> for ArchiveStatsError {
    fn from(err: ConfigError) -> Self {
        ArchiveStatsError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

const MAX_THREADS: usize = 1024;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub processing: ProcessingConfig,
    pub files: FileConfig,
    pub output: OutputConfig,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of archives processed concurrently (None = CPU count)
    pub threads: Option<usize>,
}

/// Archive discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Archive extensions to process
    pub extensions: Vec<String>,
    /// Include patterns (glob syntax)
    pub include_patterns: Vec<String>,
    /// Exclude patterns (glob syntax)
    pub exclude_patterns: Vec<String>,
    /// Search depth below the working directory (None = unlimited)
    pub max_depth: Option<usize>,
    /// Follow symbolic links while searching
    pub follow_symlinks: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Levels table path
    pub levels: PathBuf,
    /// Objects table path
    pub objects: PathBuf,
    pub verbose: bool,
    pub quiet: bool,
    pub debug: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["zip".to_string()],
            include_patterns: vec![],
            exclude_patterns: vec![],
            max_depth: Some(0),
            follow_symlinks: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        let paths = OutputPaths::default();
        Self {
            levels: paths.levels,
            objects: paths.objects,
            verbose: false,
            quiet: false,
            debug: false,
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.output.quiet {
            VerbosityLevel::Quiet
        } else if self.output.debug {
            VerbosityLevel::Debug
        } else if self.output.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            levels: self.output.levels.clone(),
            objects: self.output.objects.clone(),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;

        // CLI arguments have the highest precedence
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "archive-stats.toml",
            "archive-stats.json",
            ".archive-stats.toml",
            ".archive-stats.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("archive-stats");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(threads) = env.get("ARCHIVE_STATS_THREADS") {
            config.processing.threads = Some(threads.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid ARCHIVE_STATS_THREADS value: {}", threads))
            })?);
        }

        if let Some(levels) = env.get("ARCHIVE_STATS_LEVELS") {
            config.output.levels = PathBuf::from(levels);
        }

        if let Some(objects) = env.get("ARCHIVE_STATS_OBJECTS") {
            config.output.objects = PathBuf::from(objects);
        }

        if let Some(extensions) = env.get("ARCHIVE_STATS_EXTENSIONS") {
            config.files.extensions = split_list(&extensions);
        }

        if let Some(verbose) = env.get("ARCHIVE_STATS_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid ARCHIVE_STATS_VERBOSE value: {}", verbose))
            })?;
        }

        if let Some(quiet) = env.get("ARCHIVE_STATS_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid ARCHIVE_STATS_QUIET value: {}", quiet))
            })?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if cli.threads.is_some() {
            config.processing.threads = cli.threads;
        }

        if let Some(extensions) = cli.get_extensions() {
            config.files.extensions = extensions;
        }
        if !cli.include_patterns.is_empty() {
            config.files.include_patterns = cli.include_patterns.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.files.exclude_patterns = cli.exclude_patterns.clone();
        }
        if cli.max_depth.is_some() {
            config.files.max_depth = cli.max_depth;
        }
        if cli.no_follow_symlinks {
            config.files.follow_symlinks = false;
        }

        if let Some(levels) = &cli.levels {
            config.output.levels = levels.clone();
        }
        if let Some(objects) = &cli.objects {
            config.output.objects = objects.clone();
        }

        // Verbosity flags on the command line replace whatever was configured
        if cli.quiet || cli.verbose || cli.debug {
            config.output.quiet = cli.quiet;
            config.output.verbose = cli.verbose;
            config.output.debug = cli.debug;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if override_config.processing.threads.is_some() {
            base.processing.threads = override_config.processing.threads;
        }

        if !override_config.files.extensions.is_empty() {
            base.files.extensions = override_config.files.extensions;
        }
        if !override_config.files.include_patterns.is_empty() {
            base.files.include_patterns = override_config.files.include_patterns;
        }
        if !override_config.files.exclude_patterns.is_empty() {
            base.files.exclude_patterns = override_config.files.exclude_patterns;
        }
        base.files.max_depth = override_config.files.max_depth;
        base.files.follow_symlinks = override_config.files.follow_symlinks;

        base.output = override_config.output;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.processing.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > MAX_THREADS {
                return Err(ConfigError::Validation(format!(
                    "Number of threads cannot exceed {}",
                    MAX_THREADS
                )));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.output.levels == config.output.objects {
            return Err(ConfigError::Validation(format!(
                "Levels and objects outputs must differ: {}",
                config.output.levels.display()
            )));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one archive extension must be specified".to_string(),
            ));
        }

        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid archive extension: {}",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Get the effective worker count
    pub fn get_thread_count(config: &Config) -> usize {
        config.processing.threads.unwrap_or_else(num_cpus::get)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
