use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show diagnostics and fatal errors
    Quiet,
    /// Show diagnostics and warnings
    #[default]
    Normal,
    /// Show a run summary
    Verbose,
    /// Show everything, including timings
    Debug,
}

/// Extract id/level/object tables from directories of zipped XML documents
#[derive(Parser, Debug, Clone)]
#[command(name = "archive-stats")]
#[command(
    about = "Extract id/level and id/object tables from zip archives of XML documents"
)]
#[command(version)]
pub struct Cli {
    /// Directory to scan for archives
    #[arg(default_value = ".", help = "Where to look for archives")]
    pub path: PathBuf,

    /// Number of archives processed concurrently
    #[arg(
        short = 't',
        long = "threads",
        visible_alias = "cpu",
        help = "Number of archives processed concurrently (default: CPU count)"
    )]
    pub threads: Option<usize>,

    /// Output file for `id;level` rows
    #[arg(long = "levels", help = "Levels table output [default: levels.csv]")]
    pub levels: Option<PathBuf>,

    /// Output file for `id;objectId` rows
    #[arg(long = "objects", help = "Objects table output [default: objects.csv]")]
    pub objects: Option<PathBuf>,

    /// Archive extensions to process (comma-separated)
    #[arg(
        short = 'e',
        long = "extensions",
        help = "Archive extensions to process (e.g., 'zip,jar') [default: zip]"
    )]
    pub extensions: Option<String>,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Directory depth to search below the working directory
    #[arg(long = "max-depth", help = "Search depth below the directory [default: 0]")]
    pub max_depth: Option<usize>,

    /// Skip symbolic links while searching
    #[arg(long = "no-follow-symlinks")]
    pub no_follow_symlinks: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with_all = ["verbose", "debug"]
    )]
    pub quiet: bool,

    /// Enable debug output
    #[arg(long = "debug", help = "Debug output, including timings")]
    pub debug: bool,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn get_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_ref().map(|extensions| {
            extensions
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Err(format!("Directory does not exist: {}", self.path.display()));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }
}
