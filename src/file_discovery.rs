use crate::error::{ArchiveStatsError, Result};
use globset::{GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Async archive discovery in a working directory
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// File extensions to include (e.g., ["zip"])
    extensions: Vec<String>,
    /// Include patterns set
    include_set: Option<GlobSet>,
    /// Exclude patterns set
    exclude_set: Option<GlobSet>,
    /// Maximum depth for directory traversal (None = unlimited)
    max_depth: Option<usize>,
    /// Follow symbolic links
    follow_symlinks: bool,
}

impl FileDiscovery {
    /// Discovery of `*.zip` directly inside the given directory
    pub fn new() -> Self {
        Self {
            extensions: vec!["zip".to_string()],
            include_set: None,
            exclude_set: None,
            max_depth: Some(0),
            follow_symlinks: true,
        }
    }

    /// Set file extensions to discover
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Add include patterns
    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.include_set = build_glob_set(patterns, "include")?;
        Ok(self)
    }

    /// Add exclude patterns
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.exclude_set = build_glob_set(patterns, "exclude")?;
        Ok(self)
    }

    /// Set maximum traversal depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set whether to follow symbolic links
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Discover archives in the given path (file or directory).
    ///
    /// Results follow directory listing order, which is platform dependent.
    /// An empty result is not an error.
    pub async fn discover_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let metadata = fs::metadata(path).await?;

        if metadata.is_file() {
            return if self.should_process(path) {
                Ok(vec![path.to_path_buf()])
            } else {
                Ok(Vec::new())
            };
        }

        if !metadata.is_dir() {
            return Err(ArchiveStatsError::FileSystemTraversal {
                path: path.to_path_buf(),
                reason: "not a file or directory".to_string(),
            });
        }

        let mut files = Vec::new();
        let mut read_dir = fs::read_dir(path).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            let entry_path = entry.path();

            if entry_path.is_symlink() && !self.follow_symlinks {
                continue;
            }

            // Files in the root directory are at depth 0
            if let Err(e) = self
                .discover_files_recursive(&entry_path, 0, &mut files)
                .await
            {
                warn!(path = %entry_path.display(), error = %e, "Skipping unreadable entry");
            }
        }

        Ok(files)
    }

    /// Recursive helper for discovering files
    fn discover_files_recursive<'a>(
        &'a self,
        path: &'a Path,
        depth: usize,
        files: &'a mut Vec<PathBuf>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(max_depth) = self.max_depth
                && depth > max_depth
            {
                return Ok(());
            }

            let metadata = fs::metadata(path).await?;

            if metadata.is_file() {
                if self.should_process(path) {
                    files.push(path.to_path_buf());
                }
            } else if metadata.is_dir() {
                if let Some(max_depth) = self.max_depth
                    && depth >= max_depth
                {
                    return Ok(());
                }

                let mut read_dir = fs::read_dir(path).await?;

                while let Some(entry) = read_dir.next_entry().await? {
                    let entry_path = entry.path();

                    if entry_path.is_symlink() && !self.follow_symlinks {
                        continue;
                    }

                    if let Err(e) = self
                        .discover_files_recursive(&entry_path, depth + 1, files)
                        .await
                    {
                        warn!(path = %entry_path.display(), error = %e, "Skipping unreadable entry");
                    }
                }
            }

            Ok(())
        })
    }

    /// Check if a file should be processed based on extensions and patterns
    pub fn should_process(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(extension) if self.extensions.contains(&extension.to_lowercase()) => {}
            _ => return false,
        }

        if let Some(exclude_set) = &self.exclude_set
            && exclude_set.is_match(path)
        {
            return false;
        }

        // If any include patterns are given, at least one must match
        if let Some(include_set) = &self.include_set {
            return include_set.is_match(path);
        }

        true
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn build_glob_set(patterns: Vec<String>, kind: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                ArchiveStatsError::Config(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
        builder.add(glob);
    }

    let set = builder.build().map_err(|e| {
        ArchiveStatsError::Config(format!("Failed to build {} glob set: {}", kind, e))
    })?;
    Ok(Some(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;
    use tokio::fs;

    async fn create_test_directory() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("nested/deeper")).await.unwrap();

        fs::write(root.join("archive_0.zip"), b"").await.unwrap();
        fs::write(root.join("archive_1.ZIP"), b"").await.unwrap();
        fs::write(root.join("notes.txt"), "text file").await.unwrap();
        fs::write(root.join("archive_2.zip.bak"), b"").await.unwrap();
        fs::write(root.join("nested/archive_3.zip"), b"").await.unwrap();
        fs::write(root.join("nested/deeper/archive_4.zip"), b"")
            .await
            .unwrap();

        temp_dir
    }

    fn names(files: &[PathBuf]) -> HashSet<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_discover_archives_in_working_directory() {
        let temp_dir = create_test_directory().await;
        let discovery = FileDiscovery::new();

        let files = discovery.discover_files(temp_dir.path()).await.unwrap();

        assert_eq!(files.len(), 2);
        let found = names(&files);
        assert!(found.contains("archive_0.zip"));
        assert!(found.contains("archive_1.ZIP"));
    }

    #[tokio::test]
    async fn test_unlimited_depth() {
        let temp_dir = create_test_directory().await;
        let discovery = FileDiscovery::new().with_max_depth(None);

        let files = discovery.discover_files(temp_dir.path()).await.unwrap();

        assert_eq!(files.len(), 4);
        assert!(names(&files).contains("archive_4.zip"));
    }

    #[tokio::test]
    async fn test_max_depth_limit() {
        let temp_dir = create_test_directory().await;
        let discovery = FileDiscovery::new().with_max_depth(Some(1));

        let files = discovery.discover_files(temp_dir.path()).await.unwrap();

        // Depth 0: archive_0, archive_1. Depth 1: nested/archive_3.
        assert_eq!(files.len(), 3);
        assert!(!names(&files).contains("archive_4.zip"));
    }

    #[tokio::test]
    async fn test_empty_directory_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let files = FileDiscovery::new()
            .discover_files(temp_dir.path())
            .await
            .unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_exclude_patterns() {
        let temp_dir = create_test_directory().await;
        let discovery = FileDiscovery::new()
            .with_exclude_patterns(vec!["**/archive_0.zip".to_string()])
            .unwrap();

        let files = discovery.discover_files(temp_dir.path()).await.unwrap();

        assert_eq!(names(&files), HashSet::from(["archive_1.ZIP".to_string()]));
    }

    #[tokio::test]
    async fn test_include_patterns() {
        let temp_dir = create_test_directory().await;
        let discovery = FileDiscovery::new()
            .with_max_depth(None)
            .with_include_patterns(vec!["**/nested/**".to_string()])
            .unwrap();

        let files = discovery.discover_files(temp_dir.path()).await.unwrap();

        let found = names(&files);
        assert_eq!(found.len(), 2);
        assert!(found.contains("archive_3.zip"));
        assert!(found.contains("archive_4.zip"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = FileDiscovery::new().with_include_patterns(vec!["[unclosed".to_string()]);
        assert!(matches!(result, Err(ArchiveStatsError::Config(_))));
    }

    #[test]
    fn test_should_process() {
        let discovery = FileDiscovery::new();

        assert!(discovery.should_process(Path::new("archive.zip")));
        assert!(discovery.should_process(Path::new("ARCHIVE.Zip")));
        assert!(!discovery.should_process(Path::new("archive.xml")));
        assert!(!discovery.should_process(Path::new("zip")));

        let custom = FileDiscovery::new().with_extensions(vec![".jar".to_string()]);
        assert!(custom.should_process(Path::new("lib.jar")));
        assert!(!custom.should_process(Path::new("lib.zip")));
    }

    #[tokio::test]
    async fn test_single_file_path() {
        let temp_dir = create_test_directory().await;
        let discovery = FileDiscovery::new();

        let archive = temp_dir.path().join("archive_0.zip");
        assert_eq!(discovery.discover_files(&archive).await.unwrap(), vec![archive]);

        let text = temp_dir.path().join("notes.txt");
        assert!(discovery.discover_files(&text).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_archives_can_be_skipped() {
        let temp_dir = create_test_directory().await;
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("archive_0.zip"), root.join("linked.zip")).unwrap();

        let followed = FileDiscovery::new().discover_files(root).await.unwrap();
        assert!(names(&followed).contains("linked.zip"));

        let skipped = FileDiscovery::new()
            .with_follow_symlinks(false)
            .discover_files(root)
            .await
            .unwrap();
        assert!(!names(&skipped).contains("linked.zip"));
        assert!(names(&skipped).contains("archive_0.zip"));
    }

    #[tokio::test]
    async fn test_nonexistent_directory() {
        let result = FileDiscovery::new()
            .discover_files(Path::new("/nonexistent/path"))
            .await;

        assert!(matches!(result, Err(ArchiveStatsError::Io(_))));
    }
}
