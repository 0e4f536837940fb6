use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants;
use crate::models::FileHandle;
use crate::utils::ContextureError;

/// Configuration for project file enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Maximum file size to consider (in bytes)
    pub max_file_size: usize,
    /// File extensions treated as source files
    pub source_extensions: Vec<String>,
    /// Include hidden files (dotfiles) in the walk
    pub include_hidden: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: constants::DEFAULT_MAX_FILE_SIZE,
            source_extensions: constants::DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            include_hidden: false,
        }
    }
}

/// Enumerates candidate project files for an assembly run.
///
/// Convenience collaborator only: callers are free to supply their own
/// `FileHandle` list and skip this entirely. The walk respects .gitignore
/// and the standard ignore files via the `ignore` crate.
pub struct ProjectScanner {
    config: LoaderConfig,
}

impl ProjectScanner {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Collect candidate files under `root`, sorted by relative path for
    /// deterministic downstream behavior.
    pub fn scan(&self, root: &Path) -> Result<Vec<FileHandle>, ContextureError> {
        if !root.is_dir() {
            return Err(ContextureError::InvalidInput(format!(
                "workspace root is not a directory: {}",
                root.display()
            )));
        }

        let walker = WalkBuilder::new(root)
            .standard_filters(true) // Respect .gitignore, .ignore, etc.
            .hidden(!self.config.include_hidden)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false) // Honor ignore files outside git checkouts too
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() || !self.has_source_extension(path) {
                continue;
            }

            if let Ok(metadata) = fs::metadata(path) {
                if metadata.len() > self.config.max_file_size as u64 {
                    continue;
                }
            }

            files.push(FileHandle::new(path.to_path_buf(), root));
        }

        files.sort();
        Ok(files)
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.config.source_extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

impl Default for ProjectScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        write!(file, "{content}").unwrap();
    }

    #[test]
    fn scan_collects_source_files_sorted() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "src/main.rs", "fn main() {}");
        write_file(temp_dir.path(), "src/app.ts", "export {};");
        write_file(temp_dir.path(), "notes.txt", "not source");

        let scanner = ProjectScanner::new();
        let files = scanner.scan(temp_dir.path()).unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.relative_path()).collect();
        assert_eq!(paths, vec!["src/app.ts", "src/main.rs"]);
    }

    #[test]
    fn scan_respects_gitignore() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), ".gitignore", "generated/\n");
        write_file(temp_dir.path(), "src/lib.rs", "pub fn f() {}");
        write_file(temp_dir.path(), "generated/out.rs", "pub fn g() {}");

        let scanner = ProjectScanner::new();
        let files = scanner.scan(temp_dir.path()).unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.relative_path()).collect();
        assert_eq!(paths, vec!["src/lib.rs"]);
    }

    #[test]
    fn scan_rejects_missing_root() {
        let scanner = ProjectScanner::new();
        let err = scanner
            .scan(Path::new("/definitely/not/a/directory"))
            .unwrap_err();
        assert!(matches!(err, ContextureError::InvalidInput(_)));
    }

    #[test]
    fn scan_skips_oversized_files() {
        let temp_dir = TempDir::new().unwrap();
        write_file(temp_dir.path(), "big.rs", &"x".repeat(64));
        write_file(temp_dir.path(), "small.rs", "fn s() {}");

        let scanner = ProjectScanner::with_config(LoaderConfig {
            max_file_size: 32,
            ..LoaderConfig::default()
        });
        let files = scanner.scan(temp_dir.path()).unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.relative_path()).collect();
        assert_eq!(paths, vec!["small.rs"]);
    }
}
