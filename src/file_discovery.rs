use crate::error::{Result, ValidationError};
use crate::task::FileTask;
use glob::{MatchOptions, Pattern};
use log::warn;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Extension searched for when a directory is given instead of a pattern
const DIRECTORY_GLOB: &str = "**/*.html";

/// Expands file patterns into validation tasks.
///
/// Patterns are processed in order. A pattern containing glob syntax is
/// expanded; a literal directory is searched for `.html` files; any other
/// literal path is kept if it exists and reported missing otherwise. Patterns
/// starting with `!` exclude matching paths from the result.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Suffix that marks a file as a template fragment
    template_suffix: String,
    /// Exclude patterns, from `!`-prefixed entries
    exclude_set: Vec<Pattern>,
}

/// Outcome of expanding a pattern list
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    /// Tasks for every existing file, in first-seen order
    pub tasks: Vec<FileTask>,
    /// Literal paths that do not exist
    pub missing: Vec<PathBuf>,
}

impl Discovery {
    pub fn stats(&self) -> DiscoveryStats {
        DiscoveryStats {
            files_found: self.tasks.len(),
            templates: self.tasks.iter().filter(|t| t.is_template).count(),
            missing: self.missing.len(),
        }
    }
}

/// Statistics about a discovery run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub files_found: usize,
    pub templates: usize,
    pub missing: usize,
}

impl FileDiscovery {
    /// Create a new FileDiscovery instance
    pub fn new(template_suffix: impl Into<String>) -> Self {
        Self {
            template_suffix: template_suffix.into(),
            exclude_set: Vec::new(),
        }
    }

    /// Add exclude patterns (glob syntax, without the leading `!`)
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        for pattern in patterns {
            let compiled = Pattern::new(pattern).map_err(|e| ValidationError::Pattern {
                pattern: pattern.clone(),
                details: e.to_string(),
            })?;
            self.exclude_set.push(compiled);
        }
        Ok(self)
    }

    /// Expand `patterns` into tasks; missing literal paths are warned about and skipped
    pub async fn discover(&self, patterns: &[String]) -> Result<Discovery> {
        let (excludes, includes): (Vec<&String>, Vec<&String>) =
            patterns.iter().partition(|p| p.starts_with('!'));
        let excludes: Vec<String> = excludes
            .iter()
            .filter_map(|p| p.strip_prefix('!'))
            .map(str::to_string)
            .collect();
        let discovery = self.clone().with_exclude_patterns(&excludes)?;

        let mut seen = HashSet::new();
        let mut result = Discovery::default();

        for pattern in includes {
            for path in discovery.expand(pattern, &mut result.missing).await? {
                if discovery.is_excluded(&path) || !seen.insert(path.clone()) {
                    continue;
                }
                result
                    .tasks
                    .push(FileTask::from_path(&path, &discovery.template_suffix));
            }
        }

        Ok(result)
    }

    async fn expand(&self, pattern: &str, missing: &mut Vec<PathBuf>) -> Result<Vec<PathBuf>> {
        if is_glob(pattern) {
            return expand_glob(pattern.to_string()).await;
        }

        let path = PathBuf::from(pattern);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                let nested = path.join(DIRECTORY_GLOB);
                expand_glob(nested.to_string_lossy().into_owned()).await
            }
            Ok(_) => Ok(vec![path]),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Source file \"{}\" not found.", path.display());
                missing.push(path);
                Ok(Vec::new())
            }
            Err(e) => Err(ValidationError::from(e)),
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude_set
            .iter()
            .any(|pattern| pattern.matches_path_with(path, match_options()))
    }
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Walk a glob on the blocking pool; only regular files are returned, sorted per pattern
async fn expand_glob(pattern: String) -> Result<Vec<PathBuf>> {
    tokio::task::spawn_blocking(move || {
        let entries =
            glob::glob_with(&pattern, match_options()).map_err(|e| ValidationError::Pattern {
                pattern: pattern.clone(),
                details: e.to_string(),
            })?;

        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("Error reading {}: {}", e.path().display(), e.error()),
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| ValidationError::Concurrency {
        details: format!("Glob expansion failed: {}", e),
    })?
}
