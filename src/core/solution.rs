//! Solution file reading
//!
//! Only the `Project(...)` entry lines of a `.sln` are read; the rest of the grammar is
//! ignored.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::SolutionError;
use crate::infra::filesystem::{has_extension, to_native_separators};

/// Lists the projects a solution contains
pub trait SolutionReader {
    /// Member project paths, relative to the solution directory
    fn project_paths(&self, solution: &Path) -> Result<Vec<PathBuf>, SolutionError>;
}

/// Line-oriented reader for Visual Studio `.sln` files
#[derive(Debug)]
pub struct SlnReader {
    entry: Option<Regex>,
}

impl Default for SlnReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SlnReader {
    pub fn new() -> Self {
        Self {
            entry: Regex::new(
                r#"^\s*Project\("\{[^}]*\}"\)\s*=\s*"[^"]*"\s*,\s*"([^"]+)"\s*,\s*"\{[^}]*\}"\s*$"#,
            )
            .ok(),
        }
    }

    /// Member `.csproj` paths found in solution text
    pub fn parse_str(&self, content: &str) -> Vec<PathBuf> {
        let Some(entry) = self.entry.as_ref() else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| entry.captures(line))
            .map(|captures| PathBuf::from(to_native_separators(captures[1].trim())))
            .filter(|path| has_extension(path, "csproj"))
            .collect()
    }
}

impl SolutionReader for SlnReader {
    fn project_paths(&self, solution: &Path) -> Result<Vec<PathBuf>, SolutionError> {
        let content = std::fs::read_to_string(solution).map_err(|e| SolutionError::Io {
            path: solution.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(self.parse_str(&content))
    }
}
