//! Project validation
//!
//! Reports hint paths that make a source tree non-relocatable: absolute hint paths, and
//! hint paths pointing outside the base path.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::index::ProjectIndex;
use crate::infra::filesystem::is_within;

/// A suspicious assembly reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// `HintPath` is written as an absolute path
    AbsoluteHintPath {
        project: PathBuf,
        assembly: String,
        hint_path: String,
    },
    /// Resolved hint path lies outside the base path
    HintPathOutsideBase {
        project: PathBuf,
        assembly: String,
        hint_path: PathBuf,
    },
}

impl ValidationWarning {
    pub fn project(&self) -> &Path {
        match self {
            Self::AbsoluteHintPath { project, .. } | Self::HintPathOutsideBase { project, .. } => project,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbsoluteHintPath {
                project,
                assembly,
                hint_path,
            } => write!(
                f,
                "Absolute path in HintPath of '{assembly}': '{hint_path}' (in project {})",
                project.display()
            ),
            Self::HintPathOutsideBase {
                project,
                assembly,
                hint_path,
            } => write!(
                f,
                "HintPath of '{assembly}' points outside the base path: '{}' (in project {})",
                hint_path.display(),
                project.display()
            ),
        }
    }
}

/// Check every indexed project's hint paths
pub fn validate_projects(index: &ProjectIndex) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    for id in index.all_projects() {
        let project = index.project(id);
        for reference in &project.assembly_references {
            if let Some(explicit) = reference.explicit_hint_path.as_deref() {
                if is_absolute_hint(explicit) {
                    warnings.push(ValidationWarning::AbsoluteHintPath {
                        project: project.path.clone(),
                        assembly: reference.name.clone(),
                        hint_path: explicit.to_string(),
                    });
                }
            }
            if let Some(hint_path) = reference.hint_path.as_deref() {
                if !is_within(index.root(), hint_path) {
                    warnings.push(ValidationWarning::HintPathOutsideBase {
                        project: project.path.clone(),
                        assembly: reference.name.clone(),
                        hint_path: hint_path.to_path_buf(),
                    });
                }
            }
        }
    }

    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    warnings
}

/// Hint paths are written on Windows: `C:\..`, `\\server\..` and `/..` are all rooted
fn is_absolute_hint(hint_path: &str) -> bool {
    let bytes = hint_path.as_bytes();
    let drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    drive || hint_path.starts_with('\\') || hint_path.starts_with('/')
}
