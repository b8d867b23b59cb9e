//! Filesystem operations
//!
//! Handles path canonicalization, directory creation and file copies.

use std::path::{Component, Path, PathBuf};

use crate::error::FilesystemError;

/// Canonical absolute form of `path`
///
/// Existing paths go through the OS (symlinks resolved). Paths that do not exist yet are
/// made absolute against the working directory and normalized lexically.
pub fn canonical_path(path: &Path) -> std::io::Result<PathBuf> {
    let trimmed = PathBuf::from(path.to_string_lossy().trim());
    match std::fs::canonicalize(&trimmed) {
        Ok(resolved) => Ok(strip_verbatim_prefix(resolved)),
        Err(_) => {
            let absolute = if trimmed.is_absolute() {
                trimmed
            } else {
                std::env::current_dir()?.join(trimmed)
            };
            Ok(normalize_lexically(&absolute))
        }
    }
}

/// Resolve `relative` against `base` and normalize, without touching the filesystem
pub fn resolve_relative(base: &Path, relative: &str) -> PathBuf {
    let relative = to_native_separators(relative);
    let relative = Path::new(&relative);
    if relative.is_absolute() {
        normalize_lexically(relative)
    } else {
        normalize_lexically(&base.join(relative))
    }
}

/// Case-insensitive identity key for a canonical path
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Whether `path` lies under `dir`, comparing case-insensitively
pub fn is_within(dir: &Path, path: &Path) -> bool {
    Path::new(&path_key(path)).starts_with(Path::new(&path_key(dir)))
}

/// Whether the extension of `path` equals `extension` (no dot), ignoring case
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

/// Project and solution files are written on Windows; accept either separator
pub fn to_native_separators(path: &str) -> String {
    if std::path::MAIN_SEPARATOR == '\\' {
        path.replace('/', "\\")
    } else {
        path.replace('\\', "/")
    }
}

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy `source` into `target_dir`, keeping its file name and overwriting
pub fn copy_into(source: &Path, target_dir: &Path) -> Result<PathBuf, FilesystemError> {
    create_dir_all(target_dir)?;
    let file_name = source.file_name().unwrap_or(source.as_os_str());
    let target = target_dir.join(file_name);
    if path_key(source) == path_key(&target) {
        return Ok(target);
    }
    std::fs::copy(source, &target).map_err(|e| FilesystemError::CopyFile {
        from: source.to_path_buf(),
        to: target.clone(),
        error: e.to_string(),
    })?;
    Ok(target)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn strip_verbatim_prefix(path: PathBuf) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_prefix(r"\\?\") {
        Some(rest) if !rest.starts_with("UNC") => PathBuf::from(rest),
        _ => path,
    }
}
