//! Settings file handling
//!
//! Reads optional TOML settings. Lookup order: an explicit `--config` file, then
//! `slnresolve.toml` in the base path, then `config.toml` in the user config directory.
//! Command-line flags override every value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults::{
    DEFAULT_MSBUILD, DEFAULT_NUGET, DEFAULT_RECURSION_LEVEL, DEFAULT_TEST_FRAMEWORK_PREFIX, DEFAULT_TEST_RUNNER,
    SETTINGS_FILE,
};
use crate::error::SettingsError;
use crate::infra::dirs::SlnresolveDirs;

/// All settings, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub filter: FilterSettings,

    #[serde(default)]
    pub build: BuildSettings,

    #[serde(default)]
    pub index: IndexSettings,
}

/// External tool locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub msbuild: Option<PathBuf>,
    pub test_runner: Option<PathBuf>,
    pub test_framework_prefix: Option<String>,
    /// NuGet client for package version lookups
    pub nuget: Option<PathBuf>,
}

/// Default assembly name filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub patterns: Vec<String>,
    pub flip: Option<bool>,
}

/// Default build options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Clean before building
    pub clean: Option<bool>,
    pub ignore_missing: Option<bool>,
    pub run_tests: Option<bool>,
    pub ignore_failed_tests: Option<bool>,
    pub recursion_level: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Abort when two projects build the same assembly name
    pub fail_on_name_collision: Option<bool>,
}

/// Where the effective settings came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    File(PathBuf),
    Defaults,
}

impl Settings {
    /// Load settings following the lookup order
    ///
    /// An explicit file must exist. The other locations are skipped when absent.
    pub fn discover(
        explicit: Option<&Path>,
        base_path: &Path,
    ) -> Result<(Self, SettingsSource), SettingsError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    error: "file does not exist".to_string(),
                });
            }
            return Ok((Self::load_from_path(path)?, SettingsSource::File(path.to_path_buf())));
        }

        let candidates = [
            base_path.join(SETTINGS_FILE),
            SlnresolveDirs::new().global_config_path(),
        ];
        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!("Using settings from {}", candidate.display());
                let settings = Self::load_from_path(&candidate)?;
                return Ok((settings, SettingsSource::File(candidate)));
            }
        }
        Ok((Self::default(), SettingsSource::Defaults))
    }

    /// Load settings from a specific path, defaults if it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    #[must_use]
    pub fn msbuild(&self) -> PathBuf {
        self.tools
            .msbuild
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MSBUILD))
    }

    #[must_use]
    pub fn test_runner(&self) -> PathBuf {
        self.tools
            .test_runner
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEST_RUNNER))
    }

    #[must_use]
    pub fn nuget(&self) -> PathBuf {
        self.tools
            .nuget
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NUGET))
    }

    #[must_use]
    pub fn test_framework_prefix(&self) -> &str {
        self.tools
            .test_framework_prefix
            .as_deref()
            .unwrap_or(DEFAULT_TEST_FRAMEWORK_PREFIX)
    }

    #[must_use]
    pub fn recursion_level(&self) -> i32 {
        self.build.recursion_level.unwrap_or(DEFAULT_RECURSION_LEVEL)
    }

    #[must_use]
    pub fn clean(&self) -> bool {
        self.build.clean.unwrap_or(true)
    }
}
