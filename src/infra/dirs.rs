//! Platform-specific directory management
//!
//! Provides the user configuration directory. `SLNRESOLVE_CONFIG_DIR` overrides the
//! platform default (`$XDG_CONFIG_HOME/slnresolve`, `~/Library/Application Support/slnresolve`,
//! `%APPDATA%\slnresolve`).

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "SLNRESOLVE_CONFIG_DIR";

const APP_NAME: &str = "slnresolve";
const CONFIG_FILE: &str = "config.toml";

/// Platform-specific directory provider
#[derive(Debug, Clone)]
pub struct SlnresolveDirs {
    config_dir: PathBuf,
}

impl SlnresolveDirs {
    /// Checks the environment first, then falls back to platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// `config.toml` in the config directory
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for SlnresolveDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_path_is_under_config_dir() {
        let dirs = SlnresolveDirs::new();
        assert!(!dirs.config_dir().as_os_str().is_empty());
        assert!(dirs.global_config_path().starts_with(dirs.config_dir()));
        assert!(dirs.global_config_path().ends_with("config.toml"));
    }
}
