//! `credlock.toml` configuration.
//!
//! ```toml
//! catalogue = "catalogue.json"
//! lock_dir = "locks"
//! state_file = ".credlock/run.json"
//!
//! [lock]
//! timeout_ms = 0
//! interval_ms = 0
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.
//! The encryption passphrase is deliberately not configurable here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::LockManager;

pub const CONFIG_FILE_NAME: &str = "credlock.toml";

/// Retry policy for lock acquisition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockSettings {
    /// Total time to keep retrying; 0 tries once
    pub timeout_ms: u64,
    /// Pause between attempts
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the catalogue document
    pub catalogue: PathBuf,
    /// Directory holding lock files
    pub lock_dir: PathBuf,
    /// Where this execution context persists its run state
    pub state_file: PathBuf,
    pub lock: LockSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalogue: PathBuf::from("catalogue.json"),
            lock_dir: PathBuf::from("locks"),
            state_file: PathBuf::from(".credlock").join("run.json"),
            lock: LockSettings::default(),
        }
    }
}

impl Config {
    /// Load a config file, resolving its relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(Error::io(format!("failed to read {}", path.display()), e)),
        };

        let config: Config = toml::from_str(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve_relative(base))
    }

    /// Find the config to use.
    ///
    /// An explicit path must exist. Otherwise `./credlock.toml` is tried, then
    /// `credlock/credlock.toml` under the user config directory, and finally the
    /// defaults. Returns the file that was used, if any.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("credlock").join(CONFIG_FILE_NAME));
        }

        for candidate in candidates {
            if candidate.is_file() {
                return Ok((Self::load(&candidate)?, Some(candidate)));
            }
        }

        Ok((Self::default(), None))
    }

    pub fn resolve_relative(mut self, base: &Path) -> Self {
        for path in [&mut self.catalogue, &mut self.lock_dir, &mut self.state_file] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    pub fn lock_manager(&self) -> LockManager {
        LockManager::from_settings(&self.lock_dir, &self.lock)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Parse {
            path: PathBuf::from(CONFIG_FILE_NAME),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.catalogue, PathBuf::from("catalogue.json"));
        assert_eq!(config.lock, LockSettings::default());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "catalogue = \"users/catalogue.json\"\nlock_dir = \"/var/lock/credlock\"\n\n[lock]\ntimeout_ms = 2000\ninterval_ms = 100\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.catalogue, temp.path().join("users/catalogue.json"));
        assert_eq!(config.lock_dir, PathBuf::from("/var/lock/credlock"));
        assert_eq!(config.state_file, temp.path().join(".credlock/run.json"));

        let locks = config.lock_manager();
        assert_eq!(locks.timeout(), Duration::from_millis(2000));
        assert_eq!(locks.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(&temp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "passphrase = \"nope\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_discover_explicit_must_exist() {
        let temp = TempDir::new().unwrap();
        assert!(Config::discover(Some(&temp.path().join("missing.toml"))).is_err());
    }

    #[test]
    #[serial]
    fn test_discover_finds_config_in_current_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "lock_dir = \"shared-locks\"\n").unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp.path()).unwrap();
        let result = Config::discover(None);
        std::env::set_current_dir(original_dir).unwrap();

        let (config, source) = result.unwrap();
        assert_eq!(source, Some(PathBuf::from(CONFIG_FILE_NAME)));
        assert_eq!(config.lock_dir, PathBuf::from("shared-locks"));
        assert_eq!(config.catalogue, PathBuf::from("catalogue.json"));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
