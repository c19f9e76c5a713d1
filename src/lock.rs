//! Named, file-backed locks shared between processes
//!
//! Each lock is a file in the lock directory named after the lock. The file
//! existing means the lock is held; its content is an optional cross-reference
//! (the session group a run id points at). Acquisition relies on
//! `create_new`, which the OS performs atomically, so two processes racing for
//! the same free name can never both win.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::LockSettings;
use crate::error::{Error, Result};
use crate::fs::locking::{locked_read, locked_write, write_new};
use crate::validation::validate_lock_name;

/// A lock currently present in the lock directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockEntry {
    pub name: String,
    /// Cross-reference content, empty when none was set
    pub content: String,
    /// Last modification time of the lock file
    pub since: Option<DateTime<Utc>>,
}

/// Creates, inspects and removes named locks under one directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    dir: PathBuf,
    timeout: Duration,
    interval: Duration,
}

impl LockManager {
    /// A manager that tries each acquisition once.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            timeout: Duration::ZERO,
            interval: Duration::ZERO,
        }
    }

    pub fn from_settings(dir: impl Into<PathBuf>, settings: &LockSettings) -> Self {
        Self::new(dir)
            .with_timeout(Duration::from_millis(settings.timeout_ms))
            .with_interval(Duration::from_millis(settings.interval_ms))
    }

    /// How long [`LockManager::acquire`] keeps retrying. Zero means try once.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pause between two acquisition attempts.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Point an existing manager at another directory and retry policy.
    pub fn configure(&mut self, dir: impl Into<PathBuf>, timeout: Duration, interval: Duration) {
        self.dir = dir.into();
        self.timeout = timeout;
        self.interval = interval;
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock_path(&self, name: &str) -> Result<PathBuf> {
        validate_lock_name(name)?;
        Ok(self.dir.join(name))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                Error::io(
                    format!("failed to create lock directory {}", self.dir.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Make one exclusive-create attempt. `Ok(false)` means someone else holds it.
    pub fn try_acquire(&self, name: &str) -> Result<bool> {
        self.try_acquire_with_content(name, "")
    }

    /// Make one exclusive-create attempt, writing `content` into the new lock.
    pub fn try_acquire_with_content(&self, name: &str, content: &str) -> Result<bool> {
        let path = self.lock_path(name)?;
        self.ensure_dir()?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                if !content.is_empty() {
                    if let Err(e) = write_new(&file, &path, content) {
                        drop(file);
                        fs::remove_file(&path).ok();
                        return Err(e);
                    }
                }
                debug!(lock = name, "lock acquired");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::io(format!("failed to create lock {}", path.display()), e)),
        }
    }

    /// Acquire `name`, retrying every interval until the timeout elapses.
    ///
    /// Fails with [`Error::LockBusy`] straight away when the timeout is zero,
    /// otherwise with [`Error::LockTimeout`] once it runs out.
    pub fn acquire(&self, name: &str) -> Result<()> {
        self.acquire_with_content(name, "")
    }

    pub fn acquire_with_content(&self, name: &str, content: &str) -> Result<()> {
        let start = Instant::now();

        loop {
            if self.try_acquire_with_content(name, content)? {
                return Ok(());
            }

            if self.timeout.is_zero() {
                return Err(Error::LockBusy {
                    name: name.to_string(),
                });
            }

            let waited = start.elapsed();
            if waited >= self.timeout {
                return Err(Error::LockTimeout {
                    name: name.to_string(),
                    waited,
                });
            }

            if self.interval.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(self.interval.min(self.timeout - waited));
            }
        }
    }

    /// Whether the lock is currently held.
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock_path(name)?.is_file())
    }

    /// Cross-reference content of a held lock, `None` when it is not held.
    pub fn content(&self, name: &str) -> Result<Option<String>> {
        let path = self.lock_path(name)?;
        match locked_read(&path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or overwrite the lock `name`, recording `content` as its cross-reference.
    ///
    /// Unlike [`LockManager::acquire`] this never fails because the lock is
    /// held: it is meant for locks the caller already owns, like its run id.
    pub fn set_lock_name(&self, name: &str, content: Option<&str>) -> Result<()> {
        let path = self.lock_path(name)?;
        self.ensure_dir()?;
        locked_write(&path, content.unwrap_or(""))?;
        debug!(lock = name, content = content.unwrap_or(""), "lock written");
        Ok(())
    }

    /// Remove the lock. Releasing a lock that is not held does nothing.
    pub fn release(&self, name: &str) -> Result<()> {
        let path = self.lock_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(lock = name, "lock released");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("failed to remove lock {}", path.display()), e)),
        }
    }

    /// Every lock currently held, sorted by name.
    pub fn held(&self) -> Result<Vec<LockEntry>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::io(
                    format!("failed to list lock directory {}", self.dir.display()),
                    e,
                ))
            }
        };

        let mut locks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("failed to read lock entry", e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if validate_lock_name(&name).is_err() || !entry.path().is_file() {
                continue;
            }

            // A lock released between listing and reading is simply skipped.
            let Some(content) = self.content(&name)? else {
                continue;
            };
            let since = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            locks.push(LockEntry {
                name,
                content,
                since,
            });
        }

        locks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locks)
    }

    /// Remove every lock in the directory, returning how many were removed.
    pub fn clear_all(&self) -> Result<usize> {
        let held = self.held()?;
        for lock in &held {
            self.release(&lock.name)?;
        }
        Ok(held.len())
    }
}
