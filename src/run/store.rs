use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::types::RunState;
use crate::error::{Error, Result};
use crate::fs::locking::{ensure_parent_dir, locked_read, locked_write};

/// Persistence for the run state of one execution context.
///
/// Only one execution context writes a given store, and it does so
/// sequentially, so load → mutate → save needs no further coordination.
pub trait RunStateStore {
    /// Current state; a store that has never been written yields the default.
    fn load(&self) -> Result<RunState>;

    fn save(&self, state: &RunState) -> Result<()>;
}

impl<T: RunStateStore + ?Sized> RunStateStore for &T {
    fn load(&self) -> Result<RunState> {
        (**self).load()
    }

    fn save(&self, state: &RunState) -> Result<()> {
        (**self).save(state)
    }
}

impl<T: RunStateStore + ?Sized> RunStateStore for Box<T> {
    fn load(&self) -> Result<RunState> {
        (**self).load()
    }

    fn save(&self, state: &RunState) -> Result<()> {
        (**self).save(state)
    }
}

/// Run state kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileRunStateStore {
    path: PathBuf,
}

impl FileRunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RunStateStore for FileRunStateStore {
    /// Creates the file with an empty state on first access.
    fn load(&self) -> Result<RunState> {
        match locked_read(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| Error::Parse {
                path: self.path.clone(),
                message: e.to_string(),
            }),
            Err(Error::NotFound { .. }) => {
                debug!("creating run state at {}", self.path.display());
                let state = RunState::default();
                self.save(&state)?;
                Ok(state)
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, state: &RunState) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let content = serde_json::to_string_pretty(state).map_err(|e| Error::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        locked_write(&self.path, &content)
    }
}

/// Run state kept in memory as serialized JSON, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryRunStateStore {
    content: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times state has been saved.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last persisted state, without going through `load`.
    pub fn snapshot(&self) -> Option<RunState> {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

impl RunStateStore for MemoryRunStateStore {
    fn load(&self) -> Result<RunState> {
        let content = self.content.lock().unwrap_or_else(PoisonError::into_inner);
        match content.as_deref() {
            Some(json) => serde_json::from_str(json).map_err(|e| Error::Parse {
                path: PathBuf::from("<memory>"),
                message: e.to_string(),
            }),
            None => Ok(RunState::default()),
        }
    }

    fn save(&self, state: &RunState) -> Result<()> {
        let json = serde_json::to_string(state).map_err(|e| Error::Parse {
            path: PathBuf::from("<memory>"),
            message: e.to_string(),
        })?;
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
