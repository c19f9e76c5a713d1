//! Error type shared by every credlock component.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A document that must exist is missing.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A document exists but could not be parsed.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The catalogue parsed but breaks the cross-map invariant.
    #[error("invalid catalogue: {0}")]
    InvalidCatalogue(String),

    /// Refusing to overwrite an existing document.
    #[error("{} already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Wrong passphrase, malformed envelope or tampered ciphertext.
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// Lock is held and the manager is configured to try only once.
    #[error("lock '{name}' is already held")]
    LockBusy { name: String },

    #[error("timed out after {}ms waiting for lock '{name}'", waited.as_millis())]
    LockTimeout { name: String, waited: Duration },

    #[error("invalid lock name: {0}")]
    InvalidName(String),

    /// Every session group is locked by another run.
    #[error("no free session group for run '{run_id}' ({groups} groups in catalogue)")]
    AllocationExhausted { run_id: String, groups: usize },

    /// The session group still carries the unset sentinel for this system.
    #[error("credential system '{system}' has no user assigned in this session group")]
    Unassigned { system: String },

    #[error("no password stored for user '{user}' on credential system '{system}'")]
    MissingPassword { system: String, user: String },

    #[error("unknown credential system '{0}'")]
    UnknownSystem(String),

    #[error("unknown session group '{0}'")]
    UnknownSession(String),

    #[error("invalid run transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// True for the two lock contention outcomes.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, Error::LockBusy { .. } | Error::LockTimeout { .. })
    }
}
