//! Exclusive allocation of credential session groups to concurrent runs.
//!
//! A catalogue lists credential systems, their encrypted passwords, and
//! session groups bundling one user per system. Independent processes share a
//! lock directory; each run takes the first free session group and keeps it
//! until it releases it.

pub mod allocator;
pub mod catalogue;
pub mod commands;
pub mod completions;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod lock;
pub mod run;
pub mod validation;

pub use allocator::SessionAllocator;
pub use catalogue::{Catalogue, CatalogueCommand};
pub use config::Config;
pub use crypto::CredentialCipher;
pub use error::{Error, Result};
pub use lock::LockManager;
pub use run::{Credentials, FileRunStateStore, MemoryRunStateStore, Run, RunStateStore};
