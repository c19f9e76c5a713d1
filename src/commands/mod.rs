//! Command implementations behind the `credlock` binary.

pub mod credential;
pub mod init;
pub mod password;
pub mod run;
pub mod session;
pub mod status;

use anyhow::{Context, Result};

use crate::catalogue::{self, Catalogue, CatalogueCommand};
use crate::config::Config;
use crate::crypto::CredentialCipher;

/// Apply catalogue edits as one load → apply → save transaction.
fn edit_catalogue(config: &Config, commands: &[CatalogueCommand]) -> Result<Catalogue> {
    catalogue::edit(&config.catalogue, commands, &CredentialCipher::default())
        .with_context(|| format!("Failed to update {}", config.catalogue.display()))
}

#[cfg(test)]
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    Config::default().resolve_relative(dir)
}
