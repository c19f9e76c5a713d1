//! Loading and saving the catalogue document.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, info};

use super::{Catalogue, CatalogueCommand};
use crate::crypto::CredentialCipher;
use crate::error::{Error, Result};
use crate::fs::locking::{ensure_parent_dir, locked_read, locked_write};

/// Load and validate the catalogue at `path`.
///
/// Failures are logged before being returned; callers must branch on the
/// `Err` rather than rely on the log.
pub fn load(path: &Path) -> Result<Catalogue> {
    let content = locked_read(path).inspect_err(|e| {
        if matches!(e, Error::NotFound { .. }) {
            error!("user catalogue '{}' does not exist", path.display());
        } else {
            error!("cannot read user catalogue '{}': {e}", path.display());
        }
    })?;

    let catalogue: Catalogue = serde_json::from_str(&content).map_err(|e| {
        error!("cannot parse user catalogue '{}': {e}", path.display());
        Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    catalogue.validate().inspect_err(|e| {
        error!("user catalogue '{}' is inconsistent: {e}", path.display());
    })?;

    Ok(catalogue)
}

/// Write an empty catalogue. Never overwrites an existing file.
pub fn initialize(path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let content = render(&Catalogue::new())?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            error!("user catalogue '{}' already exists", path.display());
            return Err(Error::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(Error::io(format!("failed to create {}", path.display()), e)),
    };
    file.write_all(content.as_bytes())
        .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))?;

    info!("initialized user catalogue '{}'", path.display());
    Ok(())
}

/// Overwrite the whole document with `catalogue`.
pub fn save(path: &Path, catalogue: &Catalogue) -> Result<()> {
    ensure_parent_dir(path)?;
    locked_write(path, &render(catalogue)?)
}

/// Apply `commands` as one transaction: all of them land in a single save, or
/// nothing is written.
pub fn edit<'a>(
    path: &Path,
    commands: impl IntoIterator<Item = &'a CatalogueCommand>,
    cipher: &CredentialCipher,
) -> Result<Catalogue> {
    let mut catalogue = load(path)?;
    for command in commands {
        catalogue.apply(command, cipher)?;
    }
    catalogue.validate()?;
    save(path, &catalogue)?;
    Ok(catalogue)
}

fn render(catalogue: &Catalogue) -> Result<String> {
    let mut content = serde_json::to_string_pretty(catalogue).map_err(|e| Error::Parse {
        path: "catalogue".into(),
        message: e.to_string(),
    })?;
    content.push('\n');
    Ok(content)
}
