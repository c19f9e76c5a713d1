//! Advisory-locked file reads and writes
//!
//! Lock cross-references, the catalogue and run state are all rewritten in
//! place. `fs2` advisory locks make sure a reader in another process never sees
//! a truncated file halfway through a rewrite. All participants must go through
//! these helpers for the locking to be effective.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Read file contents under a shared lock.
///
/// A missing file is reported as [`Error::NotFound`] so callers can branch on
/// absence without inspecting io error kinds.
pub fn locked_read(path: &Path) -> Result<String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(Error::io(format!("failed to open {}", path.display()), e)),
    };
    file.lock_shared()
        .map_err(|e| Error::io(format!("failed to lock {}", path.display()), e))?;
    let mut content = String::new();
    BufReader::new(&file)
        .read_to_string(&mut content)
        .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
    Ok(content)
}

/// Write file contents under an exclusive lock, creating the file if needed.
///
/// The sequence is: open → lock → truncate → write → flush. Truncating after
/// the lock is held keeps readers from observing an empty file.
pub fn locked_write(path: &Path, content: &str) -> Result<()> {
    #[allow(clippy::suspicious_open_options)]
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .open(path)
        .map_err(|e| Error::io(format!("failed to open {} for writing", path.display()), e))?;
    file.lock_exclusive()
        .map_err(|e| Error::io(format!("failed to lock {}", path.display()), e))?;
    file.set_len(0)
        .map_err(|e| Error::io(format!("failed to truncate {}", path.display()), e))?;
    write_all(&file, path, content)
}

/// Write content into a file this process has just created exclusively.
pub(crate) fn write_new(file: &File, path: &Path, content: &str) -> Result<()> {
    file.lock_exclusive()
        .map_err(|e| Error::io(format!("failed to lock {}", path.display()), e))?;
    write_all(file, path, content)
}

fn write_all(file: &File, path: &Path, content: &str) -> Result<()> {
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))?;
    writer
        .flush()
        .map_err(|e| Error::io(format!("failed to flush {}", path.display()), e))?;
    Ok(())
}

/// Make sure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("failed to create {}", parent.display()), e))?;
        }
    }
    Ok(())
}
