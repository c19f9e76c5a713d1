//! Name validation for anything that ends up as a file name.
//!
//! Lock names are run ids and session-group names. Both are joined onto the
//! lock directory, so they are checked before any path is built to rule out
//! traversal (`../x`), separators, and names the OS treats specially.
//!
//! Catalogues load only if every group name passes, so a document whose group
//! names fail here has to have those groups renamed before it can be used.

use crate::error::{Error, Result};

/// Maximum allowed length for a lock name, in bytes.
pub const MAX_NAME_LENGTH: usize = 128;

/// Reserved names that cannot be used as lock names (case-insensitive).
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Validates that a name is safe to use as a lock file name.
///
/// A name is valid if:
/// - It is not empty and no longer than [`MAX_NAME_LENGTH`] bytes
/// - It contains only alphanumerics (any script), spaces, dashes, underscores
///   and dots
/// - It does not start with a dot or a space, and does not end with a dot or
///   a space
/// - It is not a reserved device name
///
/// ```
/// use credlock::validation::validate_lock_name;
///
/// assert!(validate_lock_name("SESSION_01").is_ok());
/// assert!(validate_lock_name("Session 1").is_ok());
/// assert!(validate_lock_name("2b1f0c9e-5d43-4e43-9a38-0d0f1f7e0d2a").is_ok());
/// assert!(validate_lock_name("../etc/passwd").is_err());
/// ```
pub fn validate_lock_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName("name cannot be empty".to_string()));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::InvalidName(format!(
            "'{name}' is too long: {} bytes (max {MAX_NAME_LENGTH})",
            name.len()
        )));
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'));
    if !valid_chars {
        return Err(Error::InvalidName(format!(
            "'{name}' contains invalid characters. Use only letters, digits, spaces, '-', '_' and '.'"
        )));
    }

    if name.starts_with(['.', ' ']) {
        return Err(Error::InvalidName(format!(
            "'{name}' must not start with '.' or a space"
        )));
    }

    // Windows drops trailing dots and spaces, which would alias two names.
    if name.ends_with(['.', ' ']) {
        return Err(Error::InvalidName(format!(
            "'{name}' must not end with '.' or a space"
        )));
    }

    let stem = name.split('.').next().unwrap_or(name).trim_end().to_lowercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return Err(Error::InvalidName(format!("'{name}' uses a reserved name")));
    }

    Ok(())
}

/// Clap value parser for session-group names.
pub fn clap_name_validator(s: &str) -> Result<String, String> {
    validate_lock_name(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lock_name_valid() {
        assert!(validate_lock_name("S1").is_ok());
        assert!(validate_lock_name("SESSION_DUPRENI").is_ok());
        assert!(validate_lock_name("group-2.eu").is_ok());
        assert!(validate_lock_name("1700000000000").is_ok());
        assert!(validate_lock_name("Session 1").is_ok());
        assert!(validate_lock_name("Sessão Ünï 2").is_ok());
    }

    #[test]
    fn test_validate_lock_name_edges() {
        assert!(validate_lock_name(" S1").is_err());
        assert!(validate_lock_name("S1 ").is_err());
        assert!(validate_lock_name("S1.").is_err());
        assert!(validate_lock_name("S1\t2").is_err());
        assert!(validate_lock_name("S1\n").is_err());
    }

    #[test]
    fn test_validate_lock_name_empty() {
        let err = validate_lock_name("").unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_lock_name_too_long() {
        let err = validate_lock_name(&"a".repeat(MAX_NAME_LENGTH + 1)).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_validate_lock_name_rejects_paths() {
        assert!(validate_lock_name("a/b").is_err());
        assert!(validate_lock_name("a\\b").is_err());
        assert!(validate_lock_name("..").is_err());
        assert!(validate_lock_name(".").is_err());
        assert!(validate_lock_name(".hidden").is_err());
        assert!(validate_lock_name("a:b").is_err());
        assert!(validate_lock_name("a*b").is_err());
    }

    #[test]
    fn test_validate_lock_name_reserved() {
        assert!(validate_lock_name("CON").is_err());
        assert!(validate_lock_name("nul.txt").is_err());
        assert!(validate_lock_name("console").is_ok());
    }

    #[test]
    fn test_clap_name_validator() {
        assert_eq!(clap_name_validator("S1").unwrap(), "S1");
        assert!(clap_name_validator("../S1").is_err());
    }
}
