//! Password command

use anyhow::Result;
use colored::Colorize;

use super::edit_catalogue;
use crate::catalogue::CatalogueCommand;
use crate::config::Config;

/// Encrypt and store the password of `user` on `system`.
pub fn set(config: &Config, system: String, user: String, password: String) -> Result<()> {
    edit_catalogue(
        config,
        &[CatalogueCommand::SetPassword {
            system: system.clone(),
            user: user.clone(),
            password,
        }],
    )?;
    println!(
        "{} Stored password of '{}' for {}",
        "✓".green().bold(),
        user,
        system.cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue;
    use crate::commands::test_config;
    use crate::crypto::CredentialCipher;
    use tempfile::TempDir;

    #[test]
    fn test_set_password_is_encrypted() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        catalogue::initialize(&config.catalogue).unwrap();

        set(
            &config,
            "ldap".to_string(),
            "alice".to_string(),
            "wonderland".to_string(),
        )
        .unwrap();

        let raw = std::fs::read_to_string(&config.catalogue).unwrap();
        assert!(!raw.contains("wonderland"));
        let loaded = catalogue::load(&config.catalogue).unwrap();
        let blob = loaded.password_blob("ldap", "alice").unwrap();
        assert_eq!(CredentialCipher::default().decrypt(blob).unwrap(), "wonderland");
    }
}
