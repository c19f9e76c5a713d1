//! Session group commands

use anyhow::Result;
use colored::Colorize;

use super::edit_catalogue;
use crate::catalogue::CatalogueCommand;
use crate::config::Config;

pub fn add(config: &Config, name: String) -> Result<()> {
    let catalogue = edit_catalogue(
        config,
        &[CatalogueCommand::AddSession { name: name.clone() }],
    )?;
    let systems = catalogue.session(&name).map_or(0, |g| g.len());
    println!(
        "{} Added session group '{}' ({} credential systems unset)",
        "✓".green().bold(),
        name,
        systems
    );
    Ok(())
}

pub fn delete(config: &Config, name: String) -> Result<()> {
    edit_catalogue(config, &[CatalogueCommand::DeleteSession { name: name.clone() }])?;
    println!("{} Deleted session group '{}'", "✓".green().bold(), name);
    Ok(())
}

pub fn rename(config: &Config, from: String, to: String) -> Result<()> {
    edit_catalogue(
        config,
        &[CatalogueCommand::RenameSession {
            from: from.clone(),
            to: to.clone(),
        }],
    )?;
    println!(
        "{} Renamed session group '{}' to '{}'",
        "✓".green().bold(),
        from,
        to
    );
    Ok(())
}

/// Assign a user to one credential system of a session group.
pub fn set(
    config: &Config,
    session: String,
    system: String,
    user: String,
    password: Option<String>,
) -> Result<()> {
    let catalogue = edit_catalogue(
        config,
        &[CatalogueCommand::SetUser {
            session: session.clone(),
            system: system.clone(),
            user: user.clone(),
            password,
        }],
    )?;

    let assigned = catalogue
        .session(&session)
        .and_then(|g| g.get(&system))
        .and_then(|u| u.as_user())
        == Some(user.as_str());
    if assigned {
        println!(
            "{} Session group '{}' uses '{}' for {}",
            "✓".green().bold(),
            session,
            user,
            system.cyan()
        );
    } else {
        println!(
            "{} Session group '{}' has no credential system '{}', nothing changed",
            "─".dimmed(),
            session,
            system
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{self, Settings, SessionUser};
    use crate::commands::test_config;
    use tempfile::TempDir;

    #[test]
    fn test_session_lifecycle() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        catalogue::initialize(&config.catalogue).unwrap();
        edit_catalogue(
            &config,
            &[CatalogueCommand::AddCredential {
                system: "sap".to_string(),
                settings: Settings::new(),
                user: None,
                password: String::new(),
            }],
        )
        .unwrap();

        add(&config, "S1".to_string()).unwrap();
        set(&config, "S1".to_string(), "sap".to_string(), "u1".to_string(), None).unwrap();
        rename(&config, "S1".to_string(), "S9".to_string()).unwrap();

        let loaded = catalogue::load(&config.catalogue).unwrap();
        assert_eq!(
            loaded.session("S9").and_then(|g| g.get("sap")),
            Some(&SessionUser::User("u1".to_string()))
        );

        delete(&config, "S9".to_string()).unwrap();
        assert!(catalogue::load(&config.catalogue)
            .unwrap()
            .group_sessions()
            .is_empty());
    }

    #[test]
    fn test_set_unknown_system_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        catalogue::initialize(&config.catalogue).unwrap();
        add(&config, "S1".to_string()).unwrap();

        set(&config, "S1".to_string(), "sap".to_string(), "u1".to_string(), None).unwrap();
        assert!(catalogue::load(&config.catalogue)
            .unwrap()
            .session("S1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_add_without_catalogue_fails() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        assert!(add(&config, "S1".to_string()).is_err());
    }
}
