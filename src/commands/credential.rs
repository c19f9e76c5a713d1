//! Credential system commands

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

use super::edit_catalogue;
use crate::catalogue::{CatalogueCommand, Settings};
use crate::config::Config;

/// Parse a `key:value` setting. Everything after the first `:` is the value.
pub fn parse_setting(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected 'key:value', got '{raw}'")),
    }
}

/// Register a credential system in every session group.
pub fn add(
    config: &Config,
    system: String,
    settings: Vec<(String, String)>,
    user: Option<String>,
    password: String,
) -> Result<()> {
    let settings: Settings = settings
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let catalogue = edit_catalogue(
        config,
        &[CatalogueCommand::AddCredential {
            system: system.clone(),
            settings,
            user,
            password,
        }],
    )?;

    println!(
        "{} Registered credential system {} in {} session groups",
        "✓".green().bold(),
        system.cyan(),
        catalogue.group_sessions().len()
    );
    Ok(())
}

pub fn delete(config: &Config, system: String) -> Result<()> {
    edit_catalogue(
        config,
        &[CatalogueCommand::DeleteCredential {
            system: system.clone(),
        }],
    )?;
    println!(
        "{} Removed credential system {} everywhere",
        "✓".green().bold(),
        system.cyan()
    );
    Ok(())
}

pub fn rename(config: &Config, from: String, to: String) -> Result<()> {
    edit_catalogue(
        config,
        &[CatalogueCommand::RenameCredential {
            from: from.clone(),
            to: to.clone(),
        }],
    )?;
    println!(
        "{} Renamed credential system {} to {}",
        "✓".green().bold(),
        from.cyan(),
        to.cyan()
    );
    Ok(())
}
