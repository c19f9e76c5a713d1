//! Init command - writes an empty catalogue

use anyhow::{Context, Result};
use colored::Colorize;

use crate::catalogue;
use crate::config::Config;
use crate::error::Error;

/// Create the catalogue file. An existing catalogue is reported and kept.
pub fn execute(config: &Config) -> Result<()> {
    match catalogue::initialize(&config.catalogue) {
        Ok(()) => {
            println!(
                "{} Created catalogue {}",
                "✓".green().bold(),
                config.catalogue.display()
            );
            Ok(())
        }
        Err(Error::AlreadyExists { path }) => {
            println!(
                "{} Catalogue {} already exists, left untouched",
                "─".dimmed(),
                path.display()
            );
            Ok(())
        }
        Err(e) => Err(e).context("Failed to initialize catalogue"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_catalogue() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());

        execute(&config).unwrap();
        assert!(catalogue::load(&config.catalogue).unwrap().group_sessions().is_empty());
    }

    #[test]
    fn test_init_keeps_existing_catalogue() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        fs::write(&config.catalogue, "custom").unwrap();

        execute(&config).unwrap();
        assert_eq!(fs::read_to_string(&config.catalogue).unwrap(), "custom");
    }
}
