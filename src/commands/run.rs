//! Run commands - acquire, release and sign a session group for this execution

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::allocator::SessionAllocator;
use crate::config::Config;
use crate::error::Error;
use crate::run::{FileRunStateStore, Run};

fn open(config: &Config) -> Result<(SessionAllocator, Run<FileRunStateStore>)> {
    let allocator = SessionAllocator::new(&config.catalogue, config.lock_manager());
    let run = allocator
        .open_run(FileRunStateStore::new(&config.state_file))
        .with_context(|| format!("Failed to open run state {}", config.state_file.display()))?;
    Ok((allocator, run))
}

/// Allocate (or re-enter) the session group of the persisted run.
///
/// Prints the group and its users. Passwords are never printed.
pub fn acquire(config: &Config) -> Result<()> {
    let (allocator, mut run) = open(config)?;

    let group = match allocator.acquire(&mut run) {
        Ok(group) => group,
        Err(Error::AllocationExhausted { run_id, groups }) => {
            bail!("No free session group for run {run_id}: all {groups} are in use")
        }
        Err(e) => return Err(e).context("Failed to acquire a session group"),
    };

    println!(
        "{} Run {} holds session group {}",
        "✓".green().bold(),
        run.id().unwrap_or_default().dimmed(),
        group.bold()
    );
    for (system, session) in run.systems().iter() {
        let user = match &session.user {
            Some(user) => user.normal(),
            None => "<unset>".yellow(),
        };
        let signed = if session.signed { " (signed)" } else { "" };
        println!("  {} {} → {}{}", "→".cyan(), system, user, signed.dimmed());
    }
    Ok(())
}

/// Release the persisted run, or with `all` remove every lock in the directory.
pub fn release(config: &Config, all: bool) -> Result<()> {
    let (allocator, mut run) = open(config)?;

    if all {
        let removed = allocator
            .locks()
            .clear_all()
            .context("Failed to clear lock directory")?;
        allocator.release(&mut run)?;
        println!("{} Removed {} locks", "✓".green().bold(), removed);
        return Ok(());
    }

    let group = run.group().map(str::to_string);
    if allocator.release(&mut run)? {
        println!(
            "{} Released session group {}",
            "✓".green().bold(),
            group.unwrap_or_default().bold()
        );
    } else {
        println!("{} No session group held", "─".dimmed());
    }
    Ok(())
}

/// Record that the run is (or is no longer) signed on to `system`.
pub fn sign(config: &Config, system: String, on: bool) -> Result<()> {
    let (_, mut run) = open(config)?;
    if run.group().is_none() {
        bail!("No session group held; run `credlock acquire` first");
    }

    let mut credentials = run.credentials(&system)?;
    if on {
        credentials.sign_on()?;
    } else {
        credentials.sign_off()?;
    }
    println!(
        "{} {} signed {}",
        "✓".green().bold(),
        system.cyan(),
        if on { "on" } else { "off" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{self, CatalogueCommand, Settings};
    use crate::commands::{edit_catalogue, test_config};
    use crate::run::RunStateStore;
    use tempfile::TempDir;

    fn seeded(temp: &TempDir) -> Config {
        let config = test_config(temp.path());
        catalogue::initialize(&config.catalogue).unwrap();
        edit_catalogue(
            &config,
            &[
                CatalogueCommand::AddCredential {
                    system: "sap".to_string(),
                    settings: Settings::new(),
                    user: None,
                    password: String::new(),
                },
                CatalogueCommand::AddSession {
                    name: "S1".to_string(),
                },
            ],
        )
        .unwrap();
        config
    }

    #[test]
    fn test_acquire_sign_release() {
        let temp = TempDir::new().unwrap();
        let config = seeded(&temp);

        acquire(&config).unwrap();
        acquire(&config).unwrap();
        sign(&config, "sap".to_string(), true).unwrap();

        let state = FileRunStateStore::new(&config.state_file).load().unwrap();
        assert_eq!(state.group.as_deref(), Some("S1"));
        assert_eq!(state.signed_flag("sap"), Some(true));

        release(&config, false).unwrap();
        assert!(config.lock_manager().held().unwrap().is_empty());
        assert!(sign(&config, "sap".to_string(), false).is_err());
    }

    #[test]
    fn test_acquire_exhausted_fails() {
        let temp = TempDir::new().unwrap();
        let config = seeded(&temp);
        config.lock_manager().acquire("S1").unwrap();

        let err = acquire(&config).unwrap_err();
        assert!(err.to_string().contains("No free session group"));
    }

    #[test]
    fn test_release_all_clears_foreign_locks() {
        let temp = TempDir::new().unwrap();
        let config = seeded(&temp);
        config.lock_manager().acquire("S1").unwrap();
        config.lock_manager().acquire("orphan-run").unwrap();

        release(&config, true).unwrap();
        assert!(config.lock_manager().held().unwrap().is_empty());
    }
}
