//! Status command - catalogue sessions, held locks and the current run

use anyhow::{Context, Result};
use colored::Colorize;

use crate::catalogue;
use crate::config::Config;
use crate::run::{FileRunStateStore, RunStateStore};

pub fn execute(config: &Config) -> Result<()> {
    let locks = config.lock_manager();
    let held = locks.held().context("Failed to list locks")?;

    println!("{}", "Session groups".bold());
    match catalogue::load(&config.catalogue) {
        Ok(catalogue) => {
            for name in catalogue.session_names() {
                let holder = held
                    .iter()
                    .find(|lock| lock.content == name)
                    .map(|lock| lock.name.as_str());
                let in_use = held.iter().any(|lock| lock.name == name);
                match (in_use, holder) {
                    (true, Some(run)) => {
                        println!("  {} {} (run {})", "●".yellow(), name, run.dimmed())
                    }
                    (true, None) => println!("  {} {} (locked)", "●".yellow(), name),
                    (false, _) => println!("  {} {}", "○".green(), name),
                }
            }
        }
        Err(e) => println!("  {} {}", "✗".red(), e),
    }

    println!("\n{}", "Locks".bold());
    if held.is_empty() {
        println!("  {} none", "─".dimmed());
    }
    for lock in &held {
        let since = lock
            .since
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        if lock.content.is_empty() {
            println!("  {} {}", lock.name, since.dimmed());
        } else {
            println!("  {} → {} {}", lock.name, lock.content, since.dimmed());
        }
    }

    println!("\n{}", "Current run".bold());
    // Do not create the state file just to look at it.
    if !config.state_file.is_file() {
        println!("  {} none", "─".dimmed());
        return Ok(());
    }
    let state = FileRunStateStore::new(&config.state_file).load()?;
    match (&state.run_id, &state.group) {
        (Some(run_id), Some(group)) => println!("  {} holds {}", run_id.dimmed(), group.bold()),
        (Some(run_id), None) => println!("  {} holds nothing", run_id.dimmed()),
        (None, _) => println!("  {} none", "─".dimmed()),
    }
    if state.run_error {
        println!("  {} allocation failed for this run", "✗".red());
    }
    Ok(())
}
