//! Separate `credlock` processes racing for session groups in one lock directory

mod common;

use common::Workspace;
use credlock::run::RunState;
use std::collections::HashSet;
use std::path::Path;
use std::process::{Child, Command, Stdio};

const GROUPS: usize = 3;
const RUNS: usize = 8;

fn credlock(ws: &Workspace, config: &Path, state_file: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_credlock"));
    cmd.arg("--config")
        .arg(config)
        .arg("--catalogue")
        .arg(&ws.catalogue)
        .arg("--lock-dir")
        .arg(&ws.lock_dir)
        .arg("--state-file")
        .arg(state_file)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "credlock=warn")
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}

fn read_state(path: &Path) -> RunState {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn test_processes_never_share_a_group() {
    let ws = Workspace::with_groups(GROUPS);
    let config = ws.temp.path().join("credlock.toml");
    std::fs::write(&config, "").unwrap();

    let state_files: Vec<_> = (0..RUNS)
        .map(|i| ws.state_file(&format!("proc-{i}")))
        .collect();

    // Start them all before waiting on any so they overlap.
    let children: Vec<Child> = state_files
        .iter()
        .map(|state| credlock(&ws, &config, state).arg("acquire").spawn().unwrap())
        .collect();

    let mut winners = Vec::new();
    for (child, state) in children.into_iter().zip(&state_files) {
        let output = child.wait_with_output().unwrap();
        let run = read_state(state);
        if output.status.success() {
            winners.push(run.group.clone().unwrap());
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            assert!(stderr.contains("No free session group"), "{stderr}");
            assert!(run.run_error);
            assert_eq!(run.group, None);
        }
    }

    assert_eq!(winners.len(), GROUPS);
    let distinct: HashSet<_> = winners.iter().collect();
    assert_eq!(distinct.len(), GROUPS, "a session group was handed out twice");
    assert_eq!(ws.lock_files(), GROUPS * 2);

    // Every run releases, losers included, and nothing is left behind.
    for state in &state_files {
        let status = credlock(&ws, &config, state)
            .arg("release")
            .status()
            .unwrap();
        assert!(status.success());
    }
    assert_eq!(ws.lock_files(), 0);
}

#[test]
fn test_repeated_acquire_in_one_process_context_keeps_group() {
    let ws = Workspace::with_groups(GROUPS);
    let config = ws.temp.path().join("credlock.toml");
    std::fs::write(&config, "").unwrap();
    let state = ws.state_file("same");

    for _ in 0..3 {
        let status = credlock(&ws, &config, &state)
            .arg("acquire")
            .status()
            .unwrap();
        assert!(status.success());
        assert_eq!(read_state(&state).group.as_deref(), Some("S1"));
    }
    assert_eq!(ws.lock_files(), 2);
}
