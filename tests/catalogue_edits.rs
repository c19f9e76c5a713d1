//! Integration tests for catalogue administration on disk

mod common;

use common::{fast_cipher, Workspace};
use credlock::catalogue::{self, CatalogueCommand, SessionUser, Settings, UNSET_USER};
use credlock::{Error, FileRunStateStore};
use serde_json::Value;
use std::fs;

fn document(ws: &Workspace) -> Value {
    serde_json::from_str(&fs::read_to_string(&ws.catalogue).unwrap()).unwrap()
}

#[test]
fn test_document_has_exactly_three_sections() {
    let ws = Workspace::with_groups(2);
    let doc = document(&ws);
    let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 3);
    for key in ["common", "group_sessions", "passwords"] {
        assert!(keys.iter().any(|k| k == key), "missing {key}");
    }
}

#[test]
fn test_credential_lifecycle_cascades_on_disk() {
    let ws = Workspace::with_groups(2);
    let cipher = fast_cipher();

    let mut settings = Settings::new();
    settings.insert("darktheme".to_string(), Value::String("true".to_string()));
    catalogue::edit(
        &ws.catalogue,
        &[CatalogueCommand::AddCredential {
            system: "github".to_string(),
            settings,
            user: None,
            password: String::new(),
        }],
        &cipher,
    )
    .unwrap();

    let doc = document(&ws);
    assert_eq!(doc["common"]["github"]["darktheme"], "true");
    assert_eq!(doc["group_sessions"]["S1"]["github"], UNSET_USER);
    assert_eq!(doc["group_sessions"]["S2"]["github"], UNSET_USER);
    assert!(doc["passwords"]["github"][UNSET_USER].is_string());

    catalogue::edit(
        &ws.catalogue,
        &[CatalogueCommand::DeleteCredential {
            system: "github".to_string(),
        }],
        &cipher,
    )
    .unwrap();

    let raw = fs::read_to_string(&ws.catalogue).unwrap();
    assert!(!raw.contains("github"));
}

#[test]
fn test_failed_batch_leaves_file_untouched() {
    let ws = Workspace::with_groups(1);
    let before = fs::read_to_string(&ws.catalogue).unwrap();

    let err = catalogue::edit(
        &ws.catalogue,
        &[
            CatalogueCommand::DeleteCredential {
                system: "sys".to_string(),
            },
            CatalogueCommand::RenameCredential {
                from: "ghost".to_string(),
                to: "spirit".to_string(),
            },
        ],
        &fast_cipher(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::UnknownSystem(_)));
    assert_eq!(fs::read_to_string(&ws.catalogue).unwrap(), before);
}

#[test]
fn test_new_session_is_allocatable_after_assignment() {
    let ws = Workspace::with_groups(1);
    let cipher = fast_cipher();
    catalogue::edit(
        &ws.catalogue,
        &[
            CatalogueCommand::AddSession {
                name: "S9".to_string(),
            },
            CatalogueCommand::SetUser {
                session: "S9".to_string(),
                system: "sys".to_string(),
                user: "u9".to_string(),
                password: Some("E9".to_string()),
            },
        ],
        &cipher,
    )
    .unwrap();

    let loaded = catalogue::load(&ws.catalogue).unwrap();
    assert_eq!(
        loaded.session("S9").and_then(|g| g.get("sys")),
        Some(&SessionUser::User("u9".to_string()))
    );

    let allocator = ws.allocator();
    ws.allocator().locks().acquire("S1").unwrap();
    let mut run = allocator
        .open_run(FileRunStateStore::new(ws.state_file("r1")))
        .unwrap();
    assert_eq!(allocator.acquire(&mut run).unwrap(), "S9");
    assert_eq!(run.credentials("sys").unwrap().password().unwrap(), "E9");
}

#[test]
fn test_malformed_catalogue_blocks_allocation() {
    let ws = Workspace::with_groups(1);
    fs::write(&ws.catalogue, r#"{"common":{},"group_sessions":{}}"#).unwrap();

    let allocator = ws.allocator();
    let mut run = allocator
        .open_run(FileRunStateStore::new(ws.state_file("r1")))
        .unwrap();
    assert!(matches!(
        allocator.acquire(&mut run),
        Err(Error::Parse { .. })
    ));
    assert_eq!(ws.lock_files(), 0);
}
