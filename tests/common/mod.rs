//! Shared fixtures for integration tests

#![allow(dead_code)]

use credlock::catalogue::{self, Catalogue, Settings};
use credlock::crypto::KdfParams;
use credlock::{CredentialCipher, LockManager, SessionAllocator};
use std::path::PathBuf;
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route library logs through the test harness, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("credlock=info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Cheap key derivation so tests do not spend their time in Argon2.
pub fn fast_cipher() -> CredentialCipher {
    CredentialCipher::default().with_params(KdfParams {
        m_cost: 64,
        t_cost: 1,
        p_cost: 1,
    })
}

pub struct Workspace {
    pub temp: TempDir,
    pub catalogue: PathBuf,
    pub lock_dir: PathBuf,
}

impl Workspace {
    /// Catalogue with `groups` session groups `S1..=Sn`, each assigning user
    /// `u<i>` with password `E<i>` on credential system `sys`.
    pub fn with_groups(groups: usize) -> Self {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let catalogue_path = temp.path().join("catalogue.json");
        let cipher = fast_cipher();

        catalogue::initialize(&catalogue_path).unwrap();
        let mut catalogue: Catalogue = catalogue::load(&catalogue_path).unwrap();
        catalogue
            .add_credential("sys", Settings::new(), None, "", &cipher)
            .unwrap();
        for i in 1..=groups {
            let session = format!("S{i}");
            catalogue.add_session(&session).unwrap();
            catalogue
                .set_user(
                    &session,
                    "sys",
                    &format!("u{i}"),
                    Some(&format!("E{i}")),
                    &cipher,
                )
                .unwrap();
        }
        catalogue::save(&catalogue_path, &catalogue).unwrap();

        let lock_dir = temp.path().join("locks");
        Self {
            temp,
            catalogue: catalogue_path,
            lock_dir,
        }
    }

    pub fn allocator(&self) -> SessionAllocator {
        SessionAllocator::new(&self.catalogue, LockManager::new(&self.lock_dir))
            .with_cipher(fast_cipher())
    }

    pub fn state_file(&self, run: &str) -> PathBuf {
        self.temp.path().join("runs").join(format!("{run}.json"))
    }

    /// Number of files in the lock directory.
    pub fn lock_files(&self) -> usize {
        std::fs::read_dir(&self.lock_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
