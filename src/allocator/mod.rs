//! Session group allocation.
//!
//! A run holds at most one session group. Holding is expressed by two locks:
//! one named after the group, and one named after the run id whose content is
//! the group name. The group lock keeps other runs away and records the run id
//! that created it; the run-id lock lets a later invocation of the same run
//! find its group again.


use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::catalogue::{self, Catalogue, SessionGroup};
use crate::crypto::CredentialCipher;
use crate::error::{Error, Result};
use crate::lock::LockManager;
use crate::run::{Run, RunPhase, RunState, RunStateStore, SystemSession};

#[derive(Debug, Clone)]
pub struct SessionAllocator {
    catalogue_path: PathBuf,
    locks: LockManager,
    cipher: CredentialCipher,
}

impl SessionAllocator {
    pub fn new(catalogue_path: impl Into<PathBuf>, locks: LockManager) -> Self {
        Self {
            catalogue_path: catalogue_path.into(),
            locks,
            cipher: CredentialCipher::default(),
        }
    }

    pub fn with_cipher(mut self, cipher: CredentialCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn catalogue_path(&self) -> &Path {
        &self.catalogue_path
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Open the run persisted in `store`, decrypting with this allocator's cipher.
    pub fn open_run<S: RunStateStore>(&self, store: S) -> Result<Run<S>> {
        Ok(Run::open(store)?.with_cipher(self.cipher.clone()))
    }

    /// Allocate the session group for the run, reusing the one recorded in its
    /// run-id lock when there is one.
    pub fn acquire<S: RunStateStore>(&self, run: &mut Run<S>) -> Result<String> {
        self.allocate(run, None)
    }

    /// Assign a session group to the run and return its name.
    ///
    /// A `preferred` group whose lock exists is reused as is. Failing that, the
    /// group recorded in the run-id lock is kept while its lock still names
    /// this run, so repeated calls keep the same group. Otherwise the first group in catalogue order whose lock
    /// can be created wins. When every group is taken the run is flagged as
    /// failed (logged once per run) and [`Error::AllocationExhausted`] is
    /// returned on every call.
    pub fn allocate<S: RunStateStore>(
        &self,
        run: &mut Run<S>,
        preferred: Option<&str>,
    ) -> Result<String> {
        let catalogue = catalogue::load(&self.catalogue_path)?;
        let run_id = run.ensure_run_id();
        run.cipher = self.cipher.clone();
        let phase = run.phase.try_transition(RunPhase::Assigned)?;

        let held = self.locks.content(&run_id)?.filter(|c| !c.is_empty());
        let picked = self.pick_group(&catalogue, &run_id, preferred, held.as_deref())?;
        let Some((name, group, fresh)) = picked else {
            if let Some(old) = held.as_deref() {
                self.drop_reference(&run_id, old)?;
            }
            return self.exhausted(run, run_id, catalogue.group_sessions().len());
        };

        if let Err(e) = self.locks.set_lock_name(&run_id, Some(&name)) {
            // Do not keep a freshly locked group nobody can find again.
            if fresh {
                self.locks.release(&name)?;
            }
            return Err(e);
        }

        // Moving to another group gives back the old one.
        if let Some(old) = held.as_deref().filter(|old| *old != name) {
            self.release_owned(&run_id, old)?;
        }

        let systems = group
            .iter()
            .map(|(system, user)| {
                let session = SystemSession {
                    user: user.as_user().map(str::to_string),
                    password: user
                        .as_user()
                        .and_then(|u| catalogue.password_blob(system, u))
                        .map(str::to_string),
                    signed: run.state.signed_flag(system).unwrap_or(false),
                    settings: catalogue.settings(system).cloned().unwrap_or_default(),
                };
                (system.to_string(), session)
            })
            .collect();

        run.state = RunState {
            run_id: Some(run_id.clone()),
            run_error: run.state.run_error,
            group: Some(name.clone()),
            systems,
        };
        run.phase = phase;
        run.persist()?;

        info!("Current execution (lock '{run_id}') uses session group '{name}'");
        Ok(name)
    }

    /// Drop both locks of the run and reset its state.
    ///
    /// Returns whether the run was holding a session group. Releasing a run
    /// that holds nothing only resets its state.
    pub fn release<S: RunStateStore>(&self, run: &mut Run<S>) -> Result<bool> {
        if run.phase.is_terminal() {
            return Ok(false);
        }

        let mut held = false;
        if let Some(run_id) = run.state.run_id.clone() {
            if let Some(group) = self.locks.content(&run_id)?.filter(|c| !c.is_empty()) {
                self.locks.release(&group)?;
                held = true;
                info!("Released session group '{group}' (lock '{run_id}')");
            }
            self.locks.release(&run_id)?;
        }

        let phase = run.phase.try_transition(RunPhase::Released)?;
        run.state.reset();
        run.persist()?;
        run.phase = phase;
        Ok(held)
    }

    fn pick_group<'c>(
        &self,
        catalogue: &'c Catalogue,
        run_id: &str,
        preferred: Option<&str>,
        held: Option<&str>,
    ) -> Result<Option<(String, &'c SessionGroup, bool)>> {
        if let Some(name) = preferred {
            match catalogue.session(name) {
                Some(group) if self.locks.exists(name)? => {
                    debug!(session = name, "reusing preferred session group");
                    return Ok(Some((name.to_string(), group, false)));
                }
                Some(_) => debug!(session = name, "preferred session group no longer locked"),
                None => warn!(session = name, "preferred session group is not in the catalogue"),
            }
        }

        // The recorded group counts only while its lock still names this run.
        if let Some(name) = held {
            match catalogue.session(name) {
                Some(group) if self.locks.content(name)?.as_deref() == Some(run_id) => {
                    debug!(session = name, "reusing held session group");
                    return Ok(Some((name.to_string(), group, false)));
                }
                Some(_) => debug!(session = name, "held session group was taken over"),
                None => warn!(session = name, "held session group is not in the catalogue"),
            }
        }

        for (name, group) in catalogue.group_sessions().iter() {
            if self.locks.try_acquire_with_content(name, run_id)? {
                return Ok(Some((name.to_string(), group, true)));
            }
        }
        Ok(None)
    }

    /// Release `group` only if this run created its lock.
    fn release_owned(&self, run_id: &str, group: &str) -> Result<()> {
        if self.locks.content(group)?.as_deref() == Some(run_id) {
            self.locks.release(group)?;
            info!("Released session group '{group}' (lock '{run_id}')");
        }
        Ok(())
    }

    /// Forget the group recorded in the run-id lock, which this run can no longer use.
    fn drop_reference(&self, run_id: &str, group: &str) -> Result<()> {
        self.release_owned(run_id, group)?;
        self.locks.release(run_id)
    }

    fn exhausted<S: RunStateStore>(
        &self,
        run: &mut Run<S>,
        run_id: String,
        groups: usize,
    ) -> Result<String> {
        if !run.state.run_error {
            error!("Current execution (lock '{run_id}') cannot get a free session group out of {groups}");
            run.state.run_error = true;
        }
        run.state.group = None;
        run.state.systems = Default::default();
        run.phase = RunPhase::Unassigned;
        run.persist()?;
        Err(Error::AllocationExhausted { run_id, groups })
    }
}
