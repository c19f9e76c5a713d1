use uuid::Uuid;

use super::store::RunStateStore;
use super::types::{RunPhase, RunState, SystemSession};
use crate::catalogue::{OrderedMap, Settings};
use crate::crypto::CredentialCipher;
use crate::error::{Error, Result};

/// One execution's view of its run state, bound to the store that persists it.
///
/// Every mutation is saved before the call returns.
pub struct Run<S: RunStateStore> {
    store: S,
    pub(crate) state: RunState,
    pub(crate) phase: RunPhase,
    pub(crate) cipher: CredentialCipher,
}

impl<S: RunStateStore> Run<S> {
    /// Load the run state, creating it if this context never stored one.
    pub fn open(store: S) -> Result<Self> {
        let state = store.load()?;
        Ok(Self {
            phase: state.phase(),
            store,
            state,
            cipher: CredentialCipher::default(),
        })
    }

    /// Decrypt passwords with `cipher` instead of the built-in one.
    pub fn with_cipher(mut self, cipher: CredentialCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.state.run_id.as_deref()
    }

    /// Session group currently held.
    pub fn group(&self) -> Option<&str> {
        self.state.group.as_deref()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Whether allocation has already failed for this run.
    pub fn has_error(&self) -> bool {
        self.state.run_error
    }

    pub fn systems(&self) -> &OrderedMap<SystemSession> {
        &self.state.systems
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Accessor for the credentials of `system` in the held session group.
    pub fn credentials(&mut self, system: &str) -> Result<Credentials<'_, S>> {
        if !self.state.systems.contains_key(system) {
            return Err(Error::UnknownSystem(system.to_string()));
        }
        Ok(Credentials {
            run: self,
            system: system.to_string(),
        })
    }

    pub(crate) fn persist(&self) -> Result<()> {
        self.store.save(&self.state)
    }

    /// The current run id, minting a new one if the run has none.
    pub(crate) fn ensure_run_id(&mut self) -> String {
        if let Some(id) = &self.state.run_id {
            return id.clone();
        }
        let id = Uuid::new_v4().to_string();
        self.state.run_id = Some(id.clone());
        self.phase = RunPhase::Unassigned;
        id
    }
}

impl<S: RunStateStore + std::fmt::Debug> std::fmt::Debug for Run<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Run")
            .field("store", &self.store)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .finish()
    }
}

/// User, password and signed flag of one credential system for the current run.
pub struct Credentials<'a, S: RunStateStore> {
    run: &'a mut Run<S>,
    system: String,
}

impl<S: RunStateStore> Credentials<'_, S> {
    fn session(&self) -> Option<&SystemSession> {
        self.run.state.systems.get(&self.system)
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Assigned user, `None` while the session group leaves it unset.
    pub fn user(&self) -> Option<&str> {
        self.session().and_then(|s| s.user.as_deref())
    }

    /// Decrypted password of the assigned user.
    pub fn password(&self) -> Result<String> {
        let session = self
            .session()
            .ok_or_else(|| Error::UnknownSystem(self.system.clone()))?;
        let Some(user) = session.user.as_deref() else {
            return Err(Error::Unassigned {
                system: self.system.clone(),
            });
        };
        let Some(blob) = session.password.as_deref() else {
            return Err(Error::MissingPassword {
                system: self.system.clone(),
                user: user.to_string(),
            });
        };
        self.run.cipher.decrypt(blob)
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.session().map(|s| &s.settings)
    }

    pub fn is_signed(&self) -> bool {
        self.session().is_some_and(|s| s.signed)
    }

    pub fn sign_on(&mut self) -> Result<()> {
        self.set_signed(true)
    }

    pub fn sign_off(&mut self) -> Result<()> {
        self.set_signed(false)
    }

    fn set_signed(&mut self, signed: bool) -> Result<()> {
        let session = self
            .run
            .state
            .systems
            .get_mut(&self.system)
            .ok_or_else(|| Error::UnknownSystem(self.system.clone()))?;
        session.signed = signed;
        self.run.persist()
    }
}
