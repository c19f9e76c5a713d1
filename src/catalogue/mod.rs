//! The credential catalogue: common settings, session groups and encrypted passwords.
//!
//! Catalogue edits are an administrative, single-writer activity. The
//! document is always saved whole, so two editors running at once silently
//! lose one side's changes. Never edit it while runs are allocating.

mod ordered;
pub mod store;


use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

use crate::crypto::CredentialCipher;
use crate::error::{Error, Result};
use crate::validation::validate_lock_name;

pub use ordered::OrderedMap;
pub use store::{edit, initialize, load, save};

/// Free-form settings shared by every user of a credential system.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Sentinel written into the document for a system with no user yet.
pub const UNSET_USER: &str = "<setUser>";

/// The user a session group assigns to one credential system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionUser {
    /// No user assigned yet; stored as [`UNSET_USER`]
    #[default]
    Unset,
    User(String),
}

impl SessionUser {
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() || raw == UNSET_USER {
            SessionUser::Unset
        } else {
            SessionUser::User(raw.to_string())
        }
    }

    pub fn as_user(&self) -> Option<&str> {
        match self {
            SessionUser::Unset => None,
            SessionUser::User(user) => Some(user),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, SessionUser::Unset)
    }

    /// Key this user's password is stored under.
    pub fn password_key(&self) -> &str {
        self.as_user().unwrap_or(UNSET_USER)
    }
}

impl fmt::Display for SessionUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.password_key())
    }
}

impl Serialize for SessionUser {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.password_key())
    }
}

impl<'de> Deserialize<'de> for SessionUser {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SessionUser::from_raw(&raw))
    }
}

/// One session group: credential system → assigned user.
pub type SessionGroup = OrderedMap<SessionUser>;

/// An edit to the catalogue, applied with [`Catalogue::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogueCommand {
    AddSession {
        name: String,
    },
    DeleteSession {
        name: String,
    },
    RenameSession {
        from: String,
        to: String,
    },
    /// Assign `user` to `system` in `session`, optionally setting the password too.
    SetUser {
        session: String,
        system: String,
        user: String,
        password: Option<String>,
    },
    AddCredential {
        system: String,
        settings: Settings,
        user: Option<String>,
        password: String,
    },
    DeleteCredential {
        system: String,
    },
    RenameCredential {
        from: String,
        to: String,
    },
    SetPassword {
        system: String,
        user: String,
        password: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalogue {
    common: OrderedMap<Settings>,
    group_sessions: OrderedMap<SessionGroup>,
    passwords: OrderedMap<OrderedMap<String>>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn common(&self) -> &OrderedMap<Settings> {
        &self.common
    }

    pub fn group_sessions(&self) -> &OrderedMap<SessionGroup> {
        &self.group_sessions
    }

    pub fn passwords(&self) -> &OrderedMap<OrderedMap<String>> {
        &self.passwords
    }

    pub fn session(&self, name: &str) -> Option<&SessionGroup> {
        self.group_sessions.get(name)
    }

    /// Session group names in declaration order.
    pub fn session_names(&self) -> impl Iterator<Item = &str> {
        self.group_sessions.keys()
    }

    pub fn settings(&self, system: &str) -> Option<&Settings> {
        self.common.get(system)
    }

    /// Encrypted password blob for `user` on `system`.
    pub fn password_blob(&self, system: &str, user: &str) -> Option<&str> {
        self.passwords
            .get(system)
            .and_then(|users| users.get(user))
            .map(String::as_str)
    }

    /// Check that every system used by a session group is registered in
    /// `common` and `passwords`, and that group names are usable as lock names.
    pub fn validate(&self) -> Result<()> {
        for (session, group) in self.group_sessions.iter() {
            validate_lock_name(session).map_err(|e| {
                Error::InvalidCatalogue(format!("session group name '{session}': {e}"))
            })?;
            for system in group.keys() {
                if !self.common.contains_key(system) {
                    return Err(Error::InvalidCatalogue(format!(
                        "session group '{session}' uses credential system '{system}' missing from common"
                    )));
                }
                if !self.passwords.contains_key(system) {
                    return Err(Error::InvalidCatalogue(format!(
                        "session group '{session}' uses credential system '{system}' missing from passwords"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create a session group with every registered system set to unset.
    ///
    /// An existing group of the same name is reset.
    pub fn add_session(&mut self, name: &str) -> Result<()> {
        validate_lock_name(name)?;
        let group: SessionGroup = self
            .common
            .keys()
            .map(|system| (system.to_string(), SessionUser::Unset))
            .collect();
        if self.group_sessions.insert(name, group).is_some() {
            warn!(session = name, "session group already existed and was reset");
        }
        Ok(())
    }

    /// Remove a session group. Returns false if it did not exist.
    pub fn delete_session(&mut self, name: &str) -> bool {
        self.group_sessions.remove(name).is_some()
    }

    pub fn rename_session(&mut self, from: &str, to: &str) -> Result<()> {
        validate_lock_name(to)?;
        if !self.group_sessions.contains_key(from) {
            return Err(Error::UnknownSession(from.to_string()));
        }
        if !self.group_sessions.rename_key(from, to) {
            return Err(Error::InvalidCatalogue(format!(
                "session group '{to}' already exists"
            )));
        }
        Ok(())
    }

    /// Register (or update) a credential system.
    ///
    /// `settings` are merged into the system's common settings. Every session
    /// group gets the system with `user` (unset when `None`), overwriting any
    /// previous assignment, and that user's password is set to `password`.
    pub fn add_credential(
        &mut self,
        system: &str,
        settings: Settings,
        user: Option<&str>,
        password: &str,
        cipher: &CredentialCipher,
    ) -> Result<()> {
        let user = user.map(SessionUser::from_raw).unwrap_or_default();
        // Encrypt before touching anything so a failure leaves the catalogue as it was.
        let blob = cipher.encrypt(password)?;

        let common = self.common.get_or_insert_with(system, Settings::new);
        common.extend(settings);

        for group in self.group_sessions.values_mut() {
            group.insert(system, user.clone());
        }

        self.passwords
            .get_or_insert_with(system, OrderedMap::new)
            .insert(user.password_key(), blob);
        Ok(())
    }

    /// Remove a credential system from `common`, every session group and
    /// `passwords`. Returns false if it was not present anywhere.
    pub fn delete_credential(&mut self, system: &str) -> bool {
        let mut removed = self.common.remove(system).is_some();
        for group in self.group_sessions.values_mut() {
            removed |= group.remove(system).is_some();
        }
        removed |= self.passwords.remove(system).is_some();
        removed
    }

    pub fn rename_credential(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.common.contains_key(from) {
            return Err(Error::UnknownSystem(from.to_string()));
        }
        if self.common.contains_key(to) || self.passwords.contains_key(to) {
            return Err(Error::InvalidCatalogue(format!(
                "credential system '{to}' already exists"
            )));
        }

        self.common.rename_key(from, to);
        for group in self.group_sessions.values_mut() {
            group.rename_key(from, to);
        }
        self.passwords.rename_key(from, to);
        Ok(())
    }

    /// Assign `user` to an existing system entry of a session group.
    ///
    /// Never registers a system from the session side: an unknown session or a
    /// system the session does not carry is logged and skipped (`Ok(false)`).
    pub fn set_user(
        &mut self,
        session: &str,
        system: &str,
        user: &str,
        password: Option<&str>,
        cipher: &CredentialCipher,
    ) -> Result<bool> {
        let Some(group) = self.group_sessions.get(session) else {
            warn!(session, "session group not found in catalogue, skipping");
            return Ok(false);
        };
        if !group.contains_key(system) {
            warn!(
                session,
                system, "credential system not registered for session group, skipping"
            );
            return Ok(false);
        }

        let user = SessionUser::from_raw(user);
        if let Some(password) = password {
            self.set_password(system, user.password_key(), password, cipher)?;
        }
        if let Some(group) = self.group_sessions.get_mut(session) {
            group.insert(system, user);
        }
        Ok(true)
    }

    /// Encrypt and store a password, creating the nested maps as needed.
    pub fn set_password(
        &mut self,
        system: &str,
        user: &str,
        plaintext: &str,
        cipher: &CredentialCipher,
    ) -> Result<()> {
        let blob = cipher.encrypt(plaintext)?;
        self.passwords
            .get_or_insert_with(system, OrderedMap::new)
            .insert(user, blob);
        Ok(())
    }

    pub fn apply(&mut self, command: &CatalogueCommand, cipher: &CredentialCipher) -> Result<()> {
        match command {
            CatalogueCommand::AddSession { name } => self.add_session(name),
            CatalogueCommand::DeleteSession { name } => {
                if !self.delete_session(name) {
                    warn!(session = name.as_str(), "session group not found, nothing deleted");
                }
                Ok(())
            }
            CatalogueCommand::RenameSession { from, to } => self.rename_session(from, to),
            CatalogueCommand::SetUser {
                session,
                system,
                user,
                password,
            } => self
                .set_user(session, system, user, password.as_deref(), cipher)
                .map(|_| ()),
            CatalogueCommand::AddCredential {
                system,
                settings,
                user,
                password,
            } => self.add_credential(system, settings.clone(), user.as_deref(), password, cipher),
            CatalogueCommand::DeleteCredential { system } => {
                if !self.delete_credential(system) {
                    warn!(system = system.as_str(), "credential system not found, nothing deleted");
                }
                Ok(())
            }
            CatalogueCommand::RenameCredential { from, to } => self.rename_credential(from, to),
            CatalogueCommand::SetPassword {
                system,
                user,
                password,
            } => self.set_password(system, user, password, cipher),
        }
    }
}
