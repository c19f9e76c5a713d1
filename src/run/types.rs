use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalogue::{OrderedMap, Settings};

/// Lifecycle of one run id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    /// No session group held yet
    Unassigned,
    /// Holding a session group
    Assigned,
    /// Locks dropped and state cleared; terminal for this run id
    Released,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Unassigned => write!(f, "Unassigned"),
            RunPhase::Assigned => write!(f, "Assigned"),
            RunPhase::Released => write!(f, "Released"),
        }
    }
}

/// Credentials of one system for the current run. The password stays encrypted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSession {
    /// Assigned user, `None` while the session group leaves it unset
    pub user: Option<String>,
    /// Encrypted password blob from the catalogue
    pub password: Option<String>,
    #[serde(default)]
    pub signed: bool,
    /// Common settings of the system
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: Option<String>,
    #[serde(default)]
    pub run_error: bool,
    /// Session group held by this run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub systems: OrderedMap<SystemSession>,
}

impl RunState {
    pub fn phase(&self) -> RunPhase {
        if self.run_id.is_some() && self.group.is_some() {
            RunPhase::Assigned
        } else {
            RunPhase::Unassigned
        }
    }

    /// Previously recorded signed flag of `system`, if any.
    pub fn signed_flag(&self, system: &str) -> Option<bool> {
        self.systems.get(system).map(|s| s.signed)
    }

    /// Back to `{runId: null, runError: false}`.
    pub fn reset(&mut self) {
        *self = RunState::default();
    }
}
