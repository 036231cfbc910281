// ── Account registry ──
//
// Process-wide map from account to its coordinator. Owned by the host
// and passed explicitly to setup/teardown.

use std::fmt;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pettracer_api::DeviceSource;

use crate::coordinator::Coordinator;
use crate::error::SetupError;

/// Account key: the login name, case-folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn from_username(username: &str) -> Self {
        Self(username.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One coordinator per configured account.
pub struct Registry<S: DeviceSource> {
    coordinators: DashMap<AccountId, Coordinator<S>>,
}

impl<S: DeviceSource> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DeviceSource> Registry<S> {
    pub fn new() -> Self {
        Self {
            coordinators: DashMap::new(),
        }
    }

    /// Register `coordinator` under `account`. Rejects a second
    /// registration for the same account.
    pub fn insert(&self, account: AccountId, coordinator: Coordinator<S>) -> Result<(), SetupError> {
        match self.coordinators.entry(account) {
            Entry::Occupied(entry) => Err(SetupError::AlreadyConfigured {
                account: entry.key().to_string(),
            }),
            Entry::Vacant(entry) => {
                info!(account = %entry.key(), "account registered");
                entry.insert(coordinator);
                Ok(())
            }
        }
    }

    pub fn get(&self, account: &AccountId) -> Option<Coordinator<S>> {
        self.coordinators.get(account).map(|c| c.value().clone())
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.coordinators.contains_key(account)
    }

    /// Remove and return the coordinator. Does not stop it.
    pub fn remove(&self, account: &AccountId) -> Option<Coordinator<S>> {
        let removed = self.coordinators.remove(account).map(|(_, c)| c);
        if removed.is_some() {
            debug!(account = %account, "account removed from registry");
        }
        removed
    }

    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<_> = self.coordinators.iter().map(|e| e.key().clone()).collect();
        accounts.sort();
        accounts
    }

    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }
}
