//! Per-user sudo grants.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::config::SUDO_TIMEOUT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SudoGrant {
    pub authenticated: bool,
    pub timestamp: DateTime<Utc>,
}

/// Grants keyed by user id. A grant expires [`SUDO_TIMEOUT`] after the
/// authentication that created it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SudoCache {
    grants: BTreeMap<u32, SudoGrant>,
}

impl SudoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, uid: u32, now: DateTime<Utc>) {
        self.grants.insert(
            uid,
            SudoGrant {
                authenticated: true,
                timestamp: now,
            },
        );
    }

    /// `sudo -k`: the entry stays but no longer authenticates.
    pub fn revoke(&mut self, uid: u32, now: DateTime<Utc>) {
        self.grants.insert(
            uid,
            SudoGrant {
                authenticated: false,
                timestamp: now,
            },
        );
    }

    pub fn get(&self, uid: u32) -> Option<&SudoGrant> {
        self.grants.get(&uid)
    }

    pub fn is_valid_at(&self, uid: u32, now: DateTime<Utc>) -> bool {
        let Some(grant) = self.grants.get(&uid) else {
            return false;
        };
        if !grant.authenticated {
            return false;
        }
        match now.signed_duration_since(grant.timestamp).to_std() {
            Ok(elapsed) => elapsed < SUDO_TIMEOUT,
            // Granted "in the future": clock went backwards
            Err(_) => true,
        }
    }

    pub fn is_valid(&self, uid: u32) -> bool {
        self.is_valid_at(uid, Utc::now())
    }

    pub fn clear(&mut self) {
        self.grants.clear();
    }
}
