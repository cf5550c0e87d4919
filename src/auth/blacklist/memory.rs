// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use tokio::sync::RwLock;

use super::{effective_window, Blacklist, BlacklistError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlacklistEntry {
    revoked: bool,
    revoked_until: DateTime<Utc>,
}

impl BlacklistEntry {
    fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked && now < self.revoked_until
    }
}

/// Process-local blacklist
///
/// Revocations are not shared with other processes and are lost on restart,
/// so this store is only suited to development, tests and single-process
/// deployments. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct InMemoryBlacklist {
    entries: Arc<RwLock<HashMap<String, BlacklistEntry>>>,
}

impl Default for InMemoryBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBlacklist {
    pub fn new() -> Self {
        warn!(
            "Using the in-memory token blacklist: revocations are not shared between processes, do not use it in production"
        );
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Drop every entry whose window has elapsed, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_active_at(now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Blacklist for InMemoryBlacklist {
    async fn is_revoked(&self, jti: &str) -> Result<bool, BlacklistError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(jti)
            .map(|entry| entry.is_active_at(Utc::now()))
            .unwrap_or(false))
    }

    async fn revoke(&self, jti: &str, valid_for: Duration) -> Result<(), BlacklistError> {
        let now = Utc::now();
        let revoked_until = now
            .checked_add_signed(effective_window(valid_for))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_active_at(now));
        entries.insert(
            jti.to_string(),
            BlacklistEntry {
                revoked: true,
                revoked_until,
            },
        );
        debug!("Revoked token {} until {}", jti, revoked_until);
        Ok(())
    }
}
