// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token revocation stores
//!
//! A blacklist records the `jti` of revoked tokens for a bounded time window.
//! Backends implement the [`Blacklist`] trait:
//!
//! - [`InMemoryBlacklist`]: process-local map, for development and tests
//! - `RedisBlacklist` (feature `redis`): shared between processes, entries
//!   expire in Redis itself
//!
//! Windows shorter than [`MIN_REVOCATION_WINDOW_SECS`] are extended to it
//! by every backend.
//!
//! A lookup for an unknown id is `Ok(false)`. Backend failures are reported
//! as [`BlacklistError`] and the guards reject the request instead of
//! treating the token as valid.

mod memory;
#[cfg(feature = "redis")]
mod redis;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

pub use memory::InMemoryBlacklist;
#[cfg(feature = "redis")]
pub use self::redis::RedisBlacklist;

/// Shortest window a revocation is kept for, in seconds
pub const MIN_REVOCATION_WINDOW_SECS: i64 = 1;

/// The window a backend actually applies for a requested `valid_for`
pub(crate) fn effective_window(valid_for: Duration) -> Duration {
    valid_for.max(Duration::seconds(MIN_REVOCATION_WINDOW_SECS))
}

/// Failure of a revocation backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlacklistError {
    #[error("blacklist backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "redis")]
impl From<::redis::RedisError> for BlacklistError {
    fn from(error: ::redis::RedisError) -> Self {
        BlacklistError::Backend(error.to_string())
    }
}

/// Capability set of a revocation store
#[async_trait]
pub trait Blacklist: Send + Sync {
    /// Returns true if `jti` is currently revoked
    async fn is_revoked(&self, jti: &str) -> Result<bool, BlacklistError>;

    /// Revoke `jti` for `valid_for`
    ///
    /// Revoking the same id again replaces its window. Windows shorter than
    /// [`MIN_REVOCATION_WINDOW_SECS`], zero and negative ones included, are
    /// extended to that minimum.
    async fn revoke(&self, jti: &str, valid_for: Duration) -> Result<(), BlacklistError>;
}
