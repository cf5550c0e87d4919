// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Redis-backed blacklist
//!
//! Each revoked token is stored as `<prefix><jti>` with `SET EX`, so Redis
//! drops the entry when its window elapses.

use async_trait::async_trait;
use chrono::Duration;
use log::{debug, error, info};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;

use super::{effective_window, Blacklist, BlacklistError};

/// Blacklist shared by every process connected to the same Redis server
pub struct RedisBlacklist {
    client: Client,
    key_prefix: String,
    connection: OnceCell<MultiplexedConnection>,
}

impl std::fmt::Debug for RedisBlacklist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBlacklist")
            .field("key_prefix", &self.key_prefix)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisBlacklist {
    /// Create a blacklist for the server at `url` (e.g. `redis://127.0.0.1:6379`)
    ///
    /// The connection is opened lazily on first use.
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, BlacklistError> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            connection: OnceCell::new(),
        })
    }

    fn key(&self, jti: &str) -> String {
        format!("{}{}", self.key_prefix, jti)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, BlacklistError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                match self.client.get_multiplexed_async_connection().await {
                    Ok(connection) => {
                        info!("Connected to the Redis token blacklist");
                        Ok(connection)
                    }
                    Err(e) => {
                        error!("Redis connection error: {}", e);
                        Err(BlacklistError::from(e))
                    }
                }
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl Blacklist for RedisBlacklist {
    async fn is_revoked(&self, jti: &str) -> Result<bool, BlacklistError> {
        let mut connection = self.connection().await?;
        let revoked: bool = connection.exists(self.key(jti)).await?;
        Ok(revoked)
    }

    async fn revoke(&self, jti: &str, valid_for: Duration) -> Result<(), BlacklistError> {
        // SET EX takes whole seconds, round up
        let window = effective_window(valid_for);
        let seconds = (window.num_seconds() + i64::from(window.subsec_nanos() > 0)) as u64;
        let mut connection = self.connection().await?;
        let _: () = connection.set_ex(self.key(jti), "revoked", seconds).await?;
        debug!("Revoked token {} in Redis for {}s", jti, seconds);
        Ok(())
    }
}
