// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Read-only view over a verified token

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::claims::{ClaimSet, Freshness, TokenType};
use crate::error::JwtError;

/// A decoded and verified token
///
/// Built on every successful decode and handed to request handlers by the
/// guards. It never changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    claims: ClaimSet,
    raw: String,
    user: Option<Value>,
}

fn timestamp(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

impl Token {
    pub(crate) fn new(claims: ClaimSet, raw: impl Into<String>) -> Self {
        Self {
            claims,
            raw: raw.into(),
            user: None,
        }
    }

    pub(crate) fn with_user(mut self, user: Value) -> Self {
        self.user = Some(user);
        self
    }

    /// Unique id of the token, used by the blacklist
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    /// Identity as it was passed to the token creation
    pub fn identity(&self) -> &Value {
        &self.claims.identity
    }

    /// Deserialize the identity into a concrete type
    pub fn identity_as<T: DeserializeOwned>(&self) -> Result<T, JwtError> {
        serde_json::from_value(self.claims.identity.clone())
            .map_err(|e| JwtError::Decode(format!("Unexpected identity: {}", e)))
    }

    pub fn token_type(&self) -> TokenType {
        self.claims.token_type
    }

    /// Freshness claim, `None` for refresh tokens
    pub fn fresh(&self) -> Option<Freshness> {
        self.claims.fresh
    }

    /// Returns true if this is an access token that is fresh right now
    pub fn is_fresh(&self) -> bool {
        self.claims
            .fresh
            .map(|fresh| fresh.is_fresh_at(Utc::now().timestamp()))
            .unwrap_or(false)
    }

    pub fn role(&self) -> Option<&str> {
        self.claims.role.as_deref()
    }

    /// Expiry time, `None` for non-expiring tokens
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.claims.exp)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.claims.iat)
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        timestamp(self.claims.nbf)
    }

    /// Time left before expiry, `None` for non-expiring tokens
    ///
    /// Never negative.
    pub fn remaining_lifetime(&self) -> Option<Duration> {
        self.claims.exp.map(|exp| {
            let left = exp - Utc::now().timestamp();
            Duration::seconds(left.max(0))
        })
    }

    pub fn public_claims(&self) -> &Map<String, Value> {
        &self.claims.public_claims
    }

    pub fn private_claims(&self) -> &Map<String, Value> {
        &self.claims.private_claims
    }

    /// The complete verified payload
    pub fn raw_claims(&self) -> &Map<String, Value> {
        &self.claims.raw
    }

    /// The compact token string this view was decoded from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// User resolved by the manager's user loader, if one is registered
    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }
}
