// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claim set of a decoded token
//!
//! The wire payload is a flat JSON object. [`ClaimSet::from_claims`] checks
//! the reserved claims the codec relies on and splits the payload into typed
//! fields, using the claim names of the active [`JwtConfig`].

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::JwtConfig;
use crate::error::JwtError;

/// Kind of token, written to the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// Wire value of the `type` claim
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `fresh` claim
///
/// Either a plain flag or the Unix timestamp at which the token stops being
/// fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Freshness {
    Flag(bool),
    Until(i64),
}

impl Freshness {
    /// Fresh for `duration` from now
    pub fn lasting(duration: Duration) -> Self {
        Freshness::Until(chrono::Utc::now().timestamp() + duration.num_seconds())
    }

    /// Returns true if the token counts as fresh at Unix time `now`
    ///
    /// A timestamp stays fresh up to and including that second.
    pub fn is_fresh_at(self, now: i64) -> bool {
        match self {
            Freshness::Flag(fresh) => fresh,
            Freshness::Until(until) => until >= now,
        }
    }
}

impl From<bool> for Freshness {
    fn from(fresh: bool) -> Self {
        Freshness::Flag(fresh)
    }
}

impl From<Duration> for Freshness {
    fn from(duration: Duration) -> Self {
        Freshness::lasting(duration)
    }
}

/// Reserved and custom claims of a verified token
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSet {
    pub jti: String,
    pub identity: Value,
    pub token_type: TokenType,
    /// Always set for access tokens, never for refresh tokens
    pub fresh: Option<Freshness>,
    pub role: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub nbf: Option<i64>,
    pub public_claims: Map<String, Value>,
    pub private_claims: Map<String, Value>,
    /// The complete payload as received
    pub raw: Map<String, Value>,
}

fn missing(claim: &str) -> JwtError {
    JwtError::Decode(format!("Missing claim: {}", claim))
}

fn nested_object(
    claims: &Map<String, Value>,
    key: &str,
) -> Result<Map<String, Value>, JwtError> {
    match claims.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(JwtError::Decode(format!("Claim {} must be an object", key))),
    }
}

impl ClaimSet {
    /// Validate the structure of a verified payload
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::Decode`] if `jti`, the identity claim, `type` or,
    /// for access tokens, `fresh` is missing, if `type` is neither `access`
    /// nor `refresh`, or if a claim has the wrong JSON type.
    pub fn from_claims(claims: Map<String, Value>, config: &JwtConfig) -> Result<Self, JwtError> {
        let jti = match claims.get("jti") {
            Some(Value::String(jti)) if !jti.is_empty() => jti.clone(),
            Some(_) => return Err(JwtError::Decode("Claim jti must be a string".to_string())),
            None => return Err(missing("jti")),
        };

        let identity = claims
            .get(&config.identity_claim_key)
            .cloned()
            .ok_or_else(|| missing(&config.identity_claim_key))?;

        let token_type = match claims.get("type") {
            Some(Value::String(kind)) if kind == "access" => TokenType::Access,
            Some(Value::String(kind)) if kind == "refresh" => TokenType::Refresh,
            Some(other) => {
                return Err(JwtError::Decode(format!(
                    "Invalid token type: {}",
                    other
                )))
            }
            None => return Err(missing("type")),
        };

        let fresh = match token_type {
            TokenType::Access => {
                let value = claims.get("fresh").cloned().ok_or_else(|| missing("fresh"))?;
                let fresh = serde_json::from_value::<Freshness>(value).map_err(|_| {
                    JwtError::Decode("Claim fresh must be a boolean or a timestamp".to_string())
                })?;
                Some(fresh)
            }
            TokenType::Refresh => None,
        };

        let role = match claims.get(&config.acl_claim) {
            _ if !config.use_acl => None,
            None | Some(Value::Null) => None,
            Some(Value::String(role)) => Some(role.clone()),
            Some(_) => {
                return Err(JwtError::Decode(format!(
                    "Claim {} must be a string",
                    config.acl_claim
                )))
            }
        };

        let public_claims = if config.public_claim_namespace.is_empty() {
            Map::new()
        } else {
            nested_object(&claims, &config.public_claim_namespace)?
        };
        let private_claims = nested_object(&claims, &config.private_claim_prefix)?;

        let timestamp = |key: &str| claims.get(key).and_then(Value::as_i64);

        Ok(Self {
            jti,
            identity,
            token_type,
            fresh,
            role,
            exp: timestamp("exp"),
            iat: timestamp("iat"),
            nbf: timestamp("nbf"),
            public_claims,
            private_claims,
            raw: claims,
        })
    }
}
