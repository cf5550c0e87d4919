// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token lifetime setting
//!
//! In YAML an expiry is written either as a number of seconds or as `false`
//! for tokens that never expire:
//!
//! ```yaml
//! access_token_expires: 900
//! refresh_token_expires: false
//! ```

use chrono::Duration;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifetime of an issued token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The token expires this long after it is issued
    After(Duration),
    /// The token carries no `exp` claim at all
    Never,
}

impl Expiry {
    /// Expiry after a number of seconds
    pub fn seconds(seconds: i64) -> Self {
        Expiry::After(Duration::seconds(seconds))
    }

    /// Expiry after a number of minutes
    pub fn minutes(minutes: i64) -> Self {
        Expiry::After(Duration::minutes(minutes))
    }

    /// Expiry after a number of days
    pub fn days(days: i64) -> Self {
        Expiry::After(Duration::days(days))
    }

    /// The lifetime, or `None` for non-expiring tokens
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Expiry::After(duration) => Some(*duration),
            Expiry::Never => None,
        }
    }
}

impl From<Duration> for Expiry {
    fn from(duration: Duration) -> Self {
        Expiry::After(duration)
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expiry::After(duration) => serializer.serialize_i64(duration.num_seconds()),
            Expiry::Never => serializer.serialize_bool(false),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiryRepr {
    Seconds(i64),
    Flag(bool),
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ExpiryRepr::deserialize(deserializer)? {
            ExpiryRepr::Seconds(seconds) => Duration::try_seconds(seconds)
                .map(Expiry::After)
                .ok_or_else(|| D::Error::custom(format!("expiry of {seconds}s is out of range"))),
            ExpiryRepr::Flag(false) => Ok(Expiry::Never),
            ExpiryRepr::Flag(true) => Err(D::Error::custom(
                "expiry must be a number of seconds or `false`",
            )),
        }
    }
}
