// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Application hooks run by the guards once a token passed every check
//!
//! Both hooks are optional and registered on the
//! [`JwtManagerBuilder`](crate::auth::JwtManagerBuilder):
//!
//! - a [`ClaimsVerifier`] inspects access tokens and may reject them with
//!   [`JwtError::ClaimsVerification`](crate::JwtError::ClaimsVerification)
//! - a [`UserLoader`] resolves the identity of access and refresh tokens into
//!   a user; finding none rejects the request with
//!   [`JwtError::UserLoad`](crate::JwtError::UserLoad)
//!
//! Plain closures can be used for hooks that need no I/O.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rocket_jwt_extended::auth::{JwtManager, Token};
//! use serde_json::{json, Value};
//!
//! let manager = JwtManager::builder()
//!     .configure(|config| config.secret_key = Some("super-secret".to_string()))
//!     .claims_verifier(Arc::new(|token: &Token| token.private_claims().get("banned").is_none()))
//!     .user_loader(Arc::new(|identity: &Value| {
//!         (identity == "alice").then(|| json!({"name": "alice", "admin": false}))
//!     }))
//!     .build()
//!     .unwrap();
//! ```

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::jwt::Token;

/// Accepts or rejects the claims of a verified access token
#[async_trait]
pub trait ClaimsVerifier: Send + Sync {
    /// Returns false to reject the token
    async fn verify_claims(&self, token: &Token) -> bool;
}

/// Resolves a token identity into the user it stands for
#[async_trait]
pub trait UserLoader: Send + Sync {
    /// The user behind `identity`, `None` if there is no such user
    async fn load_user(&self, identity: &Value) -> Option<Value>;
}

#[async_trait]
impl<F> ClaimsVerifier for F
where
    F: Fn(&Token) -> bool + Send + Sync,
{
    async fn verify_claims(&self, token: &Token) -> bool {
        self(token)
    }
}

#[async_trait]
impl<F> UserLoader for F
where
    F: Fn(&Value) -> Option<Value> + Send + Sync,
{
    async fn load_user(&self, identity: &Value) -> Option<Value> {
        self(identity)
    }
}

/// Identity as shown in error messages, strings without their quotes
pub(crate) fn identity_label(identity: &Value) -> String {
    match identity {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
