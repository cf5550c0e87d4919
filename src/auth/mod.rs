// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authentication module
//!
//! Token issuing and enforcement for Rocket handlers:
//!
//! - [`jwt`]: keys, claims, codec and the decoded [`Token`] view
//! - [`blacklist`]: revocation stores
//! - [`guards`]: the guard pipeline and the Rocket request guards
//! - [`hooks`]: claims verification and user loading callbacks
//! - [`responses`]: JSON error responses and the error catcher
//! - [`manager`]: the [`JwtManager`] tying everything together

pub mod blacklist;
pub mod guards;
pub mod hooks;
pub mod jwt;
pub mod manager;
pub mod responses;

pub use blacklist::{Blacklist, BlacklistError, InMemoryBlacklist};
#[cfg(feature = "redis")]
pub use blacklist::RedisBlacklist;
pub use guards::{
    attached_token, AuthRequest, FreshJwtRequired, Guard, GuardKind, GuardPolicy, JwtOptional,
    JwtRefreshRequired, JwtRequired, JwtRequiredWith, RolePolicy,
};
pub use hooks::{ClaimsVerifier, UserLoader};
pub use jwt::{EncodeOptions, Freshness, Token, TokenType};
pub use manager::{JwtFairing, JwtManager, JwtManagerBuilder};
pub use responses::{jwt_error_catcher, ErrorHandlers, ErrorResponse};

pub use crate::error::{ErrorKind, JwtError};
