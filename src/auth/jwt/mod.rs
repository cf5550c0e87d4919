// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT encoding, decoding and key management
//!
//! - [`keys`]: signing and verification keys for every supported algorithm
//! - [`claims`]: the wire claim set and its validation
//! - [`codec`]: token creation and verification
//! - [`token`]: the read-only view handed to request handlers

pub mod claims;
pub mod codec;
pub mod keys;
pub mod token;

pub use claims::{ClaimSet, Freshness, TokenType};
pub use codec::{EncodeOptions, JwtCodec};
pub use keys::{JwtKeyConfig, KeyType};
pub use token::Token;
