// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Extraction of the raw token from a request
//!
//! Locations are scanned in the configured order. A location without a token
//! falls through to the next one; the first location holding anything is
//! used, even if what it holds turns out to be malformed.

use log::debug;

use super::request::AuthRequest;
use crate::auth::jwt::TokenType;
use crate::config::{JwtConfig, TokenLocation};
use crate::error::JwtError;

fn from_header<R: AuthRequest + ?Sized>(
    config: &JwtConfig,
    request: &R,
    kind: TokenType,
) -> Result<String, JwtError> {
    let (key, prefix) = match kind {
        TokenType::Access => (&config.jwt_header_key, &config.jwt_header_prefix),
        TokenType::Refresh => (
            &config.refresh_jwt_header_key,
            &config.refresh_jwt_header_prefix,
        ),
    };

    // A present header is a candidate even when blank
    let value = request
        .header(key)
        .ok_or_else(|| JwtError::NoAuthorization(format!("Missing {} Header", key)))?;

    // <HeaderName>: <Prefix> <JWT>, or <HeaderName>: <JWT> without a prefix
    let parts: Vec<&str> = value.split_whitespace().collect();
    if prefix.is_empty() {
        match parts.as_slice() {
            [token] => Ok(token.to_string()),
            _ => Err(JwtError::InvalidHeader(format!(
                "Bad {} header. Expected value '<JWT>'",
                key
            ))),
        }
    } else {
        match parts.as_slice() {
            [found, token] if *found == prefix.as_str() => Ok(token.to_string()),
            _ => Err(JwtError::InvalidHeader(format!(
                "Bad {} header. Expected value '{} <JWT>'",
                key, prefix
            ))),
        }
    }
}

fn from_query<R: AuthRequest + ?Sized>(config: &JwtConfig, request: &R) -> Result<String, JwtError> {
    let name = &config.jwt_query_param_name;
    request
        .query(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| JwtError::NoAuthorization(format!("Missing \"{}\" query parameter", name)))
}

/// Find the raw token of `kind` in `request`
///
/// # Errors
///
/// - [`JwtError::InvalidHeader`] if the first location holding a value is malformed
/// - [`JwtError::NoAuthorization`] if no location holds a value; with several
///   locations configured the message lists each of them
pub fn locate_token<R: AuthRequest + ?Sized>(
    config: &JwtConfig,
    request: &R,
    kind: TokenType,
) -> Result<String, JwtError> {
    let mut missing = Vec::new();

    for location in &config.token_location {
        let found = match location {
            TokenLocation::Header => from_header(config, request, kind),
            TokenLocation::Query => from_query(config, request),
        };
        match found {
            Ok(token) => {
                debug!("Found {} token in {}", kind, location);
                return Ok(token);
            }
            Err(JwtError::NoAuthorization(reason)) => missing.push(reason),
            Err(other) => return Err(other),
        }
    }

    let message = match config.token_location.as_slice() {
        [_] => missing.pop().unwrap_or_default(),
        [head @ .., last] => format!(
            "Missing JWT in {} or {} ({})",
            head.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            last,
            missing.join("; ")
        ),
        [] => "No token location configured".to_string(),
    };
    Err(JwtError::NoAuthorization(message))
}
