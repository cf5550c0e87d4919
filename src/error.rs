// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy shared by the codec, the guards and the manager
//!
//! Every failure raised while issuing or enforcing a token is a [`JwtError`].
//! Each variant maps to a stable [`ErrorKind`], which in turn carries the
//! default HTTP status used by the error renderers in
//! [`crate::auth::responses`].

use rocket::http::Status;
use thiserror::Error;

use crate::auth::blacklist::BlacklistError;

/// Errors raised by token creation, decoding and the guard protocol
///
/// The enum is `Clone` so that a rejected request can keep a copy of the
/// error in Rocket's request-local cache for the error catcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    /// No candidate token was found at any configured location
    #[error("{0}")]
    NoAuthorization(String),

    /// A token location was present but malformed (wrong prefix, wrong part count)
    #[error("{0}")]
    InvalidHeader(String),

    /// The signature was valid but the claim set is structurally invalid
    #[error("{0}")]
    Decode(String),

    /// Signature, structure or algorithm verification failed
    #[error("{0}")]
    InvalidToken(String),

    /// The `exp` claim lies in the past
    #[error("Token has expired")]
    ExpiredToken,

    /// An access token was presented where a refresh token is expected, or vice versa
    #[error("{0}")]
    WrongToken(String),

    /// The endpoint requires a fresh access token
    #[error("Fresh token required")]
    FreshTokenRequired,

    /// The token id is present in the blacklist
    #[error("Token has been revoked")]
    RevokedToken,

    /// The role claim is missing or rejected by the guard's role policy
    #[error("{0}")]
    AccessDenied(String),

    /// The claims verifier rejected the token
    #[error("User claims verification failed")]
    ClaimsVerification,

    /// The user loader found no user for the token identity
    #[error("Error loading the user {0}")]
    UserLoad(String),

    /// The revocation store could not answer
    #[error("Token blacklist unavailable: {0}")]
    Store(String),

    /// Programmer error: inconsistent configuration or API misuse
    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),
}

/// Discriminant of [`JwtError`], used as the key of the error renderer registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoAuthorization,
    InvalidHeader,
    Decode,
    InvalidToken,
    ExpiredToken,
    WrongToken,
    FreshTokenRequired,
    RevokedToken,
    AccessDenied,
    ClaimsVerification,
    UserLoad,
    Store,
    ConfigurationConflict,
}

impl ErrorKind {
    /// All error kinds, in taxonomy order
    pub const ALL: [ErrorKind; 13] = [
        ErrorKind::NoAuthorization,
        ErrorKind::InvalidHeader,
        ErrorKind::Decode,
        ErrorKind::InvalidToken,
        ErrorKind::ExpiredToken,
        ErrorKind::WrongToken,
        ErrorKind::FreshTokenRequired,
        ErrorKind::RevokedToken,
        ErrorKind::AccessDenied,
        ErrorKind::ClaimsVerification,
        ErrorKind::UserLoad,
        ErrorKind::Store,
        ErrorKind::ConfigurationConflict,
    ];

    /// Default HTTP status for this kind of error
    ///
    /// | Kind | Status |
    /// |------|--------|
    /// | NoAuthorization, ExpiredToken, FreshTokenRequired, RevokedToken, AccessDenied, UserLoad | 401 |
    /// | ClaimsVerification | 400 |
    /// | InvalidHeader, Decode, InvalidToken, WrongToken | 422 |
    /// | Store | 503 |
    /// | ConfigurationConflict | 500 |
    pub fn default_status(self) -> Status {
        match self {
            ErrorKind::NoAuthorization
            | ErrorKind::ExpiredToken
            | ErrorKind::FreshTokenRequired
            | ErrorKind::RevokedToken
            | ErrorKind::AccessDenied
            | ErrorKind::UserLoad => Status::Unauthorized,
            ErrorKind::ClaimsVerification => Status::BadRequest,
            ErrorKind::InvalidHeader
            | ErrorKind::Decode
            | ErrorKind::InvalidToken
            | ErrorKind::WrongToken => Status::UnprocessableEntity,
            ErrorKind::Store => Status::ServiceUnavailable,
            ErrorKind::ConfigurationConflict => Status::InternalServerError,
        }
    }
}

impl JwtError {
    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            JwtError::NoAuthorization(_) => ErrorKind::NoAuthorization,
            JwtError::InvalidHeader(_) => ErrorKind::InvalidHeader,
            JwtError::Decode(_) => ErrorKind::Decode,
            JwtError::InvalidToken(_) => ErrorKind::InvalidToken,
            JwtError::ExpiredToken => ErrorKind::ExpiredToken,
            JwtError::WrongToken(_) => ErrorKind::WrongToken,
            JwtError::FreshTokenRequired => ErrorKind::FreshTokenRequired,
            JwtError::RevokedToken => ErrorKind::RevokedToken,
            JwtError::AccessDenied(_) => ErrorKind::AccessDenied,
            JwtError::ClaimsVerification => ErrorKind::ClaimsVerification,
            JwtError::UserLoad(_) => ErrorKind::UserLoad,
            JwtError::Store(_) => ErrorKind::Store,
            JwtError::ConfigurationConflict(_) => ErrorKind::ConfigurationConflict,
        }
    }

    /// Default HTTP status for this error, see [`ErrorKind::default_status`]
    pub fn status(&self) -> Status {
        self.kind().default_status()
    }

    /// Shorthand for building a [`JwtError::ConfigurationConflict`]
    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        JwtError::ConfigurationConflict(message.into())
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
            _ => JwtError::InvalidToken(error.to_string()),
        }
    }
}

impl From<BlacklistError> for JwtError {
    fn from(error: BlacklistError) -> Self {
        JwtError::Store(error.to_string())
    }
}
