// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket JWT extended library
//!
//! This library issues, verifies and enforces JSON Web Tokens for Rocket
//! request handlers. It provides:
//!
//! - A write-once configuration ([`config::JwtConfig`], [`config::ConfigStore`])
//! - A token codec producing signed access and refresh tokens ([`auth::jwt::JwtCodec`])
//! - A read-only view over decoded claims ([`auth::jwt::Token`])
//! - Pluggable revocation stores ([`auth::blacklist::Blacklist`])
//! - The guard protocol and its Rocket request guards ([`auth::guards`])
//! - Mapping of every failure kind to a JSON error response ([`auth::responses`])
//!
//! # Example
//!
//! ```no_run
//! use rocket_jwt_extended::auth::{EncodeOptions, JwtManager};
//!
//! let manager = JwtManager::builder()
//!     .configure(|config| config.secret_key = Some("super-secret".to_string()))
//!     .build()
//!     .unwrap();
//!
//! let access_token = manager
//!     .create_access_token(&"alice", EncodeOptions::default().fresh(true))
//!     .unwrap();
//! let token = manager.decode_token(&access_token).unwrap();
//! assert_eq!(token.identity(), "alice");
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod server;

pub use error::{ErrorKind, JwtError};
