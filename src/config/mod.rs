// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for JWT issuing and verification
//!
//! This module provides functionality for loading, validating, and freezing
//! the JWT configuration. The configuration is backed by a YAML file and
//! validated against a JSON schema before deserialization.
//!
//! ## Key material
//!
//! The configuration supports both HMAC and asymmetric JWT signing:
//! - HMAC (`HS256`, `HS384`, `HS512`): only `secret_key` must be set
//! - RSA, RSA-PSS, EC and EdDSA: both `public_key` and `private_key` must be set,
//!   as PEM text or base64-encoded PEM
//!
//! Setting both kinds of key material, or neither, is a configuration conflict.
//!
//! ## Usage
//!
//! ```no_run
//! use rocket_jwt_extended::config::{ConfigStore, JwtConfig};
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let config = JwtConfig::from_file(Path::new("jwt.yaml")).unwrap();
//!
//! let store = ConfigStore::new(config);
//! store.update(|config| config.use_blacklist = true).unwrap();
//! let frozen = store.freeze().unwrap();
//!
//! // Writes after the freeze are rejected
//! assert!(store.update(|config| config.use_acl = true).is_err());
//! println!("Tokens are signed with {:?}", frozen.algorithm);
//! ```

pub mod expiry;
pub mod store;
pub mod utils;

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use jsonwebtoken::Algorithm;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::error::JwtError;

pub use expiry::Expiry;
pub use store::ConfigStore;
pub use utils::{output_config_schema, validate_specific_rules};

/// Claim names written by the codec itself
///
/// Configurable claim keys (identity, role, public namespace, private prefix)
/// must not collide with any of them.
pub const RESERVED_CLAIMS: [&str; 8] = ["iat", "nbf", "jti", "exp", "type", "fresh", "iss", "aud"];

/// Placeholder HMAC secret written to generated configuration files
pub const SAMPLE_SECRET: &str = "change-me";

/// Place of an incoming request where a raw token may be found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenLocation {
    /// `<HeaderKey>: <Prefix> <token>`
    Header,
    /// `?<param>=<token>`
    Query,
}

impl fmt::Display for TokenLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenLocation::Header => write!(f, "header"),
            TokenLocation::Query => write!(f, "query"),
        }
    }
}

/// JWT configuration
///
/// Every field has a default, so a configuration file only needs the key
/// material. Once handed to a [`ConfigStore`] and frozen, the configuration
/// is shared read-only behind an `Arc`.
///
/// # Example
///
/// ```
/// use rocket_jwt_extended::config::{Expiry, JwtConfig, TokenLocation};
///
/// let config = JwtConfig {
///     secret_key: Some("super-secret".to_string()),
///     access_token_expires: Expiry::minutes(5),
///     token_location: vec![TokenLocation::Header, TokenLocation::Query],
///     use_acl: true,
///     ..JwtConfig::default()
/// };
/// assert!(config.check_consistency().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JwtConfig {
    /// HMAC secret, used only by the `HS*` algorithms
    pub secret_key: Option<String>,

    /// Public key (PEM or base64-encoded PEM) for asymmetric algorithms
    pub public_key: Option<String>,

    /// Private key (PEM or base64-encoded PEM) for asymmetric algorithms
    pub private_key: Option<String>,

    /// Signing algorithm
    pub algorithm: Algorithm,

    /// Issuer written to `iss` and required on decode when set
    pub default_issuer: Option<String>,

    /// Audience written to `aud` and required on decode when set
    pub default_audience: Option<String>,

    /// Lifetime of access tokens
    pub access_token_expires: Expiry,

    /// Lifetime of refresh tokens
    pub refresh_token_expires: Expiry,

    /// Claim holding the caller-supplied identity
    pub identity_claim_key: String,

    /// Claim under which public claims are nested; public claims are refused while empty
    pub public_claim_namespace: String,

    /// Claim under which private claims are nested
    pub private_claim_prefix: String,

    /// Ordered list of places to look for a token
    pub token_location: Vec<TokenLocation>,

    /// Header carrying access tokens
    pub jwt_header_key: String,

    /// Prefix expected before the token in the access header; may be empty
    pub jwt_header_prefix: String,

    /// Header carrying refresh tokens
    pub refresh_jwt_header_key: String,

    /// Prefix expected before the token in the refresh header; may be empty
    pub refresh_jwt_header_prefix: String,

    /// Query parameter carrying the token
    pub jwt_query_param_name: String,

    /// Enables the role claim and role-based guards
    pub use_acl: bool,

    /// Claim holding the role
    pub acl_claim: String,

    /// Enables revocation checks in every guard
    pub use_blacklist: bool,

    /// JSON key of the error message in error responses
    pub error_msg_key: String,

    /// HTTP methods that bypass token verification
    pub exempt_methods: Vec<String>,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            public_key: None,
            private_key: None,
            algorithm: Algorithm::HS256,
            default_issuer: None,
            default_audience: None,
            access_token_expires: Expiry::minutes(15),
            refresh_token_expires: Expiry::days(30),
            identity_claim_key: "identity".to_string(),
            public_claim_namespace: String::new(),
            private_claim_prefix: "private".to_string(),
            token_location: vec![TokenLocation::Header],
            jwt_header_key: "Authorization".to_string(),
            jwt_header_prefix: "Bearer".to_string(),
            refresh_jwt_header_key: "Authorization".to_string(),
            refresh_jwt_header_prefix: "Bearer".to_string(),
            jwt_query_param_name: "jwt".to_string(),
            use_acl: false,
            acl_claim: "role".to_string(),
            use_blacklist: false,
            error_msg_key: "msg".to_string(),
            exempt_methods: vec!["OPTIONS".to_string()],
        }
    }
}

/// Returns true for the HMAC family of algorithms
pub fn is_symmetric(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl JwtConfig {
    /// The HMAC secret, if set and not blank
    pub fn secret(&self) -> Option<&str> {
        non_empty(&self.secret_key)
    }

    /// The public key text, if set and not blank
    pub fn public_key_text(&self) -> Option<&str> {
        non_empty(&self.public_key)
    }

    /// The private key text, if set and not blank
    pub fn private_key_text(&self) -> Option<&str> {
        non_empty(&self.private_key)
    }

    /// Returns true if the placeholder secret of generated files is in use
    pub fn uses_sample_secret(&self) -> bool {
        is_symmetric(self.algorithm) && self.secret() == Some(SAMPLE_SECRET)
    }

    /// Returns true if requests using `method` skip token verification
    pub fn is_exempt(&self, method: &str) -> bool {
        self.exempt_methods
            .iter()
            .any(|exempt| exempt.eq_ignore_ascii_case(method))
    }

    /// Check the invariants a configuration must satisfy before it is frozen
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationConflict`] if:
    /// - an `HS*` algorithm is used without a secret, or with a public/private key
    /// - an asymmetric algorithm is used without both keys, or with a secret
    /// - no token location is configured
    /// - a claim key is empty or collides with a reserved claim or another key
    pub fn check_consistency(&self) -> Result<(), JwtError> {
        let has_secret = self.secret().is_some();
        let has_public = self.public_key_text().is_some();
        let has_private = self.private_key_text().is_some();

        if is_symmetric(self.algorithm) {
            if !has_secret {
                return Err(JwtError::conflict(format!(
                    "algorithm {:?} requires secret_key",
                    self.algorithm
                )));
            }
            if has_public || has_private {
                return Err(JwtError::conflict(format!(
                    "algorithm {:?} uses secret_key only, public_key and private_key must not be set",
                    self.algorithm
                )));
            }
        } else {
            if has_secret {
                return Err(JwtError::conflict(format!(
                    "algorithm {:?} uses a key pair, secret_key must not be set",
                    self.algorithm
                )));
            }
            if !(has_public && has_private) {
                return Err(JwtError::conflict(format!(
                    "algorithm {:?} requires both public_key and private_key",
                    self.algorithm
                )));
            }
        }

        if self.token_location.is_empty() {
            return Err(JwtError::conflict("token_location must not be empty"));
        }
        if self.jwt_header_key.trim().is_empty() || self.refresh_jwt_header_key.trim().is_empty()
        {
            return Err(JwtError::conflict("header keys must not be empty"));
        }
        if self.jwt_query_param_name.trim().is_empty() {
            return Err(JwtError::conflict("jwt_query_param_name must not be empty"));
        }
        if self.error_msg_key.is_empty() {
            return Err(JwtError::conflict("error_msg_key must not be empty"));
        }

        let mut claim_keys = vec![
            ("identity_claim_key", self.identity_claim_key.as_str()),
            ("acl_claim", self.acl_claim.as_str()),
            ("private_claim_prefix", self.private_claim_prefix.as_str()),
        ];
        if !self.public_claim_namespace.is_empty() {
            claim_keys.push(("public_claim_namespace", self.public_claim_namespace.as_str()));
        }
        for (index, (name, key)) in claim_keys.iter().enumerate() {
            if key.is_empty() {
                return Err(JwtError::conflict(format!("{name} must not be empty")));
            }
            if RESERVED_CLAIMS.contains(key) {
                return Err(JwtError::conflict(format!(
                    "{name} '{key}' collides with a reserved claim"
                )));
            }
            if let Some((other, _)) = claim_keys[..index].iter().find(|(_, k)| k == key) {
                return Err(JwtError::conflict(format!(
                    "{name} and {other} both use the claim '{key}'"
                )));
            }
        }

        Ok(())
    }

    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::sample()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// A default configuration with a placeholder secret, used for generated files
    pub fn sample() -> Self {
        Self {
            secret_key: Some(SAMPLE_SECRET.to_string()),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    ///
    /// If the file does not exist, a sample configuration is written there and
    /// returned. If the file fails schema validation, deserialization or the
    /// specific rules, a `<name>.sample.yaml` file is generated next to it and
    /// an error is returned.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::sample();
            default_config.save_to_file(path)?;
            warn!(
                "Created {:?} with the placeholder secret '{}', set secret_key before deploying",
                path, SAMPLE_SECRET
            );
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // YAML to a generic value, then to JSON for schema validation
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: JwtConfig = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values
    ///
    /// Only values that are explicitly provided override the file.
    ///
    /// # Example
    ///
    /// ```
    /// use rocket_jwt_extended::config::JwtConfig;
    ///
    /// let mut config = JwtConfig::default();
    /// config.apply_args(Some("new_secret".to_string()), Some(true));
    /// assert_eq!(config.secret(), Some("new_secret"));
    /// assert!(config.use_blacklist);
    /// ```
    pub fn apply_args(&mut self, secret_key: Option<String>, use_blacklist: Option<bool>) {
        if let Some(secret) = secret_key {
            debug!("Overriding HMAC secret from command line");
            self.secret_key = Some(secret);
        }
        if let Some(enabled) = use_blacklist {
            debug!("Overriding blacklist from command line: {}", enabled);
            self.use_blacklist = enabled;
        }
    }
}
