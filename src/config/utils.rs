// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::{Expiry, JwtConfig};
use crate::auth::jwt::JwtKeyConfig;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rocket-jwt-extended --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validate rules that the JSON schema cannot express
///
/// On top of [`JwtConfig::check_consistency`], this checks that:
/// - the configured key material actually parses for the configured algorithm
/// - token lifetimes are strictly positive
pub fn validate_specific_rules(config: &JwtConfig) -> Result<()> {
    config
        .check_consistency()
        .context("Inconsistent JWT configuration")?;

    debug!("Checking key material for {:?}", config.algorithm);
    JwtKeyConfig::from_config(config).context("Invalid JWT key material")?;

    for (name, expiry) in [
        ("access_token_expires", config.access_token_expires),
        ("refresh_token_expires", config.refresh_token_expires),
    ] {
        if let Expiry::After(duration) = expiry {
            if duration.num_seconds() <= 0 {
                anyhow::bail!("{} must be a positive number of seconds or false", name);
            }
        }
    }

    Ok(())
}
