// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::path::Path;
use std::sync::Once;

use rocket_jwt_extended::config::JwtConfig;
use tempfile::tempdir;

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn assert_sample_created(path: &Path) {
    let sample_path = path.with_extension("sample.yaml");
    assert!(
        sample_path.exists(),
        "Sample config file should be created at {:?}",
        sample_path
    );
    let sample = JwtConfig::from_file(&sample_path).expect("sample config is valid");
    assert_eq!(sample, JwtConfig::sample());
}

#[test]
fn test_invalid_yaml_creates_sample() {
    init_logger();
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, "secret_key: [unclosed\n  use_acl: : :").unwrap();

    let result = JwtConfig::from_file(&path);
    assert!(result.is_err());
    // Parse errors are reported before validation, no sample is written
    assert!(!path.with_extension("sample.yaml").exists());
}

#[test]
fn test_schema_violation_creates_sample() {
    init_logger();
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "secret_key: secret\naccess_token_expires: -10\nunknown_field: 1\n",
    )
    .unwrap();

    let result = JwtConfig::from_file(&path);
    let err = result.expect_err("schema violation is rejected");
    assert!(err.to_string().contains("Configuration validation failed"));
    assert_sample_created(&path);
}

#[test]
fn test_reserved_claim_key_creates_sample() {
    init_logger();
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.yaml");
    fs::write(&path, "secret_key: secret\nidentity_claim_key: exp\n").unwrap();

    assert!(JwtConfig::from_file(&path).is_err());
    assert_sample_created(&path);
}

#[test]
fn test_inconsistent_keys_create_sample() {
    init_logger();
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.yaml");
    // Passes the schema, fails the consistency rules
    fs::write(
        &path,
        "secret_key: secret\nalgorithm: RS256\npublic_key: abc\nprivate_key: def\n",
    )
    .unwrap();

    let err = JwtConfig::from_file(&path).expect_err("conflicting key material");
    assert!(format!("{:#}", err).contains("Inconsistent JWT configuration"));
    assert_sample_created(&path);
}
