// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Generate an RSA key pair for the RS* and PS* JWT algorithms
//!
//! The keys are written as PKCS#1 PEM files and printed as a YAML snippet
//! (base64-encoded PEM) ready to paste into the configuration file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use clap::Parser;
use jsonwebtoken::Algorithm;
use rocket_jwt_extended::auth::jwt::{JwtKeyConfig, KeyType};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Generate an RSA key pair for JWT signing
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Output path for the public key PEM file
    #[clap(long, default_value = "./pub.key")]
    out_pub_key: PathBuf,

    /// Output path for the private key PEM file
    #[clap(long, default_value = "./private.key")]
    out_private_key: PathBuf,

    /// RSA key length in bits
    #[clap(long, default_value = "4096")]
    length: usize,

    /// Signing algorithm written to the YAML snippet (RS256, RS384, RS512, PS256, PS384, PS512)
    #[clap(long, default_value = "RS256")]
    algorithm: String,

    /// Only print the YAML snippet, do not write PEM files
    #[clap(long)]
    no_files: bool,
}

fn write_pem(path: &Path, pem: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create key file at {:?}", path))?;
    file.write_all(pem.as_bytes())
        .with_context(|| format!("Failed to write key to {:?}", path))?;
    println!("Key written to: {:?}", path);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let algorithm: Algorithm = args
        .algorithm
        .parse()
        .with_context(|| format!("Unknown algorithm {}", args.algorithm))?;
    if KeyType::for_algorithm(algorithm) != KeyType::RSA {
        anyhow::bail!("{:?} does not use RSA keys", algorithm);
    }

    eprintln!("Generating RSA key pair with {} bits...", args.length);

    let mut rng = rsa::rand_core::OsRng;
    let private_key =
        RsaPrivateKey::new(&mut rng, args.length).context("Failed to generate RSA private key")?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .context("Failed to encode private key to PEM")?;
    let public_pem = public_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .context("Failed to encode public key to PEM")?;

    // Make sure the pair loads the way the server will load it
    JwtKeyConfig::new_rsa_from_pem(private_pem.as_bytes(), public_pem.as_bytes(), algorithm)
        .context("Generated keys are not usable for JWT signing")?;

    if !args.no_files {
        write_pem(&args.out_private_key, &private_pem)?;
        write_pem(&args.out_pub_key, &public_pem)?;
    }

    let engine = base64::engine::general_purpose::STANDARD;
    println!();
    println!("# Paste into the configuration file");
    println!("algorithm: {:?}", algorithm);
    println!("secret_key: null");
    println!("public_key: {}", engine.encode(public_pem.as_bytes()));
    println!("private_key: {}", engine.encode(private_pem.as_bytes()));

    Ok(())
}
