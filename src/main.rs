// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Demo server for the JWT request guards

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};

use rocket_jwt_extended::auth::JwtManager;
use rocket_jwt_extended::config::{output_config_schema, JwtConfig};
use rocket_jwt_extended::server::{build_rocket, handlers::AdminOnly};

/// JWT access and refresh token demo server
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (created with defaults if missing)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// HMAC secret, overrides the configuration file
    #[arg(long)]
    secret: Option<String>,

    /// Enable or disable the token blacklist, overrides the configuration file
    #[arg(long)]
    blacklist: Option<bool>,

    /// Web server port
    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,

    /// Web server address
    #[arg(short, long, default_value = "127.0.0.1")]
    address: String,
}

#[rocket::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.show_config_schema {
        return output_config_schema();
    }

    let mut config = JwtConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    config.apply_args(args.secret, args.blacklist);
    if config.uses_sample_secret() {
        warn!(
            "{:?} uses the placeholder HMAC secret, pass --secret or edit secret_key",
            args.config
        );
    }

    let mut builder = JwtManager::builder_with(config.clone());
    if config.use_acl {
        builder = builder.policy::<AdminOnly>();
    }
    let manager = builder.build().context("Invalid JWT configuration")?;

    info!("Web server enabled on {}:{}", args.address, args.port);
    let figment = rocket::Config::figment()
        .merge((
            "ident",
            format!("RocketJwtExtended/{}", env!("CARGO_PKG_VERSION")),
        ))
        .merge(("limits", Limits::new().limit("json", 1.mebibytes())))
        .merge(("address", args.address))
        .merge(("port", args.port))
        .merge(("log_level", LogLevel::Normal));

    let _rocket = build_rocket(figment, manager).launch().await?;

    Ok(())
}
