// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Demo web server
//!
//! A small Rocket application exercising every guard:
//!
//! | Route | Guard |
//! |-------|-------|
//! | `POST /login` | none, issues a fresh access token and a refresh token |
//! | `POST /refresh` | [`JwtRefreshRequired`](crate::auth::JwtRefreshRequired) |
//! | `GET /protected` | [`JwtRequired`](crate::auth::JwtRequired) |
//! | `GET /fresh` | [`FreshJwtRequired`](crate::auth::FreshJwtRequired) |
//! | `GET /optional` | [`JwtOptional`](crate::auth::JwtOptional) |
//! | `GET /admin` | [`JwtRequiredWith<AdminOnly>`](crate::auth::JwtRequiredWith) |
//! | `DELETE /logout` | revokes the access token |
//! | `DELETE /logout/refresh` | revokes the refresh token |
//!
//! ## Example
//!
//! ```no_run
//! use rocket::figment::Figment;
//! use rocket_jwt_extended::auth::JwtManager;
//! use rocket_jwt_extended::server;
//!
//! # #[rocket::main]
//! # async fn main() {
//! let manager = JwtManager::builder()
//!     .configure(|config| config.secret_key = Some("super-secret".to_string()))
//!     .build()
//!     .expect("valid configuration");
//! let rocket = server::build_rocket(Figment::from(rocket::Config::default()), manager);
//! // rocket.launch().await.expect("Failed to launch");
//! # }
//! ```

pub mod handlers;

use log::debug;
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

use crate::auth::JwtManager;
use handlers::*;

/// Build the demo Rocket instance around `manager`
pub fn build_rocket(figment: Figment, manager: JwtManager) -> Rocket<Build> {
    debug!("Building demo server with {:?}", manager);
    rocket::custom(figment).attach(manager.fairing()).mount(
        "/",
        routes![
            login,
            refresh,
            protected,
            fresh,
            optional,
            admin,
            logout,
            logout_refresh,
            preflight,
        ],
    )
}
