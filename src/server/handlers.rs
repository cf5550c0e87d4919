// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Route handlers of the demo server
//!
//! The login route trusts the username it receives: credentials are the
//! business of the application embedding the crate.

use std::path::PathBuf;

use log::info;
use rocket::serde::json::Json;
use rocket::{delete, get, options, post, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{
    EncodeOptions, FreshJwtRequired, Guard, GuardPolicy, JwtError, JwtManager, JwtOptional,
    JwtRefreshRequired, JwtRequired, JwtRequiredWith,
};

/// Admits access tokens carrying the `ADMIN` role
pub struct AdminOnly;

impl GuardPolicy for AdminOnly {
    fn guard() -> Result<Guard, JwtError> {
        Guard::required().allow(["ADMIN"]).build()
    }
}

/// Body of `POST /login`
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    /// Only used when `use_acl` is enabled
    pub role: Option<String>,
}

/// Issue a fresh access token and a refresh token
#[post("/login", data = "<login>")]
pub fn login(manager: &State<JwtManager>, login: Json<LoginRequest>) -> Result<Json<Value>, JwtError> {
    let login = login.into_inner();
    let mut options = EncodeOptions::default();
    if let Some(role) = login.role.filter(|_| manager.config().use_acl) {
        options = options.role(role);
    }

    let access_token = manager.create_access_token(&login.username, options.clone().fresh(true))?;
    let refresh_token = manager.create_refresh_token(&login.username, options)?;
    info!("Issued tokens for {}", login.username);

    Ok(Json(json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
    })))
}

/// Exchange a refresh token for a new, non-fresh access token
#[post("/refresh")]
pub fn refresh(manager: &State<JwtManager>, jwt: JwtRefreshRequired) -> Result<Json<Value>, JwtError> {
    let mut options = EncodeOptions::default();
    if let Some(role) = jwt.role() {
        options = options.role(role);
    }
    let access_token = manager.create_access_token(jwt.identity(), options)?;
    Ok(Json(json!({ "access_token": access_token })))
}

#[get("/protected")]
pub fn protected(jwt: JwtRequired) -> Json<Value> {
    Json(json!({ "logged_in_as": jwt.identity() }))
}

/// Only reachable right after a login
#[get("/fresh")]
pub fn fresh(jwt: FreshJwtRequired) -> Json<Value> {
    Json(json!({ "fresh_logged_in_as": jwt.identity() }))
}

#[get("/optional")]
pub fn optional(jwt: JwtOptional) -> Json<Value> {
    let identity = jwt.0.as_ref().map(|token| token.identity().clone());
    Json(json!({ "logged_in_as": identity }))
}

#[get("/admin")]
pub fn admin(jwt: JwtRequiredWith<AdminOnly>) -> Json<Value> {
    Json(json!({ "admin": jwt.identity() }))
}

/// Revoke the access token of the request
#[delete("/logout")]
pub async fn logout(manager: &State<JwtManager>, jwt: JwtRequired) -> Result<Json<Value>, JwtError> {
    manager.revoke(&jwt).await?;
    Ok(Json(json!({ "msg": "Successfully logged out" })))
}

/// Revoke the refresh token of the request
#[delete("/logout/refresh")]
pub async fn logout_refresh(
    manager: &State<JwtManager>,
    jwt: JwtRefreshRequired,
) -> Result<Json<Value>, JwtError> {
    manager.revoke(&jwt).await?;
    Ok(Json(json!({ "msg": "Refresh token revoked" })))
}

/// CORS preflight requests skip token verification and land here
#[options("/<_path..>")]
pub fn preflight(_path: PathBuf) {}
