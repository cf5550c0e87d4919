// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket request guards for JWT protected routes
//!
//! Each guard runs the [`Guard`] pipeline with the [`JwtManager`] managed by
//! the Rocket instance (see [`JwtManager::fairing`]) and exposes the verified
//! [`Token`] to the handler.
//!
//! # Request Guards
//!
//! - [`JwtRequired`] - Requires a valid access token
//! - [`FreshJwtRequired`] - Requires a valid and fresh access token
//! - [`JwtOptional`] - Verifies an access token if one is present
//! - [`JwtRefreshRequired`] - Requires a valid refresh token
//! - [`JwtRequiredWith`] - Runs the guard of a [`GuardPolicy`], e.g. a role allow list
//!
//! ### Error Responses
//!
//! A rejected request fails the guard with the status of its [`JwtError`]
//! and the rendered JSON body is kept in the request-local cache, where the
//! catcher registered by the fairing picks it up:
//!
//! | Condition | HTTP Status |
//! |-----------|-------------|
//! | No token found | 401 Unauthorized |
//! | Malformed header, bad signature, wrong token type | 422 Unprocessable Entity |
//! | Expired, stale, revoked token or role denied | 401 Unauthorized |
//! | Blacklist backend unavailable | 503 Service Unavailable |
//! | Manager missing or guard misconfigured | 500 Internal Server Error |
//!
//! Requests using an exempt method (`OPTIONS` by default) are forwarded by
//! the required guards instead of being verified.
//!
//! ### Examples
//!
//! ```rust,no_run
//! use rocket::get;
//! use rocket_jwt_extended::auth::{Guard, GuardPolicy, JwtError, JwtOptional, JwtRequired, JwtRequiredWith};
//!
//! #[get("/me")]
//! fn me(jwt: JwtRequired) -> String {
//!     format!("Hello {}", jwt.identity())
//! }
//!
//! #[get("/maybe")]
//! fn maybe(jwt: JwtOptional) -> String {
//!     match jwt.0 {
//!         Some(token) => format!("Hello {}", token.identity()),
//!         None => "Hello stranger".to_string(),
//!     }
//! }
//!
//! pub struct AdminOnly;
//!
//! impl GuardPolicy for AdminOnly {
//!     fn guard() -> Result<Guard, JwtError> {
//!         Guard::required().allow(["ADMIN"]).build()
//!     }
//! }
//!
//! #[get("/admin")]
//! fn admin(jwt: JwtRequiredWith<AdminOnly>) -> &'static str {
//!     "Welcome, administrator"
//! }
//! ```

use std::marker::PhantomData;
use std::ops::Deref;

use log::error;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

use super::protocol::{Guard, GuardKind};
use super::request::AuthRequest;
use crate::auth::jwt::Token;
use crate::auth::manager::JwtManager;
use crate::auth::responses::{ErrorHandlers, RenderedError};
use crate::error::JwtError;

/// A named guard configuration usable as a request guard type parameter
///
/// Register the policy with [`crate::auth::JwtManagerBuilder::policy`] so that
/// an invalid policy stops the server at startup instead of failing requests.
pub trait GuardPolicy: Send + Sync + 'static {
    fn guard() -> Result<Guard, JwtError>;
}

fn managed<'r>(request: &'r Request<'_>) -> Result<&'r JwtManager, JwtError> {
    request.rocket().state::<JwtManager>().ok_or_else(|| {
        error!("No JwtManager is managed by this Rocket instance, attach JwtManager::fairing()");
        JwtError::conflict("JWT manager is not configured")
    })
}

/// Render `error`, keep the rendering for the catcher and fail the guard
fn fail<T>(
    request: &Request<'_>,
    manager: Option<&JwtManager>,
    error: JwtError,
) -> Outcome<T, JwtError> {
    let rendered = match manager {
        Some(manager) => manager.render_error(&error),
        None => ErrorHandlers::default().render(&error, "msg"),
    };
    let status = rendered.status;
    request.local_cache(|| RenderedError(Some(rendered)));
    Outcome::Error((status, error))
}

/// Run `select`ed guard of the managed [`JwtManager`] on `request`
async fn verify<'r, F>(request: &'r Request<'_>, select: F) -> Outcome<Option<Token>, JwtError>
where
    F: FnOnce(&JwtManager) -> Result<Guard, JwtError>,
{
    let manager = match managed(request) {
        Ok(manager) => manager,
        Err(error) => return fail(request, None, error),
    };
    let guard = match select(manager) {
        Ok(guard) => guard,
        Err(error) => return fail(request, Some(manager), error),
    };

    match guard.authorize(manager, request).await {
        Ok(Some(token)) => {
            request.attach(token.clone());
            Outcome::Success(Some(token))
        }
        Ok(None) => Outcome::Success(None),
        Err(error) => fail(request, Some(manager), error),
    }
}

/// Turn the outcome of a guard that must yield a token into the guard value
fn required<T>(outcome: Outcome<Option<Token>, JwtError>, wrap: fn(Token) -> T) -> Outcome<T, JwtError> {
    match outcome {
        Outcome::Success(Some(token)) => Outcome::Success(wrap(token)),
        // Exempt method: let another route or the catcher handle it
        Outcome::Success(None) => Outcome::Forward(Status::Unauthorized),
        Outcome::Error(error) => Outcome::Error(error),
        Outcome::Forward(status) => Outcome::Forward(status),
    }
}

macro_rules! deref_token {
    ($($guard:ident),*) => {
        $(
            impl Deref for $guard {
                type Target = Token;

                fn deref(&self) -> &Token {
                    &self.0
                }
            }
        )*
    };
}

/// Requires a valid access token
#[derive(Debug, Clone)]
pub struct JwtRequired(pub Token);

/// Requires a valid access token that is still fresh
#[derive(Debug, Clone)]
pub struct FreshJwtRequired(pub Token);

/// Requires a valid refresh token
#[derive(Debug, Clone)]
pub struct JwtRefreshRequired(pub Token);

/// Verifies an access token when the request carries one
///
/// A missing token or a malformed header yields `JwtOptional(None)`; a token
/// that is present but invalid still rejects the request.
#[derive(Debug, Clone)]
pub struct JwtOptional(pub Option<Token>);

/// Runs the guard built by the policy `P`
pub struct JwtRequiredWith<P: GuardPolicy>(pub Token, PhantomData<fn() -> P>);

deref_token!(JwtRequired, FreshJwtRequired, JwtRefreshRequired);

impl<P: GuardPolicy> Deref for JwtRequiredWith<P> {
    type Target = Token;

    fn deref(&self) -> &Token {
        &self.0
    }
}

impl<P: GuardPolicy> std::fmt::Debug for JwtRequiredWith<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("JwtRequiredWith").field(&self.0).finish()
    }
}

impl<P: GuardPolicy> JwtRequiredWith<P> {
    pub fn into_inner(self) -> Token {
        self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for JwtRequired {
    type Error = JwtError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let outcome = verify(request, |manager| Ok(manager.guards().required.clone())).await;
        required(outcome, JwtRequired)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for FreshJwtRequired {
    type Error = JwtError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let outcome = verify(request, |manager| Ok(manager.guards().fresh.clone())).await;
        required(outcome, FreshJwtRequired)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for JwtRefreshRequired {
    type Error = JwtError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let outcome = verify(request, |manager| Ok(manager.guards().refresh.clone())).await;
        required(outcome, JwtRefreshRequired)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for JwtOptional {
    type Error = JwtError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        verify(request, |manager| Ok(manager.guards().optional.clone()))
            .await
            .map(JwtOptional)
    }
}

#[rocket::async_trait]
impl<'r, P: GuardPolicy> FromRequest<'r> for JwtRequiredWith<P> {
    type Error = JwtError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let outcome = verify(request, |manager| {
            let guard = manager.policy::<P>()?;
            if guard.kind() == GuardKind::Optional {
                return Err(JwtError::conflict(
                    "JwtRequiredWith needs a required or refresh guard policy",
                ));
            }
            Ok(guard)
        })
        .await;
        required(outcome, |token| JwtRequiredWith(token, PhantomData))
    }
}
