// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Guard protocol
//!
//! A [`Guard`] runs the verification pipeline of one request:
//!
//! 1. exempt methods (`OPTIONS` by default) skip everything
//! 2. locate the raw token
//! 3. decode and verify it
//! 4. check the token type
//! 5. check freshness, when required
//! 6. apply the role policy
//! 7. check the blacklist, when enabled
//! 8. run the claims verifier on access tokens, when registered
//! 9. load the user, when a user loader is registered
//!
//! The first failing step ends the pipeline with its [`JwtError`]. Guards are
//! built once, usually at startup, and invalid combinations of options are
//! rejected by [`GuardBuilder::build`] before any request is served.
//!
//! # Example
//!
//! ```no_run
//! use rocket_jwt_extended::auth::{Guard, JwtManager};
//!
//! # async fn example(manager: &JwtManager, request: &rocket::Request<'_>) {
//! let guard = Guard::required().allow(["ADMIN"]).build().unwrap();
//! let result = guard
//!     .run(manager, request, |token| async move {
//!         format!("hello {}", token.map(|t| t.identity().to_string()).unwrap_or_default())
//!     })
//!     .await;
//! # }
//! ```

use std::future::Future;

use chrono::Utc;
use log::debug;

use super::locator::locate_token;
use super::request::AuthRequest;
use crate::auth::hooks::identity_label;
use crate::auth::jwt::{Token, TokenType};
use crate::auth::manager::JwtManager;
use crate::error::JwtError;

/// The three guard variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// A valid access token is required
    Required,
    /// An access token is verified if present; its absence is not an error
    Optional,
    /// A valid refresh token is required
    Refresh,
}

impl GuardKind {
    /// Token type accepted by this kind of guard
    pub fn expected_type(self) -> TokenType {
        match self {
            GuardKind::Required | GuardKind::Optional => TokenType::Access,
            GuardKind::Refresh => TokenType::Refresh,
        }
    }
}

/// Role check applied after the token type and freshness checks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RolePolicy {
    #[default]
    Any,
    /// Only these roles are admitted
    Allow(Vec<String>),
    /// These roles are rejected, every other role is admitted
    Deny(Vec<String>),
}

impl RolePolicy {
    /// Check the role claim of a token against the policy
    pub fn check(&self, role: Option<&str>) -> Result<(), JwtError> {
        match self {
            RolePolicy::Any => Ok(()),
            RolePolicy::Allow(_) | RolePolicy::Deny(_) if role.is_none() => {
                Err(JwtError::AccessDenied("Missing role claim".to_string()))
            }
            RolePolicy::Allow(allowed) => {
                let role = role.unwrap_or_default();
                if allowed.iter().any(|allowed| allowed == role) {
                    Ok(())
                } else {
                    Err(JwtError::AccessDenied(format!("Role {} is not allowed", role)))
                }
            }
            RolePolicy::Deny(denied) => {
                let role = role.unwrap_or_default();
                if denied.iter().any(|denied| denied == role) {
                    Err(JwtError::AccessDenied(format!("Role {} is denied", role)))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Verification policy of a protected handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    kind: GuardKind,
    roles: RolePolicy,
    fresh_required: bool,
}

/// Builder returned by [`Guard::required`], [`Guard::optional`] and [`Guard::refresh`]
#[derive(Debug, Clone)]
#[must_use]
pub struct GuardBuilder {
    kind: GuardKind,
    allow: Option<Vec<String>>,
    deny: Option<Vec<String>>,
    fresh_required: bool,
}

fn role_list<I, S>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    roles.into_iter().map(Into::into).collect()
}

impl GuardBuilder {
    /// Admit only tokens whose role is in `roles`
    ///
    /// Role claims only exist when `use_acl` is enabled: running a guard with
    /// roles under a manager without ACL fails with
    /// [`JwtError::ConfigurationConflict`].
    pub fn allow<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(role_list(roles));
        self
    }

    /// Reject tokens whose role is in `roles`
    ///
    /// Like [`GuardBuilder::allow`], this requires `use_acl`.
    pub fn deny<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny = Some(role_list(roles));
        self
    }

    /// Require a fresh access token
    pub fn fresh_required(mut self) -> Self {
        self.fresh_required = true;
        self
    }

    /// Validate the combination of options
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationConflict`] if both `allow` and `deny`
    /// are set, if an optional guard is given roles or freshness, or if a
    /// refresh guard requires freshness.
    pub fn build(self) -> Result<Guard, JwtError> {
        let roles = match (self.allow, self.deny) {
            (Some(_), Some(_)) => {
                return Err(JwtError::conflict(
                    "allow and deny can not be set on the same guard",
                ))
            }
            (Some(allow), None) => RolePolicy::Allow(allow),
            (None, Some(deny)) => RolePolicy::Deny(deny),
            (None, None) => RolePolicy::Any,
        };

        match self.kind {
            GuardKind::Optional if roles != RolePolicy::Any || self.fresh_required => {
                return Err(JwtError::conflict(
                    "optional guards do not support roles or freshness",
                ))
            }
            GuardKind::Refresh if self.fresh_required => {
                return Err(JwtError::conflict("refresh tokens carry no freshness"))
            }
            _ => {}
        }

        Ok(Guard {
            kind: self.kind,
            roles,
            fresh_required: self.fresh_required,
        })
    }
}

impl Guard {
    fn builder(kind: GuardKind) -> GuardBuilder {
        GuardBuilder {
            kind,
            allow: None,
            deny: None,
            fresh_required: false,
        }
    }

    /// Guard requiring an access token
    pub fn required() -> GuardBuilder {
        Self::builder(GuardKind::Required)
    }

    /// Guard accepting requests without a token
    pub fn optional() -> GuardBuilder {
        Self::builder(GuardKind::Optional)
    }

    /// Guard requiring a refresh token
    pub fn refresh() -> GuardBuilder {
        Self::builder(GuardKind::Refresh)
    }

    pub fn kind(&self) -> GuardKind {
        self.kind
    }

    pub fn roles(&self) -> &RolePolicy {
        &self.roles
    }

    pub fn is_fresh_required(&self) -> bool {
        self.fresh_required
    }

    /// Run the verification pipeline for `request`
    ///
    /// Returns `Ok(None)` for exempt methods, and for optional guards when
    /// the request carries no token or a malformed header.
    pub async fn authorize<R>(
        &self,
        manager: &JwtManager,
        request: &R,
    ) -> Result<Option<Token>, JwtError>
    where
        R: AuthRequest + ?Sized,
    {
        let result = self.pipeline(manager, request).await;
        if let Err(error) = &result {
            debug!(
                "{} {:?} guard rejected the request: {}",
                request.method(),
                self.kind,
                error
            );
        }
        result
    }

    async fn pipeline<R>(&self, manager: &JwtManager, request: &R) -> Result<Option<Token>, JwtError>
    where
        R: AuthRequest + ?Sized,
    {
        let config = manager.config();
        if config.is_exempt(request.method()) {
            debug!("{} is exempt from token verification", request.method());
            return Ok(None);
        }

        if !config.use_acl && self.roles != RolePolicy::Any {
            return Err(JwtError::conflict("guard uses roles but use_acl is disabled"));
        }

        let expected = self.kind.expected_type();
        let raw = match locate_token(config, request, expected) {
            Ok(raw) => raw,
            Err(JwtError::NoAuthorization(_) | JwtError::InvalidHeader(_))
                if self.kind == GuardKind::Optional =>
            {
                return Ok(None)
            }
            Err(error) => return Err(error),
        };

        let claims = manager.codec().decode(&raw)?;

        if claims.token_type != expected {
            return Err(JwtError::WrongToken(format!(
                "Only {} tokens are allowed",
                expected
            )));
        }

        if self.fresh_required {
            let now = Utc::now().timestamp();
            let fresh = claims
                .fresh
                .map(|fresh| fresh.is_fresh_at(now))
                .unwrap_or(false);
            if !fresh {
                return Err(JwtError::FreshTokenRequired);
            }
        }

        self.roles.check(claims.role.as_deref())?;

        if let Some(blacklist) = manager.blacklist() {
            if blacklist.is_revoked(&claims.jti).await? {
                return Err(JwtError::RevokedToken);
            }
        }

        let mut token = Token::new(claims, raw);

        if self.kind != GuardKind::Refresh {
            if let Some(verifier) = manager.claims_verifier() {
                if !verifier.verify_claims(&token).await {
                    return Err(JwtError::ClaimsVerification);
                }
            }
        }

        if let Some(loader) = manager.user_loader() {
            match loader.load_user(token.identity()).await {
                Some(user) => token = token.with_user(user),
                None => return Err(JwtError::UserLoad(identity_label(token.identity()))),
            }
        }

        Ok(Some(token))
    }

    /// Verify `request`, attach the token to it, then call `handler`
    ///
    /// The handler receives `None` only from optional guards and for exempt
    /// methods.
    pub async fn run<R, F, Fut, T>(
        &self,
        manager: &JwtManager,
        request: &R,
        handler: F,
    ) -> Result<T, JwtError>
    where
        R: AuthRequest + ?Sized,
        F: FnOnce(Option<Token>) -> Fut,
        Fut: Future<Output = T>,
    {
        let token = self.authorize(manager, request).await?;
        if let Some(token) = &token {
            request.attach(token.clone());
        }
        Ok(handler(token).await)
    }
}
