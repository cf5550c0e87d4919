// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request guards
//!
//! - [`protocol`]: the framework-agnostic verification pipeline ([`Guard`])
//! - [`locator`]: extraction of the raw token from headers or query string
//! - [`request`]: the [`AuthRequest`] host abstraction
//! - [`bearer`]: Rocket request guards built on the pipeline

pub mod bearer;
pub mod locator;
pub mod protocol;
pub mod request;

pub use bearer::{FreshJwtRequired, GuardPolicy, JwtOptional, JwtRefreshRequired, JwtRequired, JwtRequiredWith};
pub use locator::locate_token;
pub use protocol::{Guard, GuardBuilder, GuardKind, RolePolicy};
pub use request::{attached_token, AttachedToken, AuthRequest};
