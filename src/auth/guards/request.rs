// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Host request abstraction used by the guard protocol

use rocket::Request;

use crate::auth::jwt::Token;

/// What the guard protocol needs from an incoming request
///
/// Implemented for [`rocket::Request`]; other hosts (or tests) can provide
/// their own implementation.
pub trait AuthRequest: Sync {
    /// HTTP method, upper case
    fn method(&self) -> &str;

    /// First value of the header `name`
    fn header(&self, name: &str) -> Option<&str>;

    /// Decoded value of the query parameter `name`
    fn query(&self, name: &str) -> Option<String>;

    /// Make the verified token available to the downstream handler
    fn attach(&self, token: Token);
}

/// Token attached to a Rocket request by a successful guard
///
/// Stored in the request-local cache; read it with [`attached_token`].
#[derive(Debug, Clone)]
pub struct AttachedToken(pub Option<Token>);

impl AuthRequest for Request<'_> {
    fn method(&self) -> &str {
        Request::method(self).as_str()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get_one(name)
    }

    fn query(&self, name: &str) -> Option<String> {
        self.query_value::<String>(name).and_then(Result::ok)
    }

    fn attach(&self, token: Token) {
        self.local_cache(|| AttachedToken(Some(token)));
    }
}

/// The token attached by the first successful guard of this request, if any
pub fn attached_token<'r>(request: &'r Request<'_>) -> Option<&'r Token> {
    request.local_cache(|| AttachedToken(None)).0.as_ref()
}
