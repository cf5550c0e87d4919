// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error responses
//!
//! Every [`JwtError`] is rendered as a status code and a JSON body of the form
//! `{"<error_msg_key>": "<message>"}`. The renderer used for each
//! [`ErrorKind`] can be replaced through the manager builder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{catch, Request};
use serde_json::{json, Value};

use crate::auth::manager::JwtManager;
use crate::error::{ErrorKind, JwtError};

/// Produces the status and message of an error response
pub type ErrorRenderer = Arc<dyn Fn(&JwtError) -> (Status, String) + Send + Sync>;

/// A rendered error, ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: Status,
    pub body: Value,
}

impl<'r> Responder<'r, 'static> for ErrorResponse {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        (self.status, Json(self.body)).respond_to(request)
    }
}

/// Error rendered by a failed guard, kept in the request-local cache
#[derive(Debug, Clone)]
pub struct RenderedError(pub Option<ErrorResponse>);

/// Registry of error renderers, one per [`ErrorKind`]
#[derive(Clone)]
pub struct ErrorHandlers {
    renderers: HashMap<ErrorKind, ErrorRenderer>,
}

impl fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlers")
            .field("kinds", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn default_renderer(error: &JwtError) -> (Status, String) {
    (error.status(), error.to_string())
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        let renderers = ErrorKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(default_renderer) as ErrorRenderer))
            .collect();
        Self { renderers }
    }
}

impl ErrorHandlers {
    /// Replace the renderer of `kind`
    pub fn set(&mut self, kind: ErrorKind, renderer: ErrorRenderer) {
        self.renderers.insert(kind, renderer);
    }

    /// Render `error` with `msg_key` as the JSON message key
    pub fn render(&self, error: &JwtError, msg_key: &str) -> ErrorResponse {
        let (status, message) = match self.renderers.get(&error.kind()) {
            Some(renderer) => renderer(error),
            None => default_renderer(error),
        };
        ErrorResponse {
            status,
            body: json!({ msg_key: message }),
        }
    }
}

/// Lets handlers return `Result<_, JwtError>`, e.g. from token creation
impl<'r> Responder<'r, 'static> for JwtError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let rendered = match request.rocket().state::<JwtManager>() {
            Some(manager) => manager.render_error(&self),
            None => ErrorHandlers::default().render(&self, "msg"),
        };
        rendered.respond_to(request)
    }
}

/// Catcher sending the error rendered by a failed JWT guard
///
/// Other failures get a body with the standard reason phrase under the same
/// message key.
#[catch(default)]
pub fn jwt_error_catcher(status: Status, request: &Request<'_>) -> ErrorResponse {
    if let Some(rendered) = &request.local_cache(|| RenderedError(None)).0 {
        return rendered.clone();
    }
    let msg_key = request
        .rocket()
        .state::<JwtManager>()
        .map(|manager| manager.config().error_msg_key.clone())
        .unwrap_or_else(|| "msg".to_string());
    ErrorResponse {
        status,
        body: json!({ msg_key: status.reason().unwrap_or("Unknown Error") }),
    }
}
