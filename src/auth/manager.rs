// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT manager
//!
//! [`JwtManager`] is the object handed to Rocket (through its fairing) and to
//! any code creating or revoking tokens. It bundles the frozen configuration,
//! the codec, the optional blacklist, the error renderers and the prebuilt
//! guards. Cloning it is cheap.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rocket_jwt_extended::auth::{EncodeOptions, InMemoryBlacklist, JwtManager};
//!
//! # #[rocket::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = JwtManager::builder()
//!     .configure(|config| {
//!         config.secret_key = Some("super-secret".to_string());
//!         config.use_blacklist = true;
//!     })
//!     .blacklist(Arc::new(InMemoryBlacklist::new()))
//!     .build()?;
//!
//! let raw = manager.create_access_token("alice", EncodeOptions::default())?;
//! let token = manager.decode_token(&raw)?;
//! manager.revoke(&token).await?;
//!
//! rocket::build().attach(manager.fairing()).launch().await?;
//! # Ok(())
//! # }
//! ```

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, error, info, warn};
use rocket::fairing::{self, Fairing, Info, Kind};
use rocket::http::Status;
use rocket::{catchers, Build, Rocket};
use serde::Serialize;

use crate::auth::blacklist::{Blacklist, InMemoryBlacklist};
use crate::auth::guards::{Guard, GuardPolicy, RolePolicy};
use crate::auth::hooks::{ClaimsVerifier, UserLoader};
use crate::auth::jwt::{EncodeOptions, JwtCodec, Token, TokenType};
use crate::auth::responses::{jwt_error_catcher, ErrorHandlers, ErrorResponse};
use crate::config::{ConfigStore, JwtConfig};
use crate::error::{ErrorKind, JwtError};

/// Revocation window for tokens without an expiry
const NEVER_EXPIRING_WINDOW_DAYS: i64 = 365 * 100;

/// Guards behind the built-in request guards
#[derive(Debug, Clone)]
pub struct StandardGuards {
    pub required: Guard,
    pub fresh: Guard,
    pub optional: Guard,
    pub refresh: Guard,
}

impl StandardGuards {
    fn new() -> Result<Self, JwtError> {
        Ok(Self {
            required: Guard::required().build()?,
            fresh: Guard::required().fresh_required().build()?,
            optional: Guard::optional().build()?,
            refresh: Guard::refresh().build()?,
        })
    }
}

struct ManagerInner {
    store: Arc<ConfigStore>,
    config: Arc<JwtConfig>,
    codec: JwtCodec,
    blacklist: Option<Arc<dyn Blacklist>>,
    claims_verifier: Option<Arc<dyn ClaimsVerifier>>,
    user_loader: Option<Arc<dyn UserLoader>>,
    handlers: ErrorHandlers,
    guards: StandardGuards,
    policies: HashMap<TypeId, Guard>,
}

/// Entry point for token creation, verification and revocation
#[derive(Clone)]
pub struct JwtManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("algorithm", &self.inner.config.algorithm)
            .field("blacklist", &self.inner.blacklist.is_some())
            .field("claims_verifier", &self.inner.claims_verifier.is_some())
            .field("user_loader", &self.inner.user_loader.is_some())
            .field("policies", &self.inner.policies.len())
            .finish()
    }
}

type PolicyConstructor = fn() -> Result<Guard, JwtError>;

/// Builder of a [`JwtManager`]
///
/// The configuration can be changed freely until [`JwtManagerBuilder::build`]
/// freezes it.
#[must_use]
pub struct JwtManagerBuilder {
    config: JwtConfig,
    blacklist: Option<Arc<dyn Blacklist>>,
    claims_verifier: Option<Arc<dyn ClaimsVerifier>>,
    user_loader: Option<Arc<dyn UserLoader>>,
    handlers: ErrorHandlers,
    policies: Vec<(TypeId, &'static str, PolicyConstructor)>,
}

impl JwtManagerBuilder {
    /// Modify the configuration
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut JwtConfig),
    {
        f(&mut self.config);
        self
    }

    /// Revocation store consulted by every guard when `use_blacklist` is set
    pub fn blacklist(mut self, blacklist: Arc<dyn Blacklist>) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    /// Hook deciding whether the claims of an access token are acceptable
    pub fn claims_verifier(mut self, verifier: Arc<dyn ClaimsVerifier>) -> Self {
        self.claims_verifier = Some(verifier);
        self
    }

    /// Hook resolving the identity of every verified token into a user
    pub fn user_loader(mut self, loader: Arc<dyn UserLoader>) -> Self {
        self.user_loader = Some(loader);
        self
    }

    /// Replace the response renderer of one kind of error
    pub fn error_handler<F>(mut self, kind: ErrorKind, renderer: F) -> Self
    where
        F: Fn(&JwtError) -> (Status, String) + Send + Sync + 'static,
    {
        self.handlers.set(kind, Arc::new(renderer));
        self
    }

    /// Build the guard of policy `P` when the manager is built
    pub fn policy<P: GuardPolicy>(mut self) -> Self {
        self.policies
            .push((TypeId::of::<P>(), type_name::<P>(), P::guard as PolicyConstructor));
        self
    }

    /// Freeze the configuration and build the manager
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationConflict`] if the configuration is
    /// inconsistent, the key material is invalid, or a registered policy is
    /// invalid (e.g. both `allow` and `deny`, or roles while `use_acl` is off).
    pub fn build(self) -> Result<JwtManager, JwtError> {
        let store = Arc::new(ConfigStore::new(self.config));
        let config = store.freeze().map_err(|e| {
            error!("Invalid JWT configuration: {}", e);
            e
        })?;
        let codec = JwtCodec::new(Arc::clone(&config))?;
        if config.uses_sample_secret() {
            warn!("Tokens are signed with the placeholder secret, anyone can forge them");
        }

        let blacklist = match (config.use_blacklist, self.blacklist) {
            (true, Some(blacklist)) => Some(blacklist),
            (true, None) => Some(Arc::new(InMemoryBlacklist::new()) as Arc<dyn Blacklist>),
            (false, Some(_)) => {
                warn!("A token blacklist was supplied but use_blacklist is disabled, it will not be consulted");
                None
            }
            (false, None) => None,
        };

        let mut policies = HashMap::new();
        for (id, name, constructor) in self.policies {
            let guard = constructor().map_err(|e| {
                error!("Invalid guard policy {}: {}", name, e);
                e
            })?;
            if !config.use_acl && *guard.roles() != RolePolicy::Any {
                error!("Guard policy {} uses roles but use_acl is disabled", name);
                return Err(JwtError::conflict(format!(
                    "guard policy {} uses roles but use_acl is disabled",
                    name
                )));
            }
            debug!("Registered guard policy {}", name);
            policies.insert(id, guard);
        }

        info!(
            "JWT manager ready: algorithm {:?}, blacklist {}, acl {}",
            config.algorithm,
            if blacklist.is_some() { "enabled" } else { "disabled" },
            if config.use_acl { "enabled" } else { "disabled" },
        );

        Ok(JwtManager {
            inner: Arc::new(ManagerInner {
                store,
                config,
                codec,
                blacklist,
                claims_verifier: self.claims_verifier,
                user_loader: self.user_loader,
                handlers: self.handlers,
                guards: StandardGuards::new()?,
                policies,
            }),
        })
    }
}

impl JwtManager {
    /// Start from the default configuration
    pub fn builder() -> JwtManagerBuilder {
        Self::builder_with(JwtConfig::default())
    }

    /// Start from `config`, e.g. one loaded with [`JwtConfig::from_file`]
    pub fn builder_with(config: JwtConfig) -> JwtManagerBuilder {
        JwtManagerBuilder {
            config,
            blacklist: None,
            claims_verifier: None,
            user_loader: None,
            handlers: ErrorHandlers::default(),
            policies: Vec::new(),
        }
    }

    /// The frozen configuration
    pub fn config(&self) -> &JwtConfig {
        &self.inner.config
    }

    /// Attempt to change the configuration
    ///
    /// The configuration is frozen once the manager is built, so this always
    /// fails with [`JwtError::ConfigurationConflict`].
    pub fn configure<F>(&self, f: F) -> Result<(), JwtError>
    where
        F: FnOnce(&mut JwtConfig),
    {
        self.inner.store.update(f)
    }

    pub fn codec(&self) -> &JwtCodec {
        &self.inner.codec
    }

    /// The revocation store, when `use_blacklist` is enabled
    pub fn blacklist(&self) -> Option<&Arc<dyn Blacklist>> {
        self.inner.blacklist.as_ref()
    }

    pub fn claims_verifier(&self) -> Option<&Arc<dyn ClaimsVerifier>> {
        self.inner.claims_verifier.as_ref()
    }

    pub fn user_loader(&self) -> Option<&Arc<dyn UserLoader>> {
        self.inner.user_loader.as_ref()
    }

    pub fn guards(&self) -> &StandardGuards {
        &self.inner.guards
    }

    /// The guard of policy `P`
    ///
    /// Policies registered on the builder were validated at startup. An
    /// unregistered policy is built on each call.
    pub fn policy<P: GuardPolicy>(&self) -> Result<Guard, JwtError> {
        match self.inner.policies.get(&TypeId::of::<P>()) {
            Some(guard) => Ok(guard.clone()),
            None => {
                debug!("Guard policy {} was not registered", type_name::<P>());
                P::guard()
            }
        }
    }

    /// Create a signed access token for `identity`
    pub fn create_access_token<I>(&self, identity: &I, options: EncodeOptions) -> Result<String, JwtError>
    where
        I: Serialize + ?Sized,
    {
        self.inner.codec.encode(TokenType::Access, identity, &options)
    }

    /// Create a signed refresh token for `identity`
    pub fn create_refresh_token<I>(&self, identity: &I, options: EncodeOptions) -> Result<String, JwtError>
    where
        I: Serialize + ?Sized,
    {
        self.inner.codec.encode(TokenType::Refresh, identity, &options)
    }

    /// Verify a raw token without applying any guard policy
    pub fn decode_token(&self, raw: &str) -> Result<Token, JwtError> {
        let claims = self.inner.codec.decode(raw)?;
        Ok(Token::new(claims, raw))
    }

    fn require_blacklist(&self) -> Result<&Arc<dyn Blacklist>, JwtError> {
        self.blacklist()
            .ok_or_else(|| JwtError::conflict("use_blacklist must be enabled to revoke tokens"))
    }

    /// Revoke `token` for the rest of its lifetime
    pub async fn revoke(&self, token: &Token) -> Result<(), JwtError> {
        let window = match token.claims().exp {
            // A token is accepted through the whole second of its exp
            Some(exp) => Duration::seconds((exp - Utc::now().timestamp()).max(0) + 1),
            None => Duration::days(NEVER_EXPIRING_WINDOW_DAYS),
        };
        self.revoke_jti(token.jti(), window).await
    }

    /// Revoke the token id `jti` for `valid_for`
    pub async fn revoke_jti(&self, jti: &str, valid_for: Duration) -> Result<(), JwtError> {
        let blacklist = self.require_blacklist()?;
        blacklist.revoke(jti, valid_for).await?;
        info!("Token {} revoked", jti);
        Ok(())
    }

    /// Returns true if `jti` is currently revoked
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, JwtError> {
        let blacklist = self.require_blacklist()?;
        Ok(blacklist.is_revoked(jti).await?)
    }

    /// Render `error` with the registered renderers
    pub fn render_error(&self, error: &JwtError) -> ErrorResponse {
        self.inner
            .handlers
            .render(error, &self.inner.config.error_msg_key)
    }

    /// Fairing managing this manager and registering the JSON error catcher
    pub fn fairing(&self) -> JwtFairing {
        JwtFairing {
            manager: self.clone(),
        }
    }
}

/// Makes a [`JwtManager`] available to the request guards
pub struct JwtFairing {
    manager: JwtManager,
}

#[rocket::async_trait]
impl Fairing for JwtFairing {
    fn info(&self) -> Info {
        Info {
            name: "JWT manager",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
        debug!("Registering JWT manager and error catcher");
        Ok(rocket
            .manage(self.manager.clone())
            .register("/", catchers![jwt_error_catcher]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AdminOnly;

    impl GuardPolicy for AdminOnly {
        fn guard() -> Result<Guard, JwtError> {
            Guard::required().allow(["ADMIN"]).build()
        }
    }

    struct Conflicting;

    impl GuardPolicy for Conflicting {
        fn guard() -> Result<Guard, JwtError> {
            Guard::required().allow(["ADMIN"]).deny(["GUEST"]).build()
        }
    }

    fn builder() -> JwtManagerBuilder {
        JwtManager::builder().configure(|config| config.secret_key = Some("secret".to_string()))
    }

    #[test]
    fn test_configuration_is_frozen() {
        let manager = builder().build().unwrap();
        let err = manager.configure(|config| config.use_acl = true).unwrap_err();
        assert!(matches!(err, JwtError::ConfigurationConflict(_)));
        assert!(!manager.config().use_acl);
    }

    #[test]
    fn test_invalid_configuration_fails_build() {
        assert!(JwtManager::builder().build().is_err());
    }

    #[test]
    fn test_policies_are_checked_at_build() {
        let err = builder()
            .configure(|config| config.use_acl = true)
            .policy::<Conflicting>()
            .build()
            .unwrap_err();
        assert!(matches!(err, JwtError::ConfigurationConflict(_)));

        // Roles without ACL
        assert!(builder().policy::<AdminOnly>().build().is_err());

        let manager = builder()
            .configure(|config| config.use_acl = true)
            .policy::<AdminOnly>()
            .build()
            .unwrap();
        let guard = manager.policy::<AdminOnly>().unwrap();
        assert_eq!(guard, Guard::required().allow(["ADMIN"]).build().unwrap());
    }

    #[test]
    fn test_role_requires_acl() {
        let manager = builder().build().unwrap();
        let err = manager
            .create_access_token("alice", EncodeOptions::default().role("ADMIN"))
            .unwrap_err();
        assert!(matches!(err, JwtError::ConfigurationConflict(_)));
    }

    #[tokio::test]
    async fn test_revoke_requires_blacklist() {
        let manager = builder().build().unwrap();
        let raw = manager
            .create_access_token("alice", EncodeOptions::default())
            .unwrap();
        let token = manager.decode_token(&raw).unwrap();
        assert!(matches!(
            manager.revoke(&token).await,
            Err(JwtError::ConfigurationConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_non_expiring_token() {
        let manager = builder()
            .configure(|config| config.use_blacklist = true)
            .build()
            .unwrap();
        let raw = manager
            .create_refresh_token(
                "alice",
                EncodeOptions::default().expires(crate::config::Expiry::Never),
            )
            .unwrap();
        let token = manager.decode_token(&raw).unwrap();
        assert!(!manager.is_revoked(token.jti()).await.unwrap());
        manager.revoke(&token).await.unwrap();
        assert!(manager.is_revoked(token.jti()).await.unwrap());
    }

    #[tokio::test]
    async fn test_revocation_outlives_token() {
        use crate::auth::guards::tests::MockRequest;
        use crate::config::Expiry;

        let manager = builder()
            .configure(|config| config.use_blacklist = true)
            .build()
            .unwrap();

        // Start right after a second boundary so that exp is one second away
        let into_second = Utc::now().timestamp_subsec_millis() as u64;
        tokio::time::sleep(std::time::Duration::from_millis(1050 - into_second.min(1000))).await;

        let raw = manager
            .create_access_token("alice", EncodeOptions::default().expires(Expiry::seconds(1)))
            .unwrap();
        let token = manager.decode_token(&raw).unwrap();
        manager.revoke(&token).await.unwrap();

        // Inside the exp second the token still decodes, the revocation must hold
        tokio::time::sleep(std::time::Duration::from_millis(1400)).await;
        assert!(manager.decode_token(&raw).is_ok());
        let request = MockRequest::get().with_header("Authorization", &format!("Bearer {}", raw));
        let result = manager.guards().required.authorize(&manager, &request).await;
        assert_eq!(result, Err(JwtError::RevokedToken));
    }

    #[test]
    fn test_custom_error_renderer() {
        let manager = builder()
            .error_handler(ErrorKind::ExpiredToken, |_| {
                (Status::Unauthorized, "Please log in again".to_string())
            })
            .configure(|config| config.error_msg_key = "error".to_string())
            .build()
            .unwrap();
        let response = manager.render_error(&JwtError::ExpiredToken);
        assert_eq!(response.body, serde_json::json!({"error": "Please log in again"}));
    }
}
