// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Token codec
//!
//! [`JwtCodec`] signs claim sets into compact JWTs and verifies compact JWTs
//! back into [`ClaimSet`]s. It only holds the frozen configuration and the key
//! material, so it can be cloned into every request and used concurrently.
//!
//! Policy checks (token type, freshness, role, revocation) are not done here;
//! they belong to the guard protocol.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Header, Validation};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::claims::{ClaimSet, Freshness, TokenType};
use super::keys::JwtKeyConfig;
use crate::config::{Expiry, JwtConfig};
use crate::error::JwtError;

/// Optional inputs of token creation
///
/// # Example
///
/// ```
/// use rocket_jwt_extended::auth::EncodeOptions;
/// use rocket_jwt_extended::config::Expiry;
///
/// let options = EncodeOptions::default()
///     .fresh(true)
///     .role("ADMIN")
///     .expires(Expiry::minutes(5))
///     .private_claim("tenant", "acme");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeOptions {
    /// Claims nested under the configured public namespace
    pub public_claims: Map<String, Value>,
    /// Claims nested under the configured private prefix
    pub private_claims: Map<String, Value>,
    /// Role claim, requires `use_acl`
    pub role: Option<String>,
    /// Freshness of an access token, `false` when unset
    pub fresh: Option<Freshness>,
    /// Overrides the configured lifetime for this token
    pub expires: Option<Expiry>,
}

impl EncodeOptions {
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Accepts a flag or a `chrono::Duration` during which the token stays fresh
    pub fn fresh(mut self, fresh: impl Into<Freshness>) -> Self {
        self.fresh = Some(fresh.into());
        self
    }

    pub fn expires(mut self, expires: impl Into<Expiry>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    pub fn public_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.public_claims.insert(key.into(), value.into());
        self
    }

    pub fn public_claims(mut self, claims: Map<String, Value>) -> Self {
        self.public_claims.extend(claims);
        self
    }

    pub fn private_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.private_claims.insert(key.into(), value.into());
        self
    }
}

/// Signs and verifies tokens with the frozen configuration
#[derive(Debug, Clone)]
pub struct JwtCodec {
    config: Arc<JwtConfig>,
    keys: JwtKeyConfig,
}

impl JwtCodec {
    /// Create a codec, loading the key material of `config`
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationConflict`] if the key material is
    /// missing or invalid for the configured algorithm.
    pub fn new(config: Arc<JwtConfig>) -> Result<Self, JwtError> {
        let keys = JwtKeyConfig::from_config(&config)?;
        Ok(Self { config, keys })
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Encode and sign a token of `kind` for `identity`
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationConflict`] if a role is given without
    /// `use_acl`, public claims are given without a namespace, freshness is
    /// given for a refresh token, or signing fails.
    pub fn encode<I>(
        &self,
        kind: TokenType,
        identity: &I,
        options: &EncodeOptions,
    ) -> Result<String, JwtError>
    where
        I: Serialize + ?Sized,
    {
        let config = &self.config;

        if options.role.is_some() && !config.use_acl {
            return Err(JwtError::conflict(
                "a role claim requires use_acl to be enabled",
            ));
        }
        if !options.public_claims.is_empty() && config.public_claim_namespace.is_empty() {
            return Err(JwtError::conflict(
                "public claims require public_claim_namespace to be set",
            ));
        }
        if kind == TokenType::Refresh && options.fresh.is_some() {
            return Err(JwtError::conflict("refresh tokens can not carry freshness"));
        }

        let identity = serde_json::to_value(identity)
            .map_err(|e| JwtError::conflict(format!("identity is not serializable: {}", e)))?;

        let now = Utc::now().timestamp();
        let mut claims = Map::new();
        claims.insert("iat".to_string(), now.into());
        claims.insert("nbf".to_string(), now.into());
        claims.insert("jti".to_string(), Uuid::new_v4().to_string().into());

        let expires = options.expires.unwrap_or(match kind {
            TokenType::Access => config.access_token_expires,
            TokenType::Refresh => config.refresh_token_expires,
        });
        if let Some(lifetime) = expires.duration() {
            let exp = now
                .checked_add(lifetime.num_seconds())
                .ok_or_else(|| JwtError::conflict("token lifetime overflows"))?;
            claims.insert("exp".to_string(), exp.into());
        }

        if let Some(issuer) = &config.default_issuer {
            claims.insert("iss".to_string(), issuer.clone().into());
        }
        if let Some(audience) = &config.default_audience {
            claims.insert("aud".to_string(), audience.clone().into());
        }

        claims.insert(config.identity_claim_key.clone(), identity);
        claims.insert("type".to_string(), kind.as_str().into());

        if kind == TokenType::Access {
            let fresh = options.fresh.unwrap_or(Freshness::Flag(false));
            let fresh = serde_json::to_value(fresh)
                .map_err(|e| JwtError::conflict(format!("invalid freshness: {}", e)))?;
            claims.insert("fresh".to_string(), fresh);
        }
        if let Some(role) = &options.role {
            claims.insert(config.acl_claim.clone(), role.clone().into());
        }
        if !options.public_claims.is_empty() {
            claims.insert(
                config.public_claim_namespace.clone(),
                Value::Object(options.public_claims.clone()),
            );
        }
        if !options.private_claims.is_empty() {
            claims.insert(
                config.private_claim_prefix.clone(),
                Value::Object(options.private_claims.clone()),
            );
        }

        let header = Header::new(self.keys.algorithm);
        let token = jsonwebtoken::encode(&header, &claims, &self.keys.encoding_key)
            .map_err(|e| JwtError::conflict(format!("failed to sign token: {}", e)))?;
        debug!("Issued {} token {}", kind, claims["jti"]);
        Ok(token)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.keys.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // exp is optional: tokens issued with Expiry::Never have none
        validation.required_spec_claims = HashSet::new();
        if let Some(issuer) = &self.config.default_issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.config.default_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }

    /// Verify a compact token and return its claim set
    ///
    /// # Errors
    ///
    /// - [`JwtError::ExpiredToken`] if `exp` is in the past
    /// - [`JwtError::InvalidToken`] for signature, structure, algorithm,
    ///   `nbf`, issuer or audience failures
    /// - [`JwtError::Decode`] if a reserved claim is missing or malformed
    pub fn decode(&self, token: &str) -> Result<ClaimSet, JwtError> {
        let data = jsonwebtoken::decode::<Map<String, Value>>(
            token,
            &self.keys.decoding_key,
            &self.validation(),
        )?;
        ClaimSet::from_claims(data.claims, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec(config: JwtConfig) -> JwtCodec {
        JwtCodec::new(Arc::new(config)).unwrap()
    }

    fn payload_of(token: &str) -> Map<String, Value> {
        use base64::Engine;
        let part = token.split('.').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(part)
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_round_trip_keeps_inputs() {
        let codec = codec(JwtConfig {
            use_acl: true,
            public_claim_namespace: "https://example.com".to_string(),
            ..JwtConfig::sample()
        });
        let options = EncodeOptions::default()
            .role("ADMIN")
            .public_claim("plan", "gold")
            .private_claim("tenant", 42);

        let first = codec.encode(TokenType::Access, "alice", &options).unwrap();
        let second = codec.encode(TokenType::Access, "alice", &options).unwrap();

        let first = codec.decode(&first).unwrap();
        let second = codec.decode(&second).unwrap();
        assert_eq!(first.identity, json!("alice"));
        assert_eq!(first.role.as_deref(), Some("ADMIN"));
        assert_eq!(first.public_claims["plan"], json!("gold"));
        assert_eq!(first.private_claims["tenant"], json!(42));
        assert_eq!(first.fresh, Some(Freshness::Flag(false)));
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_never_expiring_token_has_no_exp() {
        let codec = codec(JwtConfig::sample());
        let token = codec
            .encode(
                TokenType::Refresh,
                "alice",
                &EncodeOptions::default().expires(Expiry::Never),
            )
            .unwrap();
        let payload = payload_of(&token);
        assert!(!payload.contains_key("exp"));
        assert!(!payload.contains_key("fresh"));
        assert_eq!(payload["type"], json!("refresh"));

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.exp, None);
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_expired_token() {
        let codec = codec(JwtConfig::sample());
        let token = codec
            .encode(
                TokenType::Access,
                "alice",
                &EncodeOptions::default().expires(Expiry::seconds(-10)),
            )
            .unwrap();
        assert_eq!(codec.decode(&token).unwrap_err(), JwtError::ExpiredToken);
    }

    #[test]
    fn test_configuration_conflicts_on_encode() {
        let codec = codec(JwtConfig::sample());
        let role = codec.encode(TokenType::Access, "alice", &EncodeOptions::default().role("ADMIN"));
        assert!(matches!(role, Err(JwtError::ConfigurationConflict(_))));

        let public = codec.encode(
            TokenType::Access,
            "alice",
            &EncodeOptions::default().public_claim("plan", "gold"),
        );
        assert!(matches!(public, Err(JwtError::ConfigurationConflict(_))));

        let fresh_refresh =
            codec.encode(TokenType::Refresh, "alice", &EncodeOptions::default().fresh(true));
        assert!(matches!(fresh_refresh, Err(JwtError::ConfigurationConflict(_))));
    }

    #[test]
    fn test_signature_and_structure_failures() {
        let issuer = codec(JwtConfig::sample());
        let verifier = codec(JwtConfig {
            secret_key: Some("another-secret".to_string()),
            ..JwtConfig::default()
        });
        let token = issuer
            .encode(TokenType::Access, "alice", &EncodeOptions::default())
            .unwrap();

        assert!(matches!(verifier.decode(&token), Err(JwtError::InvalidToken(_))));
        assert!(matches!(issuer.decode("not.a.token"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn test_issuer_and_audience() {
        let issuer = codec(JwtConfig {
            default_issuer: Some("auth.example.com".to_string()),
            default_audience: Some("api".to_string()),
            ..JwtConfig::sample()
        });
        let token = issuer
            .encode(TokenType::Access, "alice", &EncodeOptions::default())
            .unwrap();
        let payload = payload_of(&token);
        assert_eq!(payload["iss"], json!("auth.example.com"));
        assert_eq!(payload["aud"], json!("api"));
        assert!(issuer.decode(&token).is_ok());

        // Same keys, different audience
        let other = codec(JwtConfig {
            default_audience: Some("billing".to_string()),
            ..JwtConfig::sample()
        });
        assert!(matches!(other.decode(&token), Err(JwtError::InvalidToken(_))));

        // No audience configured: tokens carrying one still decode
        assert!(codec(JwtConfig::sample()).decode(&token).is_ok());
    }

    #[test]
    fn test_structured_identity_and_custom_claim_names() {
        let codec = codec(JwtConfig {
            identity_claim_key: "sub".to_string(),
            private_claim_prefix: "internal".to_string(),
            ..JwtConfig::sample()
        });
        let identity = json!({"id": 7, "email": "alice@example.com"});
        let token = codec
            .encode(
                TokenType::Access,
                &identity,
                &EncodeOptions::default().private_claim("scope", "read"),
            )
            .unwrap();
        let payload = payload_of(&token);
        assert_eq!(payload["sub"], identity);
        assert_eq!(payload["internal"], json!({"scope": "read"}));
        assert_eq!(codec.decode(&token).unwrap().identity, identity);
    }
}
