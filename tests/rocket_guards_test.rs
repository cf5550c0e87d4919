// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end tests of the request guards through the demo server

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use rocket::config::LogLevel;
use rocket::figment::Figment;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};

use rocket_jwt_extended::auth::{
    Blacklist, BlacklistError, EncodeOptions, ErrorKind, JwtError, JwtManager, JwtManagerBuilder,
    Token,
};
use rocket_jwt_extended::config::{Expiry, JwtConfig, TokenLocation};
use rocket_jwt_extended::server::{build_rocket, handlers::AdminOnly};

fn get_test_figment() -> Figment {
    rocket::Config::figment()
        .merge(("port", 0))
        .merge(("address", "127.0.0.1"))
        .merge(("log_level", LogLevel::Off))
}

fn test_config() -> JwtConfig {
    JwtConfig {
        secret_key: Some("integration-test-secret".to_string()),
        ..JwtConfig::default()
    }
}

async fn client_with(builder: JwtManagerBuilder) -> (Client, JwtManager) {
    let manager = builder.build().expect("valid manager");
    let client = Client::tracked(build_rocket(get_test_figment(), manager.clone()))
        .await
        .expect("valid rocket instance");
    (client, manager)
}

async fn client() -> (Client, JwtManager) {
    client_with(JwtManager::builder_with(test_config())).await
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}

async fn login(client: &Client, body: Value) -> (String, String) {
    let response = client
        .post("/login")
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let tokens: Value = response.into_json().await.expect("JSON body");
    (
        tokens["access_token"].as_str().expect("access token").to_string(),
        tokens["refresh_token"].as_str().expect("refresh token").to_string(),
    )
}

async fn get_json(client: &Client, uri: &str, token: Option<&str>) -> (Status, Value) {
    let mut request = client.get(uri.to_string());
    if let Some(token) = token {
        request = request.header(bearer(token));
    }
    let response = request.dispatch().await;
    let status = response.status();
    let body = response.into_json().await.unwrap_or(Value::Null);
    (status, body)
}

#[rocket::async_test]
async fn test_required_guard_accepts_bearer_token() {
    let (client, manager) = client().await;
    let token = manager
        .create_access_token("alice", EncodeOptions::default().expires(Expiry::minutes(15)))
        .unwrap();

    let (status, body) = get_json(&client, "/protected", Some(&token)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body, json!({"logged_in_as": "alice"}));
}

#[rocket::async_test]
async fn test_wrong_header_prefix_is_rejected() {
    let (client, manager) = client().await;
    let token = manager
        .create_access_token("alice", EncodeOptions::default())
        .unwrap();

    let response = client
        .get("/protected")
        .header(Header::new("Authorization", format!("Token {}", token)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(
        body,
        json!({"msg": "Bad Authorization header. Expected value 'Bearer <JWT>'"})
    );
}

#[rocket::async_test]
async fn test_missing_header_is_rejected() {
    let (client, _) = client().await;

    let (status, body) = get_json(&client, "/protected", None).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body, json!({"msg": "Missing Authorization Header"}));
}

#[rocket::async_test]
async fn test_role_without_acl_is_a_conflict() {
    let manager = JwtManager::builder_with(test_config()).build().unwrap();

    let result = manager.create_access_token("alice", EncodeOptions::default().role("ADMIN"));
    assert!(matches!(result, Err(JwtError::ConfigurationConflict(_))));
}

#[rocket::async_test]
async fn test_invalid_signature_and_expired_token() {
    let (client, manager) = client().await;

    let other = JwtManager::builder_with(JwtConfig {
        secret_key: Some("some other secret".to_string()),
        ..JwtConfig::default()
    })
    .build()
    .unwrap();
    let forged = other
        .create_access_token("mallory", EncodeOptions::default())
        .unwrap();
    let (status, _) = get_json(&client, "/protected", Some(&forged)).await;
    assert_eq!(status, Status::UnprocessableEntity);

    let expired = manager
        .create_access_token("alice", EncodeOptions::default().expires(Expiry::seconds(-10)))
        .unwrap();
    let (status, body) = get_json(&client, "/protected", Some(&expired)).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body, json!({"msg": "Token has expired"}));
}

#[rocket::async_test]
async fn test_login_refresh_and_freshness() {
    let (client, _) = client().await;
    let (access, refresh) = login(&client, json!({"username": "alice"})).await;

    // The login token is fresh
    let (status, body) = get_json(&client, "/fresh", Some(&access)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body, json!({"fresh_logged_in_as": "alice"}));

    // An access token cannot be used to refresh
    let response = client.post("/refresh").header(bearer(&access)).dispatch().await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body, json!({"msg": "Only refresh tokens are allowed"}));

    // A refresh token cannot reach an access-protected route
    let (status, body) = get_json(&client, "/protected", Some(&refresh)).await;
    assert_eq!(status, Status::UnprocessableEntity);
    assert_eq!(body, json!({"msg": "Only access tokens are allowed"}));

    let response = client.post("/refresh").header(bearer(&refresh)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    let refreshed = body["access_token"].as_str().unwrap().to_string();

    let (status, _) = get_json(&client, "/protected", Some(&refreshed)).await;
    assert_eq!(status, Status::Ok);

    // Refreshed access tokens are not fresh
    let (status, body) = get_json(&client, "/fresh", Some(&refreshed)).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body, json!({"msg": "Fresh token required"}));
}

#[rocket::async_test]
async fn test_optional_guard() {
    let (client, manager) = client().await;

    let (status, body) = get_json(&client, "/optional", None).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body, json!({"logged_in_as": null}));

    // A malformed header counts as no token
    let response = client
        .get("/optional")
        .header(Header::new("Authorization", "Basic dXNlcjpwYXNz"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let token = manager
        .create_access_token("bob", EncodeOptions::default())
        .unwrap();
    let (status, body) = get_json(&client, "/optional", Some(&token)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body, json!({"logged_in_as": "bob"}));

    // A present but invalid token still rejects the request
    let expired = manager
        .create_access_token("bob", EncodeOptions::default().expires(Expiry::seconds(-10)))
        .unwrap();
    let (status, _) = get_json(&client, "/optional", Some(&expired)).await;
    assert_eq!(status, Status::Unauthorized);
}

#[rocket::async_test]
async fn test_admin_policy() {
    let builder = JwtManager::builder_with(JwtConfig {
        use_acl: true,
        ..test_config()
    })
    .policy::<AdminOnly>();
    let (client, manager) = client_with(builder).await;

    let (admin, _) = login(&client, json!({"username": "root", "role": "ADMIN"})).await;
    let (status, body) = get_json(&client, "/admin", Some(&admin)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body, json!({"admin": "root"}));

    let (user, _) = login(&client, json!({"username": "alice", "role": "USER"})).await;
    let (status, body) = get_json(&client, "/admin", Some(&user)).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body, json!({"msg": "Role USER is not allowed"}));

    let no_role = manager
        .create_access_token("carol", EncodeOptions::default())
        .unwrap();
    let (status, body) = get_json(&client, "/admin", Some(&no_role)).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body, json!({"msg": "Missing role claim"}));

    // The role survives a refresh
    let (_, refresh) = login(&client, json!({"username": "root", "role": "ADMIN"})).await;
    let response = client.post("/refresh").header(bearer(&refresh)).dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    let refreshed = body["access_token"].as_str().unwrap().to_string();
    let (status, _) = get_json(&client, "/admin", Some(&refreshed)).await;
    assert_eq!(status, Status::Ok);
}

#[rocket::async_test]
async fn test_admin_policy_requires_acl() {
    let result = JwtManager::builder_with(test_config())
        .policy::<AdminOnly>()
        .build();
    assert!(matches!(result, Err(JwtError::ConfigurationConflict(_))));
}

#[rocket::async_test]
async fn test_logout_revokes_tokens() {
    let (client, manager) = client_with(JwtManager::builder_with(JwtConfig {
        use_blacklist: true,
        ..test_config()
    }))
    .await;
    let (access, refresh) = login(&client, json!({"username": "alice"})).await;

    let response = client.delete("/logout").header(bearer(&access)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let (status, body) = get_json(&client, "/protected", Some(&access)).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(body, json!({"msg": "Token has been revoked"}));

    // The refresh token is still usable until it is revoked too
    let response = client.post("/refresh").header(bearer(&refresh)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .delete("/logout/refresh")
        .header(bearer(&refresh))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let response = client.post("/refresh").header(bearer(&refresh)).dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);

    let token = manager.decode_token(&refresh).unwrap();
    assert!(manager.is_revoked(token.jti()).await.unwrap());
}

#[rocket::async_test]
async fn test_logout_without_blacklist_is_a_server_error() {
    let (client, _) = client().await;
    let (access, _) = login(&client, json!({"username": "alice"})).await;

    let response = client.delete("/logout").header(bearer(&access)).dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
}

#[rocket::async_test]
async fn test_query_location() {
    let (client, manager) = client_with(JwtManager::builder_with(JwtConfig {
        token_location: vec![TokenLocation::Header, TokenLocation::Query],
        ..test_config()
    }))
    .await;
    let token = manager
        .create_access_token("alice", EncodeOptions::default())
        .unwrap();

    let (status, body) = get_json(&client, &format!("/protected?jwt={}", token), None).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body, json!({"logged_in_as": "alice"}));

    let (status, body) = get_json(&client, "/protected", None).await;
    assert_eq!(status, Status::Unauthorized);
    assert_eq!(
        body,
        json!({"msg": "Missing JWT in header or query (Missing Authorization Header; Missing \"jwt\" query parameter)"})
    );
}

#[rocket::async_test]
async fn test_exempt_method_skips_verification() {
    let (client, _) = client().await;

    let response = client.options("/protected").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}

#[rocket::async_test]
async fn test_custom_error_rendering() {
    let builder = JwtManager::builder_with(JwtConfig {
        error_msg_key: "error".to_string(),
        ..test_config()
    })
    .error_handler(ErrorKind::NoAuthorization, |_| {
        (Status::Forbidden, "Authentication required".to_string())
    });
    let (client, _) = client_with(builder).await;

    let (status, body) = get_json(&client, "/protected", None).await;
    assert_eq!(status, Status::Forbidden);
    assert_eq!(body, json!({"error": "Authentication required"}));

    // Errors outside the guards use the same message key
    let (status, body) = get_json(&client, "/does-not-exist", None).await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body, json!({"error": "Not Found"}));
}

struct UnreachableBlacklist;

#[async_trait]
impl Blacklist for UnreachableBlacklist {
    async fn is_revoked(&self, _jti: &str) -> Result<bool, BlacklistError> {
        Err(BlacklistError::Backend("connection refused".to_string()))
    }

    async fn revoke(&self, _jti: &str, _valid_for: Duration) -> Result<(), BlacklistError> {
        Err(BlacklistError::Backend("connection refused".to_string()))
    }
}

#[rocket::async_test]
async fn test_unavailable_blacklist_fails_closed() {
    let builder = JwtManager::builder_with(JwtConfig {
        use_blacklist: true,
        ..test_config()
    })
    .blacklist(Arc::new(UnreachableBlacklist));
    let (client, manager) = client_with(builder).await;
    let token = manager
        .create_access_token("alice", EncodeOptions::default())
        .unwrap();

    let (status, _) = get_json(&client, "/protected", Some(&token)).await;
    assert_eq!(status, Status::ServiceUnavailable);
}

#[rocket::async_test]
async fn test_application_hooks_reject_requests() {
    let builder = JwtManager::builder_with(test_config())
        .claims_verifier(Arc::new(|token: &Token| {
            token.private_claims().get("banned").is_none()
        }))
        .user_loader(Arc::new(|identity: &Value| {
            (identity == "alice").then(|| json!({"name": "alice"}))
        }));
    let (client, manager) = client_with(builder).await;

    let alice = manager
        .create_access_token("alice", EncodeOptions::default())
        .unwrap();
    let (status, body) = get_json(&client, "/protected", Some(&alice)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body, json!({"logged_in_as": "alice"}));

    let banned = manager
        .create_access_token("alice", EncodeOptions::default().private_claim("banned", true))
        .unwrap();
    let (status, body) = get_json(&client, "/protected", Some(&banned)).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body, json!({"msg": "User claims verification failed"}));

    let bob = manager
        .create_refresh_token("bob", EncodeOptions::default())
        .unwrap();
    let response = client.post("/refresh").header(bearer(&bob)).dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body: Value = response.into_json().await.expect("JSON body");
    assert_eq!(body, json!({"msg": "Error loading the user bob"}));
}
