use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use session::Role;
use session::claims::{NAME_CLAIM, ROLE_CLAIM};
use session::cookies::{ACCESS_TOKEN_COOKIE, ROLE_COOKIE};

use super::*;
use crate::net::backend_stub::{GOOD_REFRESH, ISSUED_TOKEN, PASSWORD, StubBackend, dead_url};
use crate::net::transport::test_helpers::FakeTransport;
use crate::state::persistence::MemoryPersistence;

fn jwt(name: &str, role: &str) -> String {
    let payload = json!({ NAME_CLAIM: name, ROLE_CLAIM: role });
    format!("h.{}.s", URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap()))
}

fn grant(access_token: String) -> TokenGrant {
    TokenGrant { access_token, refresh_token: Some("refresh".into()), ..TokenGrant::default() }
}

fn manager() -> SessionManager<FakeTransport> {
    SessionManager::new(AuthStore::in_memory(), CookieBridge::new(FakeTransport::open()))
}

#[tokio::test]
async fn sign_in_populates_store_cookies_and_identity() {
    let manager = manager();
    let identity = manager.sign_in(grant(jwt("alice", "ADMIN"))).await.unwrap();

    assert!(identity.is_authenticated);
    assert_eq!(identity.role, Some(Role::Admin));
    assert_eq!(identity.username.as_deref(), Some("alice"));
    assert_eq!(manager.store().get().role, Some(Role::Admin));
    assert_eq!(manager.bridge().transport().cookie(ROLE_COOKIE).as_deref(), Some("ADMIN"));
}

#[tokio::test]
async fn identity_is_stable_between_reads() {
    let manager = manager();
    manager.sign_in(grant(jwt("alice", "SHOPPER"))).await.unwrap();
    assert!(Arc::ptr_eq(&manager.identity(), &manager.identity()));
}

#[tokio::test]
async fn repeated_sign_in_with_same_token_syncs_once() {
    let manager = manager();
    let token = jwt("alice", "SHOPPER");
    manager.sign_in(grant(token.clone())).await.unwrap();
    manager.sign_in(grant(token)).await.unwrap();
    assert_eq!(manager.bridge().transport().sets(), 1);
}

#[tokio::test]
async fn apply_refresh_replaces_token_and_resyncs() {
    let manager = manager();
    manager.sign_in(grant(jwt("alice", "SHOPPER"))).await.unwrap();
    let refreshed = jwt("alice-2", "SHOPPER");
    manager.apply_refresh(grant(refreshed.clone())).await.unwrap();

    assert_eq!(manager.store().get().access_token, Some(refreshed.clone()));
    assert_eq!(manager.bridge().transport().cookie(ACCESS_TOKEN_COOKIE), Some(refreshed));
    assert_eq!(manager.identity().username.as_deref(), Some("alice-2"));
}

#[tokio::test]
async fn sign_out_clears_store_and_cookies() {
    let manager = manager();
    manager.sign_in(grant(jwt("alice", "SHOPPER"))).await.unwrap();
    manager.sign_out().await.unwrap();

    assert_eq!(manager.store().get(), AuthState::empty());
    assert!(manager.bridge().transport().cookie(ACCESS_TOKEN_COOKIE).is_none());
    assert!(!manager.identity().is_authenticated);
}

#[tokio::test]
async fn sign_out_reports_failed_clear_but_still_signs_out() {
    let manager = manager();
    manager.sign_in(grant(jwt("alice", "SHOPPER"))).await.unwrap();
    manager.bridge().transport().fail_next_clear();

    assert!(matches!(manager.sign_out().await, Err(SessionError::Bridge(_))));
    assert!(!manager.store().get().is_authenticated);
    assert!(manager.bridge().transport().cookie(ACCESS_TOKEN_COOKIE).is_none());
}

#[tokio::test]
async fn failed_sync_on_sign_in_keeps_store_and_retries() {
    let manager = manager();
    manager.bridge().transport().fail_next_set();
    let token = jwt("alice", "SHOPPER");

    assert!(manager.sign_in(grant(token.clone())).await.is_err());
    assert!(manager.store().get().is_authenticated);

    manager.sign_in(grant(token)).await.unwrap();
    assert_eq!(manager.bridge().transport().sets(), 2);
}

#[tokio::test]
async fn rehydrate_restores_and_remirrors_session() {
    let medium = Arc::new(MemoryPersistence::new());
    let first = SessionManager::new(AuthStore::new(Arc::clone(&medium)), CookieBridge::new(FakeTransport::open()));
    first.sign_in(grant(jwt("alice", "EMPLOYEE"))).await.unwrap();

    let restarted = SessionManager::new(AuthStore::new(Arc::clone(&medium)), CookieBridge::new(FakeTransport::open()));
    let identity = restarted.rehydrate().await.unwrap();
    assert!(identity.is_authenticated);
    assert_eq!(identity.role, Some(Role::Employee));
    assert_eq!(restarted.bridge().transport().cookie(ROLE_COOKIE).as_deref(), Some("EMPLOYEE"));
}

#[tokio::test]
async fn rehydrate_empty_issues_no_request() {
    let manager = manager();
    let identity = manager.rehydrate().await.unwrap();
    assert!(!identity.is_authenticated);
    assert_eq!(manager.bridge().transport().sets(), 0);
}

#[tokio::test]
async fn refresh_with_without_refresh_token_is_error() {
    let manager = manager();
    let api = AuthApi::new("http://127.0.0.1:9").unwrap();
    assert!(matches!(manager.refresh_with(&api).await, Err(SessionError::NoRefreshToken)));
}

#[tokio::test]
async fn grant_without_role_drops_previous_role_cookie() {
    let manager = manager();
    manager.sign_in(grant(jwt("alice", "ADMIN"))).await.unwrap();

    let roleless = format!(
        "h.{}.s",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({ NAME_CLAIM: "bob" })).unwrap())
    );
    let identity = manager.sign_in(grant(roleless)).await.unwrap();

    assert_eq!(identity.role, None);
    assert_eq!(manager.bridge().transport().cookie(ROLE_COOKIE), None);
}

// =============================================================================
// flows against a loopback backend
// =============================================================================

#[tokio::test]
async fn sign_in_with_installs_backend_grant() {
    let stub = StubBackend::start().await;
    let api = AuthApi::new(&stub.url()).unwrap();
    let manager = manager();

    let identity = manager.sign_in_with(&api, "a@shop.test", PASSWORD).await.unwrap();
    assert!(identity.is_authenticated);
    assert_eq!(identity.role, Some(Role::Shopper));
    assert_eq!(manager.bridge().transport().cookie(ACCESS_TOKEN_COOKIE).as_deref(), Some(ISSUED_TOKEN));
}

#[tokio::test]
async fn refresh_with_installs_new_grant() {
    let stub = StubBackend::start().await;
    let api = AuthApi::new(&stub.url()).unwrap();
    let manager = manager();
    manager
        .sign_in(TokenGrant {
            access_token: jwt("alice", "SHOPPER"),
            refresh_token: Some(GOOD_REFRESH.into()),
            ..TokenGrant::default()
        })
        .await
        .unwrap();

    manager.refresh_with(&api).await.unwrap();
    assert_eq!(manager.store().get().access_token.as_deref(), Some(ISSUED_TOKEN));
    assert_eq!(manager.bridge().transport().sets(), 2);
}

#[tokio::test]
async fn refused_refresh_signs_out_and_revokes() {
    let stub = StubBackend::start().await;
    let api = AuthApi::new(&stub.url()).unwrap();
    let manager = manager();
    manager.sign_in(grant(jwt("alice", "ADMIN"))).await.unwrap();

    let err = manager.refresh_with(&api).await.unwrap_err();
    assert!(matches!(&err, SessionError::Api(e) if e.is_rejection()), "{err:?}");
    assert_eq!(manager.store().get(), AuthState::empty());
    assert_eq!(manager.bridge().transport().clears(), 1);
    assert_eq!(manager.bridge().transport().cookie(ROLE_COOKIE), None);
    assert!(!manager.identity().is_authenticated);
}

#[tokio::test]
async fn unreachable_refresh_keeps_session() {
    let api = AuthApi::new(&dead_url().await).unwrap();
    let manager = manager();
    let token = jwt("alice", "ADMIN");
    manager.sign_in(grant(token.clone())).await.unwrap();

    let err = manager.refresh_with(&api).await.unwrap_err();
    assert!(matches!(&err, SessionError::Api(ApiError::Request(_))), "{err:?}");
    assert_eq!(manager.store().get().access_token, Some(token));
    assert_eq!(manager.bridge().transport().clears(), 0);
    assert!(manager.identity().is_authenticated);
}
