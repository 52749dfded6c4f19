mod common;

use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;
use spotauth::{
    error::{AuthError, StoreError},
    management::{CredentialStore, MemoryStore, Session},
    server::CallbackListener,
    types::{FlowState, StoredAuth},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

use common::{CLIENT_ID, FakeProvider};

fn token_body(access: &str, refresh: &str, expires_in: u64) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": expires_in,
    })
}

/// Memory store whose first `failing_saves` writes of a refresh token fail,
/// and whose loads fail altogether when `unreadable` is set.
struct FaultyStore {
    inner: MemoryStore,
    failing_saves: AtomicUsize,
    unreadable: bool,
}

impl FaultyStore {
    fn failing_saves(refresh_token: &str, count: usize) -> Self {
        FaultyStore {
            inner: stored(refresh_token),
            failing_saves: AtomicUsize::new(count),
            unreadable: false,
        }
    }

    fn unreadable() -> Self {
        FaultyStore {
            inner: MemoryStore::default(),
            failing_saves: AtomicUsize::new(0),
            unreadable: true,
        }
    }
}

fn disk_full() -> StoreError {
    StoreError::Io(io::Error::other("disk full"))
}

#[async_trait]
impl CredentialStore for FaultyStore {
    async fn load(&self) -> Result<StoredAuth, StoreError> {
        if self.unreadable {
            return Err(disk_full());
        }
        self.inner.load().await
    }

    async fn save_refresh_token(&self, refresh_token: &str) -> Result<(), StoreError> {
        let failed = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(disk_full());
        }
        self.inner.save_refresh_token(refresh_token).await
    }

    async fn save_client_id(&self, client_id: &str) -> Result<(), StoreError> {
        self.inner.save_client_id(client_id).await
    }
}

fn stored(refresh_token: &str) -> MemoryStore {
    MemoryStore::new(StoredAuth {
        client_id: CLIENT_ID.to_string(),
        refresh_token: refresh_token.to_string(),
    })
}

#[tokio::test]
async fn test_interactive_authorization_end_to_end() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=XYZ"))
        .and(body_string_contains("client_id=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT1", "RT1", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = FakeProvider::consenting("XYZ");
    let session = Session::new(settings, MemoryStore::default(), provider.clone());
    assert_eq!(session.state(), FlowState::Idle);

    // no stored refresh token: straight to the consent step
    let credential = session.authenticate().await.unwrap();

    assert_eq!(credential.access_token, "AT1");
    assert_eq!(credential.refresh_token, "RT1");
    assert_eq!(credential.expires_in, Duration::from_secs(3600));
    assert_eq!(provider.opened(), 1);
    assert_eq!(session.state(), FlowState::Authenticated);
    assert_eq!(session.access_token().await.as_deref(), Some("AT1"));
    assert_eq!(session.store().load().await.unwrap().refresh_token, "RT1");
}

#[tokio::test]
async fn test_forged_state_never_reaches_token_endpoint() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT1", "RT1", 3600)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let session = Session::new(
        settings,
        MemoryStore::default(),
        FakeProvider::forging("XYZ", "wrong-value"),
    );

    let result = session.authorize().await;
    assert!(matches!(result, Err(AuthError::InvalidAuth)), "{:?}", result);
    assert_eq!(session.state(), FlowState::Failed);
    assert!(session.credential().await.is_none());
}

#[tokio::test]
async fn test_consent_timeout_fails_and_frees_port() {
    let mock_server = MockServer::start().await;
    let mut settings = common::settings(&mock_server.uri());
    settings.callback_timeout = Duration::from_millis(300);
    let redirect_uri = settings.redirect_uri.clone();

    let provider = FakeProvider::silent();
    let session = Session::new(settings, MemoryStore::default(), provider.clone());

    let result = session.authorize().await;
    assert!(matches!(result, Err(AuthError::AuthTimeout)), "{:?}", result);
    assert_eq!(provider.opened(), 1);
    assert_eq!(session.state(), FlowState::Failed);

    CallbackListener::bind(&redirect_uri)
        .await
        .expect("redirect port still bound");
}

#[tokio::test]
async fn test_refresh_uses_stored_token_and_persists_rotation() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=RT0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT1", "RT1", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = FakeProvider::consenting("unused");
    let session = Session::new(settings, stored("RT0"), provider.clone());

    let credential = session.authenticate().await.unwrap();

    assert_eq!(credential.access_token, "AT1");
    assert_eq!(provider.opened(), 0);
    assert_eq!(session.store().load().await.unwrap().refresh_token, "RT1");
    assert_eq!(session.state(), FlowState::Authenticated);
}

#[tokio::test]
async fn test_revoked_refresh_token_falls_back_to_consent() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=FRESH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT2", "RT2", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = FakeProvider::consenting("FRESH");
    let session = Session::new(settings, stored("revoked"), provider.clone());

    let credential = session.authenticate().await.unwrap();

    assert_eq!(credential.access_token, "AT2");
    assert_eq!(provider.opened(), 1);
    assert_eq!(session.state(), FlowState::Authenticated);
    assert_eq!(session.store().load().await.unwrap().refresh_token, "RT2");
}

#[tokio::test]
async fn test_plain_refresh_failure_is_reported() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&mock_server)
        .await;

    let provider = FakeProvider::consenting("unused");
    let session = Session::new(settings, stored("revoked"), provider.clone());

    let result = session.refresh().await;
    assert!(matches!(result, Err(AuthError::TokenRequestFailed(_))), "{:?}", result);
    assert_eq!(provider.opened(), 0);
    assert_eq!(session.state(), FlowState::Failed);
    // a refused grant must not wipe what is stored
    assert_eq!(session.store().load().await.unwrap().refresh_token, "revoked");
}

#[tokio::test]
async fn test_missing_client_id_fails_without_consent() {
    let mock_server = MockServer::start().await;
    let mut settings = common::settings(&mock_server.uri());
    settings.client_id = None;

    let provider = FakeProvider::consenting("XYZ");
    let session = Session::new(settings, MemoryStore::default(), provider.clone());

    let result = session.authenticate().await;
    assert!(matches!(result, Err(AuthError::MissingClientId)), "{:?}", result);
    assert_eq!(provider.opened(), 0);
    assert_eq!(session.state(), FlowState::Failed);
}

#[tokio::test]
async fn test_client_id_is_read_from_store() {
    let mock_server = MockServer::start().await;
    let mut settings = common::settings(&mock_server.uri());
    settings.client_id = None;

    Mock::given(method("POST"))
        .and(body_string_contains("client_id=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT1", "RT1", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new(settings, stored("RT0"), FakeProvider::consenting("unused"));
    assert_eq!(session.client_id().await.unwrap(), CLIENT_ID);
    session.refresh().await.unwrap();
}

#[tokio::test]
async fn test_token_operations_never_overlap() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    // if both refreshes ran at once, both would present RT0
    Mock::given(method("POST"))
        .and(body_string_contains("refresh_token=RT0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("AT1", "RT1", 3600))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("refresh_token=RT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT2", "RT2", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new(settings, stored("RT0"), FakeProvider::consenting("unused"));

    let (first, second) = tokio::join!(session.refresh(), session.refresh());
    let mut tokens = vec![first.unwrap().access_token, second.unwrap().access_token];
    tokens.sort();

    assert_eq!(tokens, vec!["AT1".to_string(), "AT2".to_string()]);
    assert_eq!(session.store().load().await.unwrap().refresh_token, "RT2");
}

#[tokio::test]
async fn test_run_refreshes_before_expiry_with_latest_refresh_token() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    for (presented, access, rotated, expires_in) in [
        ("RT0", "AT1", "RT1", 1),
        ("RT1", "AT2", "RT2", 1),
        ("RT2", "AT3", "RT3", 3600),
    ] {
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains(format!("refresh_token={}", presented)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(token_body(access, rotated, expires_in)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let session = Session::new(settings, stored("RT0"), FakeProvider::consenting("unused"));

    let mut seen = Vec::new();
    let outcome = tokio::time::timeout(
        Duration::from_secs(4),
        session.run(|credential| seen.push(credential.access_token.clone())),
    )
    .await;

    // the loop never ends on its own
    assert!(outcome.is_err());
    assert_eq!(seen, vec!["AT1", "AT2", "AT3"]);
    assert_eq!(session.state(), FlowState::RefreshScheduled);
    assert_eq!(session.store().load().await.unwrap().refresh_token, "RT3");
}

#[tokio::test]
async fn test_rotated_token_survives_failed_persist() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .and(body_string_contains("refresh_token=RT0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT1", "RT1", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("refresh_token=RT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT2", "RT2", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new(
        settings,
        FaultyStore::failing_saves("RT0", 1),
        FakeProvider::consenting("unused"),
    );

    let result = session.refresh().await;
    assert!(matches!(result, Err(AuthError::Store(_))), "{:?}", result);
    assert_eq!(session.state(), FlowState::Failed);
    assert_eq!(
        session.credential().await.map(|c| c.refresh_token).as_deref(),
        Some("RT1")
    );

    // RT0 was rotated away and must never be presented again
    let credential = session.refresh().await.unwrap();
    assert_eq!(credential.access_token, "AT2");
    assert_eq!(session.store().load().await.unwrap().refresh_token, "RT2");
}

#[tokio::test]
async fn test_exchanged_token_kept_when_persist_fails() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT1", "RT1", 3600)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = Session::new(
        settings,
        FaultyStore::failing_saves("", 1),
        FakeProvider::consenting("XYZ"),
    );

    let result = session.authorize().await;
    assert!(matches!(result, Err(AuthError::Store(_))), "{:?}", result);
    assert_eq!(session.access_token().await.as_deref(), Some("AT1"));
}

#[tokio::test]
async fn test_store_failure_does_not_start_consent() {
    let mock_server = MockServer::start().await;
    let settings = common::settings(&mock_server.uri());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("AT1", "RT1", 3600)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = FakeProvider::consenting("XYZ");
    let session = Session::new(settings, FaultyStore::unreadable(), provider.clone());

    let result = session.authenticate().await;
    assert!(matches!(result, Err(AuthError::Store(_))), "{:?}", result);
    assert_eq!(provider.opened(), 0);
    assert_eq!(session.state(), FlowState::Failed);
}
