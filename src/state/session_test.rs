use super::*;
use crate::net::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::net::types::Role;
use crate::store::CredentialStore;
use crate::test_support::{BASE_URL, MockTransport, facade, user, user_json};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

fn session(mock: &Arc<MockTransport>, store: &CredentialStore) -> SessionContext {
    SessionContext::new(facade(mock, store))
}

fn me_ok() -> serde_json::Value {
    json!({ "success": true, "message": "ok", "data": user_json() })
}

// =============================================================================
// initial phase and no-credential short-circuit
// =============================================================================

#[test]
fn new_session_is_initializing() {
    let ctx = session(&MockTransport::new(), &CredentialStore::in_memory());
    assert_eq!(ctx.phase(), SessionPhase::Initializing);
    assert_eq!(ctx.state(), SessionState { user: None, loading: true });
    assert_eq!(ctx.user(), None);
}

#[tokio::test]
async fn refresh_without_credential_skips_network() {
    let mock = MockTransport::new();
    let ctx = session(&mock, &CredentialStore::in_memory());

    let state = ctx.mount().await;

    assert_eq!(state, SessionState { user: None, loading: false });
    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn refresh_with_detached_store_is_anonymous() {
    let mock = MockTransport::new();
    let ctx = session(&mock, &CredentialStore::detached());

    ctx.mount().await;

    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn repeated_anonymous_refresh_stays_anonymous() {
    let mock = MockTransport::new();
    let ctx = session(&mock, &CredentialStore::in_memory());

    ctx.refresh_user().await;
    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    ctx.refresh_user().await;
    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(mock.request_count(), 0);
}

// =============================================================================
// lookups
// =============================================================================

#[tokio::test]
async fn refresh_with_valid_credential_authenticates() {
    let mock = MockTransport::new();
    mock.reply_json(200, &me_ok());
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = session(&mock, &store);

    let state = ctx.mount().await;

    assert_eq!(state, SessionState { user: Some(user()), loading: false });
    assert_eq!(ctx.phase(), SessionPhase::Authenticated(user()));
    assert_eq!(store.get().as_deref(), Some("tok"));
}

#[tokio::test]
async fn failed_lookup_evicts_credential() {
    let mock = MockTransport::new();
    mock.reply_json(401, &json!({ "message": "expired" }));
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = session(&mock, &store);

    ctx.mount().await;

    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn unreachable_lookup_also_evicts_credential() {
    let mock = MockTransport::new();
    mock.fail("offline");
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = session(&mock, &store);

    ctx.mount().await;

    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn success_envelope_without_data_is_anonymous() {
    let mock = MockTransport::new();
    mock.reply_json(200, &json!({ "success": true, "message": "ok" }));
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = session(&mock, &store);

    ctx.mount().await;

    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn login_then_refresh_presents_new_credential() {
    let mock = MockTransport::new();
    mock.reply_json(200, &json!({ "success": true, "message": "ok", "accessToken": "tok-T", "user": user_json() }));
    mock.reply_json(200, &me_ok());
    let store = CredentialStore::in_memory();
    let ctx = session(&mock, &store);
    ctx.mount().await;

    let resp = ctx.login(&LoginRequest::new("guard@shield.test", "secret1")).await;

    assert!(resp.success);
    assert_eq!(ctx.phase(), SessionPhase::Authenticated(user()));
    let sent = mock.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].url, format!("{BASE_URL}/auth/me"));
    assert_eq!(sent[1].header("Authorization"), Some("Bearer tok-T"));
}

#[tokio::test]
async fn login_over_corrupt_credential_file_authenticates() {
    let dir = crate::test_support::scratch_dir();
    let path = dir.join("credentials.json");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(&path, "garbage").unwrap();

    let mock = MockTransport::new();
    mock.reply_json(200, &json!({ "success": true, "message": "ok", "accessToken": "T", "user": user_json() }));
    mock.reply_json(200, &me_ok());
    let store = CredentialStore::file(&path);
    let ctx = session(&mock, &store);

    let resp = ctx.login(&LoginRequest::new("guard@shield.test", "secret1")).await;

    assert!(resp.success);
    assert_eq!(store.get().as_deref(), Some("T"));
    assert_eq!(ctx.phase(), SessionPhase::Authenticated(user()));
    assert_eq!(mock.request_count(), 2);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn failed_login_keeps_anonymous_and_fills_message() {
    let mock = MockTransport::new();
    mock.reply_json(200, &json!({ "success": false }));
    let ctx = session(&mock, &CredentialStore::in_memory());
    ctx.mount().await;

    let resp = ctx.login(&LoginRequest::new("a@b.test", "wrong")).await;

    assert!(!resp.success);
    assert_eq!(resp.message, LOGIN_FAILED_MESSAGE);
    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn signup_with_token_authenticates() {
    let mock = MockTransport::new();
    mock.reply_json(200, &json!({ "success": true, "message": "welcome", "accessToken": "tok-S" }));
    mock.reply_json(
        200,
        &json!({ "success": true, "message": "ok", "data": { "id": 9, "email": "new@shield.test", "name": "New", "role": "ADMIN" } }),
    );
    let store = CredentialStore::in_memory();
    let ctx = session(&mock, &store);

    let req = SignupRequest {
        email: "new@shield.test".into(),
        password: "secret1".into(),
        name: Some("New".into()),
        phone_number: None,
        management_code: None,
    };
    let resp = ctx.signup(&req).await;

    assert!(resp.success);
    let user = ctx.user().unwrap();
    assert_eq!(user.id, 9);
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn signup_rejection_fills_fallback_message() {
    let mock = MockTransport::new();
    mock.reply_json(200, &json!({ "success": false, "message": "" }));
    let ctx = session(&mock, &CredentialStore::in_memory());

    let req = SignupRequest {
        email: "new@shield.test".into(),
        password: "secret1".into(),
        name: None,
        phone_number: None,
        management_code: None,
    };
    let resp = ctx.signup(&req).await;

    assert_eq!(resp.message, SIGNUP_FAILED_MESSAGE);
    assert_eq!(mock.request_count(), 1);
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_is_anonymous_even_on_server_error() {
    let mock = MockTransport::new();
    mock.reply_json(200, &me_ok());
    mock.reply_json(500, &json!({ "message": "Internal error" }));
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = session(&mock, &store);
    ctx.mount().await;
    assert!(ctx.user().is_some());

    let resp = ctx.logout().await;

    assert!(!resp.success);
    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(ctx.state(), SessionState { user: None, loading: false });
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn logout_before_mount_settles_anonymous() {
    let mock = MockTransport::new();
    mock.fail("offline");
    let ctx = session(&mock, &CredentialStore::in_memory());

    ctx.logout().await;

    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let mock = MockTransport::new();
    mock.reply_json(200, &me_ok());
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = session(&mock, &store);
    let mut rx = ctx.subscribe();
    assert_eq!(*rx.borrow_and_update(), SessionPhase::Initializing);

    ctx.mount().await;

    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), SessionPhase::Authenticated(user()));
}

// =============================================================================
// overlapping calls
// =============================================================================

/// Transport whose replies are held until the test opens each one's gate.
/// Replies are bound to requests in arrival order.
#[derive(Default)]
struct GatedTransport {
    arrived: AtomicUsize,
    script: Mutex<VecDeque<(HttpResponse, oneshot::Receiver<()>)>>,
}

impl GatedTransport {
    fn push(&self, body: serde_json::Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        let reply = HttpResponse { status: 200, body: body.to_string() };
        self.script.lock().unwrap().push_back((reply, rx));
        tx
    }

    async fn wait_for_arrivals(&self, n: usize) {
        while self.arrived.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait::async_trait]
impl Transport for GatedTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let next = self.script.lock().unwrap().pop_front();
        self.arrived.fetch_add(1, Ordering::SeqCst);
        let Some((reply, gate)) = next else {
            return Err(TransportError("no scripted reply".into()));
        };
        gate.await.map_err(|_| TransportError("gate dropped".into()))?;
        Ok(reply)
    }
}

fn gated_session(transport: &Arc<GatedTransport>, store: &CredentialStore) -> SessionContext {
    let gateway = crate::net::gateway::RequestGateway::new(BASE_URL, transport.clone(), store.clone());
    SessionContext::new(AuthFacade::new(gateway))
}

#[tokio::test]
async fn superseded_refresh_result_is_discarded() {
    let transport = Arc::new(GatedTransport::default());
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = gated_session(&transport, &store);

    let stale_user = json!({ "id": 1, "email": "old@shield.test", "name": "Old", "role": "USER" });
    let open_first = transport.push(json!({ "success": true, "message": "ok", "data": stale_user }));
    let open_second = transport.push(me_ok());

    let first = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.refresh_user().await }
    });
    transport.wait_for_arrivals(1).await;
    let second = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.refresh_user().await }
    });
    transport.wait_for_arrivals(2).await;

    open_second.send(()).unwrap();
    second.await.unwrap();
    assert_eq!(ctx.phase(), SessionPhase::Authenticated(user()));

    open_first.send(()).unwrap();
    first.await.unwrap();
    assert_eq!(ctx.phase(), SessionPhase::Authenticated(user()));
}

#[tokio::test]
async fn refresh_finishing_after_logout_cannot_resurrect_user() {
    let transport = Arc::new(GatedTransport::default());
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = gated_session(&transport, &store);

    let open_lookup = transport.push(me_ok());
    let open_logout = transport.push(json!({ "success": true, "message": "bye" }));

    let lookup = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.refresh_user().await }
    });
    transport.wait_for_arrivals(1).await;
    let logout = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.logout().await }
    });
    transport.wait_for_arrivals(2).await;

    open_logout.send(()).unwrap();
    logout.await.unwrap();
    assert_eq!(ctx.phase(), SessionPhase::Anonymous);

    open_lookup.send(()).unwrap();
    lookup.await.unwrap();
    assert_eq!(ctx.phase(), SessionPhase::Anonymous);
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn superseded_failing_refresh_does_not_evict() {
    let transport = Arc::new(GatedTransport::default());
    let store = CredentialStore::in_memory();
    store.set("tok");
    let ctx = gated_session(&transport, &store);

    let open_first = transport.push(json!({ "success": false, "message": "expired" }));
    let open_second = transport.push(me_ok());

    let first = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.refresh_user().await }
    });
    transport.wait_for_arrivals(1).await;
    let second = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.refresh_user().await }
    });
    transport.wait_for_arrivals(2).await;

    open_second.send(()).unwrap();
    second.await.unwrap();
    open_first.send(()).unwrap();
    first.await.unwrap();

    assert_eq!(ctx.phase(), SessionPhase::Authenticated(user()));
    assert_eq!(store.get().as_deref(), Some("tok"));
}
