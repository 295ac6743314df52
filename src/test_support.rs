//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::net::gateway::RequestGateway;
use crate::net::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::net::types::{Role, SessionUser};
use crate::services::auth::AuthFacade;
use crate::store::CredentialStore;

pub const BASE_URL: &str = "http://api.test/api";

/// Scripted transport. Replies are consumed in order; every request is
/// recorded. Running out of replies is a transport failure.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse { status, body: body.into() }));
    }

    pub fn reply_json(&self, status: u16, body: &serde_json::Value) {
        self.reply(status, body.to_string());
    }

    pub fn fail(&self, detail: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError(detail.to_owned())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted reply".into())))
    }
}

pub fn gateway(mock: &Arc<MockTransport>, store: &CredentialStore) -> RequestGateway {
    RequestGateway::new(BASE_URL, mock.clone(), store.clone())
}

pub fn facade(mock: &Arc<MockTransport>, store: &CredentialStore) -> AuthFacade {
    AuthFacade::new(gateway(mock, store))
}

pub fn user() -> SessionUser {
    SessionUser { id: 42, email: "guard@shield.test".into(), name: "Guard".into(), role: Role::User }
}

pub fn user_json() -> serde_json::Value {
    serde_json::json!({ "id": 42, "email": "guard@shield.test", "name": "Guard", "role": "USER" })
}

/// Fresh, not-yet-created directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("smartshield-test-{}-{n}", std::process::id()))
}
