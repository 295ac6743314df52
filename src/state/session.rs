//! Session state machine for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`SessionContext`] is built per process and handed to every consumer
//! that needs to know who is signed in. Consumers read the current
//! [`SessionPhase`] or subscribe to changes; they change it only through
//! [`SessionContext::refresh_user`], [`SessionContext::logout`], and the
//! login/signup flows.
//!
//! SEQUENCING
//! ==========
//! Each refresh and logout takes a ticket from a monotonically increasing
//! counter. A refresh whose ticket is no longer the latest when its lookup
//! returns discards its result, so overlapping refreshes resolve to the most
//! recently started one and a logout can never be undone by a stale lookup.
//!
//! KNOWN IMPRECISION
//! =================
//! Any failed identity lookup while a credential is stored evicts the
//! credential, whether the token expired or the server was merely
//! unreachable.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::net::types::{ApiResponse, AuthResponse, LoginRequest, SessionUser, SignupRequest};
use crate::services::auth::AuthFacade;

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed.";
pub const SIGNUP_FAILED_MESSAGE: &str = "Signup failed.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No refresh has completed yet.
    Initializing,
    Authenticated(SessionUser),
    Anonymous,
}

impl SessionPhase {
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        match self {
            Self::Initializing => SessionState { user: None, loading: true },
            Self::Authenticated(user) => SessionState { user: Some(user.clone()), loading: false },
            Self::Anonymous => SessionState { user: None, loading: false },
        }
    }
}

/// Flattened `{ user, loading }` view of a [`SessionPhase`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<SessionUser>,
    pub loading: bool,
}

struct Inner {
    auth: AuthFacade,
    phase: watch::Sender<SessionPhase>,
    latest: Mutex<u64>,
}

/// Shared handle to the session. Clones observe and drive the same state.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// New session in [`SessionPhase::Initializing`]. Call
    /// [`SessionContext::mount`] to resolve it.
    #[must_use]
    pub fn new(auth: AuthFacade) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Initializing);
        Self { inner: Arc::new(Inner { auth, phase, latest: Mutex::new(0) }) }
    }

    /// Resolve the initial phase. Equivalent to the first `refresh_user`.
    pub async fn mount(&self) -> SessionState {
        self.refresh_user().await
    }

    #[must_use]
    pub fn auth(&self) -> &AuthFacade {
        &self.inner.auth
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.phase.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.phase.borrow().snapshot()
    }

    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        match &*self.inner.phase.borrow() {
            SessionPhase::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    /// Receiver that observes every phase change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase.subscribe()
    }

    /// Re-derive the phase from the stored credential.
    ///
    /// With no credential this settles to `Anonymous` without a network
    /// call. Otherwise the identity lookup decides: success gives
    /// `Authenticated`, anything else evicts the credential and gives
    /// `Anonymous`. The current phase stays visible while the lookup runs.
    pub async fn refresh_user(&self) -> SessionState {
        let ticket = self.take_ticket();

        if self.inner.auth.store().get().is_none() {
            self.settle(ticket, SessionPhase::Anonymous, false);
            return self.state();
        }

        let response = self.inner.auth.current_user().await;
        let next = match response {
            ApiResponse { success: true, data: Some(user), .. } => SessionPhase::Authenticated(user),
            ApiResponse { message, .. } => {
                tracing::warn!(%message, "identity lookup failed; evicting credential");
                SessionPhase::Anonymous
            }
        };
        let evict = next == SessionPhase::Anonymous;
        self.settle(ticket, next, evict);
        self.state()
    }

    /// Log out on the server and always end `Anonymous` with no stored
    /// credential, even when the call fails.
    pub async fn logout(&self) -> ApiResponse<serde_json::Value> {
        self.take_ticket();
        let response = self.inner.auth.logout().await;

        let mut latest = self.inner.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest += 1;
        self.inner.auth.store().remove();
        self.inner.phase.send_replace(SessionPhase::Anonymous);
        tracing::info!("session logged out");
        response
    }

    /// Log in, then re-derive the session from the fresh credential.
    pub async fn login(&self, request: &LoginRequest) -> AuthResponse {
        let mut response = self.inner.auth.login(request).await;
        if response.success {
            self.refresh_user().await;
        } else if response.message.is_empty() {
            LOGIN_FAILED_MESSAGE.clone_into(&mut response.message);
        }
        response
    }

    /// Sign up, then re-derive the session if a credential was issued.
    pub async fn signup(&self, request: &SignupRequest) -> AuthResponse {
        let mut response = self.inner.auth.signup(request).await;
        if response.success {
            self.refresh_user().await;
        } else if response.message.is_empty() {
            SIGNUP_FAILED_MESSAGE.clone_into(&mut response.message);
        }
        response
    }

    fn take_ticket(&self) -> u64 {
        let mut latest = self.inner.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest += 1;
        *latest
    }

    /// Apply `next` if `ticket` is still the latest; otherwise drop it.
    fn settle(&self, ticket: u64, next: SessionPhase, evict: bool) {
        let latest = self.inner.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if *latest != ticket {
            tracing::debug!(ticket, latest = *latest, "discarding superseded session refresh");
            return;
        }
        if evict {
            self.inner.auth.store().remove();
        }
        match &next {
            SessionPhase::Authenticated(user) => tracing::info!(user_id = user.id, "session authenticated"),
            SessionPhase::Anonymous => tracing::info!("session anonymous"),
            SessionPhase::Initializing => {}
        }
        self.inner.phase.send_replace(next);
    }
}
