//! Auth operations: signup, login, logout, token refresh, identity lookup.
//!
//! Each operation goes through the gateway and then reconciles the
//! credential store with the result. A credential is written only after a
//! successful response that carries one. Logout clears it no matter what
//! the server says.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::net::gateway::RequestGateway;
use crate::net::transport::Method;
use crate::net::types::{ApiResponse, AuthResponse, LoginRequest, SessionUser, SignupRequest};
use crate::store::CredentialStore;

#[derive(Clone)]
pub struct AuthFacade {
    gateway: RequestGateway,
}

impl AuthFacade {
    #[must_use]
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    #[must_use]
    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        self.gateway.store()
    }

    /// `POST /auth/signup`. Persists the returned credential, if any.
    pub async fn signup(&self, request: &SignupRequest) -> AuthResponse {
        let response = self
            .gateway
            .envelope("/auth/signup", Method::POST, Some(request))
            .await;
        self.persist_issued(&response);
        response
    }

    /// `POST /auth/login`. Persists the returned credential.
    pub async fn login(&self, request: &LoginRequest) -> AuthResponse {
        let response = self
            .gateway
            .envelope("/auth/login", Method::POST, Some(request))
            .await;
        self.persist_issued(&response);
        response
    }

    /// `POST /auth/logout`. The local credential is removed even when the
    /// call fails.
    pub async fn logout(&self) -> ApiResponse<serde_json::Value> {
        let response = self
            .gateway
            .envelope::<ApiResponse<serde_json::Value>, ()>("/auth/logout", Method::POST, None)
            .await;
        self.store().remove();
        if !response.success {
            tracing::warn!(message = %response.message, "server logout failed; local credential cleared anyway");
        }
        response
    }

    /// `POST /auth/refresh`. Persists the new credential. Server-side the
    /// refresh token travels in a cookie, which the transport replays.
    pub async fn refresh_token(&self) -> AuthResponse {
        let response = self
            .gateway
            .envelope::<AuthResponse, ()>("/auth/refresh", Method::POST, None)
            .await;
        self.persist_issued(&response);
        response
    }

    /// `GET /auth/me`, returned as-is.
    pub async fn current_user(&self) -> ApiResponse<SessionUser> {
        self.gateway
            .envelope::<ApiResponse<SessionUser>, ()>("/auth/me", Method::GET, None)
            .await
    }

    fn persist_issued(&self, response: &AuthResponse) {
        if let Some(token) = response.issued_token() {
            self.store().set(token);
        }
    }
}
