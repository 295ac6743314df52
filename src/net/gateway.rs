//! Request gateway: the single chokepoint for backend calls.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every call reads the stored credential, sends JSON to
//! `<base-url><path>`, and normalizes the outcome. The gateway never writes
//! the credential store and never retries; both are left to callers.
//!
//! ERROR HANDLING
//! ==============
//! Failures are tagged ([`RequestError`]) but keep the user-facing fallback
//! texts: an unreachable server or an unreadable error body reads
//! `"Network error"`, a readable body without a message reads
//! `"API request failed"`.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method, Transport};
use super::types::{Envelope, ErrorBody};
use crate::config::ClientConfig;
use crate::store::CredentialStore;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error";
pub const REQUEST_FAILED_MESSAGE: &str = "API request failed";
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from server";
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request";

/// Why a gateway call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The round trip never completed.
    #[error("Network error")]
    Unreachable { detail: String },

    /// The server answered 401 or 403.
    #[error("{message}")]
    Unauthenticated { status: u16, message: String },

    /// Any other non-2xx answer.
    #[error("{message}")]
    ServerRejected { status: u16, message: String },

    /// A 2xx body did not match the declared response shape.
    #[error("invalid response body: {0}")]
    InvalidResponse(String),

    /// The request body could not be encoded.
    #[error("invalid request body: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    /// Short text suitable for showing to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Unreachable { .. } => NETWORK_ERROR_MESSAGE.to_owned(),
            Self::Unauthenticated { message, .. } | Self::ServerRejected { message, .. } => message.clone(),
            Self::InvalidResponse(_) => INVALID_RESPONSE_MESSAGE.to_owned(),
            Self::InvalidRequest(_) => INVALID_REQUEST_MESSAGE.to_owned(),
        }
    }

    /// HTTP status for server-side failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated { status, .. } | Self::ServerRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_response(response: &HttpResponse) -> Self {
        let message = rejection_message(&response.body);
        match response.status {
            401 | 403 => Self::Unauthenticated { status: response.status, message },
            status => Self::ServerRejected { status, message },
        }
    }
}

/// Pick the user-facing message out of a non-2xx body.
pub(crate) fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { message: Some(message) }) if !message.is_empty() => message,
        Ok(_) => REQUEST_FAILED_MESSAGE.to_owned(),
        Err(_) => NETWORK_ERROR_MESSAGE.to_owned(),
    }
}

/// Builds, sends, and decodes backend requests with the stored credential
/// attached. Cheap to clone.
#[derive(Clone)]
pub struct RequestGateway {
    base_url: String,
    transport: Arc<dyn Transport>,
    store: CredentialStore,
}

impl RequestGateway {
    /// `base_url` is used as given apart from trailing-slash trimming.
    #[must_use]
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, store: CredentialStore) -> Self {
        let base_url = base_url.trim_end_matches('/').to_owned();
        Self { base_url, transport, store }
    }

    /// Gateway over the real HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig, store: CredentialStore) -> Result<Self, RequestError> {
        let transport = HttpTransport::new(config.timeouts)
            .map_err(|e| RequestError::Unreachable { detail: e.to_string() })?;
        Ok(Self::new(&config.base_url, Arc::new(transport), store))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Send `method path` with an optional JSON body and decode a `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the transport fails, the server answers
    /// non-2xx, or the body does not decode as `T`.
    pub async fn request<T, B>(&self, path: &str, method: Method, body: Option<&B>) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.build(path, method, body)?;
        tracing::debug!(
            method = %request.method,
            %path,
            authorized = request.header("Authorization").is_some(),
            "api request"
        );

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%path, error = %e, "api transport failed");
                return Err(RequestError::Unreachable { detail: e.0 });
            }
        };
        tracing::debug!(%path, status = response.status, "api response");

        if !response.is_success() {
            let err = RequestError::from_response(&response);
            tracing::warn!(%path, status = response.status, error = %err, "api request rejected");
            return Err(err);
        }

        serde_json::from_str::<T>(&response.body).map_err(|e| {
            tracing::warn!(%path, error = %e, "api response decode failed");
            RequestError::InvalidResponse(e.to_string())
        })
    }

    /// `GET path` with no body.
    ///
    /// # Errors
    ///
    /// See [`RequestGateway::request`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.request::<T, ()>(path, Method::GET, None).await
    }

    /// `POST path` with no body.
    ///
    /// # Errors
    ///
    /// See [`RequestGateway::request`].
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.request::<T, ()>(path, Method::POST, None).await
    }

    /// `POST path` with `body` encoded as JSON.
    ///
    /// # Errors
    ///
    /// See [`RequestGateway::request`].
    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(path, Method::POST, Some(body)).await
    }

    /// Like [`RequestGateway::request`], but folds any failure into a
    /// `success=false` envelope.
    pub async fn envelope<T, B>(&self, path: &str, method: Method, body: Option<&B>) -> T
    where
        T: Envelope + DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match self.request::<T, B>(path, method, body).await {
            Ok(envelope) => envelope.normalized(),
            Err(e) => T::from_failure(e),
        }
    }

    fn build<B>(&self, path: &str, method: Method, body: Option<&B>) -> Result<HttpRequest, RequestError>
    where
        B: Serialize + ?Sized,
    {
        let mut headers = vec![("Content-Type", "application/json".to_owned())];
        if let Some(token) = self.store.get() {
            headers.push(("Authorization", format!("Bearer {token}")));
        }
        let body = match body {
            Some(body) => Some(serde_json::to_string(body).map_err(|e| RequestError::InvalidRequest(e.to_string()))?),
            None => None,
        };
        Ok(HttpRequest { method, url: format!("{}{}", self.base_url, path), headers, body })
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;
