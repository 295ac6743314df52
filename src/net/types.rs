//! Wire DTOs for the SmartShield REST API.
//!
//! DESIGN
//! ======
//! Field names follow the server's camelCase JSON. Every response type is an
//! envelope (`success` + `message`) so failures from the gateway can be
//! folded into the same shape the server uses; see [`Envelope`].

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Deserializer, Serialize};

use super::gateway::RequestError;

/// Account role as assigned by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

/// The authenticated account, as returned by `/auth/me` and the auth
/// endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Numeric account identifier.
    pub id: i64,
    pub email: String,
    /// Display name. The server allows accounts without one.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub role: Role,
}

/// Generic `{ success, message, data? }` envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Tagged cause when this envelope was produced by a failed request
    /// rather than decoded from the server.
    #[serde(skip)]
    pub failure: Option<RequestError>,
}

/// Envelope returned by signup, login, and refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip)]
    pub failure: Option<RequestError>,
}

impl AuthResponse {
    /// The credential to persist, if this response is allowed to issue one.
    ///
    /// Only a successful response carrying a non-empty token qualifies.
    #[must_use]
    pub fn issued_token(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Body for `POST /auth/signup`. Absent optionals are omitted from the JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_code: Option<String>,
}

/// Body for `POST /auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

/// Error body on non-2xx responses. Only `message` is read.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Response shapes that carry `success`/`message` and can represent a
/// failed request without an `Err`.
pub trait Envelope: Sized {
    /// Build a `success=false` envelope for `error`.
    fn from_failure(error: RequestError) -> Self;

    fn is_success(&self) -> bool;

    fn message(&self) -> &str;

    /// Drop payload fields a failed envelope must not carry.
    #[must_use]
    fn normalized(self) -> Self {
        self
    }
}

impl<T> Envelope for ApiResponse<T> {
    fn from_failure(error: RequestError) -> Self {
        Self { success: false, message: error.message(), data: None, failure: Some(error) }
    }

    fn is_success(&self) -> bool {
        self.success
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn normalized(mut self) -> Self {
        if !self.success {
            self.data = None;
        }
        self
    }
}

impl Envelope for AuthResponse {
    fn from_failure(error: RequestError) -> Self {
        Self { success: false, message: error.message(), access_token: None, user: None, failure: Some(error) }
    }

    fn is_success(&self) -> bool {
        self.success
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn normalized(mut self) -> Self {
        if !self.success {
            self.user = None;
        }
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
