//! SmartShield client — session and API-access layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every backend call flows through one gateway that attaches the stored
//! bearer credential and normalizes failures. On top of it sit the typed
//! auth operations and a session handle that consumers read to decide
//! whether a user is signed in.
//!
//! LAYERS
//! ======
//! - [`store`]: the single persisted credential.
//! - [`net`]: wire types, the transport seam, and the request gateway.
//! - [`services`]: auth and user-data operations composed on the gateway.
//! - [`state`]: the session state machine and navigation guard.
//! - [`validation`]: form checks that run before any request.

pub mod config;
pub mod net;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, ConfigError};
pub use net::gateway::{RequestError, RequestGateway};
pub use net::transport::{HttpTransport, Transport};
pub use net::types::{ApiResponse, AuthResponse, LoginRequest, Role, SessionUser, SignupRequest};
pub use services::auth::AuthFacade;
pub use state::session::{SessionContext, SessionPhase, SessionState};
pub use store::{CredentialStore, FileStorage, MemoryStorage, Storage};
