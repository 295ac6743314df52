//! User data endpoints: stored videos and analysis history.
//!
//! Payload shapes are owned by the video features, so both are returned as
//! raw JSON inside the standard envelope.

#[cfg(test)]
#[path = "users_test.rs"]
mod users_test;

use crate::net::gateway::RequestGateway;
use crate::net::transport::Method;
use crate::net::types::ApiResponse;

/// `GET /users/videos`.
pub async fn fetch_videos(gateway: &RequestGateway) -> ApiResponse<serde_json::Value> {
    gateway.envelope::<_, ()>("/users/videos", Method::GET, None).await
}

/// `GET /users/analysis`.
pub async fn fetch_analysis(gateway: &RequestGateway) -> ApiResponse<serde_json::Value> {
    gateway.envelope::<_, ()>("/users/analysis", Method::GET, None).await
}
