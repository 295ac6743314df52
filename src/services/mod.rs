//! Backend operations composed on the request gateway.
//!
//! Services return envelopes rather than `Err` so callers can show
//! `message` directly; the tagged cause stays on `failure`.

pub mod auth;
pub mod users;
