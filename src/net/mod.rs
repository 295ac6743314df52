//! Networking: wire types, the transport seam, and the request gateway.

pub mod gateway;
pub mod transport;
pub mod types;
