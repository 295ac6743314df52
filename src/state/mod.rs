//! Client-side session state.

pub mod guard;
pub mod session;
