//! Navigation guard for pages that need a signed-in user.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use tokio::sync::watch;

use super::session::{SessionPhase, SessionState};

pub const LOGIN_PATH: &str = "/login";

/// Where to send the user instead of a protected page, if anywhere.
///
/// Nothing happens while the session is still loading; once it has settled
/// without a user, the answer is the login page.
#[must_use]
pub fn redirect_target(state: &SessionState) -> Option<&'static str> {
    if !state.loading && state.user.is_none() { Some(LOGIN_PATH) } else { None }
}

/// Wait until the session leaves `Initializing`, then return the settled
/// state. Returns the last seen state if the session was dropped.
pub async fn settled(mut rx: watch::Receiver<SessionPhase>) -> SessionState {
    let outcome = rx
        .wait_for(|phase| *phase != SessionPhase::Initializing)
        .await
        .map(|phase| phase.snapshot());
    match outcome {
        Ok(state) => state,
        Err(_) => rx.borrow().snapshot(),
    }
}
