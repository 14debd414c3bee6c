//! Remote compute backend: protocol adapter and session coordination.

use std::future::Future;
use std::time::Duration;

pub mod client;
pub mod error;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{HttpRemoteClient, RemoteBackend};
pub use error::RemoteError;
pub use session::{SessionCoordinator, SessionError, SessionHandle};
pub use types::{
    RemoteReply, SessionInfo, StatementInfo, StatementPayload, SubmittedStatement,
};

/// Session states in which statements can be submitted.
pub const LIVE_SESSION_STATES: [&str; 3] = ["starting", "idle", "busy"];

pub fn is_live_session_state(state: &str) -> bool {
    LIVE_SESSION_STATES.contains(&state)
}

/// Bounds a remote call. Running out of time is reported as
/// [`RemoteError::Timeout`], never as a backend answer.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<RemoteReply<T>, RemoteError>
where
    F: Future<Output = Result<RemoteReply<T>, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}
