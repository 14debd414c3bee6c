//! Remote backend error types.

use thiserror::Error;

/// Failures talking to the remote compute backend. Explicit HTTP answers
/// such as 404 are not errors; they come back as a `RemoteReply`.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Connection refused, reset, DNS failure and the like.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not complete in time.
    #[error("Remote call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The backend answered but the body was not what we expected.
    #[error("Failed to decode remote response: {0}")]
    Decode(String),

    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl RemoteError {
    /// Whether the next poll cycle may succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transport(_) | RemoteError::Timeout(_))
    }
}
