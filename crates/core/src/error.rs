/// Failures surfaced by the dialogue core.
///
/// `Clone` and `PartialEq` so the last error can be carried on a `Snapshot`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogueError {
    /// The command is not valid in the current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The service reply was malformed or broke the feedback contract.
    #[error("invalid response from interview service: {0}")]
    InvalidResponse(String),
    /// Transport failure or timeout.
    #[error("interview service unavailable: {0}")]
    ServiceUnavailable(String),
    /// The service rejected the request; the message is the service's own.
    #[error("{0}")]
    RemoteError(String),
    /// Speech capture is not offered (or broke down). Typed answers still work.
    #[error("speech capture unavailable: {0}")]
    CapabilityUnavailable(String),
}

impl DialogueError {
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidResponse(_) | Self::ServiceUnavailable(_) | Self::RemoteError(_)
        )
    }
}
