use thiserror::Error;

/// Errors that can occur while matching an inbound reply to a pending operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The reply's identifier matches no pending operation. It was either
    /// superseded, cancelled, already answered, or timed out
    #[error("No pending operation for correlation id {id}; the reply is stale")]
    StaleCorrelation { id: String },

    /// Attempted to track an identifier that is already pending
    #[error("Correlation id {id} is already pending")]
    AlreadyPending { id: String },
}
