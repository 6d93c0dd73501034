use thiserror::Error;

/// Errors reported by the native bridge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The calling application is not allowed to perform this request
    #[error("SecurityError: the native layer refused {method}")]
    Security { method: String },

    /// The native layer reported a failure for this request
    #[error("Error response from {method}: {reason}")]
    Failed { method: String, reason: String },

    /// The native layer answered with something that is not a valid response
    #[error("Invalid response from {method}")]
    InvalidResponse { method: String },
}

impl BridgeError {
    pub fn is_security(&self) -> bool {
        matches!(self, BridgeError::Security { .. })
    }
}
