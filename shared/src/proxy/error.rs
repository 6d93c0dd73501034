use thiserror::Error;

use crate::CallId;

/// Errors surfaced by the observer proxy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// The paired context's observer rejected an async call
    #[error("Async call {call_id} failed in the paired context: {reason}")]
    AsyncCallFailed { call_id: CallId, reason: String },

    /// No reply arrived within the configured timeout
    #[error("Async call with callId {call_id} timed out without receiving a response")]
    AsyncCallTimedOut { call_id: CallId },

    /// The proxy was dropped before the call completed
    #[error("Async call {call_id} was dropped before completion")]
    CallDropped { call_id: CallId },

    /// The transport refused the envelope
    #[error("Transport closed while sending {message}")]
    TransportClosed { message: &'static str },

    /// An envelope could not be serialized
    #[error("Failed to encode proxy envelope: {reason}")]
    Encode { reason: String },

    /// Inbound data was not a valid envelope
    #[error("Failed to decode proxy envelope: {reason}")]
    Decode { reason: String },
}

/// Errors an observer reports when asked to perform a forwarded call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserverError {
    /// The observer has no method with this name
    #[error("Observer has no method named '{name}'")]
    UnknownMethod { name: String },

    /// The arguments could not be interpreted for this method
    #[error("Invalid arguments for '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },
}
