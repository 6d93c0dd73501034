use serde::{Deserialize, Serialize};

use crate::{proxy::error::ProxyError, CallId, ObserverKey, PropertyMap, SessionId, Value};

/// A named event replayed on the paired context's observer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProxyEvent {
    pub name: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl ProxyEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Outcome of an async observer call as carried back across the boundary
pub type AsyncCallOutcome = Result<Vec<Value>, String>;

/// Everything one context can ask of the other
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyMessage {
    HandshakeRequest {
        call_id: CallId,
    },
    MethodRequest {
        observer_key: ObserverKey,
        name: String,
        args: Vec<Value>,
    },
    AsyncMethodRequest {
        observer_key: ObserverKey,
        name: String,
        args: Vec<Value>,
        call_id: CallId,
    },
    AsyncMethodResponse {
        call_id: CallId,
        outcome: AsyncCallOutcome,
    },
    SetProperties {
        observer_key: ObserverKey,
        properties: PropertyMap,
    },
    DispatchEvent {
        observer_key: ObserverKey,
        event: ProxyEvent,
    },
}

impl ProxyMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ProxyMessage::HandshakeRequest { .. } => "HandshakeRequest",
            ProxyMessage::MethodRequest { .. } => "MethodRequest",
            ProxyMessage::AsyncMethodRequest { .. } => "AsyncMethodRequest",
            ProxyMessage::AsyncMethodResponse { .. } => "AsyncMethodResponse",
            ProxyMessage::SetProperties { .. } => "SetProperties",
            ProxyMessage::DispatchEvent { .. } => "DispatchEvent",
        }
    }

    /// Key of the observer this message is addressed to, if any
    pub fn observer_key(&self) -> Option<&ObserverKey> {
        match self {
            ProxyMessage::MethodRequest { observer_key, .. }
            | ProxyMessage::AsyncMethodRequest { observer_key, .. }
            | ProxyMessage::SetProperties { observer_key, .. }
            | ProxyMessage::DispatchEvent { observer_key, .. } => Some(observer_key),
            ProxyMessage::HandshakeRequest { .. } | ProxyMessage::AsyncMethodResponse { .. } => {
                None
            }
        }
    }
}

/// A message stamped with the session it belongs to
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProxyEnvelope {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub message: ProxyMessage,
}

impl ProxyEnvelope {
    pub fn new(session_id: SessionId, message: ProxyMessage) -> Self {
        Self {
            session_id,
            message,
        }
    }

    pub fn encode(&self) -> Result<String, ProxyError> {
        serde_json::to_string(self).map_err(|error| ProxyError::Encode {
            reason: error.to_string(),
        })
    }

    pub fn decode(raw: &str) -> Result<Self, ProxyError> {
        serde_json::from_str(raw).map_err(|error| ProxyError::Decode {
            reason: error.to_string(),
        })
    }
}
