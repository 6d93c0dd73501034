use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Dynamically-typed argument / property value carried across the context boundary
pub type Value = serde_json::Value;

/// A partial property state: only the fields that changed
pub type PropertyMap = BTreeMap<String, Value>;

/// Identifies one proxy session (one handshake between two contexts)
pub type SessionId = u64;

/// Identifies one async observer call within a proxy
pub type CallId = u64;

/// Stable, caller-chosen name of one mirrored object within a proxy scope.
///
/// Keys take the form `<TypeName>` or `<TypeName>_<index>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverKey(String);

impl ObserverKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `<type_name>_<index>`, e.g. `TextTrack_0`
    pub fn indexed(type_name: &str, index: usize) -> Self {
        Self(format!("{}_{}", type_name, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObserverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObserverKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ObserverKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Which context a mirrored effect originated in.
///
/// Effects that arrive from the paired context are applied but never forwarded
/// again, so a change cannot ping-pong between the two contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    pub fn invert(self) -> Self {
        match self {
            Origin::Local => Origin::Remote,
            Origin::Remote => Origin::Local,
        }
    }
}
