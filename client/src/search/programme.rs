use serde::{Deserialize, Serialize};
use serde_json::Map;

use orb_shared::Value;

/// One programme returned by a metadata search
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Programme {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    /// Seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(rename = "channelID", default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(rename = "programmeID", default, skip_serializing_if = "Option::is_none")]
    pub programme_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programme_id_type: Option<u8>,
    /// Fields this type does not model, kept as delivered
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Programme {
    /// Falls back to the short description when no long one was delivered
    pub fn long_description(&self) -> Option<&str> {
        self.long_description
            .as_deref()
            .or(self.description.as_deref())
    }

    pub fn end_time(&self) -> Option<i64> {
        Some(self.start_time? + self.duration?)
    }
}
