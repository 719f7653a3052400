use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// The `meta` block of an OCS response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    /// `"ok"` on success, `"failure"` otherwise.
    pub status: String,
    /// Numeric OCS status code.
    pub statuscode: u32,
    /// Human readable backend message (empty when absent).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

impl StatusEnvelope {
    /// Create an envelope.
    pub fn new(status: impl Into<String>, statuscode: u32, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            statuscode,
            message: message.into(),
        }
    }

    /// Whether the backend reported success.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Parse only the envelope from a JSON OCS document.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let document: OcsDocument<serde_json::Value> = parse_document(data)?;
        Ok(document.ocs.meta)
    }
}

/// Full OCS document: `{"ocs": {"meta": ..., "data": ...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct OcsDocument<T> {
    /// Document body.
    pub ocs: OcsBody<T>,
}

/// Body of an OCS document.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct OcsBody<T> {
    /// Status envelope.
    pub meta: StatusEnvelope,
    /// Operation-specific payload, absent or empty on failures.
    #[serde(default = "Option::default", deserialize_with = "lenient_data")]
    pub data: Option<T>,
}

/// Parse an OCS document with a typed `data` section.
pub fn parse_document<T: DeserializeOwned>(data: &[u8]) -> Result<OcsDocument<T>> {
    serde_json::from_slice(data).map_err(|e| Error::Envelope(e.to_string()))
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ownCloud sends `"data": []` on failures, which never matches a typed payload.
fn lenient_data<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Array(ref items) if items.is_empty() => Ok(None),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
