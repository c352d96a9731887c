//! Foreground to background message schema
//!
//! Messages are JSON objects discriminated by `type`. Version 1 has a single
//! payload-less message, `{"type": "WRITE_INTERVAL_FILE"}`. Receivers ignore
//! types they do not know so new kinds can be added without breaking older
//! background contexts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages the foreground posts to the background. No replies exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelMessage {
    /// Attempt one write cycle
    WriteIntervalFile,
}

/// Inbound data that is not a message at all
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no string 'type' field")]
    MissingType,
}

impl ChannelMessage {
    /// Wire name of the message kind
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelMessage::WriteIntervalFile => "WRITE_INTERVAL_FILE",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a raw message.
    ///
    /// Returns `Ok(None)` for a well-formed message of an unknown kind.
    pub fn decode(raw: &str) -> Result<Option<Self>, ProtocolError> {
        let value: Value = serde_json::from_str(raw)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingType)?;

        match kind {
            "WRITE_INTERVAL_FILE" => Ok(Some(serde_json::from_value(value)?)),
            _ => Ok(None),
        }
    }
}
