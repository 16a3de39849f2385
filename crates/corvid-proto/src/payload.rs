//! Gateway frame types.
//!
//! Every frame on the gateway socket is a JSON object with four fields:
//! `op` (opcode), `d` (payload body), `s` (sequence number), and `t`
//! (event name). Only dispatch frames carry `s` and `t`; for every other
//! opcode both are null and omitted on the wire when sending.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// Dispatch frame carrying a named event.
pub const OP_DISPATCH: u8 = 0;
/// Liveness probe, client to platform.
pub const OP_HEARTBEAT: u8 = 1;
/// Session handshake, client to platform.
pub const OP_IDENTIFY: u8 = 2;
/// First frame after connect; carries the heartbeat interval.
pub const OP_HELLO: u8 = 10;
/// Acknowledgement of a heartbeat probe.
pub const OP_HEARTBEAT_ACK: u8 = 11;

/// A raw gateway frame: `{op, d, s, t}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayPayload {
    /// Opcode identifying the frame.
    pub op: u8,
    /// Payload body; `null` when the frame carries none.
    #[serde(default)]
    pub d: Value,
    /// Sequence number, present on dispatch frames only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Event name, present on dispatch frames only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    /// Create a heartbeat frame carrying the last observed sequence
    /// number, or 0 when no dispatch has been seen yet.
    #[must_use]
    pub fn heartbeat(seq: Option<u64>) -> Self {
        Self {
            op: OP_HEARTBEAT,
            d: Value::from(seq.unwrap_or(0)),
            s: None,
            t: None,
        }
    }

    /// Create an identify frame from a handshake body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn identify(identify: &Identify) -> Result<Self, ProtoError> {
        let d = serde_json::to_value(identify).map_err(|e| ProtoError::Encoding(e.to_string()))?;
        Ok(Self {
            op: OP_IDENTIFY,
            d,
            s: None,
            t: None,
        })
    }

    /// Serialize the frame to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Deserialize a frame from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid frame.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }
}

/// Client properties sent inside the identify handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionProperties {
    /// Operating system the client runs on.
    #[serde(rename = "$os")]
    pub os: String,
    /// Library identifier reported as the browser.
    #[serde(rename = "$browser")]
    pub browser: String,
    /// Library identifier reported as the device.
    #[serde(rename = "$device")]
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "corvidbot".to_string(),
            device: "corvidbot".to_string(),
        }
    }
}

/// Identify handshake body, the `d` of an op 2 frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identify {
    /// Bot authentication token.
    pub token: String,
    /// Event subscription bitmask.
    pub intents: u64,
    /// Client properties.
    pub properties: ConnectionProperties,
    /// Shard assignment as `[index, total]`.
    pub shard: [u32; 2],
}

impl Identify {
    /// Create an identify body for the given token and intents.
    #[must_use]
    pub fn new(token: impl Into<String>, intents: u64, shard_index: u32, shard_count: u32) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: ConnectionProperties::default(),
            shard: [shard_index, shard_count],
        }
    }
}

/// Hello body, the `d` of an op 10 frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hello {
    /// Heartbeat cadence in milliseconds.
    pub heartbeat_interval: u64,
}

/// The bot user reported inside a READY dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadyUser {
    /// Platform-assigned user id.
    pub id: String,
    /// Account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// READY dispatch body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ready {
    /// Session identifier assigned by the platform.
    pub session_id: String,
    /// The authenticated bot user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ReadyUser>,
}

/// A gateway frame decoded into its typed variant at the socket boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// Op 10: the platform's opening frame.
    Hello(Hello),
    /// Op 11: a heartbeat was acknowledged.
    HeartbeatAck,
    /// Op 0: a named event with its sequence number and body.
    Dispatch {
        /// Event name from the `t` field.
        event: String,
        /// Sequence number from the `s` field.
        seq: Option<u64>,
        /// Event body from the `d` field.
        data: Value,
    },
    /// Any opcode this client does not consume.
    Unknown {
        /// The unrecognized opcode.
        op: u8,
    },
}

impl GatewayEvent {
    /// Decode a raw frame into its typed variant.
    ///
    /// # Errors
    ///
    /// Returns an error if a dispatch frame has no event name or if a
    /// hello body does not parse.
    pub fn from_payload(payload: GatewayPayload) -> Result<Self, ProtoError> {
        match payload.op {
            OP_DISPATCH => {
                let event = payload.t.ok_or(ProtoError::MissingField("t"))?;
                Ok(Self::Dispatch {
                    event,
                    seq: payload.s,
                    data: payload.d,
                })
            }
            OP_HELLO => {
                let hello: Hello = serde_json::from_value(payload.d)
                    .map_err(|e| ProtoError::Decoding(e.to_string()))?;
                Ok(Self::Hello(hello))
            }
            OP_HEARTBEAT_ACK => Ok(Self::HeartbeatAck),
            op => Ok(Self::Unknown { op }),
        }
    }

    /// Decode a JSON text frame straight into its typed variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid frame.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        Self::from_payload(GatewayPayload::from_json(json)?)
    }
}
