//! Interaction payloads and response envelopes.
//!
//! An interaction arrives as the `d` body of an `INTERACTION_CREATE`
//! dispatch. The client answers it exactly once through the callback
//! endpoint, posting an [`InteractionResponse`] envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtoError;

/// Message flag marking a response visible only to the invoking user.
pub const FLAG_EPHEMERAL: u64 = 64;

/// Callback type acknowledging a ping.
pub const CALLBACK_PONG: u8 = 1;
/// Callback type carrying an immediate channel message.
pub const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
/// Callback type deferring the reply while showing a loading state.
pub const CALLBACK_DEFERRED: u8 = 5;

/// Kind of an inbound interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum InteractionType {
    /// Liveness check from the platform.
    Ping,
    /// Slash command invocation.
    ApplicationCommand,
    /// Button press or select on a message component.
    MessageComponent,
    /// Modal form submission.
    ModalSubmit,
    /// Any type tag this client does not model.
    Unknown(u8),
}

impl From<u8> for InteractionType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

impl From<InteractionType> for u8 {
    fn from(value: InteractionType) -> Self {
        match value {
            InteractionType::Ping => 1,
            InteractionType::ApplicationCommand => 2,
            InteractionType::MessageComponent => 3,
            InteractionType::ModalSubmit => 5,
            InteractionType::Unknown(other) => other,
        }
    }
}

/// One option value supplied with an invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionOption {
    /// Option name.
    pub name: String,
    /// Option type tag.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<u8>,
    /// Raw value as supplied.
    #[serde(default)]
    pub value: Value,
    /// Nested values for sub-command invocations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionOption>,
}

/// Payload-specific data of an interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InteractionData {
    /// Command name, set on application command interactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Custom identifier, set on component and modal interactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    /// Supplied option values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InteractionOption>,
}

/// An inbound interaction event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Platform-assigned interaction id.
    pub id: String,
    /// Single-use token for answering this interaction.
    pub token: String,
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: InteractionType,
    /// Typed data payload.
    #[serde(default)]
    pub data: InteractionData,
    /// Guild member object, present for guild invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Value>,
    /// Invoking user, present for user-installed invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    /// Channel the interaction was invoked from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl Interaction {
    /// Decode an interaction from the `d` body of an `INTERACTION_CREATE`
    /// dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not parse as an interaction.
    pub fn from_dispatch(data: Value) -> Result<Self, ProtoError> {
        serde_json::from_value(data).map_err(|e| ProtoError::Decoding(e.to_string()))
    }

    /// Routing discriminator: the command name for command invocations,
    /// the custom identifier for components and modals.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        match self.kind {
            InteractionType::ApplicationCommand => self.data.name.as_deref(),
            InteractionType::MessageComponent | InteractionType::ModalSubmit => {
                self.data.custom_id.as_deref()
            }
            InteractionType::Ping | InteractionType::Unknown(_) => None,
        }
    }

    /// Look up a supplied option value by name.
    #[must_use]
    pub fn option_value(&self, name: &str) -> Option<&Value> {
        self.data
            .options
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }
}

/// Message body of an interaction response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseData {
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Message flags bitmask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    /// Rich embed objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Value>>,
    /// Component rows attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
}

impl ResponseData {
    /// Create a plain text body.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Mark the message visible only to the invoking user.
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(self.flags.unwrap_or(0) | FLAG_EPHEMERAL);
        self
    }

    /// Attach an embed object.
    #[must_use]
    pub fn embed(mut self, embed: Value) -> Self {
        self.embeds.get_or_insert_with(Vec::new).push(embed);
        self
    }

    /// Attach component rows.
    #[must_use]
    pub fn components(mut self, components: Value) -> Self {
        self.components = Some(components);
        self
    }
}

/// Top-level interaction response envelope: `{type, data}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionResponse {
    /// Callback type.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Message body, absent for pong and deferred callbacks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    /// Pong reply to a ping interaction.
    #[must_use]
    pub const fn pong() -> Self {
        Self {
            kind: CALLBACK_PONG,
            data: None,
        }
    }

    /// Immediate channel message with text content.
    #[must_use]
    pub fn channel_message(content: impl Into<String>) -> Self {
        Self {
            kind: CALLBACK_CHANNEL_MESSAGE,
            data: Some(ResponseData::text(content)),
        }
    }

    /// Immediate channel message from a prepared body.
    #[must_use]
    pub fn message(data: ResponseData) -> Self {
        Self {
            kind: CALLBACK_CHANNEL_MESSAGE,
            data: Some(data),
        }
    }

    /// Deferred acknowledgement; the actual reply follows later through
    /// an edit or a followup.
    #[must_use]
    pub const fn deferred() -> Self {
        Self {
            kind: CALLBACK_DEFERRED,
            data: None,
        }
    }

    /// Mark the response ephemeral.
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.data = Some(self.data.unwrap_or_default().ephemeral());
        self
    }
}
