//! # corvid-proto
//!
//! Wire types shared between the corvid gateway client and the command API.
//!
//! This crate defines the serializable frames and payloads the platform
//! speaks: raw gateway frames (`{op, d, s, t}`), the identify handshake,
//! inbound interactions with their response envelopes, and application
//! command declarations as the host application declares them and as the
//! platform stores them.
//!
//! Everything here is plain data. Transport, retry, and session concerns
//! live in the `corvidbot` crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod interaction;
pub mod payload;

pub use command::{option_type, ApplicationCommand, CommandOption, RegisteredCommand};
pub use error::ProtoError;
pub use interaction::{Interaction, InteractionResponse, InteractionType, ResponseData};
pub use payload::{GatewayEvent, GatewayPayload, Hello, Identify, Ready};
