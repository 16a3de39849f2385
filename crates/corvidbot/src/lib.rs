//! # corvidbot
//!
//! Gateway client and interaction framework for chat platform bots.
//!
//! This crate maintains the WebSocket session to the platform gateway,
//! synchronizes declared slash commands over REST, and routes inbound
//! interactions to registered handlers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     WebSocket      ┌─────────────────┐
//! │   platform   │◄──────────────────►│  GatewaySession │
//! │   gateway    │                    │                 │
//! └──────────────┘                    │  ┌───────────┐  │
//!                                     │  │ Heartbeat │  │
//! ┌──────────────┐                    │  └───────────┘  │
//! │   platform   │◄────────┐          │  ┌───────────┐  │
//! │   REST API   │         │          │  │ Reconnect │  │
//! └──────────────┘         │          │  └───────────┘  │
//!                          │          └────────┬────────┘
//!                          │                   │ SessionEvent
//!                          │          ┌────────▼────────┐
//!                          └──────────┤       Bot       │
//!                                     │                 │
//!                                     │  ┌───────────┐  │
//!                                     │  │  Router   │  │
//!                                     │  └───────────┘  │
//!                                     │  ┌───────────┐  │
//!                                     │  │RestClient │  │
//!                                     │  └───────────┘  │
//!                                     └─────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use corvid_proto::{ApplicationCommand, Interaction, InteractionResponse};
//! use corvidbot::{Bot, BotConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BotConfig::from_file("corvidbot.toml")?;
//!
//!     Bot::new(config)
//!         .command(
//!             ApplicationCommand::new("ping", "Check that the bot is alive"),
//!             |_interaction: Interaction| async {
//!                 Ok(InteractionResponse::channel_message("Pong!"))
//!             },
//!         )
//!         .run()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Session Lifecycle
//!
//! A session moves through these states:
//!
//! - **Disconnected**: no socket open
//! - **Connecting**: socket being opened
//! - **Identifying**: hello received, identify sent
//! - **Connected**: READY received, dispatches flowing
//! - **Reconnecting**: backing off before the next attempt
//! - **Closed**: stopped, or the reconnect budget is spent

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bot;
pub mod config;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod rest;
pub mod router;
pub mod sync;

// Re-export main types
pub use bot::{Bot, EventHook};
pub use config::{BotConfig, HeartbeatSettings, ReconnectSettings, ShardConfig};
pub use error::{BotError, Result};
pub use gateway::{
    GatewaySession, HeartbeatConfig, ReconnectPolicy, SessionEvent, SessionState,
};
pub use guard::{allow_users, developer_only, require_any_role, require_permissions};
pub use rest::{ApiResponse, ResponseSender, RestClient};
pub use router::{DispatchOutcome, InteractionHandler, Router};
pub use sync::{sync_commands, SyncReport};
