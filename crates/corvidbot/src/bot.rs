//! Bot assembly and run loop.
//!
//! [`Bot`] ties the pieces together: it owns the declared commands and
//! their handlers, synchronizes the command set at startup, then drives
//! the gateway session and fans events out to handlers and hooks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use corvid_proto::{ApplicationCommand, Identify};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::gateway::{GatewaySession, SessionEvent};
use crate::rest::RestClient;
use crate::router::{InteractionHandler, Router};
use crate::sync::{sync_commands, SyncReport};

/// Callback for a named gateway event that is not an interaction.
#[async_trait]
pub trait EventHook: Send + Sync {
    /// Observe the event body.
    async fn on_event(&self, data: &Value);
}

#[async_trait]
impl<F, Fut> EventHook for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn on_event(&self, data: &Value) {
        self(data.clone()).await;
    }
}

/// A configured bot, ready to run.
pub struct Bot {
    config: BotConfig,
    commands: Vec<ApplicationCommand>,
    router: Router,
    hooks: HashMap<String, Arc<dyn EventHook>>,
}

impl Bot {
    /// Create a bot from its configuration.
    #[must_use]
    pub fn new(config: BotConfig) -> Self {
        Self {
            config,
            commands: Vec::new(),
            router: Router::new(),
            hooks: HashMap::new(),
        }
    }

    /// Declare a command and register its handler.
    ///
    /// The declaration is pushed to the platform by the startup sync; the
    /// handler is routed by the declared name.
    #[must_use]
    pub fn command(
        mut self,
        declaration: ApplicationCommand,
        handler: impl InteractionHandler + 'static,
    ) -> Self {
        let name = declaration.name.clone();
        self.commands.push(declaration);
        self.router = self.router.command(name, handler);
        self
    }

    /// Register a component handler by custom identifier.
    #[must_use]
    pub fn component(
        mut self,
        custom_id: impl Into<String>,
        handler: impl InteractionHandler + 'static,
    ) -> Self {
        self.router = self.router.component(custom_id, handler);
        self
    }

    /// Register a modal handler by custom identifier.
    #[must_use]
    pub fn modal(
        mut self,
        custom_id: impl Into<String>,
        handler: impl InteractionHandler + 'static,
    ) -> Self {
        self.router = self.router.modal(custom_id, handler);
        self
    }

    /// Register a hook for a named gateway event, `MESSAGE_CREATE` and
    /// the like.
    #[must_use]
    pub fn on_event(mut self, name: impl Into<String>, hook: impl EventHook + 'static) -> Self {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }

    /// Synchronize the declared commands and return the report without
    /// connecting to the gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the sync
    /// fails.
    pub async fn sync(self) -> Result<SyncReport> {
        self.config.validate()?;

        let rest = RestClient::new(
            &self.config.api_base,
            &self.config.token,
            &self.config.application_id,
        );

        sync_commands(&rest, &self.commands).await
    }

    /// Run the bot until shutdown.
    ///
    /// Synchronizes commands, connects to the gateway, and processes
    /// events until Ctrl-C or until the reconnect budget is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the startup
    /// sync fails, or the session dies with its reconnect budget spent.
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            commands,
            router,
            hooks,
        } = self;

        config.validate()?;

        let rest = Arc::new(RestClient::new(
            &config.api_base,
            &config.token,
            &config.application_id,
        ));

        sync_commands(&rest, &commands).await?;

        let identify = Identify::new(
            &config.token,
            config.intents,
            config.shard.index,
            config.shard.count,
        );
        let session = GatewaySession::new(config.gateway_url.clone(), identify)
            .with_reconnect_policy(config.reconnect.policy())
            .with_heartbeat_config(config.heartbeat.config());

        let router = Arc::new(router);
        let mut events = session.start();

        info!(url = %config.gateway_url, "connecting to gateway");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(SessionEvent::Ready(ready)) => {
                            info!(session_id = %ready.session_id, "bot is ready");
                            if let Some(hook) = hooks.get("READY") {
                                match serde_json::to_value(&ready) {
                                    Ok(data) => hook.on_event(&data).await,
                                    Err(e) => warn!(error = %e, "failed to encode READY for its hook"),
                                }
                            }
                        }
                        Some(SessionEvent::Interaction(interaction)) => {
                            // Handlers run concurrently so a slow one cannot
                            // stall the event loop.
                            let router = Arc::clone(&router);
                            let rest = Arc::clone(&rest);
                            tokio::spawn(async move {
                                router.dispatch(&interaction, rest.as_ref()).await;
                            });
                        }
                        Some(SessionEvent::Event { name, data }) => {
                            // Hooks run inline so dispatches are observed in
                            // arrival order; only interaction handlers overlap.
                            if let Some(hook) = hooks.get(&name) {
                                hook.on_event(&data).await;
                            } else {
                                debug!(event = %name, "no hook for gateway event");
                            }
                        }
                        Some(SessionEvent::Disconnected { reason }) => {
                            debug!(%reason, "session disconnected");
                        }
                        Some(SessionEvent::Reconnecting { attempt, delay }) => {
                            info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
                        }
                        Some(SessionEvent::ReconnectFailed { attempts, last_error }) => {
                            warn!(attempts, %last_error, "giving up on the gateway");
                            return Err(BotError::ReconnectExhausted {
                                attempts,
                                last_error,
                            });
                        }
                        None => {
                            info!("session event stream ended");
                            return Ok(());
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    session.stop();
                    return Ok(());
                }
            }
        }
    }
}
