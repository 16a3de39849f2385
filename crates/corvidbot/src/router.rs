//! Interaction routing and dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use corvid_proto::{Interaction, InteractionResponse, InteractionType};
use tracing::{debug, warn};

use crate::error::Result;
use crate::rest::ResponseSender;

/// Fallback reply for a command with no registered handler.
const UNKNOWN_COMMAND: &str = "Unknown command";
/// Fallback reply for a component with no registered handler.
const NO_COMPONENT_HANDLER: &str = "No handler for this component.";
/// Fallback reply for a modal with no registered handler.
const NO_MODAL_HANDLER: &str = "No handler for this modal.";
/// Fallback reply when a command handler returns an error.
const COMMAND_FAILED: &str = "An error occurred while executing the command.";
/// Fallback reply when a component handler returns an error.
const COMPONENT_FAILED: &str = "An error occurred while handling the component.";
/// Fallback reply when a modal handler returns an error.
const MODAL_FAILED: &str = "An error occurred while handling the modal.";
/// Fallback reply for an interaction type this client does not route.
const UNKNOWN_TYPE: &str = "Unknown interaction type";

/// Handler for one routed interaction.
///
/// A handler answers in one of two ways: return `Ok(Some(response))`
/// and let the router deliver it, or respond through `sender` itself
/// (defer, then edit later) and return `Ok(None)` so the router sends
/// nothing further.
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    /// Handle an interaction, optionally producing a response for the
    /// router to deliver.
    async fn handle(
        &self,
        interaction: &Interaction,
        sender: &dyn ResponseSender,
    ) -> Result<Option<InteractionResponse>>;
}

/// Plain closures are handlers that always hand their response back to
/// the router.
#[async_trait]
impl<F, Fut> InteractionHandler for F
where
    F: Fn(Interaction) -> Fut + Send + Sync,
    Fut: Future<Output = Result<InteractionResponse>> + Send,
{
    async fn handle(
        &self,
        interaction: &Interaction,
        _sender: &dyn ResponseSender,
    ) -> Result<Option<InteractionResponse>> {
        self(interaction.clone()).await.map(Some)
    }
}

/// What dispatching an interaction resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran; its response was delivered, or it responded itself.
    Handled,
    /// A handler ran but failed; a fallback message was delivered instead.
    HandlerFailed,
    /// No handler matched; a fixed notice was delivered.
    NoHandler,
    /// A ping was answered with a pong.
    Pong,
    /// The interaction type is not routable.
    UnknownType,
}

/// Routes interactions to registered handlers.
///
/// Commands route by name, components and modals by custom identifier.
/// Every inbound interaction gets exactly one acknowledgement path: the
/// handler's response on success, a fixed fallback otherwise.
#[derive(Default)]
pub struct Router {
    commands: HashMap<String, Arc<dyn InteractionHandler>>,
    components: HashMap<String, Arc<dyn InteractionHandler>>,
    modals: HashMap<String, Arc<dyn InteractionHandler>>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command handler by command name.
    #[must_use]
    pub fn command(
        mut self,
        name: impl Into<String>,
        handler: impl InteractionHandler + 'static,
    ) -> Self {
        self.commands.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register a component handler by custom identifier.
    #[must_use]
    pub fn component(
        mut self,
        custom_id: impl Into<String>,
        handler: impl InteractionHandler + 'static,
    ) -> Self {
        self.components.insert(custom_id.into(), Arc::new(handler));
        self
    }

    /// Register a modal handler by custom identifier.
    #[must_use]
    pub fn modal(
        mut self,
        custom_id: impl Into<String>,
        handler: impl InteractionHandler + 'static,
    ) -> Self {
        self.modals.insert(custom_id.into(), Arc::new(handler));
        self
    }

    /// Check whether a command handler is registered under `name`.
    #[must_use]
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Dispatch one interaction and deliver its response.
    pub async fn dispatch(
        &self,
        interaction: &Interaction,
        sender: &dyn ResponseSender,
    ) -> DispatchOutcome {
        match interaction.kind {
            InteractionType::Ping => {
                debug!(id = %interaction.id, "answering ping");
                Self::deliver(sender, interaction, &InteractionResponse::pong()).await;
                DispatchOutcome::Pong
            }
            InteractionType::ApplicationCommand => {
                self.dispatch_to(&self.commands, interaction, sender, UNKNOWN_COMMAND, COMMAND_FAILED)
                    .await
            }
            InteractionType::MessageComponent => {
                self.dispatch_to(
                    &self.components,
                    interaction,
                    sender,
                    NO_COMPONENT_HANDLER,
                    COMPONENT_FAILED,
                )
                .await
            }
            InteractionType::ModalSubmit => {
                self.dispatch_to(&self.modals, interaction, sender, NO_MODAL_HANDLER, MODAL_FAILED)
                    .await
            }
            InteractionType::Unknown(tag) => {
                warn!(id = %interaction.id, tag, "unroutable interaction type");
                Self::deliver(
                    sender,
                    interaction,
                    &InteractionResponse::channel_message(UNKNOWN_TYPE).ephemeral(),
                )
                .await;
                DispatchOutcome::UnknownType
            }
        }
    }

    async fn dispatch_to(
        &self,
        table: &HashMap<String, Arc<dyn InteractionHandler>>,
        interaction: &Interaction,
        sender: &dyn ResponseSender,
        missing_message: &str,
        failure_message: &str,
    ) -> DispatchOutcome {
        let handler = interaction
            .discriminator()
            .and_then(|key| table.get(key));

        let Some(handler) = handler else {
            debug!(
                id = %interaction.id,
                key = interaction.discriminator().unwrap_or("<none>"),
                "no handler registered"
            );
            Self::deliver(
                sender,
                interaction,
                &InteractionResponse::channel_message(missing_message).ephemeral(),
            )
            .await;
            return DispatchOutcome::NoHandler;
        };

        match handler.handle(interaction, sender).await {
            Ok(Some(response)) => {
                Self::deliver(sender, interaction, &response).await;
                DispatchOutcome::Handled
            }
            Ok(None) => {
                debug!(id = %interaction.id, "handler responded directly");
                DispatchOutcome::Handled
            }
            Err(e) => {
                warn!(id = %interaction.id, error = %e, "handler failed");
                Self::deliver(
                    sender,
                    interaction,
                    &InteractionResponse::channel_message(failure_message).ephemeral(),
                )
                .await;
                DispatchOutcome::HandlerFailed
            }
        }
    }

    /// Send a response, logging delivery failures. The interaction token
    /// expires either way, so there is nothing to retry here.
    async fn deliver(
        sender: &dyn ResponseSender,
        interaction: &Interaction,
        response: &InteractionResponse,
    ) {
        if let Err(e) = sender.send_response(interaction, response).await {
            warn!(id = %interaction.id, error = %e, "failed to deliver response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use std::sync::Mutex;

    /// Records every delivered response instead of sending it anywhere.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<InteractionResponse>>,
    }

    impl RecordingSender {
        fn take(&self) -> Vec<InteractionResponse> {
            match self.sent.lock() {
                Ok(mut sent) => std::mem::take(&mut *sent),
                Err(_) => Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ResponseSender for RecordingSender {
        async fn send_response(
            &self,
            _interaction: &Interaction,
            response: &InteractionResponse,
        ) -> Result<()> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(response.clone());
            }
            Ok(())
        }
    }

    fn command_interaction(name: &str) -> Interaction {
        let body = serde_json::json!({
            "id": "1",
            "token": "tok",
            "type": 2,
            "data": {"name": name}
        });
        Interaction::from_dispatch(body).unwrap()
    }

    fn component_interaction(custom_id: &str) -> Interaction {
        let body = serde_json::json!({
            "id": "2",
            "token": "tok",
            "type": 3,
            "data": {"custom_id": custom_id}
        });
        Interaction::from_dispatch(body).unwrap()
    }

    fn modal_interaction(custom_id: &str) -> Interaction {
        let body = serde_json::json!({
            "id": "3",
            "token": "tok",
            "type": 5,
            "data": {"custom_id": custom_id}
        });
        Interaction::from_dispatch(body).unwrap()
    }

    #[tokio::test]
    async fn test_command_routes_by_name() {
        let router = Router::new().command("ping", |_interaction: Interaction| async {
            Ok(InteractionResponse::channel_message("Pong!"))
        });
        let sender = RecordingSender::default();

        let outcome = router.dispatch(&command_interaction("ping"), &sender).await;

        assert_eq!(outcome, DispatchOutcome::Handled);
        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data.as_ref().unwrap().content.as_deref(), Some("Pong!"));
    }

    #[tokio::test]
    async fn test_unknown_command_gets_fixed_reply() {
        let router = Router::new();
        let sender = RecordingSender::default();

        let outcome = router.dispatch(&command_interaction("nope"), &sender).await;

        assert_eq!(outcome, DispatchOutcome::NoHandler);
        let sent = sender.take();
        assert_eq!(sent[0].data.as_ref().unwrap().content.as_deref(), Some("Unknown command"));
        assert_eq!(sent[0].data.as_ref().unwrap().flags, Some(64));
    }

    #[tokio::test]
    async fn test_handler_error_gets_fallback_reply() {
        let router = Router::new().command("boom", |_interaction: Interaction| async {
            Err(BotError::Handler("exploded".to_string()))
        });
        let sender = RecordingSender::default();

        let outcome = router.dispatch(&command_interaction("boom"), &sender).await;

        assert_eq!(outcome, DispatchOutcome::HandlerFailed);
        let sent = sender.take();
        assert_eq!(
            sent[0].data.as_ref().unwrap().content.as_deref(),
            Some("An error occurred while executing the command.")
        );
        assert_eq!(sent[0].data.as_ref().unwrap().flags, Some(64));
    }

    #[tokio::test]
    async fn test_self_responding_handler_suppresses_router_send() {
        struct Deferring;

        #[async_trait]
        impl InteractionHandler for Deferring {
            async fn handle(
                &self,
                interaction: &Interaction,
                sender: &dyn ResponseSender,
            ) -> Result<Option<InteractionResponse>> {
                sender
                    .send_response(interaction, &InteractionResponse::deferred())
                    .await?;
                Ok(None)
            }
        }

        let router = Router::new().command("slow", Deferring);
        let sender = RecordingSender::default();

        let outcome = router.dispatch(&command_interaction("slow"), &sender).await;

        // The deferred ack the handler sent itself is the only response.
        assert_eq!(outcome, DispatchOutcome::Handled);
        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, 5);
    }

    #[tokio::test]
    async fn test_ping_answered_with_pong() {
        let router = Router::new();
        let sender = RecordingSender::default();
        let body = serde_json::json!({"id": "9", "token": "tok", "type": 1});
        let interaction = Interaction::from_dispatch(body).unwrap();

        let outcome = router.dispatch(&interaction, &sender).await;

        assert_eq!(outcome, DispatchOutcome::Pong);
        let sent = sender.take();
        assert_eq!(sent[0].kind, 1);
        assert!(sent[0].data.is_none());
    }

    #[tokio::test]
    async fn test_component_routes_by_custom_id() {
        let router = Router::new().component("confirm", |_interaction: Interaction| async {
            Ok(InteractionResponse::channel_message("confirmed"))
        });
        let sender = RecordingSender::default();

        let outcome = router
            .dispatch(&component_interaction("confirm"), &sender)
            .await;

        assert_eq!(outcome, DispatchOutcome::Handled);
    }

    #[tokio::test]
    async fn test_component_without_handler() {
        let router = Router::new();
        let sender = RecordingSender::default();

        let outcome = router
            .dispatch(&component_interaction("ghost"), &sender)
            .await;

        assert_eq!(outcome, DispatchOutcome::NoHandler);
        let sent = sender.take();
        assert_eq!(
            sent[0].data.as_ref().unwrap().content.as_deref(),
            Some("No handler for this component.")
        );
    }

    #[tokio::test]
    async fn test_modal_without_handler() {
        let router = Router::new();
        let sender = RecordingSender::default();

        let outcome = router.dispatch(&modal_interaction("form"), &sender).await;

        assert_eq!(outcome, DispatchOutcome::NoHandler);
        let sent = sender.take();
        assert_eq!(
            sent[0].data.as_ref().unwrap().content.as_deref(),
            Some("No handler for this modal.")
        );
    }

    #[tokio::test]
    async fn test_unknown_type_gets_notice() {
        let router = Router::new();
        let sender = RecordingSender::default();
        let body = serde_json::json!({"id": "4", "token": "tok", "type": 4});
        let interaction = Interaction::from_dispatch(body).unwrap();

        let outcome = router.dispatch(&interaction, &sender).await;

        assert_eq!(outcome, DispatchOutcome::UnknownType);
        let sent = sender.take();
        assert_eq!(
            sent[0].data.as_ref().unwrap().content.as_deref(),
            Some("Unknown interaction type")
        );
    }

    #[tokio::test]
    async fn test_command_and_component_tables_are_separate() {
        // Same key in both tables must not cross-route.
        let router = Router::new()
            .command("shared", |_interaction: Interaction| async {
                Ok(InteractionResponse::channel_message("command"))
            })
            .component("shared", |_interaction: Interaction| async {
                Ok(InteractionResponse::channel_message("component"))
            });
        let sender = RecordingSender::default();

        router.dispatch(&command_interaction("shared"), &sender).await;
        router
            .dispatch(&component_interaction("shared"), &sender)
            .await;

        let sent = sender.take();
        assert_eq!(sent[0].data.as_ref().unwrap().content.as_deref(), Some("command"));
        assert_eq!(sent[1].data.as_ref().unwrap().content.as_deref(), Some("component"));
    }

    #[test]
    fn test_has_command() {
        let router = Router::new().command("ping", |_interaction: Interaction| async {
            Ok(InteractionResponse::pong())
        });

        assert!(router.has_command("ping"));
        assert!(!router.has_command("pong"));
    }
}
