//! Handler guards.
//!
//! A guard wraps an [`InteractionHandler`] and runs the inner handler
//! only when the invoking user passes a check. Blocked invocations get a
//! fixed ephemeral reply, so from the router's point of view the guard
//! is just another handler that succeeded.

use async_trait::async_trait;
use corvid_proto::{Interaction, InteractionResponse};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::rest::ResponseSender;
use crate::router::InteractionHandler;

/// Permission bit constants for [`RequirePermissions`].
pub mod permission {
    /// Grants every permission.
    pub const ADMINISTRATOR: u64 = 1 << 3;
    /// Allows kicking members.
    pub const KICK_MEMBERS: u64 = 1 << 1;
    /// Allows banning members.
    pub const BAN_MEMBERS: u64 = 1 << 2;
    /// Allows managing guild settings.
    pub const MANAGE_GUILD: u64 = 1 << 5;
    /// Allows deleting messages of other members.
    pub const MANAGE_MESSAGES: u64 = 1 << 13;
}

const NOT_ALLOWED: &str = "You do not have permission to use this command.";
const PERMISSIONS_UNVERIFIABLE: &str = "Unable to verify permissions.";
const MISSING_ROLE: &str = "You do not have the required role to use this command.";
const ROLES_UNVERIFIABLE: &str = "Unable to verify roles.";
const DEVELOPER_ONLY: &str = "This command is restricted to bot developers only.";

/// Runs the inner handler only when the member holds every required
/// permission bit. The denial names the missing permissions.
pub struct RequirePermissions<H> {
    required: u64,
    inner: H,
}

/// Runs the inner handler only when the member holds at least one of the
/// listed role ids.
pub struct RequireRoles<H> {
    any_of: Vec<String>,
    inner: H,
}

/// Runs the inner handler only for the listed user ids.
pub struct AllowUsers<H> {
    allowed: Vec<String>,
    inner: H,
}

/// Runs the inner handler only for the listed developer user ids.
pub struct DeveloperOnly<H> {
    developers: Vec<String>,
    inner: H,
}

/// Guard `inner` behind a permission bitmask check.
pub fn require_permissions<H: InteractionHandler>(required: u64, inner: H) -> RequirePermissions<H> {
    RequirePermissions { required, inner }
}

/// Guard `inner` behind a role check. The member needs any one of the ids.
pub fn require_any_role<H: InteractionHandler>(
    any_of: impl IntoIterator<Item = impl Into<String>>,
    inner: H,
) -> RequireRoles<H> {
    RequireRoles {
        any_of: any_of.into_iter().map(Into::into).collect(),
        inner,
    }
}

/// Guard `inner` behind a user allowlist.
pub fn allow_users<H: InteractionHandler>(
    allowed: impl IntoIterator<Item = impl Into<String>>,
    inner: H,
) -> AllowUsers<H> {
    AllowUsers {
        allowed: allowed.into_iter().map(Into::into).collect(),
        inner,
    }
}

/// Guard `inner` behind a developer allowlist.
pub fn developer_only<H: InteractionHandler>(
    developers: impl IntoIterator<Item = impl Into<String>>,
    inner: H,
) -> DeveloperOnly<H> {
    DeveloperOnly {
        developers: developers.into_iter().map(Into::into).collect(),
        inner,
    }
}

/// Permissions bitmask from the member object. The platform serializes
/// it as a decimal string.
fn member_permissions(interaction: &Interaction) -> Option<u64> {
    interaction
        .member
        .as_ref()?
        .get("permissions")?
        .as_str()?
        .parse()
        .ok()
}

/// Names for the known permission bits, used in denial messages.
fn permission_names(bits: u64) -> Vec<&'static str> {
    const KNOWN: &[(u64, &str)] = &[
        (permission::ADMINISTRATOR, "administrator"),
        (permission::KICK_MEMBERS, "kick_members"),
        (permission::BAN_MEMBERS, "ban_members"),
        (permission::MANAGE_GUILD, "manage_guild"),
        (permission::MANAGE_MESSAGES, "manage_messages"),
    ];
    KNOWN
        .iter()
        .filter(|&&(bit, _)| bits & bit != 0)
        .map(|&(_, name)| name)
        .collect()
}

/// Role ids held by the invoking member.
fn member_role_ids(interaction: &Interaction) -> Option<Vec<&str>> {
    let roles = interaction.member.as_ref()?.get("roles")?.as_array()?;
    Some(roles.iter().filter_map(Value::as_str).collect())
}

/// Id of the invoking user, from the member object in guilds or the
/// top-level user object elsewhere.
fn invoking_user_id(interaction: &Interaction) -> Option<&str> {
    interaction
        .member
        .as_ref()
        .and_then(|member| member.get("user"))
        .and_then(|user| user.get("id"))
        .and_then(Value::as_str)
        .or_else(|| {
            interaction
                .user
                .as_ref()
                .and_then(|user| user.get("id"))
                .and_then(Value::as_str)
        })
}

#[async_trait]
impl<H: InteractionHandler> InteractionHandler for RequirePermissions<H> {
    async fn handle(
        &self,
        interaction: &Interaction,
        sender: &dyn ResponseSender,
    ) -> Result<Option<InteractionResponse>> {
        match member_permissions(interaction) {
            Some(held) if held & self.required == self.required => {
                self.inner.handle(interaction, sender).await
            }
            Some(held) => {
                debug!(
                    id = %interaction.id,
                    required = self.required,
                    held,
                    "permission check failed"
                );
                let missing = permission_names(self.required & !held);
                let message = if missing.is_empty() {
                    NOT_ALLOWED.to_string()
                } else {
                    format!("Missing required permissions: {}", missing.join(", "))
                };
                Ok(Some(InteractionResponse::channel_message(message).ephemeral()))
            }
            None => Ok(Some(
                InteractionResponse::channel_message(PERMISSIONS_UNVERIFIABLE).ephemeral(),
            )),
        }
    }
}

#[async_trait]
impl<H: InteractionHandler> InteractionHandler for RequireRoles<H> {
    async fn handle(
        &self,
        interaction: &Interaction,
        sender: &dyn ResponseSender,
    ) -> Result<Option<InteractionResponse>> {
        match member_role_ids(interaction) {
            Some(held) => {
                if self.any_of.iter().any(|role| held.contains(&role.as_str())) {
                    self.inner.handle(interaction, sender).await
                } else {
                    debug!(id = %interaction.id, "role check failed");
                    Ok(Some(
                        InteractionResponse::channel_message(MISSING_ROLE).ephemeral(),
                    ))
                }
            }
            None => Ok(Some(
                InteractionResponse::channel_message(ROLES_UNVERIFIABLE).ephemeral(),
            )),
        }
    }
}

#[async_trait]
impl<H: InteractionHandler> InteractionHandler for AllowUsers<H> {
    async fn handle(
        &self,
        interaction: &Interaction,
        sender: &dyn ResponseSender,
    ) -> Result<Option<InteractionResponse>> {
        match invoking_user_id(interaction) {
            Some(id) if self.allowed.iter().any(|allowed| allowed == id) => {
                self.inner.handle(interaction, sender).await
            }
            _ => {
                debug!(id = %interaction.id, "user allowlist check failed");
                Ok(Some(
                    InteractionResponse::channel_message(NOT_ALLOWED).ephemeral(),
                ))
            }
        }
    }
}

#[async_trait]
impl<H: InteractionHandler> InteractionHandler for DeveloperOnly<H> {
    async fn handle(
        &self,
        interaction: &Interaction,
        sender: &dyn ResponseSender,
    ) -> Result<Option<InteractionResponse>> {
        match invoking_user_id(interaction) {
            Some(id) if self.developers.iter().any(|dev| dev == id) => {
                self.inner.handle(interaction, sender).await
            }
            _ => {
                debug!(id = %interaction.id, "developer check failed");
                Ok(Some(
                    InteractionResponse::channel_message(DEVELOPER_ONLY).ephemeral(),
                ))
            }
        }
    }
}
