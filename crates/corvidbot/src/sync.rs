//! Command synchronization.
//!
//! Diffs the declared command set against what the platform has stored
//! and converges the remote side: missing commands are created, drifted
//! ones updated through the upserting create endpoint, and commands no
//! longer declared are deleted. Running twice in a row is a no-op.

use std::collections::HashMap;

use corvid_proto::{ApplicationCommand, RegisteredCommand};
use tracing::{debug, info};

use crate::error::Result;
use crate::rest::RestClient;

/// What one synchronization pass did, by command name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Commands created remotely.
    pub created: Vec<String>,
    /// Commands whose remote copy was replaced.
    pub updated: Vec<String>,
    /// Remote commands deleted because they are no longer declared.
    pub deleted: Vec<String>,
    /// Commands already in sync.
    pub unchanged: Vec<String>,
}

impl SyncReport {
    /// True when the pass made no remote writes.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Synchronize the declared commands with the platform.
///
/// # Errors
///
/// Returns an error when any API call fails; the pass stops at the first
/// failure and the report for it is lost.
pub async fn sync_commands(
    rest: &RestClient,
    desired: &[ApplicationCommand],
) -> Result<SyncReport> {
    let remote = rest.get_global_commands().await?;
    let mut by_name: HashMap<&str, &RegisteredCommand> = remote
        .iter()
        .map(|command| (command.name.as_str(), command))
        .collect();

    let mut report = SyncReport::default();

    for command in desired {
        match by_name.remove(command.name.as_str()) {
            None => {
                info!(command = %command.name, "creating command");
                rest.create_global_command(command).await?;
                report.created.push(command.name.clone());
            }
            Some(existing) if !commands_match(command, existing) => {
                info!(command = %command.name, "updating command");
                // Create upserts by name, so updates go through the same endpoint.
                rest.create_global_command(command).await?;
                report.updated.push(command.name.clone());
            }
            Some(_) => {
                debug!(command = %command.name, "command unchanged");
                report.unchanged.push(command.name.clone());
            }
        }
    }

    // Whatever is left in the index has no declared counterpart.
    for leftover in by_name.values() {
        info!(command = %leftover.name, id = %leftover.id, "deleting command");
        rest.delete_global_command(&leftover.id).await?;
        report.deleted.push(leftover.name.clone());
    }

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        deleted = report.deleted.len(),
        unchanged = report.unchanged.len(),
        "command sync complete"
    );

    Ok(report)
}

/// Field-wise comparison between a declared command and its remote copy.
/// The declared version only participates when it is set; the platform
/// always assigns one remotely.
fn commands_match(desired: &ApplicationCommand, remote: &RegisteredCommand) -> bool {
    if desired.name != remote.name || desired.description != remote.description {
        return false;
    }
    if desired.options != remote.options {
        return false;
    }
    if desired.integration_types != remote.integration_types {
        return false;
    }
    if desired.contexts != remote.contexts {
        return false;
    }
    if let Some(version) = &desired.version {
        if remote.version.as_ref() != Some(version) {
            return false;
        }
    }

    true
}
