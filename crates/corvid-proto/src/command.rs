//! Application command declarations and their remote counterparts.
//!
//! [`ApplicationCommand`] is a command as the host application declares
//! it; [`RegisteredCommand`] is the platform's stored copy, which carries
//! the platform-assigned id. The synchronizer in `corvidbot` diffs one
//! set against the other.

use serde::{Deserialize, Serialize};

/// Option type tags for command declarations.
pub mod option_type {
    /// A nested sub-command.
    pub const SUB_COMMAND: u8 = 1;
    /// A group of sub-commands.
    pub const SUB_COMMAND_GROUP: u8 = 2;
    /// Free-form text.
    pub const STRING: u8 = 3;
    /// Whole number.
    pub const INTEGER: u8 = 4;
    /// True or false.
    pub const BOOLEAN: u8 = 5;
    /// A user mention.
    pub const USER: u8 = 6;
    /// A channel mention.
    pub const CHANNEL: u8 = 7;
    /// A role mention.
    pub const ROLE: u8 = 8;
    /// Floating point number.
    pub const NUMBER: u8 = 10;
}

/// One option in a command declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandOption {
    /// Option type tag.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Option name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether the invoker must supply this option.
    #[serde(default)]
    pub required: bool,
    /// Nested options, used by sub-commands and sub-command groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    /// Create an optional option of the given type.
    #[must_use]
    pub fn new(kind: u8, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            options: Vec::new(),
        }
    }

    /// Create a sub-command that nests its own options.
    #[must_use]
    pub fn sub_command(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(option_type::SUB_COMMAND, name, description)
    }

    /// Create a group of sub-commands.
    #[must_use]
    pub fn sub_command_group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(option_type::SUB_COMMAND_GROUP, name, description)
    }

    /// Mark the option as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Nest an option inside this one.
    #[must_use]
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }
}

fn default_integration_types() -> Vec<u8> {
    vec![0]
}

fn default_contexts() -> Vec<u8> {
    vec![0, 1, 2]
}

/// A command as declared by the host application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationCommand {
    /// Unique command name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared options.
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Installation surfaces: 0 for guild installs, 1 for user installs.
    #[serde(default = "default_integration_types")]
    pub integration_types: Vec<u8>,
    /// Invocation contexts: guild, bot DM, and private channel.
    #[serde(default = "default_contexts")]
    pub contexts: Vec<u8>,
    /// Declared version, compared against the remote copy when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ApplicationCommand {
    /// Create a guild-installable command usable in every context.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            integration_types: default_integration_types(),
            contexts: default_contexts(),
            version: None,
        }
    }

    /// Add an option.
    #[must_use]
    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    /// Also register the command for user installs.
    #[must_use]
    pub fn user_installable(mut self) -> Self {
        self.integration_types = vec![0, 1];
        self
    }

    /// Declare a version string for change detection.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A command as stored by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisteredCommand {
    /// Platform-assigned command id.
    pub id: String,
    /// Unique command name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Stored options.
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Stored installation surfaces.
    #[serde(default)]
    pub integration_types: Vec<u8>,
    /// Stored invocation contexts.
    #[serde(default)]
    pub contexts: Vec<u8>,
    /// Platform-assigned version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
