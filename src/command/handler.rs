//! Handler capability contract

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::command::context::CommandContext;
use crate::command::result::CommandResult;
use crate::core::types::CommandType;

/// Routing tier; a higher tier always wins over a lower one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum HandlerPriority {
    /// Catch-alls and read-only views
    Low = 10,
    Normal = 20,
    /// Mode-specific handlers that should shadow general ones
    High = 30,
    /// Engine-level overrides
    System = 40,
}

impl HandlerPriority {
    pub fn outranks(&self, other: HandlerPriority) -> bool {
        (*self as u8) > (other as u8)
    }
}

impl Default for HandlerPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Static description of a handler, travelling with its implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    /// Unique registry key
    pub name: String,
    pub command_types: BTreeSet<CommandType>,
    /// Extra words offered as suggestions for unknown input
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    #[serde(default)]
    pub priority: HandlerPriority,
    /// Initial enabled state when registered
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl HandlerDescriptor {
    pub fn new(name: impl Into<String>, priority: HandlerPriority) -> Self {
        Self {
            name: name.into(),
            command_types: BTreeSet::new(),
            aliases: BTreeSet::new(),
            priority,
            enabled: true,
        }
    }

    pub fn handles(mut self, command_types: &[CommandType]) -> Self {
        self.command_types.extend(command_types.iter().copied());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// One command family
///
/// The registry only calls `can_handle` for command types listed in the
/// descriptor. `validate` runs after selection and before `handle`; a
/// returned message becomes a validation failure.
pub trait CommandHandler: Send + Sync {
    fn descriptor(&self) -> &HandlerDescriptor;

    /// Whether this handler applies in the current context
    fn can_handle(&self, _ctx: &CommandContext) -> bool {
        true
    }

    fn validate(&self, _ctx: &CommandContext) -> Result<(), String> {
        Ok(())
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult;

    fn help(&self) -> String {
        let descriptor = self.descriptor();
        let verbs: Vec<&str> = descriptor
            .command_types
            .iter()
            .filter_map(|t| t.keywords().first().copied())
            .collect();
        format!("{}: {}", descriptor.name, verbs.join(" / "))
    }
}
