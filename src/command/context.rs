//! Per-invocation command context
//!
//! The host supplies a small `ContextSnapshot` with each input; the processor
//! combines it with the parsed command into a `CommandContext` that flows
//! through the middleware chain into the selected handler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::command::result::GameEvent;
use crate::core::types::{CommandSource, CommandType, EntityId, GameMode};
use crate::intent::context::ContextHint;
use crate::parser::command::ParsedCommand;

/// What the engine needs to know about the acting character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub id: EntityId,
    pub name: String,
    /// Unconscious, dead or otherwise unable to act
    #[serde(default)]
    pub incapacitated: bool,
}

impl ActorSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            incapacitated: false,
        }
    }

    pub fn incapacitated(mut self) -> Self {
        self.incapacitated = true;
        self
    }
}

/// Host-side state handed in with every input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub actor: Option<ActorSnapshot>,
    pub location: String,
    pub game_mode: GameMode,
    pub source: CommandSource,
}

impl ContextSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Player-sourced snapshot for a named actor, exploring
    pub fn player(name: impl Into<String>) -> Self {
        Self::new().with_actor(ActorSnapshot::new(name))
    }

    pub fn with_actor(mut self, actor: ActorSnapshot) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_mode(mut self, game_mode: GameMode) -> Self {
        self.game_mode = game_mode;
        self
    }

    pub fn with_source(mut self, source: CommandSource) -> Self {
        self.source = source;
        self
    }

    /// Fold the events a result reported into the snapshot
    ///
    /// Only location changes are tracked; everything else stays with the host.
    pub fn apply_events(&mut self, events: &[GameEvent]) {
        for event in events {
            if let GameEvent::Moved { to, .. } = event {
                self.location = to.clone();
            }
        }
    }

    /// Hint passed to the fallback oracle
    pub fn hint(&self) -> ContextHint {
        let mut hint = ContextHint::new(self.game_mode, self.location.clone());
        hint.actor_name = self.actor.as_ref().map(|a| a.name.clone());
        hint
    }
}

/// Everything a middleware or handler can see about one invocation
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub command: ParsedCommand,
    /// Input exactly as the caller supplied it, before alias resolution
    pub raw_input: String,
    pub actor: Option<ActorSnapshot>,
    pub location: String,
    pub game_mode: GameMode,
    pub source: CommandSource,
    /// Scratch space shared by middlewares and the handler
    pub flags: HashMap<String, serde_json::Value>,
}

impl CommandContext {
    pub fn new(
        command: ParsedCommand,
        raw_input: impl Into<String>,
        snapshot: &ContextSnapshot,
    ) -> Self {
        Self {
            command,
            raw_input: raw_input.into(),
            actor: snapshot.actor.clone(),
            location: snapshot.location.clone(),
            game_mode: snapshot.game_mode,
            source: snapshot.source,
            flags: HashMap::new(),
        }
    }

    pub fn command_type(&self) -> CommandType {
        self.command.command_type
    }

    pub fn actor_name(&self) -> &str {
        self.actor.as_ref().map(|a| a.name.as_str()).unwrap_or("你")
    }

    pub fn set_flag(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.flags.insert(key.into(), value);
    }

    pub fn flag(&self, key: &str) -> Option<&serde_json::Value> {
        self.flags.get(key)
    }

    /// Snapshot equivalent of this context, used to replay inverses
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            actor: self.actor.clone(),
            location: self.location.clone(),
            game_mode: self.game_mode,
            source: self.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_context_copies_snapshot() {
        let snapshot = ContextSnapshot::player("韩立")
            .with_location("青云城")
            .with_mode(GameMode::Trading);
        let cmd = ParsedCommand::new(CommandType::Trade, None, BTreeMap::new(), "交易", 0.9);
        let mut ctx = CommandContext::new(cmd, "交易", &snapshot);

        assert_eq!(ctx.command_type(), CommandType::Trade);
        assert_eq!(ctx.actor_name(), "韩立");
        assert_eq!(ctx.game_mode, GameMode::Trading);
        assert_eq!(ctx.snapshot(), snapshot);

        ctx.set_flag("handler", serde_json::json!("interaction"));
        assert_eq!(ctx.flag("handler"), Some(&serde_json::json!("interaction")));
    }

    #[test]
    fn test_hint_carries_actor_and_mode() {
        let hint = ContextSnapshot::player("韩立")
            .with_mode(GameMode::Combat)
            .hint();
        assert_eq!(hint.game_mode, GameMode::Combat);
        assert_eq!(hint.actor_name.as_deref(), Some("韩立"));
    }

    #[test]
    fn test_apply_events_follows_moves() {
        let mut snapshot = ContextSnapshot::player("韩立").with_location("城外荒野");
        snapshot.apply_events(&[
            GameEvent::QuitRequested,
            GameEvent::Moved {
                from: "城外荒野".into(),
                to: "青云城".into(),
            },
        ]);
        assert_eq!(snapshot.location, "青云城");
    }
}
