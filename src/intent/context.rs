//! Situation summary handed to fallback oracles
//!
//! A pattern miss is often ambiguous ("跑" is fleeing in a fight and a walk
//! anywhere else), so oracles receive a small snapshot of where the player is
//! and what they did recently.

use serde::{Deserialize, Serialize};

use crate::core::types::GameMode;

/// Context snapshot for intent disambiguation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextHint {
    /// Current interaction mode
    pub game_mode: GameMode,
    /// Name of the current location
    pub location: String,
    /// Display name of the acting character, if any
    pub actor_name: Option<String>,
    /// Most recent successful inputs, oldest first
    pub recent_commands: Vec<String>,
}

impl ContextHint {
    pub fn new(game_mode: GameMode, location: impl Into<String>) -> Self {
        Self {
            game_mode,
            location: location.into(),
            actor_name: None,
            recent_commands: Vec::new(),
        }
    }

    /// Add a recent command, keeping only the last 5
    pub fn add_recent(&mut self, command: impl Into<String>) {
        self.recent_commands.push(command.into());
        if self.recent_commands.len() > 5 {
            self.recent_commands.remove(0);
        }
    }

    /// Generate a text summary of the context for LLM prompts
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(&format!("Mode: {:?}\n", self.game_mode));
        if !self.location.is_empty() {
            s.push_str(&format!("Location: {}\n", self.location));
        }
        if let Some(name) = &self.actor_name {
            s.push_str(&format!("Player: {}\n", name));
        }

        if !self.recent_commands.is_empty() {
            s.push_str("\nRecent Commands:\n");
            for command in &self.recent_commands {
                s.push_str(&format!("- {}\n", command));
            }
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_includes_mode_and_location() {
        let mut hint = ContextHint::new(GameMode::Combat, "青云城");
        hint.actor_name = Some("韩立".into());
        let summary = hint.summary();
        assert!(summary.contains("Combat"));
        assert!(summary.contains("青云城"));
        assert!(summary.contains("韩立"));
        assert!(!summary.contains("Recent Commands"));
    }

    #[test]
    fn test_recent_commands_are_bounded() {
        let mut hint = ContextHint::default();
        for i in 0..8 {
            hint.add_recent(format!("cmd{}", i));
        }
        assert_eq!(hint.recent_commands.len(), 5);
        assert_eq!(hint.recent_commands[0], "cmd3");
        assert!(hint.summary().contains("- cmd7"));
    }
}
