//! Structured form of a player's input

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::CommandType;

/// Confidence assigned to deterministic pattern matches
pub const PATTERN_CONFIDENCE: f32 = 0.9;

/// A classified command, created once per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// Canonical command category
    pub command_type: CommandType,
    /// Primary target (enemy, NPC, item) when the input names one
    pub target: Option<String>,
    /// Named parameters extracted from the input (`skill`, `location`, ...)
    pub parameters: BTreeMap<String, String>,
    /// Text the command was parsed from, after alias resolution
    pub raw_text: String,
    /// Parser's confidence in the interpretation (0.0 - 1.0)
    pub confidence: f32,
}

impl ParsedCommand {
    /// Build a command, clamping confidence and enforcing that a zero
    /// confidence always means `Unknown`
    pub fn new(
        command_type: CommandType,
        target: Option<String>,
        parameters: BTreeMap<String, String>,
        raw_text: impl Into<String>,
        confidence: f32,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if confidence == 0.0 || command_type == CommandType::Unknown {
            return Self::unknown(raw_text);
        }

        let target = target
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            command_type,
            target,
            parameters,
            raw_text: raw_text.into(),
            confidence,
        }
    }

    /// The "could not determine intent" command
    pub fn unknown(raw_text: impl Into<String>) -> Self {
        Self {
            command_type: CommandType::Unknown,
            target: None,
            parameters: BTreeMap::new(),
            raw_text: raw_text.into(),
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.command_type == CommandType::Unknown
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Target, falling back to the named parameters handlers commonly use
    pub fn target_or_param(&self, keys: &[&str]) -> Option<&str> {
        self.target
            .as_deref()
            .or_else(|| keys.iter().find_map(|k| self.param(k)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_confidence_forces_unknown() {
        let cmd = ParsedCommand::new(
            CommandType::Attack,
            Some("妖兽".into()),
            BTreeMap::new(),
            "攻击 妖兽",
            0.0,
        );
        assert!(cmd.is_unknown());
        assert_eq!(cmd.target, None);
    }

    #[test]
    fn test_unknown_type_forces_zero_confidence() {
        let cmd = ParsedCommand::new(CommandType::Unknown, None, BTreeMap::new(), "xyz", 0.8);
        assert_eq!(cmd.confidence, 0.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let cmd = ParsedCommand::new(CommandType::Help, None, BTreeMap::new(), "帮助", 3.0);
        assert_eq!(cmd.confidence, 1.0);

        let cmd = ParsedCommand::new(CommandType::Help, None, BTreeMap::new(), "帮助", f32::NAN);
        assert!(cmd.is_unknown());
    }

    #[test]
    fn test_blank_target_is_dropped() {
        let cmd = ParsedCommand::new(
            CommandType::Attack,
            Some("  ".into()),
            BTreeMap::new(),
            "攻击",
            0.9,
        );
        assert_eq!(cmd.target, None);
    }

    #[test]
    fn test_target_or_param() {
        let mut params = BTreeMap::new();
        params.insert("item".to_string(), "气血药水".to_string());
        let cmd = ParsedCommand::new(CommandType::UseItem, None, params, "服用 气血药水", 0.9);
        assert_eq!(cmd.target_or_param(&["item"]), Some("气血药水"));
        assert_eq!(cmd.target_or_param(&["npc"]), None);
    }
}
