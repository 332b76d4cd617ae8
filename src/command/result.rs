//! Command results and the events they announce
//!
//! Handlers never mutate game state directly. They describe what should
//! happen as `GameEvent`s and leave applying them to the host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::error::CommandError;
use crate::core::types::CommandType;

/// Something a handler wants the host game to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    AttackDeclared { target: Option<String> },
    SkillCast { skill: String, target: Option<String> },
    Defended,
    FleeAttempted,
    Moved { from: String, to: String },
    Explored { location: String, focus: Option<String> },
    TalkStarted { npc: String },
    TradeOpened { merchant: Option<String> },
    ItemPicked { item: String },
    CultivationStarted { duration: Option<String>, resting: bool },
    SkillLearned { skill: String },
    BreakthroughAttempted,
    ItemUsed { item: String },
    ItemEquipped { item: String },
    ItemUnequipped { item: String },
    SaveRequested { slot: Option<String> },
    LoadRequested { slot: Option<String> },
    QuitRequested,
    Custom { kind: String, payload: Value },
}

/// A command that undoes a successful one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InverseAction {
    pub command_type: CommandType,
    pub target: Option<String>,
    pub parameters: BTreeMap<String, String>,
    /// How the inverse reads as player input, for history and logs
    pub raw_input: String,
}

impl InverseAction {
    pub fn new(command_type: CommandType, raw_input: impl Into<String>) -> Self {
        Self {
            command_type,
            target: None,
            parameters: BTreeMap::new(),
            raw_input: raw_input.into(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    #[serde(default)]
    pub events: Vec<GameEvent>,
    /// False when the caller should stop feeding commands (quit, faults)
    pub continue_processing: bool,
    #[serde(skip)]
    pub inverse: Option<InverseAction>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            data: BTreeMap::new(),
            events: Vec::new(),
            continue_processing: true,
            inverse: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            data: BTreeMap::new(),
            events: Vec::new(),
            continue_processing: true,
            inverse: None,
        }
    }

    /// Failed result for an engine-level rejection
    pub fn from_error(err: &CommandError) -> Self {
        let mut result = Self::failure(err.to_string()).with_data("error_kind", json!(err.kind()));
        if let Some(retry_after) = err.retry_after() {
            result = result.with_data("retry_after_secs", json!(retry_after.as_secs_f64()));
        }
        if let CommandError::NoApplicableHandler { command_type } = err {
            result = result.with_data("command_type", json!(command_type));
        }
        result.continue_processing = err.is_recoverable();
        result
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_event(mut self, event: GameEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_inverse(mut self, inverse: InverseAction) -> Self {
        self.inverse = Some(inverse);
        self
    }

    pub fn with_suggestions(self, suggestions: Vec<String>) -> Self {
        if suggestions.is_empty() {
            return self;
        }
        self.with_data("suggestions", json!(suggestions))
    }

    /// Ask the caller to stop processing further input
    pub fn halt(mut self) -> Self {
        self.continue_processing = false;
        self
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.data.get("error_kind").and_then(Value::as_str)
    }

    pub fn retry_after_secs(&self) -> Option<f64> {
        self.data.get("retry_after_secs").and_then(Value::as_f64)
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.data
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// One line for the player, plus a suggestion line when there are any
    pub fn render(&self) -> String {
        let mut out = match (&self.message, &self.error) {
            (Some(message), _) => message.clone(),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        };
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str(&format!("\n你是不是想输入: {}", suggestions.join("、")));
        }
        out
    }
}
