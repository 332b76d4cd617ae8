use std::time::Duration;

use thiserror::Error;

use crate::core::types::{CommandSource, CommandType};

/// Engine-level failures: setup, configuration, transport
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Handler already registered: {0}")]
    DuplicateHandler(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Why a throttle middleware rejected a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleKind {
    Cooldown,
    RateLimit,
}

/// Failures surfaced to the player as a failed `CommandResult`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("无法识别的命令: {input}")]
    UnknownCommand { input: String },

    #[error("这里无法执行该命令 ({command_type})")]
    NoApplicableHandler { command_type: CommandType },

    #[error("{0}")]
    ValidationFailed(String),

    #[error("{command_type} 不允许由 {source_kind} 发起")]
    PermissionDenied {
        command_type: CommandType,
        source_kind: CommandSource,
    },

    #[error("命令冷却中，请等待 {:.1} 秒", .retry_after.as_secs_f64())]
    CooldownActive {
        command_type: CommandType,
        retry_after: Duration,
    },

    #[error("命令太频繁，请稍后再试（{window_secs}秒内最多{max_commands}条）")]
    RateLimited {
        max_commands: usize,
        window_secs: f64,
        retry_after: Duration,
    },

    #[error("命令执行失败")]
    HandlerFault { handler: String, detail: String },

    #[error("命令已取消")]
    Cancelled,
}

impl CommandError {
    /// Stable machine-readable tag written into result data
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::UnknownCommand { .. } => "unknown_command",
            CommandError::NoApplicableHandler { .. } => "no_applicable_handler",
            CommandError::ValidationFailed(_) | CommandError::PermissionDenied { .. } => {
                "validation_failed"
            }
            CommandError::CooldownActive { .. } | CommandError::RateLimited { .. } => {
                "throttle_rejected"
            }
            CommandError::HandlerFault { .. } => "handler_fault",
            CommandError::Cancelled => "cancelled",
        }
    }

    pub fn throttle_kind(&self) -> Option<ThrottleKind> {
        match self {
            CommandError::CooldownActive { .. } => Some(ThrottleKind::Cooldown),
            CommandError::RateLimited { .. } => Some(ThrottleKind::RateLimit),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CommandError::CooldownActive { retry_after, .. }
            | CommandError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Whether the caller may keep chaining commands after this failure
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CommandError::HandlerFault { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = CommandError::CooldownActive {
            command_type: CommandType::Cultivate,
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(err.kind(), "throttle_rejected");
        assert_eq!(err.throttle_kind(), Some(ThrottleKind::Cooldown));
        assert_eq!(err.retry_after(), Some(Duration::from_millis(1500)));
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_handler_fault_is_not_recoverable() {
        let err = CommandError::HandlerFault {
            handler: "attack".into(),
            detail: "boom".into(),
        };
        assert!(!err.is_recoverable());
        // Internal detail never reaches the player-facing line
        assert!(!err.to_string().contains("boom"));
    }
}
