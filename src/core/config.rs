//! Engine configuration with documented defaults
//!
//! Everything tunable about dispatch lives here: cooldowns, the rate-limit
//! window, the oracle confidence threshold and the history bounds. A config
//! is passed into the processor explicitly; there is no global instance.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::CommandType;

/// Configuration for the command dispatch engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === THROTTLING ===
    /// Minimum seconds between two successful invocations of a command type
    ///
    /// Types missing from the map have no cooldown at all.
    pub cooldowns: BTreeMap<CommandType, f64>,

    /// Sliding-window limit applied per actor
    pub rate_limit: RateLimitConfig,

    // === CLASSIFICATION ===
    /// Oracle guesses below this confidence become `Unknown`
    ///
    /// Pattern matches are never subject to the threshold; they are
    /// deterministic and always carry `PATTERN_CONFIDENCE`.
    pub confidence_threshold: f32,

    /// Upper bound on a single fallback oracle call (milliseconds)
    ///
    /// A timed-out call degrades to `Unknown` instead of stalling the turn.
    pub oracle_timeout_ms: u64,

    // === HISTORY ===
    /// Ring buffer size for executed commands; oldest entries are evicted
    pub history_capacity: usize,

    /// Maximum number of inverse actions kept for undo
    pub undo_capacity: usize,

    /// Maximum suggestions returned for an unrecognised command
    pub suggestion_limit: usize,
}

/// Sliding-window rate limit settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Commands admitted per window
    pub max_commands: usize,
    /// Window length in seconds
    pub window_seconds: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_commands: 10,
            window_seconds: 60.0,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs_f64(self.window_seconds)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut cooldowns = BTreeMap::new();
        // Cultivation is the slowest loop; skills and saves are short
        cooldowns.insert(CommandType::Cultivate, 5.0);
        cooldowns.insert(CommandType::UseSkill, 2.0);
        cooldowns.insert(CommandType::Save, 10.0);

        Self {
            cooldowns,
            rate_limit: RateLimitConfig::default(),
            confidence_threshold: 0.5,
            oracle_timeout_ms: 15_000,
            history_capacity: 100,
            undo_capacity: 20,
            suggestion_limit: 5,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, filling omitted keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate().map_err(EngineError::Config)?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Builder-style override of one cooldown
    pub fn with_cooldown(mut self, command_type: CommandType, seconds: f64) -> Self {
        self.cooldowns.insert(command_type, seconds);
        self
    }

    /// Builder-style override of the rate limit
    pub fn with_rate_limit(mut self, max_commands: usize, window_seconds: f64) -> Self {
        self.rate_limit = RateLimitConfig {
            max_commands,
            window_seconds,
        };
        self
    }

    pub fn cooldown_for(&self, command_type: CommandType) -> Option<Duration> {
        self.cooldowns
            .get(&command_type)
            .filter(|secs| **secs > 0.0)
            .map(|secs| Duration::from_secs_f64(*secs))
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "confidence_threshold ({}) must be within [0, 1]",
                self.confidence_threshold
            ));
        }

        if let Some((command_type, secs)) = self
            .cooldowns
            .iter()
            .find(|(_, secs)| !secs.is_finite() || **secs < 0.0)
        {
            return Err(format!(
                "cooldown for {} must be a non-negative number of seconds, got {}",
                command_type, secs
            ));
        }

        if self.rate_limit.max_commands == 0 {
            return Err("rate_limit.max_commands must be at least 1".into());
        }
        if !self.rate_limit.window_seconds.is_finite() || self.rate_limit.window_seconds <= 0.0 {
            return Err(format!(
                "rate_limit.window_seconds ({}) must be positive",
                self.rate_limit.window_seconds
            ));
        }

        if self.history_capacity == 0 {
            return Err("history_capacity must be at least 1".into());
        }
        if self.suggestion_limit > 5 {
            return Err(format!(
                "suggestion_limit ({}) must be at most 5",
                self.suggestion_limit
            ));
        }
        if self.oracle_timeout_ms == 0 {
            return Err("oracle_timeout_ms must be positive".into());
        }

        Ok(())
    }
}

/// Connection settings for the remote LLM oracle
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    /// Extra attempts after a transport failure
    pub max_retries: u32,
}

impl LlmSettings {
    /// Read settings from the environment
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to the DeepSeek chat endpoint)
    /// Optional: LLM_MODEL (defaults to deepseek-chat)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| EngineError::LlmError("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com/v1/chat/completions".into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".into());

        Ok(Self {
            api_key,
            api_url,
            model,
            max_retries: 2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.rate_limit.max_commands, 10);
        assert_eq!(config.cooldown_for(CommandType::Cultivate), Some(Duration::from_secs(5)));
        assert_eq!(config.cooldown_for(CommandType::Status), None);
    }

    #[test]
    fn test_from_toml_overrides_and_defaults() {
        let toml = r#"
            confidence_threshold = 0.7
            history_capacity = 50

            [cooldowns]
            CULTIVATE = 2.0

            [rate_limit]
            max_commands = 3
        "#;
        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert!((config.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.cooldown_for(CommandType::Cultivate), Some(Duration::from_secs(2)));
        // A cooldowns table replaces the defaults wholesale
        assert_eq!(config.cooldown_for(CommandType::Save), None);
        assert_eq!(config.rate_limit.max_commands, 3);
        assert_eq!(config.rate_limit.window_seconds, 60.0);
        assert_eq!(config.undo_capacity, 20);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = EngineConfig {
            confidence_threshold: 1.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_window() {
        let config = EngineConfig::default().with_rate_limit(0, 60.0);
        assert!(config.validate().is_err());

        let config = EngineConfig::default().with_rate_limit(5, 0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cooldown_means_none() {
        let config = EngineConfig::default().with_cooldown(CommandType::Cultivate, 0.0);
        assert_eq!(config.cooldown_for(CommandType::Cultivate), None);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let result = EngineConfig::from_toml_str("confidence_threshold = \"high\"");
        assert!(result.is_err());
    }
}
