//! Command Engine - text command dispatch for a cultivation RPG
//!
//! Free-form player input is resolved through aliases, classified by a
//! pattern table with a pluggable fallback oracle, passed through a
//! middleware chain (logging, validation, cooldowns, rate limiting) and
//! dispatched to the highest-priority applicable handler.

pub mod command;
pub mod core;
pub mod handlers;
pub mod intent;
pub mod llm;
pub mod middleware;
pub mod parser;

pub use crate::command::{CommandProcessor, CommandResult, ContextSnapshot};
pub use crate::core::{CommandType, EngineConfig, GameMode};
