//! Deterministic text parsing
//!
//! Raw input -> AliasResolver -> PatternTable -> ParsedCommand

pub mod alias;
pub mod command;
pub mod patterns;

pub use alias::AliasResolver;
pub use command::{ParsedCommand, PATTERN_CONFIDENCE};
pub use patterns::{FieldMapping, PatternMatch, PatternSpec, PatternTable};
