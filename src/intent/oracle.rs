//! Fallback oracle interface
//!
//! An oracle is consulted only after every pattern missed. It returns a
//! best-effort guess with a confidence; the classifier decides whether to
//! trust it.

use async_trait::async_trait;

use crate::core::error::Result;
use crate::intent::context::ContextHint;
use crate::parser::command::ParsedCommand;

#[async_trait]
pub trait IntentOracle: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Guess the command behind `text`
    ///
    /// Errors are never shown to the player; the classifier logs them and
    /// treats the input as unknown.
    async fn classify(&self, text: &str, hint: &ContextHint) -> Result<ParsedCommand>;
}
