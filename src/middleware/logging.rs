//! Start/end records for every invocation

use std::time::Instant;

use crate::command::context::CommandContext;
use crate::command::result::CommandResult;
use crate::middleware::{Middleware, Next};

/// Outermost layer, so short-circuits further in still get an end record
#[derive(Debug, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn process(&self, ctx: &mut CommandContext, next: Next<'_>) -> CommandResult {
        let command_type = ctx.command_type();
        let started = Instant::now();
        tracing::info!(
            "Command start: '{}' -> {} (source: {}, mode: {:?})",
            ctx.raw_input,
            command_type,
            ctx.source,
            ctx.game_mode
        );

        let result = next.run(ctx);

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        if result.success {
            tracing::info!(
                "Command end: {} succeeded in {:.2}ms",
                command_type,
                duration_ms
            );
        } else {
            tracing::info!(
                "Command end: {} failed in {:.2}ms: {}",
                command_type,
                duration_ms,
                result.error.as_deref().unwrap_or("")
            );
        }
        result
    }
}
