//! Per-command-type cooldowns
//!
//! The slot is reserved before the handler runs so two concurrent
//! invocations cannot both pass the check; a failed command hands the slot
//! back, so only successes start a cooldown.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::command::context::CommandContext;
use crate::command::result::CommandResult;
use crate::core::clock::Clock;
use crate::core::config::EngineConfig;
use crate::core::error::CommandError;
use crate::core::types::CommandType;
use crate::middleware::store::ThrottleStore;
use crate::middleware::{Middleware, Next};

pub struct CooldownMiddleware {
    cooldowns: BTreeMap<CommandType, Duration>,
    store: Arc<ThrottleStore>,
    clock: Arc<dyn Clock>,
}

impl CooldownMiddleware {
    pub fn new(
        cooldowns: BTreeMap<CommandType, Duration>,
        store: Arc<ThrottleStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cooldowns,
            store,
            clock,
        }
    }

    pub fn from_config(config: &EngineConfig, store: Arc<ThrottleStore>, clock: Arc<dyn Clock>) -> Self {
        let cooldowns = config
            .cooldowns
            .keys()
            .filter_map(|&t| config.cooldown_for(t).map(|d| (t, d)))
            .collect();
        Self::new(cooldowns, store, clock)
    }

    pub fn cooldown_for(&self, command_type: CommandType) -> Option<Duration> {
        self.cooldowns.get(&command_type).copied()
    }
}

impl Middleware for CooldownMiddleware {
    fn name(&self) -> &str {
        "cooldown"
    }

    fn process(&self, ctx: &mut CommandContext, next: Next<'_>) -> CommandResult {
        let command_type = ctx.command_type();
        let Some(cooldown) = self.cooldown_for(command_type) else {
            return next.run(ctx);
        };

        let now = self.clock.now();
        let previous = match self.store.try_reserve_cooldown(command_type, cooldown, now) {
            Ok(previous) => previous,
            Err(retry_after) => {
                tracing::debug!(
                    "{} on cooldown for another {:.2}s",
                    command_type,
                    retry_after.as_secs_f64()
                );
                return CommandResult::from_error(&CommandError::CooldownActive {
                    command_type,
                    retry_after,
                });
            }
        };

        let result = next.run(ctx);
        if !result.success {
            self.store.release_cooldown(command_type, now, previous);
        }
        result
    }
}
