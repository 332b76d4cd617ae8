//! Sliding-window rate limiting per actor

use std::sync::Arc;
use std::time::Duration;

use crate::command::context::CommandContext;
use crate::command::result::CommandResult;
use crate::core::clock::Clock;
use crate::core::config::EngineConfig;
use crate::core::error::CommandError;
use crate::middleware::store::ThrottleStore;
use crate::middleware::{Middleware, Next};

/// Window key used when the invocation has no actor
pub const GLOBAL_KEY: &str = "global";

pub struct RateLimitMiddleware {
    max_commands: usize,
    window: Duration,
    store: Arc<ThrottleStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimitMiddleware {
    pub fn new(
        max_commands: usize,
        window: Duration,
        store: Arc<ThrottleStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            max_commands,
            window,
            store,
            clock,
        }
    }

    pub fn from_config(config: &EngineConfig, store: Arc<ThrottleStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.rate_limit.max_commands,
            config.rate_limit.window(),
            store,
            clock,
        )
    }

    pub fn key_for(ctx: &CommandContext) -> String {
        ctx.actor
            .as_ref()
            .map(|a| a.id.to_string())
            .unwrap_or_else(|| GLOBAL_KEY.to_string())
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &str {
        "rate_limit"
    }

    fn process(&self, ctx: &mut CommandContext, next: Next<'_>) -> CommandResult {
        let key = Self::key_for(ctx);
        let now = self.clock.now();
        match self.store.try_admit(&key, self.max_commands, self.window, now) {
            Ok(_) => next.run(ctx),
            Err(retry_after) => {
                tracing::warn!(
                    "Rate limit hit for {} ({} per {:?})",
                    ctx.actor_name(),
                    self.max_commands,
                    self.window
                );
                CommandResult::from_error(&CommandError::RateLimited {
                    max_commands: self.max_commands,
                    window_secs: self.window.as_secs_f64(),
                    retry_after,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::context::ContextSnapshot;
    use crate::core::clock::ManualClock;
    use crate::core::types::CommandType;
    use crate::middleware::test_support::ctx;
    use crate::middleware::MiddlewareChain;

    fn chain(clock: Arc<ManualClock>) -> MiddlewareChain {
        let config = EngineConfig::default().with_rate_limit(3, 10.0);
        MiddlewareChain::new().with(Arc::new(RateLimitMiddleware::from_config(
            &config,
            Arc::new(ThrottleStore::new()),
            clock,
        )))
    }

    fn run(chain: &MiddlewareChain, snapshot: &ContextSnapshot) -> CommandResult {
        let mut ctx = ctx(CommandType::Status, snapshot);
        chain.run(&mut ctx, &|_: &mut CommandContext| CommandResult::ok("ok"))
    }

    #[test]
    fn test_window_limits_each_actor() {
        let clock = Arc::new(ManualClock::new());
        let chain = chain(clock.clone());
        let alice = ContextSnapshot::player("韩立");
        let bob = ContextSnapshot::player("南宫婉");

        for _ in 0..3 {
            assert!(run(&chain, &alice).success);
            clock.advance_secs(1.0);
        }
        let rejected = run(&chain, &alice);
        assert_eq!(rejected.error_kind(), Some("throttle_rejected"));
        assert!((rejected.retry_after_secs().unwrap() - 7.0).abs() < 1e-6);
        assert!(run(&chain, &bob).success);

        clock.advance_secs(7.0);
        assert!(run(&chain, &alice).success);
    }

    #[test]
    fn test_actorless_commands_share_global_window() {
        let clock = Arc::new(ManualClock::new());
        let chain = chain(clock);
        let nobody = ContextSnapshot::default();
        for _ in 0..3 {
            assert!(run(&chain, &nobody).success);
        }
        assert!(!run(&chain, &nobody).success);
    }
}
