//! Middleware chain wrapping handler invocation
//!
//! Each middleware receives the context and a `Next` that runs the rest of
//! the chain. Returning without calling `next.run` short-circuits. The
//! terminal stage (handler selection and execution) is supplied per call.

pub mod cooldown;
pub mod logging;
pub mod rate_limit;
pub mod store;
pub mod validation;

use std::sync::Arc;

use crate::command::context::CommandContext;
use crate::command::result::CommandResult;
use crate::core::clock::Clock;
use crate::core::config::EngineConfig;

pub use cooldown::CooldownMiddleware;
pub use logging::LoggingMiddleware;
pub use rate_limit::RateLimitMiddleware;
pub use store::ThrottleStore;
pub use validation::{Permissions, ValidationMiddleware};

/// Final stage of the chain
pub type Terminal<'a> = dyn Fn(&mut CommandContext) -> CommandResult + 'a;

pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, ctx: &mut CommandContext, next: Next<'_>) -> CommandResult;
}

/// The remainder of the chain after the current middleware
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    terminal: &'a Terminal<'a>,
}

impl<'a> Next<'a> {
    pub fn run(self, ctx: &mut CommandContext) -> CommandResult {
        match self.rest.split_first() {
            Some((head, tail)) => head.process(
                ctx,
                Next {
                    rest: tail,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(ctx),
        }
    }
}

/// Ordered list of middlewares
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logging, validation, cooldown, rate limit
    pub fn standard(
        config: &EngineConfig,
        store: Arc<ThrottleStore>,
        clock: Arc<dyn Clock>,
        permissions: Permissions,
    ) -> Self {
        Self::new()
            .with(Arc::new(LoggingMiddleware::new()))
            .with(Arc::new(ValidationMiddleware::new(permissions)))
            .with(Arc::new(CooldownMiddleware::from_config(
                config,
                Arc::clone(&store),
                Arc::clone(&clock),
            )))
            .with(Arc::new(RateLimitMiddleware::from_config(config, store, clock)))
    }

    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.layers.push(middleware);
        self
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    /// Run every middleware in order, then `terminal`
    pub fn run(&self, ctx: &mut CommandContext, terminal: &Terminal<'_>) -> CommandResult {
        Next {
            rest: &self.layers,
            terminal,
        }
        .run(ctx)
    }

    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("layers", &self.names())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::context::ContextSnapshot;
    use crate::core::types::CommandType;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        block: bool,
    }

    impl Middleware for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn process(&self, ctx: &mut CommandContext, next: Next<'_>) -> CommandResult {
            self.log.lock().unwrap().push(format!("{}:before", self.name));
            let result = if self.block {
                CommandResult::failure("blocked")
            } else {
                next.run(ctx)
            };
            self.log.lock().unwrap().push(format!("{}:after", self.name));
            result
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>, block: bool) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            log: Arc::clone(log),
            block,
        })
    }

    #[test]
    fn test_chain_runs_in_order_around_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new()
            .with(recorder("outer", &log, false))
            .with(recorder("inner", &log, false));

        let terminal_log = Arc::clone(&log);
        let terminal = move |_: &mut CommandContext| {
            terminal_log.lock().unwrap().push("handler".into());
            CommandResult::ok("done")
        };
        let mut ctx = test_support::ctx(CommandType::Status, &ContextSnapshot::default());
        let result = chain.run(&mut ctx, &terminal);

        assert!(result.success);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:before", "inner:before", "handler", "inner:after", "outer:after"]
        );
    }

    #[test]
    fn test_short_circuit_skips_rest_but_unwinds_outer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new()
            .with(recorder("outer", &log, false))
            .with(recorder("gate", &log, true))
            .with(recorder("never", &log, false));

        let terminal = |_: &mut CommandContext| CommandResult::ok("unreachable");
        let mut ctx = test_support::ctx(CommandType::Status, &ContextSnapshot::default());
        let result = chain.run(&mut ctx, &terminal);

        assert!(!result.success);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:before", "gate:before", "gate:after", "outer:after"]
        );
    }

    #[test]
    fn test_standard_order() {
        let chain = MiddlewareChain::standard(
            &EngineConfig::default(),
            Arc::new(ThrottleStore::new()),
            Arc::new(crate::core::clock::SystemClock),
            Permissions::default(),
        );
        assert_eq!(chain.names(), vec!["logging", "validation", "cooldown", "rate_limit"]);
    }
}
