//! Built-in command families
//!
//! Handlers describe outcomes as `GameEvent`s; applying them to the game
//! world is left to the host.

pub mod combat;
pub mod cultivation;
pub mod info;
pub mod interaction;
pub mod items;
pub mod movement;
pub mod system;

use std::sync::Arc;

use crate::command::registry::HandlerRegistry;
use crate::core::error::Result;

pub use combat::CombatHandler;
pub use cultivation::CultivationHandler;
pub use info::InfoHandler;
pub use interaction::InteractionHandler;
pub use items::ItemHandler;
pub use movement::MovementHandler;
pub use system::SystemHandler;

/// Register every built-in family, system handler first
pub fn register_builtin_handlers(registry: &mut HandlerRegistry) -> Result<()> {
    registry.register(Arc::new(SystemHandler::new()))?;
    registry.register(Arc::new(CombatHandler::new()))?;
    registry.register(Arc::new(MovementHandler::new()))?;
    registry.register(Arc::new(InteractionHandler::new()))?;
    registry.register(Arc::new(CultivationHandler::new()))?;
    registry.register(Arc::new(ItemHandler::new()))?;
    registry.register(Arc::new(InfoHandler::new()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use crate::command::context::{CommandContext, ContextSnapshot};
    use crate::core::types::GameMode;
    use crate::intent::classifier::IntentClassifier;
    use crate::parser::command::ParsedCommand;
    use crate::parser::patterns::PatternTable;

    /// Context for `raw` as the default pattern table classifies it
    pub fn context(raw: &str, mode: GameMode) -> CommandContext {
        let classifier =
            IntentClassifier::new(PatternTable::with_defaults(), 0.5, Duration::from_secs(1));
        let command = classifier
            .match_patterns(raw)
            .unwrap_or_else(|| ParsedCommand::unknown(raw));
        CommandContext::new(command, raw, &ContextSnapshot::player("韩立").with_mode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_register_once() {
        let mut registry = HandlerRegistry::new();
        register_builtin_handlers(&mut registry).unwrap();
        assert_eq!(registry.len(), 7);
        assert!(register_builtin_handlers(&mut registry).is_err());
    }
}
