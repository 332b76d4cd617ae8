//! Handler registry and priority routing
//!
//! Selection for one invocation: handlers listed for the command type, minus
//! disabled ones, filtered by `can_handle`, highest priority wins and the
//! earliest registration breaks ties.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashMap;

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor};
use crate::core::error::{CommandError, EngineError, Result};
use crate::core::types::CommandType;

struct Entry {
    handler: Arc<dyn CommandHandler>,
    enabled: bool,
}

/// Runtime set of handlers, in registration order
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Entry>,
    /// Name -> position in `entries`
    by_name: AHashMap<String, usize>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler; names must be unique
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) -> Result<()> {
        let descriptor = handler.descriptor();
        let name = descriptor.name.clone();
        if self.by_name.contains_key(&name) {
            return Err(EngineError::DuplicateHandler(name));
        }

        tracing::debug!(
            "Registered handler '{}' ({:?}) for {:?}",
            name,
            descriptor.priority,
            descriptor.command_types
        );
        self.by_name.insert(name, self.entries.len());
        self.entries.push(Entry {
            enabled: descriptor.enabled,
            handler,
        });
        Ok(())
    }

    /// Remove a handler by name, returning it if it was registered
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        let index = self.by_name.remove(name)?;
        let entry = self.entries.remove(index);
        for position in self.by_name.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        tracing::debug!("Unregistered handler '{}'", name);
        Some(entry.handler)
    }

    /// Enable or disable a handler; false if no such handler exists
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.by_name.get(name) {
            Some(&index) => {
                self.entries[index].enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.by_name.get(name).map(|&index| self.entries[index].enabled)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.by_name
            .get(name)
            .map(|&index| Arc::clone(&self.entries[index].handler))
    }

    /// Pick the handler for this invocation
    pub fn select(
        &self,
        ctx: &CommandContext,
    ) -> std::result::Result<Arc<dyn CommandHandler>, CommandError> {
        let command_type = ctx.command_type();
        let mut best: Option<&Entry> = None;

        for entry in self.candidates(command_type) {
            if !entry.handler.can_handle(ctx) {
                continue;
            }
            let priority = entry.handler.descriptor().priority;
            // Strictly higher only, so earlier registrations keep ties
            let better = best
                .map(|b| priority.outranks(b.handler.descriptor().priority))
                .unwrap_or(true);
            if better {
                best = Some(entry);
            }
        }

        best.map(|entry| Arc::clone(&entry.handler))
            .ok_or(CommandError::NoApplicableHandler { command_type })
    }

    /// Enabled handlers listed for a command type, in registration order
    pub fn handlers_for(&self, command_type: CommandType) -> Vec<Arc<dyn CommandHandler>> {
        self.candidates(command_type)
            .map(|entry| Arc::clone(&entry.handler))
            .collect()
    }

    /// Descriptors of enabled handlers, in registration order
    pub fn descriptors(&self) -> Vec<&HandlerDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.handler.descriptor())
            .collect()
    }

    /// Enabled handlers with their help text
    pub fn help_entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| (e.handler.descriptor().name.clone(), e.handler.help()))
            .collect()
    }

    /// Handler names and aliases usable as suggestions
    pub fn suggestion_words(&self) -> BTreeSet<String> {
        self.descriptors()
            .into_iter()
            .flat_map(|d| std::iter::once(d.name.clone()).chain(d.aliases.iter().cloned()))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.handler.descriptor().name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn candidates(&self, command_type: CommandType) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| {
            e.enabled && e.handler.descriptor().command_types.contains(&command_type)
        })
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::context::ContextSnapshot;
    use crate::command::handler::HandlerPriority;
    use crate::command::result::CommandResult;
    use crate::core::types::GameMode;
    use crate::parser::command::ParsedCommand;
    use std::collections::BTreeMap;

    struct Stub {
        descriptor: HandlerDescriptor,
        only_in: Option<GameMode>,
    }

    impl Stub {
        fn new(name: &str, priority: HandlerPriority) -> Arc<Self> {
            Arc::new(Self {
                descriptor: HandlerDescriptor::new(name, priority)
                    .handles(&[CommandType::Status]),
                only_in: None,
            })
        }

        fn in_mode(name: &str, priority: HandlerPriority, mode: GameMode) -> Arc<Self> {
            Arc::new(Self {
                descriptor: HandlerDescriptor::new(name, priority)
                    .handles(&[CommandType::Status]),
                only_in: Some(mode),
            })
        }
    }

    impl CommandHandler for Stub {
        fn descriptor(&self) -> &HandlerDescriptor {
            &self.descriptor
        }

        fn can_handle(&self, ctx: &CommandContext) -> bool {
            self.only_in.map_or(true, |mode| ctx.game_mode == mode)
        }

        fn handle(&self, _ctx: &mut CommandContext) -> CommandResult {
            CommandResult::ok(self.descriptor.name.clone())
        }
    }

    fn status_ctx(mode: GameMode) -> CommandContext {
        let cmd = ParsedCommand::new(CommandType::Status, None, BTreeMap::new(), "状态", 0.9);
        CommandContext::new(cmd, "状态", &ContextSnapshot::player("韩立").with_mode(mode))
    }

    fn selected(registry: &HandlerRegistry, mode: GameMode) -> String {
        registry
            .select(&status_ctx(mode))
            .map(|h| h.descriptor().name.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_highest_priority_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register(Stub::new("catch_all", HandlerPriority::Low)).unwrap();
        registry.register(Stub::new("override", HandlerPriority::System)).unwrap();
        assert_eq!(selected(&registry, GameMode::Exploring), "override");
    }

    #[test]
    fn test_ties_go_to_earliest_registration() {
        let mut registry = HandlerRegistry::new();
        registry.register(Stub::new("first", HandlerPriority::Normal)).unwrap();
        registry.register(Stub::new("second", HandlerPriority::Normal)).unwrap();
        assert_eq!(selected(&registry, GameMode::Exploring), "first");
    }

    #[test]
    fn test_can_handle_filters_before_priority() {
        let mut registry = HandlerRegistry::new();
        registry.register(Stub::new("general", HandlerPriority::Low)).unwrap();
        registry
            .register(Stub::in_mode("combat_view", HandlerPriority::High, GameMode::Combat))
            .unwrap();
        assert_eq!(selected(&registry, GameMode::Exploring), "general");
        assert_eq!(selected(&registry, GameMode::Combat), "combat_view");
    }

    #[test]
    fn test_no_survivor_is_no_applicable_handler() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Stub::in_mode("combat_view", HandlerPriority::High, GameMode::Combat))
            .unwrap();
        let err = registry.select(&status_ctx(GameMode::Exploring)).err();
        assert_eq!(
            err,
            Some(CommandError::NoApplicableHandler {
                command_type: CommandType::Status
            })
        );
    }

    #[test]
    fn test_disable_and_unregister() {
        let mut registry = HandlerRegistry::new();
        registry.register(Stub::new("a", HandlerPriority::Low)).unwrap();
        registry.register(Stub::new("b", HandlerPriority::High)).unwrap();
        registry.register(Stub::new("c", HandlerPriority::Normal)).unwrap();

        assert!(registry.set_enabled("b", false));
        assert_eq!(selected(&registry, GameMode::Exploring), "c");
        assert_eq!(registry.descriptors().len(), 2);

        assert!(registry.unregister("c").is_some());
        assert_eq!(selected(&registry, GameMode::Exploring), "a");
        assert!(registry.set_enabled("b", true));
        assert_eq!(selected(&registry, GameMode::Exploring), "b");
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(!registry.set_enabled("c", true));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register(Stub::new("a", HandlerPriority::Low)).unwrap();
        let result = registry.register(Stub::new("a", HandlerPriority::High));
        assert!(matches!(result, Err(EngineError::DuplicateHandler(name)) if name == "a"));
        assert_eq!(registry.len(), 1);
    }
}
