//! Precondition checks: source permissions, actor presence and capability,
//! game-mode restrictions

use std::collections::{BTreeSet, HashMap};

use crate::command::context::CommandContext;
use crate::command::result::CommandResult;
use crate::core::error::CommandError;
use crate::core::types::{CommandSource, CommandType, GameMode};
use crate::middleware::{Middleware, Next};

/// Which command types each source may issue
///
/// Sources without an entry are unrestricted.
#[derive(Debug, Clone, PartialEq)]
pub struct Permissions {
    restricted: HashMap<CommandSource, BTreeSet<CommandType>>,
}

impl Default for Permissions {
    /// Players and the system may do anything; NPCs may only talk and trade
    fn default() -> Self {
        Self::unrestricted().restrict(CommandSource::Npc, &[CommandType::Talk, CommandType::Trade])
    }
}

impl Permissions {
    pub fn unrestricted() -> Self {
        Self {
            restricted: HashMap::new(),
        }
    }

    /// Limit `source` to exactly `allowed`
    pub fn restrict(mut self, source: CommandSource, allowed: &[CommandType]) -> Self {
        self.restricted
            .insert(source, allowed.iter().copied().collect());
        self
    }

    pub fn allows(&self, source: CommandSource, command_type: CommandType) -> bool {
        self.restricted
            .get(&source)
            .map_or(true, |allowed| allowed.contains(&command_type))
    }
}

#[derive(Debug, Default)]
pub struct ValidationMiddleware {
    permissions: Permissions,
}

impl ValidationMiddleware {
    pub fn new(permissions: Permissions) -> Self {
        Self { permissions }
    }

    fn check(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let command_type = ctx.command_type();

        if !self.permissions.allows(ctx.source, command_type) {
            return Err(CommandError::PermissionDenied {
                command_type,
                source_kind: ctx.source,
            });
        }

        match &ctx.actor {
            None if command_type.requires_actor() => {
                return Err(CommandError::ValidationFailed(
                    "没有可以执行该命令的角色".into(),
                ))
            }
            Some(actor) if actor.incapacitated && !command_type.allowed_when_incapacitated() => {
                return Err(CommandError::ValidationFailed(format!(
                    "{}现在无法行动",
                    actor.name
                )))
            }
            _ => {}
        }

        if !command_type.allowed_in(ctx.game_mode) {
            let situation = match ctx.game_mode {
                GameMode::Combat => "战斗中",
                GameMode::Dialogue => "对话中",
                _ => "现在",
            };
            return Err(CommandError::ValidationFailed(format!(
                "{}无法执行此命令",
                situation
            )));
        }
        Ok(())
    }
}

impl Middleware for ValidationMiddleware {
    fn name(&self) -> &str {
        "validation"
    }

    fn process(&self, ctx: &mut CommandContext, next: Next<'_>) -> CommandResult {
        match self.check(ctx) {
            Ok(()) => next.run(ctx),
            Err(err) => {
                tracing::debug!("Validation rejected {}: {}", ctx.command_type(), err);
                CommandResult::from_error(&err)
            }
        }
    }
}
