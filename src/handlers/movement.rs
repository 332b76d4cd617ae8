//! Travel and exploration outside of combat

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
use crate::command::result::{CommandResult, GameEvent, InverseAction};
use crate::core::types::{CommandType, GameMode};

pub struct MovementHandler {
    descriptor: HandlerDescriptor,
}

impl MovementHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new("movement", HandlerPriority::Normal)
                .handles(&[CommandType::Move, CommandType::Explore])
                .alias("移动"),
        }
    }

    fn destination(ctx: &CommandContext) -> Option<&str> {
        ctx.command.target_or_param(&["location"])
    }
}

impl Default for MovementHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for MovementHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, ctx: &CommandContext) -> bool {
        match ctx.game_mode {
            GameMode::Combat => false,
            // Looking around mid-conversation is fine, walking off is not
            GameMode::Dialogue => ctx.command_type() == CommandType::Explore,
            GameMode::Exploring | GameMode::Trading => true,
        }
    }

    fn validate(&self, ctx: &CommandContext) -> Result<(), String> {
        if ctx.command_type() == CommandType::Move {
            match Self::destination(ctx) {
                None => return Err("要去哪里？".into()),
                Some(to) if to == ctx.location => return Err(format!("你已经在{}了", to)),
                _ => {}
            }
        }
        Ok(())
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult {
        match ctx.command_type() {
            CommandType::Move => {
                let to = Self::destination(ctx).unwrap_or_default().to_string();
                let from = ctx.location.clone();
                let mut result = CommandResult::ok(format!("你来到了{}", to)).with_event(
                    GameEvent::Moved {
                        from: from.clone(),
                        to,
                    },
                );
                if !from.is_empty() {
                    result = result.with_inverse(
                        InverseAction::new(CommandType::Move, format!("前往 {}", from))
                            .with_param("location", from),
                    );
                }
                result
            }
            CommandType::Explore => {
                let focus = ctx.command.target.clone();
                let location = ctx.location.clone();
                let message = match &focus {
                    Some(f) => format!("你仔细查看了{}", f),
                    None if location.is_empty() => "你四处探索了一番".to_string(),
                    None => format!("你在{}四处探索了一番", location),
                };
                CommandResult::ok(message).with_event(GameEvent::Explored { location, focus })
            }
            other => CommandResult::failure(format!("无法处理 {}", other)),
        }
    }

    fn help(&self) -> String {
        "movement: 前往 [地点] / 探索（战斗中不可用，对话中不能离开）".into()
    }
}
