//! Talking and trading with NPCs

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
use crate::command::result::{CommandResult, GameEvent};
use crate::core::types::{CommandType, GameMode};

pub struct InteractionHandler {
    descriptor: HandlerDescriptor,
}

impl InteractionHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new("interaction", HandlerPriority::Normal)
                .handles(&[CommandType::Talk, CommandType::Trade])
                .alias("对话")
                .alias("商店"),
        }
    }
}

impl Default for InteractionHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for InteractionHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, ctx: &CommandContext) -> bool {
        match ctx.command_type() {
            CommandType::Talk => ctx.game_mode != GameMode::Combat,
            CommandType::Trade => {
                matches!(ctx.game_mode, GameMode::Trading | GameMode::Exploring)
            }
            _ => false,
        }
    }

    fn validate(&self, ctx: &CommandContext) -> Result<(), String> {
        if ctx.command_type() == CommandType::Talk
            && ctx.command.target_or_param(&["npc"]).is_none()
        {
            return Err("要和谁说话？".into());
        }
        Ok(())
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult {
        let target = ctx.command.target_or_param(&["npc"]).map(str::to_string);
        match ctx.command_type() {
            CommandType::Talk => {
                let npc = target.unwrap_or_default();
                CommandResult::ok(format!("你开始与{}交谈", npc))
                    .with_event(GameEvent::TalkStarted { npc })
            }
            CommandType::Trade => {
                let message = match &target {
                    Some(merchant) => format!("{}向你展示了货物", merchant),
                    None => "你打开了交易界面".to_string(),
                };
                CommandResult::ok(message).with_event(GameEvent::TradeOpened { merchant: target })
            }
            other => CommandResult::failure(format!("无法处理 {}", other)),
        }
    }

    fn help(&self) -> String {
        "interaction: 和 [NPC] 交谈 / 和 [NPC] 交易（交易仅限探索或交易中）".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::context;

    #[test]
    fn test_mode_rules() {
        let handler = InteractionHandler::new();
        assert!(handler.can_handle(&context("和 掌柜 交谈", GameMode::Dialogue)));
        assert!(!handler.can_handle(&context("和 掌柜 交谈", GameMode::Combat)));
        assert!(handler.can_handle(&context("和 掌柜 交易", GameMode::Trading)));
        assert!(!handler.can_handle(&context("和 掌柜 交易", GameMode::Dialogue)));
    }

    #[test]
    fn test_talk_names_the_npc() {
        let mut ctx = context("和 掌柜 交谈", GameMode::Exploring);
        let handler = InteractionHandler::new();
        assert!(handler.validate(&ctx).is_ok());
        let result = handler.handle(&mut ctx);
        assert_eq!(result.events, vec![GameEvent::TalkStarted { npc: "掌柜".into() }]);
    }
}
