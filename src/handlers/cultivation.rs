//! Cultivation, skill learning and breakthroughs, only while exploring

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
use crate::command::result::{CommandResult, GameEvent};
use crate::core::types::{CommandType, GameMode};

pub struct CultivationHandler {
    descriptor: HandlerDescriptor,
}

impl CultivationHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new("cultivation", HandlerPriority::Normal)
                .handles(&[
                    CommandType::Cultivate,
                    CommandType::LearnSkill,
                    CommandType::Breakthrough,
                ])
                .alias("打坐")
                .alias("闭关"),
        }
    }
}

impl Default for CultivationHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for CultivationHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, ctx: &CommandContext) -> bool {
        ctx.game_mode == GameMode::Exploring
    }

    fn validate(&self, ctx: &CommandContext) -> Result<(), String> {
        if ctx.command_type() == CommandType::LearnSkill && ctx.command.param("skill").is_none() {
            return Err("要学习什么功法？".into());
        }
        Ok(())
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult {
        let actor = ctx.actor_name().to_string();
        match ctx.command_type() {
            CommandType::Cultivate => {
                let duration = ctx.command.param("duration").map(str::to_string);
                let resting = ctx.command.param("action") == Some("rest");
                let verb = if resting { "休息" } else { "修炼" };
                let message = match &duration {
                    Some(d) => format!("{}开始{}，为期{}", actor, verb, d),
                    None => format!("{}开始{}", actor, verb),
                };
                CommandResult::ok(message)
                    .with_event(GameEvent::CultivationStarted { duration, resting })
            }
            CommandType::LearnSkill => {
                let skill = ctx.command.param("skill").unwrap_or_default().to_string();
                CommandResult::ok(format!("{}开始参悟{}", actor, skill))
                    .with_event(GameEvent::SkillLearned { skill })
            }
            CommandType::Breakthrough => CommandResult::ok(format!("{}尝试冲击瓶颈", actor))
                .with_event(GameEvent::BreakthroughAttempted),
            other => CommandResult::failure(format!("无法处理 {}", other)),
        }
    }

    fn help(&self) -> String {
        "cultivation: 修炼 [时长] / 学习 [功法] / 突破（仅限探索中）".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::context::ContextSnapshot;
    use crate::handlers::test_support::context;
    use crate::parser::command::ParsedCommand;
    use std::collections::BTreeMap;

    #[test]
    fn test_cultivate_with_duration() {
        let mut ctx = context("修炼100天", GameMode::Exploring);
        let result = CultivationHandler::new().handle(&mut ctx);
        assert!(result.success);
        assert_eq!(
            result.events,
            vec![GameEvent::CultivationStarted {
                duration: Some("100天".into()),
                resting: false
            }]
        );
    }

    #[test]
    fn test_exploring_only() {
        let handler = CultivationHandler::new();
        assert!(!handler.can_handle(&context("修炼", GameMode::Combat)));
        assert!(!handler.can_handle(&context("修炼", GameMode::Trading)));
    }

    #[test]
    fn test_learning_needs_a_skill() {
        let handler = CultivationHandler::new();
        assert!(handler.validate(&context("学习 御剑术", GameMode::Exploring)).is_ok());

        let bare = ParsedCommand::new(CommandType::LearnSkill, None, BTreeMap::new(), "学习", 0.9);
        let ctx = CommandContext::new(bare, "学习", &ContextSnapshot::player("韩立"));
        assert_eq!(handler.validate(&ctx), Err("要学习什么功法？".to_string()));
    }
}
