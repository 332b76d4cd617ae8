//! Meta commands: save, load, quit, help

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
use crate::command::result::{CommandResult, GameEvent};
use crate::core::types::{CommandType, GameMode};

pub struct SystemHandler {
    descriptor: HandlerDescriptor,
}

impl SystemHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new("system", HandlerPriority::System)
                .handles(&[
                    CommandType::Save,
                    CommandType::Load,
                    CommandType::Quit,
                    CommandType::Help,
                ])
                .alias("系统")
                .alias("menu"),
        }
    }

    /// One line per command type with its Chinese and English verbs
    fn command_list() -> String {
        let mut lines = vec!["可用命令:".to_string()];
        for command_type in CommandType::ALL {
            let keywords = command_type.keywords();
            if keywords.is_empty() {
                continue;
            }
            lines.push(format!("  {:<14} {}", command_type.as_str(), keywords.join(" / ")));
        }
        lines.join("\n")
    }
}

impl Default for SystemHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for SystemHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn validate(&self, ctx: &CommandContext) -> Result<(), String> {
        if ctx.command_type() == CommandType::Save && ctx.game_mode == GameMode::Combat {
            return Err("战斗中无法保存".into());
        }
        Ok(())
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult {
        let slot = ctx.command.param("name").map(str::to_string);
        match ctx.command_type() {
            CommandType::Save => {
                let message = match &slot {
                    Some(name) => format!("游戏已保存到 {}", name),
                    None => "游戏已保存".to_string(),
                };
                CommandResult::ok(message).with_event(GameEvent::SaveRequested { slot })
            }
            CommandType::Load => {
                let message = match &slot {
                    Some(name) => format!("正在读取存档 {}", name),
                    None => "正在读取最近的存档".to_string(),
                };
                CommandResult::ok(message).with_event(GameEvent::LoadRequested { slot })
            }
            CommandType::Quit => CommandResult::ok("再见，道友")
                .with_event(GameEvent::QuitRequested)
                .halt(),
            CommandType::Help => CommandResult::ok(Self::command_list()),
            other => CommandResult::failure(format!("无法处理 {}", other)),
        }
    }

    fn help(&self) -> String {
        "system: 保存 [存档名] / 读取 [存档名] / 退出 / 帮助".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::context;

    #[test]
    fn test_quit_halts() {
        let mut ctx = context("退出", GameMode::Exploring);
        let result = SystemHandler::new().handle(&mut ctx);
        assert!(result.success);
        assert!(!result.continue_processing);
    }

    #[test]
    fn test_save_refused_in_combat() {
        let handler = SystemHandler::new();
        assert!(handler.validate(&context("保存", GameMode::Combat)).is_err());
        assert!(handler.validate(&context("保存", GameMode::Trading)).is_ok());
    }

    #[test]
    fn test_help_lists_every_command() {
        let mut ctx = context("帮助", GameMode::Exploring);
        let result = SystemHandler::new().handle(&mut ctx);
        let text = result.message.unwrap();
        assert!(text.contains("attack"));
        assert!(text.contains("修炼"));
        assert!(!text.contains("unknown"));
    }

    #[test]
    fn test_save_slot_name() {
        let mut ctx = context("保存 slot1", GameMode::Exploring);
        let result = SystemHandler::new().handle(&mut ctx);
        assert_eq!(
            result.events,
            vec![GameEvent::SaveRequested {
                slot: Some("slot1".into())
            }]
        );
    }
}
