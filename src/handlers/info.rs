//! Read-only views: status, inventory, skills, map

use serde_json::json;

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
use crate::command::result::CommandResult;
use crate::core::types::CommandType;

/// Low-priority catch-all; anything more specific overrides it
pub struct InfoHandler {
    descriptor: HandlerDescriptor,
}

impl InfoHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new("info", HandlerPriority::Low)
                .handles(&[
                    CommandType::Status,
                    CommandType::Inventory,
                    CommandType::Skills,
                    CommandType::Map,
                ])
                .alias("查看")
                .alias("look"),
        }
    }
}

impl Default for InfoHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for InfoHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult {
        let actor = ctx.actor_name().to_string();
        let (view, message) = match ctx.command_type() {
            CommandType::Status => ("status", format!("{}的状态", actor)),
            CommandType::Inventory => ("inventory", format!("{}的背包", actor)),
            CommandType::Skills => ("skills", format!("{}掌握的技能", actor)),
            CommandType::Map => {
                let here = if ctx.location.is_empty() {
                    "未知之地".to_string()
                } else {
                    ctx.location.clone()
                };
                ("map", format!("当前位置: {}", here))
            }
            other => return CommandResult::failure(format!("无法处理 {}", other)),
        };

        CommandResult::ok(message)
            .with_data("view", json!(view))
            .with_data("location", json!(ctx.location))
            .with_data("game_mode", json!(ctx.game_mode))
    }

    fn help(&self) -> String {
        "info: 状态 / 背包 / 技能 / 地图（任何时候都可用）".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::GameMode;
    use crate::handlers::test_support::context;

    #[test]
    fn test_view_in_any_mode() {
        let handler = InfoHandler::new();
        for mode in [GameMode::Exploring, GameMode::Combat, GameMode::Dialogue, GameMode::Trading] {
            let mut ctx = context("状态", mode);
            assert!(handler.can_handle(&ctx));
            let result = handler.handle(&mut ctx);
            assert_eq!(result.data.get("view"), Some(&json!("status")));
        }
    }

    #[test]
    fn test_map_reports_location() {
        let mut ctx = context("地图", GameMode::Exploring);
        ctx.location = "青云城".into();
        let result = InfoHandler::new().handle(&mut ctx);
        assert_eq!(result.message.as_deref(), Some("当前位置: 青云城"));
    }
}
