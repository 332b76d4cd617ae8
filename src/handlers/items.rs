//! Picking up, using and (un)equipping items

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
use crate::command::result::{CommandResult, GameEvent, InverseAction};
use crate::core::types::{CommandType, GameMode};

pub struct ItemHandler {
    descriptor: HandlerDescriptor,
}

impl ItemHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new("items", HandlerPriority::Normal)
                .handles(&[
                    CommandType::PickUp,
                    CommandType::UseItem,
                    CommandType::Equip,
                    CommandType::Unequip,
                ])
                .alias("物品"),
        }
    }

    fn item(ctx: &CommandContext) -> Option<&str> {
        ctx.command.target_or_param(&["item"])
    }
}

impl Default for ItemHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for ItemHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    /// Gear changes are not possible mid-fight
    fn can_handle(&self, ctx: &CommandContext) -> bool {
        match ctx.command_type() {
            CommandType::Equip | CommandType::Unequip => ctx.game_mode != GameMode::Combat,
            _ => true,
        }
    }

    fn validate(&self, ctx: &CommandContext) -> Result<(), String> {
        if Self::item(ctx).is_none() {
            return Err("请指定物品".into());
        }
        Ok(())
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult {
        let item = Self::item(ctx).unwrap_or_default().to_string();
        match ctx.command_type() {
            CommandType::PickUp => CommandResult::ok(format!("你拾取了{}", item))
                .with_event(GameEvent::ItemPicked { item }),
            CommandType::UseItem => CommandResult::ok(format!("你使用了{}", item))
                .with_event(GameEvent::ItemUsed { item }),
            CommandType::Equip => CommandResult::ok(format!("你装备了{}", item))
                .with_inverse(
                    InverseAction::new(CommandType::Unequip, format!("卸下 {}", item))
                        .with_param("item", item.clone()),
                )
                .with_event(GameEvent::ItemEquipped { item }),
            CommandType::Unequip => CommandResult::ok(format!("你卸下了{}", item))
                .with_inverse(
                    InverseAction::new(CommandType::Equip, format!("装备 {}", item))
                        .with_param("item", item.clone()),
                )
                .with_event(GameEvent::ItemUnequipped { item }),
            other => CommandResult::failure(format!("无法处理 {}", other)),
        }
    }

    fn help(&self) -> String {
        "items: 拾取 / 使用 / 装备 / 卸下 [物品]（战斗中不能更换装备）".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::context;

    #[test]
    fn test_equip_is_reversible() {
        let mut ctx = context("装备 青锋剑", GameMode::Exploring);
        let result = ItemHandler::new().handle(&mut ctx);
        assert!(result.success);
        let inverse = result.inverse.unwrap();
        assert_eq!(inverse.command_type, CommandType::Unequip);
        assert_eq!(inverse.raw_input, "卸下 青锋剑");
    }

    #[test]
    fn test_no_gear_changes_in_combat() {
        let handler = ItemHandler::new();
        assert!(!handler.can_handle(&context("装备 青锋剑", GameMode::Combat)));
        assert!(handler.can_handle(&context("服用 气血药水", GameMode::Combat)));
    }

    #[test]
    fn test_use_item_has_no_inverse() {
        let mut ctx = context("服用 气血药水", GameMode::Combat);
        let result = ItemHandler::new().handle(&mut ctx);
        assert!(result.inverse.is_none());
        assert_eq!(result.events, vec![GameEvent::ItemUsed { item: "气血药水".into() }]);
    }
}
