//! Combat actions, only meaningful while a fight is on

use crate::command::context::CommandContext;
use crate::command::handler::{CommandHandler, HandlerDescriptor, HandlerPriority};
use crate::command::result::{CommandResult, GameEvent};
use crate::core::types::{CommandType, GameMode};

pub struct CombatHandler {
    descriptor: HandlerDescriptor,
}

impl CombatHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new("combat", HandlerPriority::High)
                .handles(&[
                    CommandType::Attack,
                    CommandType::UseSkill,
                    CommandType::Defend,
                    CommandType::Flee,
                ])
                .alias("战斗")
                .alias("fight"),
        }
    }
}

impl Default for CombatHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHandler for CombatHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, ctx: &CommandContext) -> bool {
        ctx.game_mode == GameMode::Combat
    }

    fn validate(&self, ctx: &CommandContext) -> Result<(), String> {
        if ctx.command_type() == CommandType::UseSkill && ctx.command.param("skill").is_none() {
            return Err("请指定要使用的技能".into());
        }
        Ok(())
    }

    fn handle(&self, ctx: &mut CommandContext) -> CommandResult {
        let actor = ctx.actor_name().to_string();
        let target = ctx.command.target.clone();
        let target_text = target.as_deref().unwrap_or("眼前的敌人");

        match ctx.command_type() {
            CommandType::Attack => CommandResult::ok(format!("{}向{}发起攻击", actor, target_text))
                .with_event(GameEvent::AttackDeclared { target }),
            CommandType::UseSkill => {
                let skill = ctx.command.param("skill").unwrap_or_default().to_string();
                CommandResult::ok(format!("{}对{}施展了{}", actor, target_text, skill))
                    .with_event(GameEvent::SkillCast { skill, target })
            }
            CommandType::Defend => {
                CommandResult::ok(format!("{}摆出防御姿态", actor)).with_event(GameEvent::Defended)
            }
            CommandType::Flee => CommandResult::ok(format!("{}试图脱离战斗", actor))
                .with_event(GameEvent::FleeAttempted),
            other => CommandResult::failure(format!("战斗中无法处理 {}", other)),
        }
    }

    fn help(&self) -> String {
        "combat: 攻击 [目标] / 使用 [技能] 攻击 [目标] / 防御 / 逃跑（仅限战斗中）".into()
    }
}
