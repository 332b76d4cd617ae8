//! LLM-backed fallback oracle
//!
//! Asks a chat model to map free-form input onto one of the known command
//! types. The model's reply is parsed leniently: surrounding prose is
//! ignored and unknown command names collapse to `Unknown`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::error::{EngineError, Result};
use crate::core::types::CommandType;
use crate::intent::context::ContextHint;
use crate::intent::oracle::IntentOracle;
use crate::llm::client::LlmClient;
use crate::parser::command::ParsedCommand;

/// Raw reply shape requested from the model
#[derive(Debug, Clone, Deserialize)]
struct LlmGuess {
    command: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Fallback oracle that delegates to an `LlmClient`
pub struct LlmOracle {
    client: LlmClient,
}

impl LlmOracle {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    fn user_prompt(text: &str, hint: &ContextHint) -> String {
        format!(
            "CONTEXT:\n{}\nPLAYER INPUT:\n{}\n\nClassify this command as JSON:",
            hint.summary(),
            text
        )
    }
}

#[async_trait]
impl IntentOracle for LlmOracle {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, text: &str, hint: &ContextHint) -> Result<ParsedCommand> {
        let response = self
            .client
            .complete(CLASSIFY_SYSTEM_PROMPT, &Self::user_prompt(text, hint))
            .await?;
        parse_response(text, &response)
    }
}

/// Turn a model reply into a command for `text`
fn parse_response(text: &str, response: &str) -> Result<ParsedCommand> {
    let json_str = extract_json(response)?;
    let guess: LlmGuess = serde_json::from_str(json_str).map_err(|e| {
        EngineError::LlmError(format!(
            "Failed to parse guess: {} - Response: {}",
            e, response
        ))
    })?;

    let Some(command_type) = CommandType::from_name(&guess.command) else {
        tracing::debug!("LLM returned unrecognised command '{}'", guess.command);
        return Ok(ParsedCommand::unknown(text));
    };

    let parameters = guess
        .parameters
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, value))
        })
        .collect();

    Ok(ParsedCommand::new(
        command_type,
        guess.target,
        parameters,
        text,
        guess.confidence,
    ))
}

/// Extract JSON object from LLM response (handles surrounding text)
fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| EngineError::LlmError("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| EngineError::LlmError("No closing brace found in response".into()))?;
    Ok(&response[start..=end])
}

/// System prompt for command classification
const CLASSIFY_SYSTEM_PROMPT: &str = r#"你是"修仙世界"游戏的命令解析器。把玩家的中文自然语言指令归类为下列命令之一，并提取参数。

AVAILABLE COMMANDS:
- ATTACK: 攻击目标 (target)
- USE_SKILL: 施展技能 (skill, target)
- DEFEND / FLEE: 战斗中防御 / 逃跑
- MOVE: 前往某地 (location)
- EXPLORE: 探索周围
- TALK / TRADE: 与NPC交谈 / 交易 (target)
- PICK_UP: 拾取物品 (item)
- CULTIVATE: 修炼、打坐、休息 (duration)
- LEARN_SKILL / BREAKTHROUGH: 学习功法 / 突破境界
- USE_ITEM / EQUIP / UNEQUIP: 使用 / 装备 / 卸下物品 (item)
- STATUS / INVENTORY / SKILLS / MAP: 查看状态 / 背包 / 技能 / 地图
- SAVE / LOAD / QUIT / HELP
- UNKNOWN: 无法判断

OUTPUT FORMAT (JSON only, no explanation):
{
  "command": "COMMAND_TYPE",
  "target": "target name or null",
  "parameters": {"duration": "...", "location": "...", "item": "...", "skill": "..."},
  "confidence": 0.0-1.0
}

Examples:
"四处探索一下" -> {"command": "EXPLORE", "target": null, "parameters": {}, "confidence": 0.9}
"我想休息一个时辰" -> {"command": "CULTIVATE", "target": null, "parameters": {"duration": "1时辰"}, "confidence": 0.85}
"打开一下背包看看" -> {"command": "INVENTORY", "target": null, "parameters": {}, "confidence": 0.9}
"给那只狼来一剑" -> {"command": "ATTACK", "target": "狼", "parameters": {}, "confidence": 0.8}
"今天天气不错" -> {"command": "UNKNOWN", "target": null, "parameters": {}, "confidence": 0.1}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_simple() {
        let response = r#"{"command": "ATTACK", "target": "妖兽"}"#;
        let json = extract_json(response).unwrap();
        assert_eq!(json, response);
    }

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let response = r#"Here is the classification:
{"command": "EXPLORE", "target": null, "parameters": {}, "confidence": 0.9}
Let me know if you need anything else."#;
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.ends_with('}'));
        assert!(json.contains("EXPLORE"));
    }

    #[test]
    fn test_extract_json_no_json() {
        assert!(extract_json("I don't understand that command").is_err());
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn test_parse_full_response() {
        let response = r#"{
            "command": "CULTIVATE",
            "target": null,
            "parameters": {"duration": "1时辰", "rounds": 3, "note": null},
            "confidence": 0.85
        }"#;
        let cmd = parse_response("我想休息一个时辰", response).unwrap();
        assert_eq!(cmd.command_type, CommandType::Cultivate);
        assert_eq!(cmd.param("duration"), Some("1时辰"));
        assert_eq!(cmd.param("rounds"), Some("3"));
        assert_eq!(cmd.param("note"), None);
        assert_eq!(cmd.raw_text, "我想休息一个时辰");
        assert!((cmd.confidence - 0.85).abs() < 0.001);
    }

    #[test]
    fn test_unrecognised_command_is_unknown() {
        let response = r#"{"command": "DANCE", "confidence": 0.99}"#;
        let cmd = parse_response("跳个舞", response).unwrap();
        assert!(cmd.is_unknown());
        assert_eq!(cmd.confidence, 0.0);
    }

    #[test]
    fn test_command_names_are_case_insensitive() {
        let response = r#"{"command": "use_skill", "target": "狼", "confidence": 0.7}"#;
        let cmd = parse_response("给狼一记剑气", response).unwrap();
        assert_eq!(cmd.command_type, CommandType::UseSkill);
        assert_eq!(cmd.target.as_deref(), Some("狼"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let result = parse_response("x", r#"{"command": }"#);
        assert!(matches!(result, Err(EngineError::LlmError(_))));
    }

    #[test]
    fn test_user_prompt_carries_context() {
        let hint = ContextHint::new(crate::core::types::GameMode::Combat, "青云山");
        let prompt = LlmOracle::user_prompt("快跑", &hint);
        assert!(prompt.contains("Combat"));
        assert!(prompt.contains("青云山"));
        assert!(prompt.contains("快跑"));
    }
}
