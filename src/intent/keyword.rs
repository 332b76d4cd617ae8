//! Offline keyword scorer
//!
//! Deterministic oracle used when no LLM is configured and in tests. Each
//! rule lists trigger words for one command type; the rule with the most
//! hits wins, earlier rules win ties, and a rule that fits the current game
//! mode beats one that doesn't at equal hits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use regex::Regex;

use crate::core::error::Result;
use crate::core::types::{CommandType, GameMode};
use crate::intent::context::ContextHint;
use crate::intent::oracle::IntentOracle;
use crate::parser::command::ParsedCommand;

/// One scoring rule
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub command_type: CommandType,
    pub keywords: Vec<String>,
    /// Confidence reported when this rule wins
    pub confidence: f32,
    /// Parameters attached verbatim when this rule wins
    pub parameters: BTreeMap<String, String>,
}

impl KeywordRule {
    pub fn new(command_type: CommandType, keywords: &[&str], confidence: f32) -> Self {
        Self {
            command_type,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            confidence,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    fn hits(&self, text: &str) -> usize {
        self.keywords.iter().filter(|k| text.contains(k.as_str())).count()
    }

    /// Text following the first keyword found, used as a loose argument
    fn remainder<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.keywords.iter().find_map(|k| {
            text.find(k.as_str()).and_then(|pos| {
                let rest = text[pos + k.len()..].trim();
                rest.split_whitespace().next().filter(|r| !r.is_empty())
            })
        })
    }
}

/// Rule-based fallback oracle
pub struct KeywordOracle {
    rules: Vec<KeywordRule>,
    duration: Option<Regex>,
}

impl KeywordOracle {
    /// Oracle with the built-in rule set
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    /// Oracle with a custom rule set, scored in the given order
    pub fn with_rules(rules: Vec<KeywordRule>) -> Self {
        Self {
            rules,
            duration: Regex::new(r"(\d+|[一二三四五六七八九十百千]+)\s*(天|日|个月|月|年|小时|时辰)")
                .ok(),
        }
    }

    /// Synchronous scoring; the trait method delegates here
    pub fn score(&self, text: &str, hint: &ContextHint) -> ParsedCommand {
        let lowered = text.to_lowercase();

        let mut best: Option<(&KeywordRule, usize, bool)> = None;
        for rule in &self.rules {
            let hits = rule.hits(&lowered);
            if hits == 0 {
                continue;
            }
            let fits_mode = fits_mode(rule.command_type, hint.game_mode);
            let better = match best {
                None => true,
                Some((_, best_hits, best_fits)) => {
                    hits > best_hits || (hits == best_hits && fits_mode && !best_fits)
                }
            };
            if better {
                best = Some((rule, hits, fits_mode));
            }
        }

        let Some((rule, _, _)) = best else {
            return ParsedCommand::unknown(text);
        };

        let mut parameters = rule.parameters.clone();
        let mut target = None;
        match rule.command_type {
            CommandType::Cultivate => {
                if let Some(duration) = self.extract_duration(text) {
                    parameters.insert("duration".into(), duration);
                }
            }
            CommandType::Move => {
                if let Some(location) = rule.remainder(&lowered) {
                    parameters.insert("location".into(), location.to_string());
                }
            }
            CommandType::UseSkill => {
                if let Some(skill) = rule.remainder(&lowered) {
                    parameters.insert("skill".into(), skill.to_string());
                }
            }
            CommandType::Attack | CommandType::Talk => {
                target = rule.remainder(&lowered).map(str::to_string);
            }
            _ => {}
        }

        ParsedCommand::new(rule.command_type, target, parameters, text, rule.confidence)
    }

    fn extract_duration(&self, text: &str) -> Option<String> {
        let caps = self.duration.as_ref()?.captures(text)?;
        Some(format!("{}{}", &caps[1], &caps[2]))
    }
}

impl Default for KeywordOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentOracle for KeywordOracle {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, text: &str, hint: &ContextHint) -> Result<ParsedCommand> {
        Ok(self.score(text, hint))
    }
}

fn fits_mode(command_type: CommandType, mode: GameMode) -> bool {
    let combat = matches!(
        command_type,
        CommandType::Attack | CommandType::UseSkill | CommandType::Defend | CommandType::Flee
    );
    match mode {
        GameMode::Combat => combat,
        GameMode::Dialogue => command_type == CommandType::Talk,
        GameMode::Trading => command_type == CommandType::Trade,
        GameMode::Exploring => !combat,
    }
}

fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            CommandType::Cultivate,
            &["修炼", "修行", "打坐", "练功", "闭关", "冥想"],
            0.95,
        ),
        KeywordRule::new(
            CommandType::UseSkill,
            &["剑气斩", "火球术", "施展", "释放"],
            0.8,
        ),
        KeywordRule::new(
            CommandType::Attack,
            &["攻击", "杀", "揍", "砍", "斩", "轰", "打"],
            0.85,
        ),
        KeywordRule::new(CommandType::Defend, &["防御", "挡", "护住"], 0.8),
        KeywordRule::new(CommandType::Flee, &["逃", "撤退", "跑"], 0.7),
        KeywordRule::new(
            CommandType::Status,
            &["状态", "属性", "面板", "我的", "角色"],
            0.95,
        ),
        KeywordRule::new(CommandType::Move, &["前往", "去", "走到", "移动", "回"], 0.75),
        KeywordRule::new(CommandType::Talk, &["聊", "说话", "对话", "交谈", "问问"], 0.8),
        KeywordRule::new(CommandType::Trade, &["买", "卖", "交易", "商店"], 0.75),
        KeywordRule::new(CommandType::Explore, &["探索", "搜索", "周围", "逛逛"], 0.85),
        KeywordRule::new(CommandType::Inventory, &["背包", "物品", "道具"], 0.9),
        KeywordRule::new(CommandType::Map, &["地图", "在哪", "哪里"], 0.9),
        KeywordRule::new(CommandType::Cultivate, &["吃", "喝", "睡", "休息"], 0.7)
            .with_param("action", "rest"),
        KeywordRule::new(CommandType::Help, &["帮助", "命令", "怎么玩", "help"], 0.95),
        KeywordRule::new(
            CommandType::Quit,
            &["退出", "再见", "拜拜", "quit", "exit"],
            0.9,
        ),
        KeywordRule::new(CommandType::Breakthrough, &["突破", "进阶", "升级"], 0.85),
        // Too vague to act on with the default threshold
        KeywordRule::new(CommandType::Explore, &["看看", "随便"], 0.4),
    ]
}
