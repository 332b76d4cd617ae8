//! Ordered regex pattern table
//!
//! Patterns are plain data (`PatternSpec`) compiled into a `PatternTable`.
//! Matching is strict first-match in registration order, so a specific
//! pattern has to be registered before any general one that would also
//! accept its input ("打坐" must reach CULTIVATE before the ATTACK verb "打"
//! sees it).

use std::collections::BTreeMap;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::CommandType;

/// How named capture groups become command parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMapping {
    /// Every named capture is copied verbatim under its own name
    #[default]
    AllCaptures,
    /// Only the listed captures are copied, under the mapped field name
    Rename(BTreeMap<String, String>),
}

/// Serializable description of one pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Regular expression, matched case-insensitively
    pub pattern: String,
    /// Command produced when the pattern matches
    pub command_type: CommandType,
    /// Capture-to-field mapping
    #[serde(default)]
    pub fields: FieldMapping,
}

impl PatternSpec {
    pub fn new(pattern: impl Into<String>, command_type: CommandType) -> Self {
        Self {
            pattern: pattern.into(),
            command_type,
            fields: FieldMapping::AllCaptures,
        }
    }

    pub fn with_fields(mut self, fields: FieldMapping) -> Self {
        self.fields = fields;
        self
    }
}

/// A successful pattern match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub command_type: CommandType,
    pub parameters: BTreeMap<String, String>,
    /// Registration index of the pattern that matched
    pub index: usize,
}

struct CompiledPattern {
    spec: PatternSpec,
    regex: Regex,
}

impl CompiledPattern {
    fn compile(spec: PatternSpec) -> Result<Self> {
        let regex = Regex::new(&format!("(?i){}", spec.pattern))?;
        Ok(Self { spec, regex })
    }

    fn extract(&self, captures: &Captures<'_>) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        match &self.spec.fields {
            FieldMapping::AllCaptures => {
                for name in self.regex.capture_names().flatten() {
                    if let Some(m) = captures.name(name) {
                        if !m.as_str().is_empty() {
                            params.insert(name.to_string(), m.as_str().to_string());
                        }
                    }
                }
            }
            FieldMapping::Rename(mapping) => {
                for (capture, field) in mapping {
                    if let Some(m) = captures.name(capture) {
                        if !m.as_str().is_empty() {
                            params.insert(field.clone(), m.as_str().to_string());
                        }
                    }
                }
            }
        }
        params
    }
}

/// Ordered list of compiled patterns
#[derive(Default)]
pub struct PatternTable {
    patterns: Vec<CompiledPattern>,
}

impl PatternTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the built-in Chinese and English command patterns
    pub fn with_defaults() -> Self {
        let specs = DEFAULT_PATTERNS
            .iter()
            .map(|(pattern, command_type)| PatternSpec::new(*pattern, *command_type));
        // Built-in patterns are covered by tests; a bad one is logged and skipped
        let mut table = Self::new();
        for spec in specs {
            if let Err(e) = table.add(spec) {
                tracing::error!("Built-in pattern failed to compile: {}", e);
            }
        }
        table
    }

    /// Compile a table from specs, preserving their order
    pub fn from_specs(specs: impl IntoIterator<Item = PatternSpec>) -> Result<Self> {
        let mut table = Self::new();
        for spec in specs {
            table.add(spec)?;
        }
        Ok(table)
    }

    /// Append a pattern; it matches after every pattern already registered
    pub fn add(&mut self, spec: PatternSpec) -> Result<()> {
        self.patterns.push(CompiledPattern::compile(spec)?);
        Ok(())
    }

    /// Append a pattern from its parts
    pub fn add_pattern(
        &mut self,
        pattern: &str,
        command_type: CommandType,
        fields: FieldMapping,
    ) -> Result<()> {
        self.add(PatternSpec::new(pattern, command_type).with_fields(fields))
    }

    /// First pattern (in registration order) that matches `text`
    pub fn find_match(&self, text: &str) -> Option<PatternMatch> {
        self.patterns.iter().enumerate().find_map(|(index, p)| {
            p.regex.captures(text).map(|captures| PatternMatch {
                command_type: p.spec.command_type,
                parameters: p.extract(&captures),
                index,
            })
        })
    }

    /// Specs in registration order, for serialization or inspection
    pub fn specs(&self) -> Vec<PatternSpec> {
        self.patterns.iter().map(|p| p.spec.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl std::fmt::Debug for PatternTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternTable")
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

/// Built-in patterns, most specific first
const DEFAULT_PATTERNS: &[(&str, CommandType)] = &[
    // Skills before items and attacks: "使用 剑气斩 攻击 妖兽"
    (
        r"^(?:使用|施放|释放)\s*(?P<skill>\S+?)\s*(?:攻击|对付|打击)\s*(?P<target>\S+)",
        CommandType::UseSkill,
    ),
    (
        r"^用\s*(?P<skill>\S+?)\s*(?:攻击|对付|打击)\s*(?P<target>\S+)",
        CommandType::UseSkill,
    ),
    (
        r"^(?:use|cast)\s+(?P<skill>.+?)\s+on\s+(?P<target>\S+)",
        CommandType::UseSkill,
    ),
    (r"^cast\s+(?P<skill>\S+)", CommandType::UseSkill),
    // Cultivation before attacks: "打坐" starts with the attack verb "打"
    (
        r"^(?:修炼|打坐|练功|修行|闭关)\s*(?P<duration>\d+\s*(?:天|日|个月|月|年|小时|时辰))?",
        CommandType::Cultivate,
    ),
    (
        r"^(?:cultivate|meditate|practice)\b(?:\s+(?P<duration>\d+\s*\w+))?",
        CommandType::Cultivate,
    ),
    (r"^(?:学习|修习)\s*(?P<skill>\S+)", CommandType::LearnSkill),
    (r"^learn\s+(?P<skill>.+)$", CommandType::LearnSkill),
    (r"^(?:突破|进阶|晋级)", CommandType::Breakthrough),
    (r"^breakthrough\b", CommandType::Breakthrough),
    // Combat
    (
        r"^(?:攻击|击杀|揍|打)\s*(?P<target>\S+)?",
        CommandType::Attack,
    ),
    (
        r"^(?:attack|hit|strike)\b(?:\s+(?P<target>\S+))?",
        CommandType::Attack,
    ),
    (r"^(?:防御|防守|格挡|闪避)", CommandType::Defend),
    (r"^(?:defend|block|dodge)\b", CommandType::Defend),
    (r"^(?:逃跑|逃走|撤退|跑路)", CommandType::Flee),
    (r"^(?:flee|run|escape)\b", CommandType::Flee),
    // Movement
    (r"^(?:去|前往|移动到)\s*(?P<location>\S+)", CommandType::Move),
    (
        r"^(?:go|move)\s+(?:to\s+)?(?P<location>.+)$",
        CommandType::Move,
    ),
    (r"^(?:探索|查看周围|观察)\s*(?P<target>\S+)?", CommandType::Explore),
    (
        r"^(?:explore|look|search)\b(?:\s+(?P<target>.+))?",
        CommandType::Explore,
    ),
    // Interaction
    (
        r"^(?:和|与|跟)\s*(?P<target>\S+?)\s*(?:交易|买卖)",
        CommandType::Trade,
    ),
    (r"^(?:交易|买卖)\s*(?P<target>\S+)?", CommandType::Trade),
    (
        r"^trade\b(?:\s+(?:with\s+)?(?P<target>\S+))?",
        CommandType::Trade,
    ),
    (
        r"^(?:和|与|跟)\s*(?P<target>\S+?)\s*(?:说话|交谈|对话|聊天)",
        CommandType::Talk,
    ),
    (
        r"^(?:talk|speak)\s+(?:to\s+|with\s+)?(?P<target>\S+)",
        CommandType::Talk,
    ),
    (r"^(?:拾取|捡起|获取)\s*(?P<item>\S+)", CommandType::PickUp),
    (r"^(?:pick\s+up|take|grab)\s+(?P<item>.+)$", CommandType::PickUp),
    // Items
    (r"^(?:使用|服用|吃)\s*(?P<item>\S+)", CommandType::UseItem),
    (r"^(?:use|drink|eat)\s+(?P<item>.+)$", CommandType::UseItem),
    (r"^(?:装备|穿上|佩戴)\s*(?P<item>\S+)", CommandType::Equip),
    (r"^(?:equip|wear|wield)\s+(?P<item>.+)$", CommandType::Equip),
    (r"^(?:卸下|脱下|取下)\s*(?P<item>\S+)", CommandType::Unequip),
    (r"^(?:unequip|remove)\s+(?P<item>.+)$", CommandType::Unequip),
    // System
    (r"^(?:保存|存档)\s*(?P<name>\S+)?", CommandType::Save),
    (r"^save\b(?:\s+(?P<name>\S+))?", CommandType::Save),
    (r"^(?:读取|载入|读档)\s*(?P<name>\S+)?", CommandType::Load),
    (r"^load\b(?:\s+(?P<name>\S+))?", CommandType::Load),
    (r"^(?:退出|离开)", CommandType::Quit),
    (r"^(?:quit|exit)\b", CommandType::Quit),
    (r"^(?:help\b|\?)", CommandType::Help),
    // Information, matched anywhere in the input ("查看状态")
    (r"(?:状态|属性|信息)", CommandType::Status),
    (r"^(?:status|info|stats)\b", CommandType::Status),
    (r"(?:背包|物品)", CommandType::Inventory),
    (r"^(?:inventory|inv|items)\b", CommandType::Inventory),
    (r"(?:技能|功法)", CommandType::Skills),
    (r"^skills\b", CommandType::Skills),
    (r"(?:地图|位置)", CommandType::Map),
    (r"^(?:map|where)\b", CommandType::Map),
    (r"(?:帮助|帮忙|命令列表)", CommandType::Help),
];
