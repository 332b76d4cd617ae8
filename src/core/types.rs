//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for actors (players, NPCs) issuing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical category a raw input is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    // Combat
    Attack,
    UseSkill,
    Defend,
    Flee,

    // Movement
    Move,
    Explore,

    // Interaction
    Talk,
    Trade,
    PickUp,

    // Cultivation
    Cultivate,
    LearnSkill,
    Breakthrough,

    // Items
    UseItem,
    Equip,
    Unequip,

    // Information
    Status,
    Inventory,
    Skills,
    Map,

    // System
    Save,
    Load,
    Quit,
    Help,

    /// Could not determine intent
    Unknown,
}

impl CommandType {
    /// Every command type, `Unknown` last
    pub const ALL: [CommandType; 24] = [
        CommandType::Attack,
        CommandType::UseSkill,
        CommandType::Defend,
        CommandType::Flee,
        CommandType::Move,
        CommandType::Explore,
        CommandType::Talk,
        CommandType::Trade,
        CommandType::PickUp,
        CommandType::Cultivate,
        CommandType::LearnSkill,
        CommandType::Breakthrough,
        CommandType::UseItem,
        CommandType::Equip,
        CommandType::Unequip,
        CommandType::Status,
        CommandType::Inventory,
        CommandType::Skills,
        CommandType::Map,
        CommandType::Save,
        CommandType::Load,
        CommandType::Quit,
        CommandType::Help,
        CommandType::Unknown,
    ];

    /// Lowercase snake-case name, e.g. `use_skill`
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Attack => "attack",
            CommandType::UseSkill => "use_skill",
            CommandType::Defend => "defend",
            CommandType::Flee => "flee",
            CommandType::Move => "move",
            CommandType::Explore => "explore",
            CommandType::Talk => "talk",
            CommandType::Trade => "trade",
            CommandType::PickUp => "pick_up",
            CommandType::Cultivate => "cultivate",
            CommandType::LearnSkill => "learn_skill",
            CommandType::Breakthrough => "breakthrough",
            CommandType::UseItem => "use_item",
            CommandType::Equip => "equip",
            CommandType::Unequip => "unequip",
            CommandType::Status => "status",
            CommandType::Inventory => "inventory",
            CommandType::Skills => "skills",
            CommandType::Map => "map",
            CommandType::Save => "save",
            CommandType::Load => "load",
            CommandType::Quit => "quit",
            CommandType::Help => "help",
            CommandType::Unknown => "unknown",
        }
    }

    /// Parse a command name in any case, with `_`, `-` or space separators
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
    }

    /// Canonical player-facing verbs, used for suggestions and help
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            CommandType::Attack => &["攻击", "attack"],
            CommandType::UseSkill => &["使用", "施放", "cast"],
            CommandType::Defend => &["防御", "defend"],
            CommandType::Flee => &["逃跑", "flee"],
            CommandType::Move => &["前往", "去", "go"],
            CommandType::Explore => &["探索", "explore"],
            CommandType::Talk => &["交谈", "talk"],
            CommandType::Trade => &["交易", "trade"],
            CommandType::PickUp => &["拾取", "pick"],
            CommandType::Cultivate => &["修炼", "cultivate"],
            CommandType::LearnSkill => &["学习", "learn"],
            CommandType::Breakthrough => &["突破", "breakthrough"],
            CommandType::UseItem => &["服用", "use"],
            CommandType::Equip => &["装备", "equip"],
            CommandType::Unequip => &["卸下", "unequip"],
            CommandType::Status => &["状态", "status"],
            CommandType::Inventory => &["背包", "inventory"],
            CommandType::Skills => &["技能", "skills"],
            CommandType::Map => &["地图", "map"],
            CommandType::Save => &["保存", "save"],
            CommandType::Load => &["读取", "load"],
            CommandType::Quit => &["退出", "quit"],
            CommandType::Help => &["帮助", "help"],
            CommandType::Unknown => &[],
        }
    }

    /// Commands that make sense without an active actor
    pub fn requires_actor(&self) -> bool {
        !matches!(
            self,
            CommandType::Help | CommandType::Quit | CommandType::Save | CommandType::Load
        )
    }

    /// Commands an incapacitated actor may still issue
    pub fn allowed_when_incapacitated(&self) -> bool {
        matches!(
            self,
            CommandType::Status
                | CommandType::Inventory
                | CommandType::Skills
                | CommandType::Map
                | CommandType::Save
                | CommandType::Load
                | CommandType::Quit
                | CommandType::Help
        )
    }

    /// Whether the current game mode admits this command at all
    ///
    /// A fight leaves room for combat moves, consumables, a status check
    /// and the meta commands. Travel, attacks and cultivation wait until a
    /// conversation ends.
    pub fn allowed_in(&self, mode: GameMode) -> bool {
        match mode {
            GameMode::Combat => matches!(
                self,
                CommandType::Attack
                    | CommandType::UseSkill
                    | CommandType::Defend
                    | CommandType::Flee
                    | CommandType::UseItem
                    | CommandType::Status
                    | CommandType::Save
                    | CommandType::Quit
                    | CommandType::Help
            ),
            GameMode::Dialogue => !matches!(
                self,
                CommandType::Move | CommandType::Attack | CommandType::Cultivate
            ),
            GameMode::Exploring | GameMode::Trading => true,
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Current interaction context gating which handlers apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Exploring,
    Combat,
    Dialogue,
    Trading,
}

impl GameMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "exploring" | "explore" => Some(GameMode::Exploring),
            "combat" => Some(GameMode::Combat),
            "dialogue" => Some(GameMode::Dialogue),
            "trading" | "trade" => Some(GameMode::Trading),
            _ => None,
        }
    }
}

/// Who issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    #[default]
    Player,
    Npc,
    System,
}

impl CommandSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandSource::Player => "player",
            CommandSource::Npc => "npc",
            CommandSource::System => "system",
        }
    }
}

impl std::fmt::Display for CommandSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_type_from_name() {
        assert_eq!(CommandType::from_name("ATTACK"), Some(CommandType::Attack));
        assert_eq!(CommandType::from_name("use-skill"), Some(CommandType::UseSkill));
        assert_eq!(CommandType::from_name("Pick Up"), Some(CommandType::PickUp));
        assert_eq!(CommandType::from_name("dance"), None);
    }

    #[test]
    fn test_command_type_serialization() {
        let json = serde_json::to_string(&CommandType::UseSkill).unwrap();
        assert_eq!(json, "\"USE_SKILL\"");
        let parsed: CommandType = serde_json::from_str("\"CULTIVATE\"").unwrap();
        assert_eq!(parsed, CommandType::Cultivate);
    }

    #[test]
    fn test_all_names_round_trip_through_from_name() {
        for t in CommandType::ALL {
            assert_eq!(CommandType::from_name(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_actor_requirements() {
        assert!(!CommandType::Help.requires_actor());
        assert!(CommandType::Attack.requires_actor());
        assert!(CommandType::Status.allowed_when_incapacitated());
        assert!(!CommandType::Cultivate.allowed_when_incapacitated());
    }

    #[test]
    fn test_mode_gating() {
        assert!(CommandType::UseItem.allowed_in(GameMode::Combat));
        assert!(CommandType::Help.allowed_in(GameMode::Combat));
        for blocked in [
            CommandType::Inventory,
            CommandType::Skills,
            CommandType::Map,
            CommandType::Load,
            CommandType::Move,
        ] {
            assert!(!blocked.allowed_in(GameMode::Combat), "{}", blocked);
        }

        assert!(!CommandType::Move.allowed_in(GameMode::Dialogue));
        assert!(!CommandType::Cultivate.allowed_in(GameMode::Dialogue));
        assert!(CommandType::Explore.allowed_in(GameMode::Dialogue));
        assert!(CommandType::Attack.allowed_in(GameMode::Exploring));
    }

    #[test]
    fn test_game_mode_from_name() {
        assert_eq!(GameMode::from_name("Combat"), Some(GameMode::Combat));
        assert_eq!(GameMode::from_name("trade"), Some(GameMode::Trading));
        assert_eq!(GameMode::from_name("flying"), None);
    }
}
