//! Shorthand substitution applied before pattern matching
//!
//! Aliases replace whole whitespace-separated tokens only, so a canonical
//! word that happens to contain an alias (治疗术 contains 治疗) is never
//! rewritten a second time. Combined with the no-chains rule enforced by
//! `add`, this makes `resolve` idempotent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};

/// Token-level synonym map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasResolver {
    aliases: BTreeMap<String, String>,
}

impl AliasResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver preloaded with the game's skill, item, location and
    /// shorthand-verb nicknames
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();
        for (short, canonical) in DEFAULT_ALIASES {
            resolver
                .aliases
                .insert(short.to_lowercase(), canonical.to_string());
        }
        resolver
    }

    /// Register `short` as an alias of `canonical`
    ///
    /// Rejects empty or multi-token aliases and anything that would create a
    /// chain (an alias expanding into another alias, or a canonical word
    /// being aliased itself).
    pub fn add(&mut self, short: &str, canonical: &str) -> Result<()> {
        let short = short.trim();
        let canonical = canonical.trim();

        if short.is_empty() || short.split_whitespace().count() != 1 {
            return Err(EngineError::Config(format!(
                "alias '{}' must be a single token",
                short
            )));
        }
        if canonical.is_empty() {
            return Err(EngineError::Config(format!(
                "alias '{}' has an empty expansion",
                short
            )));
        }

        let key = short.to_lowercase();
        if canonical
            .split_whitespace()
            .any(|token| token.to_lowercase() == key || self.aliases.contains_key(&token.to_lowercase()))
        {
            return Err(EngineError::Config(format!(
                "alias '{}' -> '{}' would expand recursively",
                short, canonical
            )));
        }
        if self.aliases.iter().any(|(other, expansion)| {
            other != &key
                && expansion
                    .split_whitespace()
                    .any(|token| token.to_lowercase() == key)
        }) {
            return Err(EngineError::Config(format!(
                "'{}' is already the expansion of another alias",
                short
            )));
        }

        self.aliases.insert(key, canonical.to_string());
        Ok(())
    }

    /// Remove an alias, returning its expansion
    pub fn remove(&mut self, short: &str) -> Option<String> {
        self.aliases.remove(&short.trim().to_lowercase())
    }

    /// Substitute aliased tokens and normalise whitespace
    pub fn resolve(&self, raw: &str) -> String {
        raw.split_whitespace()
            .map(|token| {
                self.aliases
                    .get(&token.to_lowercase())
                    .map(String::as_str)
                    .unwrap_or(token)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Alias keys, in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    // Skills
    ("剑气", "剑气斩"),
    ("火球", "火球术"),
    ("治疗", "治疗术"),
    ("疗伤", "治疗术"),
    // Items
    ("红药", "气血药水"),
    ("血瓶", "气血药水"),
    ("蓝药", "灵力药水"),
    ("蓝瓶", "灵力药水"),
    // Locations
    ("主城", "青云城"),
    ("城里", "青云城"),
    ("野外", "城外荒野"),
    // Shorthand verbs
    ("gj", "攻击"),
    ("xl", "修炼"),
    ("zt", "状态"),
    ("bb", "背包"),
    ("i", "inventory"),
    ("m", "map"),
    ("h", "help"),
    ("q", "quit"),
];
