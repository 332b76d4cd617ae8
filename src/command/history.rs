//! Command history ring buffer and undo stack

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::command::context::ContextSnapshot;
use crate::command::result::InverseAction;
use crate::core::types::{CommandSource, CommandType, EntityId};

/// One processed invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub raw_input: String,
    pub parsed_type: CommandType,
    pub success: bool,
    pub duration_ms: u64,
    pub source: CommandSource,
    pub actor: Option<EntityId>,
}

impl HistoryEntry {
    pub fn new(
        raw_input: impl Into<String>,
        parsed_type: CommandType,
        success: bool,
        duration_ms: u64,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            timestamp,
            raw_input: raw_input.into(),
            parsed_type,
            success,
            duration_ms,
            source: CommandSource::Player,
            actor: None,
        }
    }
}

/// Bounded history; the oldest entry is dropped when full
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Newest-first iterator
    pub fn iter_newest(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Inverse of a reversible success, with the context it ran in
#[derive(Debug, Clone, PartialEq)]
pub struct UndoRecord {
    pub inverse: InverseAction,
    pub snapshot: ContextSnapshot,
}

/// Bounded LIFO of undo records
#[derive(Debug, Clone)]
pub struct UndoStack {
    records: VecDeque<UndoRecord>,
    capacity: usize,
}

impl UndoStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, record: UndoRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn pop(&mut self) -> Option<UndoRecord> {
        self.records.pop_back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
