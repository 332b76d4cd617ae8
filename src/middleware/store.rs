//! Shared throttle state for the cooldown and rate-limit middlewares
//!
//! Injected into the engine rather than held globally, so tests and
//! separate engine instances never share state. Check-and-update happens
//! under one lock to stay correct under concurrent submissions.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ahash::AHashMap;

use crate::core::types::CommandType;

#[derive(Debug, Default)]
pub struct ThrottleStore {
    cooldowns: Mutex<AHashMap<CommandType, Instant>>,
    windows: Mutex<AHashMap<String, VecDeque<Instant>>>,
}

impl ThrottleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the cooldown slot for `command_type` at `now`
    ///
    /// Returns the previous timestamp on success so a failed command can
    /// give the slot back, or the remaining wait when still cooling down.
    pub fn try_reserve_cooldown(
        &self,
        command_type: CommandType,
        cooldown: Duration,
        now: Instant,
    ) -> Result<Option<Instant>, Duration> {
        let mut cooldowns = self.cooldowns.lock().unwrap_or_else(|e| e.into_inner());
        let previous = cooldowns.get(&command_type).copied();
        if let Some(last) = previous {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < cooldown {
                return Err(cooldown - elapsed);
            }
        }
        cooldowns.insert(command_type, now);
        Ok(previous)
    }

    /// Undo a reservation made at `reserved_at`, unless a later one replaced it
    pub fn release_cooldown(
        &self,
        command_type: CommandType,
        reserved_at: Instant,
        previous: Option<Instant>,
    ) {
        let mut cooldowns = self.cooldowns.lock().unwrap_or_else(|e| e.into_inner());
        if cooldowns.get(&command_type) != Some(&reserved_at) {
            return;
        }
        match previous {
            Some(last) => cooldowns.insert(command_type, last),
            None => cooldowns.remove(&command_type),
        };
    }

    pub fn last_used(&self, command_type: CommandType) -> Option<Instant> {
        let cooldowns = self.cooldowns.lock().unwrap_or_else(|e| e.into_inner());
        cooldowns.get(&command_type).copied()
    }

    /// Admit one command for `key` if the sliding window has room
    ///
    /// Returns the window size after admission, or the wait until the
    /// oldest entry leaves the window.
    pub fn try_admit(
        &self,
        key: &str,
        max_commands: usize,
        window: Duration,
        now: Instant,
    ) -> Result<usize, Duration> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let timestamps = windows.entry(key.to_string()).or_default();

        while let Some(&oldest) = timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= max_commands {
            let retry_after = timestamps
                .front()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(window);
            return Err(retry_after);
        }

        timestamps.push_back(now);
        Ok(timestamps.len())
    }

    /// Commands currently counted against `key` (not pruned)
    pub fn window_len(&self, key: &str) -> usize {
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.get(key).map_or(0, VecDeque::len)
    }

    pub fn reset(&self) {
        self.cooldowns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_reservation() {
        let store = ThrottleStore::new();
        let t0 = Instant::now();
        let cd = Duration::from_secs(2);

        assert_eq!(store.try_reserve_cooldown(CommandType::Cultivate, cd, t0), Ok(None));
        let wait = store
            .try_reserve_cooldown(CommandType::Cultivate, cd, t0 + Duration::from_millis(500))
            .unwrap_err();
        assert_eq!(wait, Duration::from_millis(1500));
        // Other types are independent
        assert!(store.try_reserve_cooldown(CommandType::Save, cd, t0).is_ok());

        let t2 = t0 + Duration::from_secs(2);
        assert_eq!(store.try_reserve_cooldown(CommandType::Cultivate, cd, t2), Ok(Some(t0)));
    }

    #[test]
    fn test_release_restores_previous() {
        let store = ThrottleStore::new();
        let t0 = Instant::now();
        let cd = Duration::from_secs(1);
        store.try_reserve_cooldown(CommandType::Cultivate, cd, t0).unwrap();

        let t1 = t0 + Duration::from_secs(3);
        let previous = store.try_reserve_cooldown(CommandType::Cultivate, cd, t1).unwrap();
        store.release_cooldown(CommandType::Cultivate, t1, previous);
        assert_eq!(store.last_used(CommandType::Cultivate), Some(t0));

        // A stale release must not clobber a newer reservation
        let t2 = t1 + Duration::from_secs(3);
        store.try_reserve_cooldown(CommandType::Cultivate, cd, t2).unwrap();
        store.release_cooldown(CommandType::Cultivate, t1, None);
        assert_eq!(store.last_used(CommandType::Cultivate), Some(t2));
    }

    #[test]
    fn test_sliding_window() {
        let store = ThrottleStore::new();
        let t0 = Instant::now();
        let window = Duration::from_secs(10);

        for i in 0..3 {
            let at = t0 + Duration::from_secs(i);
            assert_eq!(store.try_admit("actor", 3, window, at), Ok(i as usize + 1));
        }
        let wait = store
            .try_admit("actor", 3, window, t0 + Duration::from_secs(4))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(6));
        assert_eq!(store.window_len("actor"), 3);

        // The first entry leaves the window at t0 + 10s
        assert!(store.try_admit("actor", 3, window, t0 + Duration::from_secs(10)).is_ok());
        assert!(store.try_admit("other", 3, window, t0).is_ok());
    }

    #[test]
    fn test_reset_clears_everything() {
        let store = ThrottleStore::new();
        let now = Instant::now();
        store.try_reserve_cooldown(CommandType::Save, Duration::from_secs(1), now).unwrap();
        store.try_admit("global", 1, Duration::from_secs(1), now).unwrap();
        store.reset();
        assert_eq!(store.last_used(CommandType::Save), None);
        assert_eq!(store.window_len("global"), 0);
    }
}
