//! Per-peer command throttling.
//!
//! Each (peer, command) pair gets one window that opens on the first
//! invocation and lasts the command's cooldown. Up to `rate_limit`
//! invocations fit in a window; the next one is refused until it closes.
//! A command with `rate_limit == 1` therefore behaves as a plain cooldown.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::descriptor::MAX_COOLDOWN_SECS;
use super::CommandDescriptor;

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: DateTime<Utc>,
    window: Duration,
}

impl WindowEntry {
    fn new(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            window,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.window_start) >= self.window
    }

    fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        let left = self.window - now.signed_duration_since(self.window_start);
        // Round up so "wait 0 seconds" is never shown.
        let secs = left.num_seconds() + i64::from(left.num_milliseconds() % 1000 > 0);
        secs.max(1)
    }
}

/// Why an invocation was refused by the limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Throttle {
    Cooldown {
        command: String,
        seconds_remaining: i64,
    },
    RateLimited {
        command: String,
        limit: u32,
        window_secs: u64,
        seconds_remaining: i64,
    },
}

impl std::fmt::Display for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Throttle::Cooldown {
                command,
                seconds_remaining,
            } => write!(
                f,
                "`4Cooldown active.`` Please wait {} seconds before using /{} again.",
                seconds_remaining, command
            ),
            Throttle::RateLimited {
                command,
                limit,
                window_secs,
                seconds_remaining,
            } => write!(
                f,
                "`4Slow down!`` /{} can be used {} times every {} seconds. Try again in {} seconds.",
                command, limit, window_secs, seconds_remaining
            ),
        }
    }
}

fn window_of(command: &CommandDescriptor) -> Duration {
    let secs = command.cooldown_secs().min(MAX_COOLDOWN_SECS);
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::days(1))
}

#[derive(Debug, Default)]
pub struct CommandLimiter {
    entries: Mutex<HashMap<(String, String), WindowEntry>>,
}

impl CommandLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one invocation of `command` by `peer_id` at `now`, or refuse it.
    ///
    /// Refused invocations are not counted.
    pub fn check_and_record(
        &self,
        peer_id: &str,
        command: &CommandDescriptor,
        now: DateTime<Utc>,
    ) -> Result<(), Throttle> {
        if command.cooldown_secs() == 0 {
            return Ok(());
        }
        let window = window_of(command);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .entry((peer_id.to_string(), command.name().to_string()))
            .or_insert_with(|| WindowEntry::new(now, window));

        if entry.is_expired(now) {
            *entry = WindowEntry::new(now, window);
        }

        if entry.count >= command.rate_limit() {
            let seconds_remaining = entry.seconds_remaining(now);
            let name = command.name().to_string();
            return Err(if command.rate_limit() == 1 {
                Throttle::Cooldown {
                    command: name,
                    seconds_remaining,
                }
            } else {
                Throttle::RateLimited {
                    command: name,
                    limit: command.rate_limit(),
                    window_secs: command.cooldown_secs(),
                    seconds_remaining,
                }
            });
        }

        if entry.count == 0 {
            entry.window_start = now;
        }
        entry.count += 1;
        Ok(())
    }

    /// Give back the slot taken by the last accepted invocation.
    ///
    /// Used when the command failed, so a failure does not cost the peer
    /// their cooldown.
    pub fn release(&self, peer_id: &str, command: &CommandDescriptor) {
        let key = (peer_id.to_string(), command.name().to_string());
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(&key) {
            entry.count = entry.count.saturating_sub(1);
            if entry.count == 0 {
                entries.remove(&key);
            }
        }
    }

    /// Forget every window belonging to `peer_id` (disconnect).
    pub fn reset_peer(&self, peer_id: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(peer, _), _| peer != peer_id);
    }

    /// Drop closed windows. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn tracked(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
