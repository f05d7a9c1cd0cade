//! Process-wide counters for the command core.
//! Read by the `status` CLI view and by tests.
use std::sync::atomic::{AtomicU64, Ordering};

static COMMANDS_EXECUTED: AtomicU64 = AtomicU64::new(0);
static COMMANDS_UNKNOWN: AtomicU64 = AtomicU64::new(0);
static COMMANDS_DENIED: AtomicU64 = AtomicU64::new(0);
static COMMANDS_THROTTLED: AtomicU64 = AtomicU64::new(0);
static COMMANDS_FAILED: AtomicU64 = AtomicU64::new(0);
static DIALOGS_PROMPTED: AtomicU64 = AtomicU64::new(0);
static DIALOGS_DROPPED: AtomicU64 = AtomicU64::new(0);
static CLEARS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static CLEARS_FAILED: AtomicU64 = AtomicU64::new(0);
static TILES_CLEARED: AtomicU64 = AtomicU64::new(0);

pub fn inc_commands_executed() {
    COMMANDS_EXECUTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_commands_unknown() {
    COMMANDS_UNKNOWN.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_commands_denied() {
    COMMANDS_DENIED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_commands_throttled() {
    COMMANDS_THROTTLED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_commands_failed() {
    COMMANDS_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_dialogs_prompted() {
    DIALOGS_PROMPTED.fetch_add(1, Ordering::Relaxed);
}
/// Stale, forged, expired or re-check-failed dialog responses.
pub fn inc_dialogs_dropped() {
    DIALOGS_DROPPED.fetch_add(1, Ordering::Relaxed);
}
pub fn record_clear_completed(tiles_cleared: u64) {
    CLEARS_COMPLETED.fetch_add(1, Ordering::Relaxed);
    TILES_CLEARED.fetch_add(tiles_cleared, Ordering::Relaxed);
}
pub fn inc_clears_failed() {
    CLEARS_FAILED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub commands_executed: u64,
    pub commands_unknown: u64,
    pub commands_denied: u64,
    pub commands_throttled: u64,
    pub commands_failed: u64,
    pub dialogs_prompted: u64,
    pub dialogs_dropped: u64,
    pub clears_completed: u64,
    pub clears_failed: u64,
    pub tiles_cleared: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        commands_executed: COMMANDS_EXECUTED.load(Ordering::Relaxed),
        commands_unknown: COMMANDS_UNKNOWN.load(Ordering::Relaxed),
        commands_denied: COMMANDS_DENIED.load(Ordering::Relaxed),
        commands_throttled: COMMANDS_THROTTLED.load(Ordering::Relaxed),
        commands_failed: COMMANDS_FAILED.load(Ordering::Relaxed),
        dialogs_prompted: DIALOGS_PROMPTED.load(Ordering::Relaxed),
        dialogs_dropped: DIALOGS_DROPPED.load(Ordering::Relaxed),
        clears_completed: CLEARS_COMPLETED.load(Ordering::Relaxed),
        clears_failed: CLEARS_FAILED.load(Ordering::Relaxed),
        tiles_cleared: TILES_CLEARED.load(Ordering::Relaxed),
    }
}
