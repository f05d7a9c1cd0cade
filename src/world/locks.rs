//! World-level ("main") locks.
//!
//! A main lock owns the whole world rather than an area of it. Main locks
//! survive a world clear; area locks (small, big, huge, builder's) do not.

use std::collections::BTreeSet;

use super::items::{DIAMOND_LOCK, EMERALD_LOCK, ROYAL_LOCK, WORLD_LOCK};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRegistry {
    main_locks: BTreeSet<u16>,
}

impl LockRegistry {
    pub fn new<I: IntoIterator<Item = u16>>(ids: I) -> Self {
        Self {
            main_locks: ids.into_iter().collect(),
        }
    }

    pub fn is_main_lock(&self, item_id: u16) -> bool {
        self.main_locks.contains(&item_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.main_locks.iter().copied()
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new([WORLD_LOCK, DIAMOND_LOCK, EMERALD_LOCK, ROYAL_LOCK])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::items::SMALL_LOCK;

    #[test]
    fn default_registry_covers_world_locks_only() {
        let locks = LockRegistry::default();
        assert!(locks.is_main_lock(WORLD_LOCK));
        assert!(locks.is_main_lock(ROYAL_LOCK));
        assert!(!locks.is_main_lock(SMALL_LOCK));
        assert_eq!(locks.ids().count(), 4);
    }
}
