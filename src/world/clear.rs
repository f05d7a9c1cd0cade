//! World clearing.
//!
//! [`clear_blocks`] is the pure tile pass. [`WorldMutationEngine`] wraps it in
//! the full sequence, all under the world's mutation lock:
//!
//! 1. scan and reset tiles, reset dropped items
//! 2. save to cache, then to durable storage (each step retried)
//! 3. tell the actor the clear succeeded
//! 4. evict every occupant so clients reload the fresh world
//!
//! If either save fails the world is restored to its pre-clear state, nobody
//! is told it succeeded and nobody is evicted.

use log::{debug, error, info, warn};

use super::items::{ItemLookup, ItemMetadata};
use super::locks::LockRegistry;
use super::manager::WorldHandle;
use super::{Block, DroppedItems, World};
use crate::config::WorldConfig;
use crate::error::{PersistStage, TileGateError};
use crate::session::{Peer, SessionRegistry};
use crate::storage::WorldPersistence;

pub const CLEAR_SUCCESS_MESSAGE: &str = "`2World cleared successfully!``";

/// Which tiles a clear must leave alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearRules {
    pub main_door_id: u16,
    pub bedrock_id: u16,
    pub locks: LockRegistry,
}

impl ClearRules {
    pub fn from_config(cfg: &WorldConfig) -> Self {
        Self {
            main_door_id: cfg.main_door_id,
            bedrock_id: cfg.bedrock_id,
            locks: LockRegistry::new(cfg.main_lock_ids.iter().copied()),
        }
    }

    /// Doors and bedrock always stay. Main locks stay; other locks go.
    pub fn is_exempt(&self, block: &Block, meta: &ItemMetadata) -> bool {
        block.fg == self.main_door_id
            || block.fg == self.bedrock_id
            || (meta.is_lock() && self.locks.is_main_lock(meta.id))
    }
}

impl Default for ClearRules {
    fn default() -> Self {
        Self::from_config(&WorldConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub scanned: usize,
    pub cleared: usize,
    pub exempted: usize,
    /// Tiles skipped because their item is missing from the catalog.
    pub unknown_items: usize,
    pub dropped_removed: usize,
    pub evicted: usize,
}

/// Reset every non-exempt tile of `world` and empty its dropped items.
///
/// Tiles are visited in index order. A tile whose item the catalog does not
/// know is left as-is rather than failing the whole pass.
pub fn clear_blocks(world: &mut World, items: &dyn ItemLookup, rules: &ClearRules) -> ClearReport {
    let mut report = ClearReport::default();
    for block in world.blocks.iter_mut() {
        report.scanned += 1;
        if block.is_empty() {
            continue;
        }
        let primary = block.primary_item();
        let Some(meta) = items.lookup(primary) else {
            warn!(
                "clear {}: no metadata for item {} at ({}, {}); tile skipped",
                world.name,
                primary,
                block.x(),
                block.y()
            );
            report.unknown_items += 1;
            continue;
        };
        if rules.is_exempt(block, meta) {
            report.exempted += 1;
            continue;
        }
        block.reset();
        report.cleared += 1;
    }
    report.dropped_removed = world.dropped.items.len();
    world.dropped = DroppedItems::default();
    report
}

pub struct WorldMutationEngine<'a> {
    items: &'a dyn ItemLookup,
    rules: &'a ClearRules,
    store: &'a dyn WorldPersistence,
    sessions: &'a SessionRegistry,
    retries: u32,
}

impl<'a> WorldMutationEngine<'a> {
    pub fn new(
        items: &'a dyn ItemLookup,
        rules: &'a ClearRules,
        store: &'a dyn WorldPersistence,
        sessions: &'a SessionRegistry,
    ) -> Self {
        Self {
            items,
            rules,
            store,
            sessions,
            retries: 1,
        }
    }

    /// Extra attempts per persistence step (0 = fail on first error).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Run the full clear sequence on `handle` on behalf of `actor`.
    pub async fn clear_world(&self, handle: &WorldHandle, actor: &Peer) -> Result<ClearReport, TileGateError> {
        let mut world = handle.lock().await;
        let before = world.clone();

        let mut report = clear_blocks(&mut world, self.items, self.rules);
        debug!(
            "clear {}: scanned={} cleared={} exempted={} unknown={} dropped={}",
            world.name,
            report.scanned,
            report.cleared,
            report.exempted,
            report.unknown_items,
            report.dropped_removed
        );

        if let Err(e) = self.persist(&world).await {
            error!("clear {} aborted: {}", world.name, e);
            *world = before;
            if let Err(e2) = self.store.save_to_cache(&world).await {
                warn!("clear {}: could not restore cache entry: {}", world.name, e2);
            }
            return Err(e);
        }

        actor.send_console(CLEAR_SUCCESS_MESSAGE);
        report.evicted = self.evict_all(&mut world);
        info!(
            target: "security",
            "world {} cleared by {} ({}): {} tiles cleared, {} occupants evicted",
            world.name,
            actor.name(),
            actor.id(),
            report.cleared,
            report.evicted
        );
        Ok(report)
    }

    async fn persist(&self, world: &World) -> Result<(), TileGateError> {
        self.save_step(PersistStage::Cache, world).await?;
        self.save_step(PersistStage::Database, world).await
    }

    async fn save_step(&self, stage: PersistStage, world: &World) -> Result<(), TileGateError> {
        let mut attempt = 0;
        loop {
            let result = match stage {
                PersistStage::Cache => self.store.save_to_cache(world).await,
                PersistStage::Database => self.store.save_to_database(world).await,
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("saving {} to {} failed ({}); retry {}", world.name, stage, e, attempt);
                }
                Err(e) => {
                    return Err(TileGateError::Persistence {
                        world: world.name.clone(),
                        stage,
                        reason: e.to_string(),
                    })
                }
            }
        }
    }

    fn evict_all(&self, world: &mut World) -> usize {
        let occupants = std::mem::take(&mut world.occupants);
        let mut evicted = 0;
        for peer_id in occupants {
            let Some(peer) = self.sessions.get(&peer_id) else {
                continue;
            };
            if peer.current_world().as_deref() == Some(world.name.as_str()) {
                peer.leave_world();
                evicted += 1;
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use crate::session::Outbound;
    use crate::world::items::{
        ItemCatalog, ItemType, BEDROCK, DIRT, MAIN_DOOR, SIGN, SMALL_LOCK, WORLD_LOCK,
    };
    use crate::world::TileExtension;
    use crate::BoxFuture;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    const TEST_LOCK: u16 = 100;

    fn catalog() -> ItemCatalog {
        ItemCatalog::builtin().with_item(ItemMetadata::new(TEST_LOCK, "Test Lock", ItemType::Lock))
    }

    fn one_tile_world(x: u16, y: u16, fg: u16, bg: u16) -> World {
        let mut w = World::empty("TEST", 8, 8);
        let b = w.block_mut(x, y).unwrap();
        b.fg = fg;
        b.bg = bg;
        w
    }

    #[test]
    fn non_main_lock_is_cleared() {
        let mut w = one_tile_world(5, 5, TEST_LOCK, 0);
        let report = clear_blocks(&mut w, &catalog(), &ClearRules::default());
        let b = w.block(5, 5).unwrap();
        assert_eq!((b.x(), b.y(), b.fg, b.bg), (5, 5, 0, 0));
        assert_eq!(report.cleared, 1);
    }

    #[test]
    fn main_door_and_bedrock_survive() {
        let mut w = one_tile_world(1, 1, MAIN_DOOR, 0);
        w.place_foreground(2, 7, BEDROCK);
        w.place_background(2, 7, 14);
        let before = w.clone();
        let report = clear_blocks(&mut w, &catalog(), &ClearRules::default());
        assert_eq!(w.block(1, 1), before.block(1, 1));
        assert_eq!(w.block(2, 7), before.block(2, 7));
        assert_eq!(report.exempted, 2);
    }

    #[test]
    fn main_locks_survive_area_locks_do_not() {
        let mut w = World::empty("TEST", 4, 4);
        w.place_foreground(0, 0, WORLD_LOCK);
        w.block_mut(0, 0).unwrap().extension = Some(TileExtension::Lock {
            owner_id: "p1".into(),
            admins: vec![],
            public: false,
        });
        w.place_foreground(1, 0, SMALL_LOCK);
        w.place_background(1, 0, 14);
        let before = w.clone();
        clear_blocks(&mut w, &catalog(), &ClearRules::default());
        assert_eq!(w.block(0, 0), before.block(0, 0));
        let area = w.block(1, 0).unwrap();
        assert_eq!((area.fg, area.bg), (0, 0));
    }

    #[test]
    fn extensions_and_flags_are_dropped() {
        let mut w = one_tile_world(3, 2, SIGN, 14);
        {
            let b = w.block_mut(3, 2).unwrap();
            b.flags = 0x1;
            b.extension = Some(TileExtension::Sign { text: "hi".into() });
        }
        clear_blocks(&mut w, &catalog(), &ClearRules::default());
        assert_eq!(w.block(3, 2).unwrap(), &Block::new(3, 2));
    }

    #[test]
    fn background_only_tiles_resolve_by_background() {
        let mut w = one_tile_world(0, 0, 0, 14);
        clear_blocks(&mut w, &catalog(), &ClearRules::default());
        assert!(w.block(0, 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_items_are_skipped_not_fatal() {
        let mut w = one_tile_world(0, 0, 9999, 0);
        w.place_foreground(1, 0, DIRT);
        let report = clear_blocks(&mut w, &catalog(), &ClearRules::default());
        assert_eq!(w.block(0, 0).unwrap().fg, 9999);
        assert_eq!(w.block(1, 0).unwrap().fg, 0);
        assert_eq!(report.unknown_items, 1);
        assert_eq!(report.cleared, 1);
    }

    #[test]
    fn clearing_twice_matches_clearing_once() {
        let mut w = World::generate("TWICE", 12, 8, MAIN_DOOR, BEDROCK);
        w.place_foreground(3, 1, WORLD_LOCK);
        w.place_foreground(4, 1, TEST_LOCK);
        w.drop_item(DIRT, 3, 10.0, 10.0);
        let rules = ClearRules::default();
        clear_blocks(&mut w, &catalog(), &rules);
        let once = w.clone();
        let second = clear_blocks(&mut w, &catalog(), &rules);
        assert_eq!(w, once);
        assert_eq!(second.cleared, 0);
    }

    #[test]
    fn dropped_items_are_reset() {
        let mut w = World::empty("DROPS", 2, 2);
        w.drop_item(DIRT, 1, 0.0, 0.0);
        w.drop_item(DIRT, 1, 0.0, 0.0);
        let report = clear_blocks(&mut w, &catalog(), &ClearRules::default());
        assert!(w.dropped.is_reset());
        assert_eq!(report.dropped_removed, 2);
    }

    #[test]
    fn empty_world_is_a_valid_noop() {
        let mut w = World::empty("VOID", 0, 0);
        w.drop_item(DIRT, 1, 0.0, 0.0);
        let report = clear_blocks(&mut w, &catalog(), &ClearRules::default());
        assert_eq!(report.scanned, 0);
        assert!(w.dropped.is_reset());
    }

    /// Persistence double that records call order and can fail on demand.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<&'static str>>,
        cache_failures: AtomicU32,
        db_failures: AtomicU32,
    }

    impl RecordingStore {
        fn failing(cache: u32, db: u32) -> Self {
            let s = Self::default();
            s.cache_failures.store(cache, Ordering::SeqCst);
            s.db_failures.store(db, Ordering::SeqCst);
            s
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn take_failure(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    impl WorldPersistence for RecordingStore {
        fn load_world<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, Result<Option<World>, TileGateError>> {
            Box::pin(async { Ok(None) })
        }

        fn save_to_cache<'a>(&'a self, _world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push("cache");
                if Self::take_failure(&self.cache_failures) {
                    return Err(TileGateError::Internal("cache down".into()));
                }
                Ok(())
            })
        }

        fn save_to_database<'a>(&'a self, _world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push("db");
                if Self::take_failure(&self.db_failures) {
                    return Err(TileGateError::Internal("db down".into()));
                }
                Ok(())
            })
        }
    }

    fn occupied_world(sessions: &SessionRegistry) -> (WorldHandle, Vec<tokio::sync::mpsc::UnboundedReceiver<Outbound>>) {
        let mut w = World::empty("BUSY", 4, 4);
        w.place_foreground(0, 0, DIRT);
        w.drop_item(DIRT, 1, 0.0, 0.0);
        let mut receivers = Vec::new();
        for id in ["a", "b"] {
            let (peer, rx) = Peer::new(id, id, Role::Developer);
            peer.set_world(Some("BUSY".into()));
            w.occupants.insert(id.to_string());
            sessions.insert(peer);
            receivers.push(rx);
        }
        (WorldHandle::new(w), receivers)
    }

    #[tokio::test]
    async fn persists_cache_then_db_then_notifies_and_evicts() {
        let sessions = SessionRegistry::new();
        let (handle, mut receivers) = occupied_world(&sessions);
        let store = RecordingStore::default();
        let (items, rules) = (catalog(), ClearRules::default());
        let actor = sessions.get("a").unwrap();

        let report = WorldMutationEngine::new(&items, &rules, &store, &sessions)
            .clear_world(&handle, &actor)
            .await
            .unwrap();

        assert_eq!(store.calls(), vec!["cache", "db"]);
        assert_eq!(report.evicted, 2);
        assert_eq!(
            receivers[0].try_recv().unwrap(),
            Outbound::Console(CLEAR_SUCCESS_MESSAGE.to_string())
        );
        assert_eq!(
            receivers[0].try_recv().unwrap(),
            Outbound::LeaveWorld { world: "BUSY".into() }
        );
        assert_eq!(
            receivers[1].try_recv().unwrap(),
            Outbound::LeaveWorld { world: "BUSY".into() }
        );
        let world = handle.snapshot().await;
        assert!(world.occupants.is_empty());
        assert!(world.block(0, 0).unwrap().is_empty());
        assert_eq!(sessions.get("b").unwrap().current_world(), None);
    }

    #[tokio::test]
    async fn single_failure_is_retried() {
        let sessions = SessionRegistry::new();
        let (handle, _rx) = occupied_world(&sessions);
        let store = RecordingStore::failing(0, 1);
        let (items, rules) = (catalog(), ClearRules::default());
        let actor = sessions.get("a").unwrap();

        let result = WorldMutationEngine::new(&items, &rules, &store, &sessions)
            .clear_world(&handle, &actor)
            .await;
        assert!(result.is_ok());
        assert_eq!(store.calls(), vec!["cache", "db", "db"]);
    }

    #[tokio::test]
    async fn persistence_failure_restores_and_keeps_everyone() {
        let sessions = SessionRegistry::new();
        let (handle, mut receivers) = occupied_world(&sessions);
        let before = handle.snapshot().await;
        let store = RecordingStore::failing(0, 5);
        let (items, rules) = (catalog(), ClearRules::default());
        let actor = sessions.get("a").unwrap();

        let err = WorldMutationEngine::new(&items, &rules, &store, &sessions)
            .clear_world(&handle, &actor)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TileGateError::Persistence { stage: PersistStage::Database, .. }
        ));
        assert_eq!(handle.snapshot().await, before);
        assert!(receivers[0].try_recv().is_err());
        assert!(receivers[1].try_recv().is_err());
        assert_eq!(actor.current_world().as_deref(), Some("BUSY"));
        // cache, db, db retry, then the cache is re-primed with the restored world
        assert_eq!(store.calls(), vec!["cache", "db", "db", "cache"]);
    }

    #[tokio::test]
    async fn cache_failure_never_reaches_db() {
        let sessions = SessionRegistry::new();
        let (handle, _rx) = occupied_world(&sessions);
        let store = RecordingStore::failing(2, 0);
        let (items, rules) = (catalog(), ClearRules::default());
        let actor = sessions.get("a").unwrap();

        let err = WorldMutationEngine::new(&items, &rules, &store, &sessions)
            .with_retries(1)
            .clear_world(&handle, &actor)
            .await
            .unwrap_err();
        assert!(err.is_persistence());
        assert!(!store.calls().contains(&"db"));
    }

    #[tokio::test]
    async fn occupants_that_already_moved_are_not_evicted() {
        let sessions = SessionRegistry::new();
        let (handle, mut receivers) = occupied_world(&sessions);
        sessions.get("b").unwrap().set_world(Some("ELSEWHERE".into()));
        let store = RecordingStore::default();
        let (items, rules) = (catalog(), ClearRules::default());
        let actor = sessions.get("a").unwrap();

        let report = WorldMutationEngine::new(&items, &rules, &store, &sessions)
            .clear_world(&handle, &actor)
            .await
            .unwrap();
        assert_eq!(report.evicted, 1);
        assert!(receivers[1].try_recv().is_err());
    }

    fn single_occupant(sessions: &SessionRegistry, w: &mut World) -> tokio::sync::mpsc::UnboundedReceiver<Outbound> {
        let (peer, rx) = Peer::new("a", "a", Role::Developer);
        peer.set_world(Some(w.name.clone()));
        w.occupants.insert("a".to_string());
        sessions.insert(peer);
        rx
    }

    #[tokio::test]
    async fn empty_world_still_persists_and_evicts() {
        let sessions = SessionRegistry::new();
        let mut w = World::empty("VOID", 0, 0);
        let mut rx = single_occupant(&sessions, &mut w);
        let handle = WorldHandle::new(w);
        let store = RecordingStore::default();
        let (items, rules) = (catalog(), ClearRules::default());
        let actor = sessions.get("a").unwrap();

        let report = WorldMutationEngine::new(&items, &rules, &store, &sessions)
            .clear_world(&handle, &actor)
            .await
            .unwrap();

        assert_eq!(report.scanned, 0);
        assert_eq!(report.evicted, 1);
        assert_eq!(store.calls(), vec!["cache", "db"]);
        assert_eq!(rx.try_recv().unwrap(), Outbound::Console(CLEAR_SUCCESS_MESSAGE.to_string()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::LeaveWorld { world: "VOID".into() });
    }

    #[tokio::test]
    async fn fully_exempt_world_still_persists_and_evicts() {
        let sessions = SessionRegistry::new();
        let mut w = World::empty("KEEP", 3, 1);
        w.place_foreground(0, 0, MAIN_DOOR);
        w.place_foreground(1, 0, BEDROCK);
        w.place_foreground(2, 0, WORLD_LOCK);
        let before = w.blocks.clone();
        let mut rx = single_occupant(&sessions, &mut w);
        let handle = WorldHandle::new(w);
        let store = RecordingStore::default();
        let (items, rules) = (catalog(), ClearRules::default());
        let actor = sessions.get("a").unwrap();

        let report = WorldMutationEngine::new(&items, &rules, &store, &sessions)
            .clear_world(&handle, &actor)
            .await
            .unwrap();

        assert_eq!(report.cleared, 0);
        assert_eq!(report.exempted, 3);
        assert_eq!(handle.snapshot().await.blocks, before);
        assert_eq!(store.calls(), vec!["cache", "db"]);
        assert_eq!(rx.try_recv().unwrap(), Outbound::Console(CLEAR_SUCCESS_MESSAGE.to_string()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::LeaveWorld { world: "KEEP".into() });
    }
}
