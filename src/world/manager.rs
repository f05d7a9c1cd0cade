//! Loaded worlds and world membership.
//!
//! Every loaded world sits behind its own async mutex. Anything that changes a
//! world's blocks, dropped items or occupants (gameplay, joins, the clear
//! sequence) holds that lock for the whole change, so a clear is never
//! interleaved with other writes to the same world.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use super::World;
use crate::config::WorldConfig;
use crate::error::TileGateError;
use crate::session::Peer;
use crate::storage::WorldPersistence;
use crate::validation::normalize_world_name;

pub struct WorldHandle {
    name: String,
    world: AsyncMutex<World>,
}

impl WorldHandle {
    pub fn new(world: World) -> Self {
        Self {
            name: world.name.clone(),
            world: AsyncMutex::new(world),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the world's mutation lock.
    pub async fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().await
    }

    /// Copy of the current world state.
    pub async fn snapshot(&self) -> World {
        self.world.lock().await.clone()
    }
}

pub struct WorldManager {
    store: Arc<dyn WorldPersistence>,
    settings: WorldConfig,
    loaded: Mutex<HashMap<String, Arc<WorldHandle>>>,
}

impl WorldManager {
    pub fn new(store: Arc<dyn WorldPersistence>, settings: WorldConfig) -> Self {
        Self {
            store,
            settings,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &dyn WorldPersistence {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &WorldConfig {
        &self.settings
    }

    pub fn get_loaded(&self, name: &str) -> Option<Arc<WorldHandle>> {
        let key = name.to_ascii_uppercase();
        self.loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Register an already-built world, replacing nothing if the name is taken.
    pub fn insert(&self, world: World) -> Arc<WorldHandle> {
        let key = world.name.to_ascii_uppercase();
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        loaded
            .entry(key)
            .or_insert_with(|| Arc::new(WorldHandle::new(world)))
            .clone()
    }

    /// Return the loaded world, loading it from storage or generating a new
    /// one when it has never been saved.
    pub async fn get_or_load(&self, name: &str) -> Result<Arc<WorldHandle>, TileGateError> {
        let name = normalize_world_name(name)
            .map_err(|e| TileGateError::NotFound(e.to_string()))?;
        if let Some(handle) = self.get_loaded(&name) {
            return Ok(handle);
        }
        let world = match self.store.load_world(&name).await? {
            Some(world) => {
                debug!("loaded world {} from storage", name);
                world
            }
            None => {
                info!("generating new world {}", name);
                World::generate(
                    &name,
                    self.settings.width,
                    self.settings.height,
                    self.settings.main_door_id,
                    self.settings.bedrock_id,
                )
            }
        };
        // Another task may have loaded the same world while we awaited storage.
        Ok(self.insert(world))
    }

    /// Move `peer` into world `name`, leaving its current world first.
    pub async fn enter(&self, peer: &Arc<Peer>, name: &str) -> Result<Arc<WorldHandle>, TileGateError> {
        // Load first: a bad name or a storage error leaves the peer where it was.
        let handle = self.get_or_load(name).await?;
        self.leave(peer).await;
        {
            let mut world = handle.lock().await;
            world.occupants.insert(peer.id().to_string());
            peer.set_world(Some(world.name.clone()));
        }
        debug!("peer {} entered {}", peer.id(), handle.name());
        Ok(handle)
    }

    /// Remove `peer` from whatever world it is in.
    pub async fn leave(&self, peer: &Arc<Peer>) {
        let Some(current) = peer.current_world() else {
            return;
        };
        if let Some(handle) = self.get_loaded(&current) {
            handle.lock().await.occupants.remove(peer.id());
        }
        peer.leave_world();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use crate::session::Outbound;
    use crate::storage::WorldStore;
    use tempfile::TempDir;

    fn manager() -> (WorldManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(WorldStore::open(dir.path(), 8).unwrap());
        let settings = WorldConfig {
            width: 10,
            height: 6,
            ..WorldConfig::default()
        };
        (WorldManager::new(store, settings), dir)
    }

    #[tokio::test]
    async fn new_worlds_are_generated_once() {
        let (mgr, _dir) = manager();
        let a = mgr.get_or_load("start").await.unwrap();
        let b = mgr.get_or_load("START").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "START");
        assert_eq!(a.snapshot().await.blocks.len(), 60);
        assert_eq!(mgr.loaded_names(), vec!["START".to_string()]);
    }

    #[tokio::test]
    async fn invalid_names_are_refused() {
        let (mgr, _dir) = manager();
        assert!(mgr.get_or_load("no/pe").await.is_err());
    }

    #[tokio::test]
    async fn failed_enter_keeps_current_world() {
        let (mgr, _dir) = manager();
        let (peer, mut rx) = Peer::new("p1", "alice", Role::Basic);
        let home = mgr.enter(&peer, "home").await.unwrap();

        assert!(mgr.enter(&peer, "no/pe").await.is_err());
        assert_eq!(peer.current_world().as_deref(), Some("HOME"));
        assert!(home.snapshot().await.has_occupant("p1"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn enter_and_leave_track_occupants() {
        let (mgr, _dir) = manager();
        let (peer, mut rx) = Peer::new("p1", "alice", Role::Basic);
        let first = mgr.enter(&peer, "one").await.unwrap();
        assert!(first.snapshot().await.has_occupant("p1"));
        assert_eq!(peer.current_world().as_deref(), Some("ONE"));

        let second = mgr.enter(&peer, "two").await.unwrap();
        assert!(!first.snapshot().await.has_occupant("p1"));
        assert!(second.snapshot().await.has_occupant("p1"));
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::LeaveWorld { world: "ONE".into() }
        );

        mgr.leave(&peer).await;
        assert!(!second.snapshot().await.has_occupant("p1"));
        assert_eq!(peer.current_world(), None);
    }
}
