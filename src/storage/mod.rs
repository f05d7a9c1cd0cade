//! # Storage - world persistence
//!
//! Worlds are saved in two steps, always in this order:
//!
//! 1. the fast-path cache (an in-memory LRU of encoded worlds), then
//! 2. durable storage (a sled tree, flushed before the save reports success).
//!
//! ```text
//! data/
//! └── worlds/         ← sled database, tree "worlds", key "worlds:<NAME>"
//! ```
//!
//! Both steps are exposed through [`WorldPersistence`] so the world layer can
//! be driven against other backends (and failing ones in tests).

pub mod cache;

use std::path::Path;

use log::debug;

use crate::error::TileGateError;
use crate::world::{World, WORLD_SCHEMA_VERSION};
use crate::BoxFuture;

pub use cache::WorldCache;

const TREE_WORLDS: &str = "worlds";

/// Persistence contract for worlds.
pub trait WorldPersistence: Send + Sync {
    /// Cache first, then durable storage. `Ok(None)` when the world was never saved.
    fn load_world<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<World>, TileGateError>>;

    fn save_to_cache<'a>(&'a self, world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>>;

    fn save_to_database<'a>(&'a self, world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>>;
}

/// Sled-backed durable store with an LRU cache in front.
pub struct WorldStore {
    _db: sled::Db,
    worlds: sled::Tree,
    cache: WorldCache,
}

impl WorldStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P, cache_capacity: usize) -> Result<Self, TileGateError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let worlds = db.open_tree(TREE_WORLDS)?;
        Ok(Self {
            _db: db,
            worlds,
            cache: WorldCache::new(cache_capacity),
        })
    }

    fn world_key(name: &str) -> Vec<u8> {
        format!("worlds:{}", name.to_ascii_uppercase()).into_bytes()
    }

    fn encode(world: &World) -> Result<Vec<u8>, TileGateError> {
        Ok(bincode::serialize(world)?)
    }

    fn decode(bytes: &[u8]) -> Result<World, TileGateError> {
        let world: World = bincode::deserialize(bytes)?;
        if world.schema_version != WORLD_SCHEMA_VERSION {
            return Err(TileGateError::SchemaMismatch {
                entity: "world",
                expected: WORLD_SCHEMA_VERSION,
                found: world.schema_version,
            });
        }
        Ok(world)
    }

    /// Read a world straight from durable storage, bypassing the cache.
    pub fn get_durable(&self, name: &str) -> Result<Option<World>, TileGateError> {
        match self.worlds.get(Self::world_key(name))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read a world from the cache only.
    pub fn get_cached(&self, name: &str) -> Result<Option<World>, TileGateError> {
        match self.cache.get(&name.to_ascii_uppercase()) {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Names of every durably stored world.
    pub fn list_world_names(&self) -> Result<Vec<String>, TileGateError> {
        let mut names = Vec::new();
        for entry in self.worlds.scan_prefix(b"worlds:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(name) = text.strip_prefix("worlds:") {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    pub fn cache(&self) -> &WorldCache {
        &self.cache
    }
}

impl WorldPersistence for WorldStore {
    fn load_world<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<World>, TileGateError>> {
        Box::pin(async move {
            if let Some(world) = self.get_cached(name)? {
                debug!("world {} served from cache", name);
                return Ok(Some(world));
            }
            let world = self.get_durable(name)?;
            if let Some(w) = &world {
                self.cache.put(&w.name.to_ascii_uppercase(), Self::encode(w)?);
            }
            Ok(world)
        })
    }

    fn save_to_cache<'a>(&'a self, world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>> {
        Box::pin(async move {
            let bytes = Self::encode(world)?;
            self.cache.put(&world.name.to_ascii_uppercase(), bytes);
            Ok(())
        })
    }

    fn save_to_database<'a>(&'a self, world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>> {
        Box::pin(async move {
            let bytes = Self::encode(world)?;
            self.worlds.insert(Self::world_key(&world.name), bytes)?;
            self.worlds.flush_async().await?;
            Ok(())
        })
    }
}
