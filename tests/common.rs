//! Test utilities & fixtures.
//! An in-memory world store with switchable failures, plus server builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedReceiver;

use tilegate::config::{Config, WorldConfig};
use tilegate::error::TileGateError;
use tilegate::server::GameServer;
use tilegate::session::Outbound;
use tilegate::storage::WorldPersistence;
use tilegate::world::{ItemCatalog, World};
use tilegate::BoxFuture;

#[derive(Default)]
pub struct MemoryStore {
    cache: Mutex<HashMap<String, World>>,
    durable: Mutex<HashMap<String, World>>,
    pub fail_db: AtomicBool,
    pub db_writes: Mutex<u32>,
}

impl MemoryStore {
    pub fn durable(&self, name: &str) -> Option<World> {
        self.durable.lock().unwrap().get(name).cloned()
    }

    pub fn cached(&self, name: &str) -> Option<World> {
        self.cache.lock().unwrap().get(name).cloned()
    }

    pub fn db_writes(&self) -> u32 {
        *self.db_writes.lock().unwrap()
    }

    pub fn set_db_failing(&self, failing: bool) {
        self.fail_db.store(failing, Ordering::SeqCst);
    }
}

impl WorldPersistence for MemoryStore {
    fn load_world<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<World>, TileGateError>> {
        Box::pin(async move {
            if let Some(w) = self.cached(name) {
                return Ok(Some(w));
            }
            Ok(self.durable(name))
        })
    }

    fn save_to_cache<'a>(&'a self, world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>> {
        Box::pin(async move {
            self.cache.lock().unwrap().insert(world.name.clone(), world.clone());
            Ok(())
        })
    }

    fn save_to_database<'a>(&'a self, world: &'a World) -> BoxFuture<'a, Result<(), TileGateError>> {
        Box::pin(async move {
            *self.db_writes.lock().unwrap() += 1;
            if self.fail_db.load(Ordering::SeqCst) {
                return Err(TileGateError::Internal("disk unavailable".into()));
            }
            self.durable.lock().unwrap().insert(world.name.clone(), world.clone());
            Ok(())
        })
    }
}

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.logging.file = None;
    cfg.logging.security_file = None;
    cfg.world = WorldConfig {
        width: 12,
        height: 8,
        ..WorldConfig::default()
    };
    cfg
}

pub fn server() -> (GameServer, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let server = GameServer::with_parts(
        test_config(),
        store.clone(),
        Arc::new(ItemCatalog::builtin()),
    )
    .unwrap();
    (server, store)
}

pub fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

pub fn console_lines(msgs: &[Outbound]) -> Vec<String> {
    msgs.iter()
        .filter_map(|m| match m {
            Outbound::Console(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}
