//! # Game server facade
//!
//! [`GameServer`] wires the command core together: the shared
//! [`ServerContext`] (config, sessions, worlds, item catalog, pending
//! confirmations), the [`CommandDispatcher`] and the [`ConfirmationFlow`].
//! The transport calls [`GameServer::handle_chat`] for every chat line and
//! [`GameServer::handle_dialog_response`] for every dialog answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::mpsc;

use crate::command::cmds::{builtin_confirmations, builtin_registry};
use crate::command::{CommandDispatcher, DispatchOutcome};
use crate::config::Config;
use crate::confirm::{ConfirmationFlow, ConfirmationRegistry, ResponseOutcome};
use crate::dialog::DialogResponse;
use crate::error::TileGateError;
use crate::roles::Role;
use crate::session::{Outbound, Peer, SessionRegistry};
use crate::storage::{WorldPersistence, WorldStore};
use crate::world::{ClearRules, ItemCatalog, ItemLookup, WorldHandle, WorldManager};

/// State shared by every command and confirmation handler.
pub struct ServerContext {
    pub config: Config,
    pub sessions: SessionRegistry,
    pub worlds: WorldManager,
    pub items: Arc<dyn ItemLookup>,
    pub rules: ClearRules,
    pub confirmations: ConfirmationRegistry,
}

pub struct GameServer {
    ctx: ServerContext,
    dispatcher: CommandDispatcher,
    confirmations: ConfirmationFlow,
}

impl GameServer {
    /// Open the world store and item catalog named by `config`.
    pub async fn new(config: Config) -> Result<Self, TileGateError> {
        let store = WorldStore::open(config.storage.resolved_db_path(), config.storage.cache_capacity)?;
        let items = match &config.items.catalog_path {
            Some(path) => {
                let catalog = ItemCatalog::from_json_file(path)?;
                info!("loaded {} items from {}", catalog.len(), path);
                catalog
            }
            None => ItemCatalog::builtin(),
        };
        Self::with_parts(config, Arc::new(store), Arc::new(items))
    }

    /// Build a server on top of an existing store and catalog.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn WorldPersistence>,
        items: Arc<dyn ItemLookup>,
    ) -> Result<Self, TileGateError> {
        let registry = Arc::new(builtin_registry()?);
        let dispatcher = CommandDispatcher::new(
            registry,
            config.command_prefix(),
            config.server.max_command_length,
        );
        let ctx = ServerContext {
            sessions: SessionRegistry::new(),
            worlds: WorldManager::new(store, config.world.clone()),
            items,
            rules: ClearRules::from_config(&config.world),
            confirmations: ConfirmationRegistry::new(config.confirmation.expiry_seconds),
            config,
        };
        Ok(Self {
            ctx,
            dispatcher,
            confirmations: builtin_confirmations(),
        })
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Register a newly connected peer.
    pub fn connect(&self, id: &str, name: &str, role: Role) -> (Arc<Peer>, mpsc::UnboundedReceiver<Outbound>) {
        let (peer, rx) = Peer::new(id, name, role);
        self.ctx.sessions.insert(Arc::clone(&peer));
        info!("peer {} ({}) connected as {}", id, name, role);
        (peer, rx)
    }

    /// Forget a peer: leave its world, drop pending prompts and throttle state.
    pub async fn disconnect(&self, peer_id: &str) {
        let Some(peer) = self.ctx.sessions.remove(peer_id) else {
            return;
        };
        self.ctx.worlds.leave(&peer).await;
        let revoked = self.ctx.confirmations.revoke_peer(peer_id);
        self.dispatcher.limiter().reset_peer(peer_id);
        debug!("peer {} disconnected ({} pending prompts revoked)", peer_id, revoked);
    }

    pub async fn enter_world(&self, peer: &Arc<Peer>, name: &str) -> Result<Arc<WorldHandle>, TileGateError> {
        self.ctx.worlds.enter(peer, name).await
    }

    pub async fn handle_chat(&self, peer: &Arc<Peer>, text: &str) -> DispatchOutcome {
        self.dispatcher.dispatch(&self.ctx, peer, text).await
    }

    pub async fn handle_chat_at(&self, peer: &Arc<Peer>, text: &str, now: DateTime<Utc>) -> DispatchOutcome {
        self.dispatcher.dispatch_at(&self.ctx, peer, text, now).await
    }

    pub async fn handle_dialog_response(&self, peer: &Arc<Peer>, response: &DialogResponse) -> ResponseOutcome {
        self.confirmations.handle_response(&self.ctx, peer, response).await
    }

    pub async fn handle_dialog_response_at(
        &self,
        peer: &Arc<Peer>,
        response: &DialogResponse,
        now: DateTime<Utc>,
    ) -> ResponseOutcome {
        self.confirmations
            .handle_response_at(&self.ctx, peer, response, now)
            .await
    }

    /// Drop expired prompts and closed throttle windows.
    pub fn housekeeping(&self, now: DateTime<Utc>) {
        let prompts = self.ctx.confirmations.purge_expired(now);
        let windows = self.dispatcher.limiter().purge_expired(now);
        if prompts + windows > 0 {
            debug!("housekeeping: {} prompts and {} throttle windows expired", prompts, windows);
        }
    }
}
