//! Connected peers as seen by the command core.
//!
//! The network layer owns the real connection; a [`Peer`] is the handle the
//! core uses to read a player's role and world and to queue outbound messages.
//! Role and world sit behind a lock because they can change while a dialog is
//! still waiting for an answer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;
use tokio::sync::mpsc;

use crate::dialog::DialogRequest;
use crate::roles::Role;

/// Messages queued for delivery to one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// One console line.
    Console(String),
    Dialog(DialogRequest),
    /// The peer was removed from `world` and must reload.
    LeaveWorld { world: String },
}

#[derive(Debug, Clone)]
struct PeerData {
    role: Role,
    world: Option<String>,
}

#[derive(Debug)]
pub struct Peer {
    id: String,
    name: String,
    data: RwLock<PeerData>,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Peer {
    pub fn new(id: &str, name: &str, role: Role) -> (Arc<Peer>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = Peer {
            id: id.to_string(),
            name: name.to_string(),
            data: RwLock::new(PeerData { role, world: None }),
            tx,
        };
        (Arc::new(peer), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> PeerData {
        self.data.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn role(&self) -> Role {
        self.read().role
    }

    pub fn level(&self) -> u8 {
        self.role().level()
    }

    pub fn set_role(&self, role: Role) {
        self.data.write().unwrap_or_else(|e| e.into_inner()).role = role;
    }

    pub fn current_world(&self) -> Option<String> {
        self.read().world
    }

    pub fn set_world(&self, world: Option<String>) {
        self.data.write().unwrap_or_else(|e| e.into_inner()).world = world;
    }

    /// Queue a message. A closed channel means the peer disconnected; the
    /// message is dropped.
    pub fn send(&self, msg: Outbound) {
        if self.tx.send(msg).is_err() {
            debug!("peer {} disconnected; dropping outbound message", self.id);
        }
    }

    pub fn send_console(&self, text: impl Into<String>) {
        self.send(Outbound::Console(text.into()));
    }

    pub fn send_dialog(&self, dialog: DialogRequest) {
        self.send(Outbound::Dialog(dialog));
    }

    /// Drop the peer out of its current world, if any, and tell the client.
    pub fn leave_world(&self) -> Option<String> {
        let left = {
            let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
            data.world.take()
        };
        if let Some(world) = &left {
            self.send(Outbound::LeaveWorld {
                world: world.clone(),
            });
        }
        left
    }
}

/// All connected peers, keyed by peer id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    peers: RwLock<HashMap<String, Arc<Peer>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, peer: Arc<Peer>) {
        self.peers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(peer.id().to_string(), peer);
    }

    pub fn remove(&self, peer_id: &str) -> Option<Arc<Peer>> {
        self.peers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(peer_id)
    }

    pub fn get(&self, peer_id: &str) -> Option<Arc<Peer>> {
        self.peers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(peer_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
