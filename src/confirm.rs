//! Two-phase confirmation for destructive commands.
//!
//! A command that needs the actor's consent records a
//! [`PendingConfirmation`] and sends a dialog carrying its token. When the
//! answer comes back, [`ConfirmationFlow`] looks the token up, checks the
//! actor still holds the required role and is still in the same world, and
//! only then hands over to the registered [`ConfirmHandler`].
//!
//! Tokens are single-use: a lookup consumes the record whatever the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, warn};
use uuid::Uuid;

use crate::config::MAX_CONFIRMATION_EXPIRY_SECS;
use crate::dialog::DialogResponse;
use crate::error::TileGateError;
use crate::logutil::escape_log;
use crate::metrics;
use crate::roles::{is_authorized, Role};
use crate::server::ServerContext;
use crate::session::Peer;
use crate::validation::parse_token;
use crate::world::WorldHandle;
use crate::BoxFuture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub token: Uuid,
    pub dialog_name: String,
    pub peer_id: String,
    /// World the actor stood in when prompted.
    pub world: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    UnknownToken,
    WrongPeer,
    WrongDialog,
    Expired,
    /// The actor left or switched worlds since the prompt.
    WorldChanged,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StaleReason::UnknownToken => "unknown token",
            StaleReason::WrongPeer => "token issued to another peer",
            StaleReason::WrongDialog => "token issued for another dialog",
            StaleReason::Expired => "expired",
            StaleReason::WorldChanged => "actor changed worlds",
        };
        f.write_str(s)
    }
}

pub struct ConfirmationRegistry {
    pending: Mutex<HashMap<Uuid, PendingConfirmation>>,
    ttl: Duration,
}

impl ConfirmationRegistry {
    /// Expiry is clamped to [`MAX_CONFIRMATION_EXPIRY_SECS`].
    pub fn new(expiry_seconds: u64) -> Self {
        let secs = expiry_seconds.min(MAX_CONFIRMATION_EXPIRY_SECS);
        let ttl = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::days(1));
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Record a prompt and return its token.
    pub fn issue(&self, dialog_name: &str, peer_id: &str, world: Option<String>, now: DateTime<Utc>) -> Uuid {
        let token = Uuid::new_v4();
        let record = PendingConfirmation {
            token,
            dialog_name: dialog_name.to_string(),
            peer_id: peer_id.to_string(),
            world,
            created_at: now,
            expires_at: now + self.ttl,
        };
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|_, p| p.expires_at > now);
        pending.insert(token, record);
        token
    }

    /// Consume the record for `token` and check it belongs to this answer.
    pub fn take(
        &self,
        token: Uuid,
        peer_id: &str,
        dialog_name: &str,
        now: DateTime<Utc>,
    ) -> Result<PendingConfirmation, StaleReason> {
        let record = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&token)
            .ok_or(StaleReason::UnknownToken)?;
        if record.peer_id != peer_id {
            return Err(StaleReason::WrongPeer);
        }
        if record.dialog_name != dialog_name {
            return Err(StaleReason::WrongDialog);
        }
        if record.expires_at <= now {
            return Err(StaleReason::Expired);
        }
        Ok(record)
    }

    /// Drop everything issued to `peer_id` (disconnect).
    pub fn revoke_peer(&self, peer_id: &str) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let before = pending.len();
        pending.retain(|_, p| p.peer_id != peer_id);
        before - pending.len()
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let before = pending.len();
        pending.retain(|_, p| p.expires_at > now);
        before - pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a handler gets once every re-check has passed.
pub struct ConfirmContext<'a> {
    pub server: &'a ServerContext,
    pub peer: &'a Arc<Peer>,
    /// The actor's current world, when the prompt was tied to one.
    pub world: Option<Arc<WorldHandle>>,
    pub pending: &'a PendingConfirmation,
}

pub trait ConfirmHandler: Send + Sync {
    fn dialog_name(&self) -> &'static str;

    /// Roles allowed to complete the action, checked again on every answer.
    fn permission(&self) -> &[Role];

    fn confirm<'a>(&'a self, ctx: ConfirmContext<'a>) -> BoxFuture<'a, Result<(), TileGateError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Not a dialog any handler answers for, or carried no usable token.
    Ignored,
    Stale(StaleReason),
    Cancelled,
    /// The actor lost the required role between prompt and answer.
    Denied,
    Completed,
    Failed,
}

#[derive(Default)]
pub struct ConfirmationFlow {
    handlers: HashMap<&'static str, Arc<dyn ConfirmHandler>>,
}

impl ConfirmationFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ConfirmHandler>) {
        self.handlers.insert(handler.dialog_name(), handler);
    }

    pub fn handles(&self, dialog_name: &str) -> bool {
        self.handlers.contains_key(dialog_name)
    }

    pub async fn handle_response(
        &self,
        server: &ServerContext,
        peer: &Arc<Peer>,
        response: &DialogResponse,
    ) -> ResponseOutcome {
        self.handle_response_at(server, peer, response, Utc::now()).await
    }

    pub async fn handle_response_at(
        &self,
        server: &ServerContext,
        peer: &Arc<Peer>,
        response: &DialogResponse,
        now: DateTime<Utc>,
    ) -> ResponseOutcome {
        let Some(name) = response.dialog_name.as_deref() else {
            debug!("dialog response from {} without a dialog name", peer.id());
            return ResponseOutcome::Ignored;
        };
        let Some(handler) = self.handlers.get(name) else {
            debug!("no confirmation handler for dialog {}", escape_log(name));
            return ResponseOutcome::Ignored;
        };
        let Some(token) = response.token.as_deref().and_then(|t| parse_token(t).ok()) else {
            metrics::inc_dialogs_dropped();
            warn!(
                target: "security",
                "dialog {} from {} carried no valid token",
                name,
                peer.id()
            );
            return ResponseOutcome::Ignored;
        };

        let pending = match server.confirmations.take(token, peer.id(), name, now) {
            Ok(p) => p,
            Err(reason) => return Self::stale(peer, name, reason),
        };

        if !response.is_confirm() {
            debug!("{} dismissed dialog {}", peer.id(), name);
            return ResponseOutcome::Cancelled;
        }

        if !is_authorized(peer.level(), handler.permission()) {
            metrics::inc_commands_denied();
            warn!(
                target: "security",
                "{} ({}) confirmed {} without the required role (now {})",
                peer.name(),
                peer.id(),
                name,
                peer.role()
            );
            return ResponseOutcome::Denied;
        }

        let world = match &pending.world {
            None => None,
            Some(prompted) => {
                if peer.current_world().as_deref() != Some(prompted.as_str()) {
                    return Self::stale(peer, name, StaleReason::WorldChanged);
                }
                match server.worlds.get_loaded(prompted) {
                    Some(handle) => Some(handle),
                    None => return Self::stale(peer, name, StaleReason::WorldChanged),
                }
            }
        };

        let ctx = ConfirmContext {
            server,
            peer,
            world,
            pending: &pending,
        };
        match handler.confirm(ctx).await {
            Ok(()) => ResponseOutcome::Completed,
            Err(e) => {
                error!("confirmation {} for {} failed: {}", name, peer.id(), e);
                ResponseOutcome::Failed
            }
        }
    }

    fn stale(peer: &Peer, dialog: &str, reason: StaleReason) -> ResponseOutcome {
        metrics::inc_dialogs_dropped();
        warn!(
            target: "security",
            "dropped {} response from {}: {}",
            dialog,
            peer.id(),
            reason
        );
        ResponseOutcome::Stale(reason)
    }
}
