//! # Tilegate - command core for tile-world game servers
//!
//! Tilegate is the part of a multiplayer tile-world server that turns chat
//! lines into permission-gated commands and carries out destructive world
//! edits behind a confirmation dialog.
//!
//! ## Features
//!
//! - **Command dispatch**: alias lookup, minimum-role permission checks and
//!   per-player cooldown and rate-limit windows.
//! - **Confirmation flow**: single-use, expiring tokens for dialog round trips,
//!   with the actor's role and world checked again when the answer arrives.
//! - **World clearing**: lock-aware tile reset under a per-world lock, saved to
//!   cache and durable storage before anyone is told or evicted.
//! - **Storage**: sled-backed worlds behind an in-memory LRU cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tilegate::config::Config;
//! use tilegate::roles::Role;
//! use tilegate::server::GameServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let server = GameServer::new(config).await?;
//!
//!     let (peer, mut outbox) = server.connect("p1", "alice", Role::Developer);
//!     server.enter_world(&peer, "START").await?;
//!     server.handle_chat(&peer, "/help").await;
//!     while let Ok(msg) = outbox.try_recv() {
//!         println!("{:?}", msg);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`command`] - descriptors, registry, throttling, dispatcher and built-in commands
//! - [`confirm`] - pending confirmations and the dialog answer flow
//! - [`world`] - world model, item catalog, lock registry and the clear engine
//! - [`storage`] - cache and sled persistence
//! - [`session`] - connected peers and their outbound queues
//! - [`config`] - configuration management and validation
//! - [`validation`] - input validation and sanitization utilities

use std::future::Future;
use std::pin::Pin;

pub mod command;
pub mod config;
pub mod confirm;
pub mod dialog;
pub mod error;
pub mod logutil;
pub mod metrics;
pub mod roles;
pub mod server;
pub mod session;
pub mod storage;
pub mod validation;
pub mod world;

/// Boxed future used by the object-safe async traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
