//! Chat commands.
//!
//! A command is a [`CommandDescriptor`] plus an async `execute`. Commands are
//! collected in a [`CommandRegistry`] at startup and reached through the
//! [`CommandDispatcher`], which applies the permission and throttle gates
//! before anything runs.

use std::sync::Arc;

use crate::error::TileGateError;
use crate::server::ServerContext;
use crate::session::Peer;
use crate::BoxFuture;

pub mod cmds;
pub mod descriptor;
pub mod dispatcher;
pub mod limiter;
pub mod registry;

pub use descriptor::{CommandDescriptor, DescriptorBuilder};
pub use dispatcher::{parse_command_line, CommandDispatcher, DispatchOutcome, GateRejection, ParsedCommand};
pub use limiter::{CommandLimiter, Throttle};
pub use registry::CommandRegistry;

/// Everything a command sees while it runs.
pub struct CommandContext<'a> {
    pub server: &'a ServerContext,
    pub registry: &'a CommandRegistry,
    pub peer: &'a Arc<Peer>,
    /// Alias the actor typed, lower-cased.
    pub alias: &'a str,
    pub args: &'a [String],
}

pub trait Command: Send + Sync {
    fn descriptor(&self) -> &CommandDescriptor;

    /// Run the command. Only called once every gate has passed.
    fn execute<'a>(&'a self, ctx: CommandContext<'a>) -> BoxFuture<'a, Result<(), TileGateError>>;
}
