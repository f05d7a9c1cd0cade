//! Built-in commands.

use std::sync::Arc;

use super::CommandRegistry;
use crate::confirm::ConfirmationFlow;
use crate::error::TileGateError;

pub mod clear_world;
pub mod help;

pub use clear_world::{ClearWorld, ConfirmClearWorld};
pub use help::Help;

pub fn builtin_registry() -> Result<CommandRegistry, TileGateError> {
    CommandRegistry::new()
        .with(Arc::new(Help::new()?))?
        .with(Arc::new(ClearWorld::new()?))
}

/// Confirmation handlers for the built-in commands that prompt.
pub fn builtin_confirmations() -> ConfirmationFlow {
    let mut flow = ConfirmationFlow::new();
    flow.register(Arc::new(ConfirmClearWorld));
    flow
}
