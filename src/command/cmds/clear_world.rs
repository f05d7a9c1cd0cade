use chrono::Utc;
use log::{error, info};

use crate::command::{Command, CommandContext, CommandDescriptor};
use crate::confirm::{ConfirmContext, ConfirmHandler};
use crate::dialog::DialogRequest;
use crate::error::TileGateError;
use crate::metrics;
use crate::roles::Role;
use crate::world::WorldMutationEngine;
use crate::BoxFuture;

pub const CONFIRM_DIALOG: &str = "confirm_clearworld";
pub const NOT_IN_WORLD: &str = "You must be in a world to use this command.";
pub const CLEAR_FAILED: &str = "`4Failed to clear the world.`` Nothing was changed, please try again.";
const WARNING_ICON: u16 = 1432;

const DEVELOPER_ONLY: &[Role] = &[Role::Developer];

/// `/clearworld` asks for confirmation; [`ConfirmClearWorld`] does the work.
pub struct ClearWorld {
    descriptor: CommandDescriptor,
}

impl ClearWorld {
    pub fn new() -> Result<Self, TileGateError> {
        let descriptor = CommandDescriptor::builder(&["clearworld", "cw"])
            .description("Clear a world")
            .cooldown(10)
            .rate_limit(1)
            .category("`bDev")
            .usage("/clearworld")
            .example("/clearworld")
            .permission(DEVELOPER_ONLY)
            .build()?;
        Ok(Self { descriptor })
    }
}

pub fn warning_dialog() -> DialogRequest {
    DialogRequest::new(CONFIRM_DIALOG)
        .label_with_icon("Warning", WARNING_ICON)
        .text("This will clear everything on your world, including your building. Are you sure?")
        .buttons("Nevermind", "Yes")
}

impl Command for ClearWorld {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    fn execute<'a>(&'a self, ctx: CommandContext<'a>) -> BoxFuture<'a, Result<(), TileGateError>> {
        Box::pin(async move {
            let Some(world) = ctx.peer.current_world() else {
                ctx.peer.send_console(NOT_IN_WORLD);
                return Ok(());
            };
            let token = ctx
                .server
                .confirmations
                .issue(CONFIRM_DIALOG, ctx.peer.id(), Some(world.clone()), Utc::now());
            ctx.peer.send_dialog(warning_dialog().with_token(token));
            metrics::inc_dialogs_prompted();
            info!("{} asked to clear world {}", ctx.peer.id(), world);
            Ok(())
        })
    }
}

pub struct ConfirmClearWorld;

impl ConfirmHandler for ConfirmClearWorld {
    fn dialog_name(&self) -> &'static str {
        CONFIRM_DIALOG
    }

    fn permission(&self) -> &[Role] {
        DEVELOPER_ONLY
    }

    fn confirm<'a>(&'a self, ctx: ConfirmContext<'a>) -> BoxFuture<'a, Result<(), TileGateError>> {
        Box::pin(async move {
            let Some(handle) = ctx.world else {
                return Err(TileGateError::Internal(format!(
                    "{} confirmed without a world",
                    CONFIRM_DIALOG
                )));
            };
            let server = ctx.server;
            let engine = WorldMutationEngine::new(
                server.items.as_ref(),
                &server.rules,
                server.worlds.store(),
                &server.sessions,
            )
            .with_retries(server.config.confirmation.persistence_retries);

            match engine.clear_world(&handle, ctx.peer).await {
                Ok(report) => {
                    metrics::record_clear_completed(report.cleared as u64);
                    Ok(())
                }
                Err(e) => {
                    metrics::inc_clears_failed();
                    error!("clearing {} for {} failed: {}", handle.name(), ctx.peer.id(), e);
                    ctx.peer.send_console(CLEAR_FAILED);
                    Err(e)
                }
            }
        })
    }
}
