use crate::command::{Command, CommandContext, CommandDescriptor, CommandRegistry};
use crate::dialog::DialogRequest;
use crate::error::TileGateError;
use crate::roles::{Role, LEVEL_DEVELOPER, LEVEL_SUPPORTER};
use crate::BoxFuture;

pub const HELP_DIALOG: &str = "help_end";
pub const NO_SUCH_COMMAND: &str = "It seems that command doesn't exist.";

/// `/help` lists the commands the actor may use; `/help <alias>` describes one.
pub struct Help {
    descriptor: CommandDescriptor,
}

impl Help {
    pub fn new() -> Result<Self, TileGateError> {
        let descriptor = CommandDescriptor::builder(&["help", "?"])
            .description("Shows available commands separated by role")
            .cooldown(5)
            .rate_limit(1)
            .category("`oBasic")
            .usage("/help [command]")
            .example("/help")
            .example("/help clearworld")
            .permission(&[Role::Basic, Role::Supporter, Role::Developer])
            .build()?;
        Ok(Self { descriptor })
    }
}

impl Command for Help {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    fn execute<'a>(&'a self, ctx: CommandContext<'a>) -> BoxFuture<'a, Result<(), TileGateError>> {
        Box::pin(async move {
            match ctx.args.first() {
                Some(alias) => match ctx.registry.lookup(alias) {
                    Some(cmd) => ctx.peer.send_dialog(detail_dialog(&alias.to_ascii_lowercase(), cmd.descriptor())),
                    None => ctx.peer.send_console(NO_SUCH_COMMAND),
                },
                None => {
                    for line in overview_lines(ctx.registry, ctx.peer.level()) {
                        ctx.peer.send_console(line);
                    }
                }
            }
            Ok(())
        })
    }
}

/// Console lines for the no-argument form, one per non-empty tier.
///
/// A command lands in the bucket of the lowest tier it lists. Supporter and
/// Developer buckets are only shown to actors at or above that tier.
pub fn overview_lines(registry: &CommandRegistry, level: u8) -> Vec<String> {
    let mut basic = Vec::new();
    let mut supporter = Vec::new();
    let mut developer = Vec::new();

    for cmd in registry.commands() {
        let d = cmd.descriptor();
        if !d.allows(level) {
            continue;
        }
        let name = d.name().to_string();
        match d.minimum_role().unwrap_or(Role::Basic) {
            Role::Basic => basic.push(name),
            Role::Supporter => supporter.push(name),
            Role::Developer => developer.push(name),
        }
    }
    basic.sort();
    supporter.sort();
    developer.sort();

    let mut lines = Vec::new();
    if !basic.is_empty() {
        lines.push(format!("`oBasic Commands: `w{}", basic.join(", ")));
    }
    if level >= LEVEL_SUPPORTER && !supporter.is_empty() {
        lines.push(format!("`9Supporter Commands: `w{}", supporter.join(", ")));
    }
    if level >= LEVEL_DEVELOPER && !developer.is_empty() {
        lines.push(format!("`bDeveloper Commands: `w{}", developer.join(", ")));
    }
    lines
}

pub fn detail_dialog(alias: &str, d: &CommandDescriptor) -> DialogRequest {
    let permissions = if d.permission().is_empty() {
        "None".to_string()
    } else {
        d.permission()
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    DialogRequest::new(HELP_DIALOG)
        .label_with_icon(alias, 32)
        .text(format!("Description: {}", d.description()))
        .text(format!("Cooldown: {}", d.cooldown_secs()))
        .text(format!("Ratelimit: {}", d.rate_limit()))
        .text(format!("Permissions: {}", permissions))
        .text(format!("Usage: {}", d.usage()))
        .text(format!("Example: {}", d.examples().join(", ")))
        .buttons("", "Ok")
}
