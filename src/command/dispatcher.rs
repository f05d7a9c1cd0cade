use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, warn};

use super::{CommandContext, CommandLimiter, CommandRegistry, Throttle};
use crate::logutil::{escape_args, escape_log};
use crate::metrics;
use crate::server::ServerContext;
use crate::session::Peer;
use crate::validation::{sanitize_command_line, InputError};

pub const UNKNOWN_COMMAND_MESSAGE: &str =
    "`4Unknown command.`` Enter `$/help`` for a list of valid commands.";
pub const COMMAND_FAILED_MESSAGE: &str = "`4Oops!`` Something went wrong while running that command.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lower-cased alias without the prefix.
    pub alias: String,
    pub args: Vec<String>,
}

/// Split `/alias arg1 arg2` into alias and arguments.
///
/// Returns `None` when the line does not start with `prefix` or names no alias.
pub fn parse_command_line(text: &str, prefix: char) -> Option<ParsedCommand> {
    let body = text.trim_start().strip_prefix(prefix)?;
    let mut parts = body.split_whitespace();
    let alias = parts.next()?.to_ascii_lowercase();
    Some(ParsedCommand {
        alias,
        args: parts.map(str::to_string).collect(),
    })
}

/// A command that never ran because a gate refused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    NotFound { alias: String },
    /// Reported to the actor exactly like `NotFound`.
    Denied { alias: String },
    Throttled(Throttle),
    InvalidInput(InputError),
}

impl GateRejection {
    /// Console line shown to the actor.
    pub fn message(&self) -> String {
        match self {
            GateRejection::NotFound { .. } | GateRejection::Denied { .. } => {
                UNKNOWN_COMMAND_MESSAGE.to_string()
            }
            GateRejection::Throttled(t) => t.to_string(),
            GateRejection::InvalidInput(e) => format!("`4{}``", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Plain chat; not for the dispatcher.
    NotACommand,
    Rejected(GateRejection),
    Executed { command: String },
    /// The command ran and returned an error; the actor got a generic notice.
    Failed { command: String },
}

pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    limiter: CommandLimiter,
    prefix: char,
    max_len: usize,
}

impl CommandDispatcher {
    pub fn new(registry: Arc<CommandRegistry>, prefix: char, max_len: usize) -> Self {
        Self {
            registry,
            limiter: CommandLimiter::new(),
            prefix,
            max_len,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn limiter(&self) -> &CommandLimiter {
        &self.limiter
    }

    pub async fn dispatch(&self, server: &ServerContext, peer: &Arc<Peer>, text: &str) -> DispatchOutcome {
        self.dispatch_at(server, peer, text, Utc::now()).await
    }

    /// Resolve, gate and run one chat line as of `now`.
    ///
    /// Gates run in a fixed order: permission, then throttle. Nothing here
    /// returns an error; every refusal is reported to the actor. A command
    /// that fails gives its throttle slot back.
    pub async fn dispatch_at(
        &self,
        server: &ServerContext,
        peer: &Arc<Peer>,
        text: &str,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        if !text.trim_start().starts_with(self.prefix) {
            return DispatchOutcome::NotACommand;
        }
        let line = match sanitize_command_line(text, self.max_len) {
            Ok(line) => line,
            Err(InputError::Empty) => return DispatchOutcome::NotACommand,
            Err(e) => return self.reject(peer, GateRejection::InvalidInput(e)),
        };
        let Some(parsed) = parse_command_line(&line, self.prefix) else {
            return DispatchOutcome::NotACommand;
        };
        debug!(
            "dispatch peer={} alias={} args={}",
            peer.id(),
            escape_log(&parsed.alias),
            escape_args(&parsed.args)
        );

        let Some(command) = self.registry.lookup(&parsed.alias) else {
            metrics::inc_commands_unknown();
            return self.reject(peer, GateRejection::NotFound { alias: parsed.alias });
        };
        let descriptor = command.descriptor();

        if !descriptor.allows(peer.level()) {
            metrics::inc_commands_denied();
            warn!(
                target: "security",
                "denied /{} for {} ({}) with role {}",
                descriptor.name(),
                peer.name(),
                peer.id(),
                peer.role()
            );
            return self.reject(peer, GateRejection::Denied { alias: parsed.alias });
        }

        if let Err(throttle) = self.limiter.check_and_record(peer.id(), descriptor, now) {
            metrics::inc_commands_throttled();
            debug!("throttled /{} for {}: {:?}", descriptor.name(), peer.id(), throttle);
            return self.reject(peer, GateRejection::Throttled(throttle));
        }

        let name = descriptor.name().to_string();
        let ctx = CommandContext {
            server,
            registry: &self.registry,
            peer,
            alias: &parsed.alias,
            args: &parsed.args,
        };
        match command.execute(ctx).await {
            Ok(()) => {
                metrics::inc_commands_executed();
                DispatchOutcome::Executed { command: name }
            }
            Err(e) => {
                metrics::inc_commands_failed();
                error!("/{} failed for {}: {}", name, peer.id(), e);
                self.limiter.release(peer.id(), descriptor);
                peer.send_console(COMMAND_FAILED_MESSAGE);
                DispatchOutcome::Failed { command: name }
            }
        }
    }

    fn reject(&self, peer: &Peer, rejection: GateRejection) -> DispatchOutcome {
        peer.send_console(rejection.message());
        DispatchOutcome::Rejected(rejection)
    }
}
