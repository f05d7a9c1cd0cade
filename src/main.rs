//! Binary entrypoint for the Tilegate CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `status` - print a configuration summary and the stored worlds
//! - `console --name <n> --role <r> --world <w>` - drive the command core from
//!   stdin as a single local player
//!
//! See the library crate docs for module-level details: `tilegate::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use tilegate::config::Config;
use tilegate::dialog::{DialogRequest, DialogResponse, BUTTON_CANCEL, BUTTON_CONFIRM};
use tilegate::logutil::LogSinks;
use tilegate::metrics;
use tilegate::roles::Role;
use tilegate::server::GameServer;
use tilegate::session::{Outbound, Peer};
use tilegate::storage::WorldStore;

#[derive(Parser)]
#[command(name = "tilegate")]
#[command(about = "Command core for tile-world game servers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show configuration and stored worlds
    Status,
    /// Play as one local peer, reading chat lines from stdin
    Console {
        /// Display name of the local player
        #[arg(short, long, default_value = "console")]
        name: String,
        /// Role of the local player (basic, supporter, developer)
        #[arg(short, long, default_value = "developer")]
        role: String,
        /// World to enter on start
        #[arg(short, long, default_value = "START")]
        world: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    if !matches!(cli.command, Commands::Init) {
        init_logging(&pre_config, cli.verbose);
    }

    match cli.command {
        Commands::Init => {
            if std::path::Path::new(&cli.config).exists() {
                return Err(anyhow!("{} already exists; refusing to overwrite", cli.config));
            }
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);
            println!("Edit it, then try: tilegate console --role developer");
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            print_status(&config)?;
        }
        Commands::Console { name, role, world } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let role = Role::parse(&role).ok_or_else(|| anyhow!("unknown role '{}'", role))?;
            run_console(config, &name, role, &world).await?;
        }
    }

    Ok(())
}

fn print_status(config: &Config) -> Result<()> {
    println!("Tilegate v{}", env!("CARGO_PKG_VERSION"));
    println!("Server:        {}", config.server.name);
    println!("Prefix:        {}", config.command_prefix());
    println!("Database:      {}", config.storage.resolved_db_path().display());
    println!("Cache entries: {}", config.storage.cache_capacity);
    println!(
        "Dialogs:       expire after {}s, {} save retries",
        config.confirmation.expiry_seconds, config.confirmation.persistence_retries
    );
    println!("Main locks:    {:?}", config.world.main_lock_ids);

    let store = WorldStore::open(config.storage.resolved_db_path(), config.storage.cache_capacity)?;
    let names = store.list_world_names()?;
    println!("Stored worlds: {}", names.len());
    for name in names {
        println!("  - {}", name);
    }
    Ok(())
}

async fn run_console(config: Config, name: &str, role: Role, world: &str) -> Result<()> {
    let motd = config.server.motd.clone();
    let server = GameServer::new(config).await?;
    let (peer, mut outbox) = server.connect("console", name, role);
    server.enter_world(&peer, world).await?;
    info!("console session started as {} ({})", name, role);
    println!("{}", motd);
    println!("Type commands as a player would. !yes / !no answer the last dialog,");
    println!("!role <role>, !world <name>, !status and !quit are console helpers.");

    let mut last_dialog: Option<DialogRequest> = None;
    drain(&mut outbox, &mut last_dialog);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        server.housekeeping(chrono::Utc::now());
        match line.split_once(' ').unwrap_or((line, "")) {
            ("!quit", _) => break,
            ("!yes", _) | ("!no", _) => {
                let button = if line == "!yes" { BUTTON_CONFIRM } else { BUTTON_CANCEL };
                answer(&server, &peer, last_dialog.take(), button).await;
            }
            ("!role", arg) => match Role::parse(arg) {
                Some(r) => {
                    peer.set_role(r);
                    println!("* role is now {}", r);
                }
                None => println!("* unknown role '{}'", arg),
            },
            ("!world", arg) => {
                if let Err(e) = server.enter_world(&peer, arg).await {
                    println!("* {}", e);
                }
            }
            ("!status", _) => println!("* {:?}", metrics::snapshot()),
            _ => {
                let outcome = server.handle_chat(&peer, line).await;
                log::debug!("console outcome: {:?}", outcome);
            }
        }
        drain(&mut outbox, &mut last_dialog);
    }

    server.disconnect(peer.id()).await;
    Ok(())
}

async fn answer(server: &GameServer, peer: &Arc<Peer>, dialog: Option<DialogRequest>, button: &str) {
    let Some(dialog) = dialog else {
        println!("* no dialog to answer");
        return;
    };
    let Some(token) = dialog.token else {
        println!("* dialog {} closed", dialog.name);
        return;
    };
    let response = DialogResponse::new(&dialog.name, token, button);
    let outcome = server.handle_dialog_response(peer, &response).await;
    println!("* {} -> {:?}", dialog.name, outcome);
}

fn drain(outbox: &mut UnboundedReceiver<Outbound>, last_dialog: &mut Option<DialogRequest>) {
    while let Ok(msg) = outbox.try_recv() {
        match msg {
            Outbound::Console(text) => println!("{}", text),
            Outbound::Dialog(dialog) => {
                println!("+-- [{}] {}", dialog.icon, dialog.title);
                for line in &dialog.lines {
                    println!("| {}", line);
                }
                if dialog.cancel_label.is_empty() {
                    println!("+-- [{}]", dialog.confirm_label);
                } else {
                    println!("+-- [{}] [{}]", dialog.cancel_label, dialog.confirm_label);
                }
                *last_dialog = Some(dialog);
            }
            Outbound::LeaveWorld { world } => {
                warn!("console peer left world {}", world);
                println!("* you were sent out of {}", world);
            }
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // -v beats the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let sinks = LogSinks::open(
        config
            .as_ref()
            .and_then(|cfg| cfg.logging.file.as_deref())
            .map(std::path::Path::new),
        config
            .as_ref()
            .and_then(|cfg| cfg.logging.security_file.as_ref())
            .map(std::path::PathBuf::from),
    );
    // With a log file, only echo to the console when someone is watching it.
    let echo = !sinks.has_file() || atty::is(atty::Stream::Stdout);

    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());
        sinks.write(record.target(), &line);
        if echo {
            writeln!(fmt, "{}", line)
        } else {
            Ok(())
        }
    });
    let _ = builder.try_init();
}
