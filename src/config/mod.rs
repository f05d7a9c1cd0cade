//! # Configuration
//!
//! TOML configuration for the command core and world layer.
//!
//! ```toml
//! [server]
//! name = "Tilegate"
//! command_prefix = "/"
//! max_command_length = 120
//!
//! [storage]
//! data_dir = "./data"
//! cache_capacity = 64
//!
//! [logging]
//! level = "info"
//! file = "tilegate.log"
//! security_file = "tilegate-security.log"
//!
//! [confirmation]
//! expiry_seconds = 120
//! persistence_retries = 1
//!
//! [world]
//! main_door_id = 6
//! bedrock_id = 8
//! main_lock_ids = [242, 1796, 2408, 7188]
//! ```
//!
//! `[confirmation]`, `[world]` and `[items]` may be omitted; missing keys fall
//! back to the defaults shown above.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Longest a confirmation dialog may stay open (one day).
pub const MAX_CONFIRMATION_EXPIRY_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    #[serde(default)]
    pub motd: String,
    /// Leading character that marks a chat line as a command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_max_command_length")]
    pub max_command_length: usize,
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_max_command_length() -> usize {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the sled database path; defaults to `<data_dir>/worlds`.
    #[serde(default)]
    pub db_path: Option<String>,
    /// Number of worlds kept in the in-memory cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
    64
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(&self.data_dir).join("worlds"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// How long a confirmation dialog stays answerable.
    pub expiry_seconds: u64,
    /// Extra attempts for each persistence step before a clear is reported as failed.
    pub persistence_retries: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            expiry_seconds: 120,
            persistence_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    pub main_door_id: u16,
    pub bedrock_id: u16,
    /// World-level locks that survive a clear. Other lock items are removed.
    pub main_lock_ids: Vec<u16>,
    pub width: u16,
    pub height: u16,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            main_door_id: 6,
            bedrock_id: 8,
            main_lock_ids: vec![242, 1796, 2408, 7188],
            width: 100,
            height: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ItemsConfig {
    /// JSON item catalog; the built-in catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub items: ItemsConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.command_prefix.chars().count() != 1 {
            return Err(anyhow!(
                "server.command_prefix must be a single character, got '{}'",
                self.server.command_prefix
            ));
        }
        if self.server.max_command_length == 0 {
            return Err(anyhow!("server.max_command_length must be at least 1"));
        }
        if self.storage.cache_capacity == 0 {
            return Err(anyhow!("storage.cache_capacity must be at least 1"));
        }
        if self.confirmation.expiry_seconds == 0 {
            return Err(anyhow!("confirmation.expiry_seconds must be at least 1"));
        }
        if self.confirmation.expiry_seconds > MAX_CONFIRMATION_EXPIRY_SECS {
            return Err(anyhow!(
                "confirmation.expiry_seconds must be at most {}, got {}",
                MAX_CONFIRMATION_EXPIRY_SECS,
                self.confirmation.expiry_seconds
            ));
        }
        if self.world.width == 0 || self.world.height < 2 {
            return Err(anyhow!(
                "world dimensions {}x{} are too small",
                self.world.width,
                self.world.height
            ));
        }
        Ok(())
    }

    pub fn command_prefix(&self) -> char {
        self.server.command_prefix.chars().next().unwrap_or('/')
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                name: "Tilegate".to_string(),
                motd: "Welcome! Type /help for a list of commands.".to_string(),
                command_prefix: default_command_prefix(),
                max_command_length: default_max_command_length(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_path: None,
                cache_capacity: default_cache_capacity(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("tilegate.log".to_string()),
                security_file: Some("tilegate-security.log".to_string()),
            },
            confirmation: ConfirmationConfig::default(),
            world: WorldConfig::default(),
            items: ItemsConfig::default(),
        }
    }
}
