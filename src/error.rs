use thiserror::Error;

/// Which half of the two-step world save failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    Cache,
    Database,
}

impl std::fmt::Display for PersistStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistStage::Cache => write!(f, "cache"),
            PersistStage::Database => write!(f, "database"),
        }
    }
}

/// Errors raised by the command core, the world layer and the storage layer.
#[derive(Debug, Error)]
pub enum TileGateError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON errors (item catalog files).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, catalog reads, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// A world save did not complete, even after retrying.
    #[error("world {world} could not be saved to {stage}: {reason}")]
    Persistence {
        world: String,
        stage: PersistStage,
        reason: String,
    },

    /// Two commands tried to claim the same alias during registration.
    #[error("alias '{alias}' is already registered by /{owner}")]
    DuplicateAlias { alias: String, owner: String },

    /// A command descriptor broke one of its construction rules.
    #[error("invalid command descriptor: {0}")]
    InvalidDescriptor(String),

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl TileGateError {
    pub fn is_persistence(&self) -> bool {
        matches!(self, TileGateError::Persistence { .. })
    }
}
