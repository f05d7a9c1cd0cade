//! Item metadata catalog.
//!
//! The clear algorithm only needs an item's id and its type tag, so the catalog
//! keeps exactly that plus a display name. A JSON file may replace the built-in
//! table:
//!
//! ```json
//! [ { "id": 242, "name": "World Lock", "type": "lock" } ]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TileGateError;

pub const DIRT: u16 = 2;
pub const MAIN_DOOR: u16 = 6;
pub const BEDROCK: u16 = 8;
pub const CAVE_BACKGROUND: u16 = 14;
pub const SIGN: u16 = 20;
pub const SMALL_LOCK: u16 = 202;
pub const BIG_LOCK: u16 = 204;
pub const HUGE_LOCK: u16 = 206;
pub const WORLD_LOCK: u16 = 242;
pub const DIAMOND_LOCK: u16 = 1796;
pub const EMERALD_LOCK: u16 = 2408;
pub const BUILDERS_LOCK: u16 = 4994;
pub const ROYAL_LOCK: u16 = 7188;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Foreground,
    Background,
    Lock,
    MainDoor,
    Door,
    Bedrock,
    Sign,
    Seed,
    DisplayBlock,
    Clothing,
    Consumable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

impl ItemMetadata {
    pub fn new(id: u16, name: &str, item_type: ItemType) -> Self {
        Self {
            id,
            name: name.to_string(),
            item_type,
        }
    }

    pub fn is_lock(&self) -> bool {
        self.item_type == ItemType::Lock
    }
}

/// Read-only item lookup used by the world layer.
pub trait ItemLookup: Send + Sync {
    fn lookup(&self, id: u16) -> Option<&ItemMetadata>;
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<u16, ItemMetadata>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: ItemMetadata) -> Self {
        self.insert(item);
        self
    }

    pub fn insert(&mut self, item: ItemMetadata) {
        self.items.insert(item.id, item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The small set of items the server knows without a catalog file.
    pub fn builtin() -> Self {
        let table = [
            (DIRT, "Dirt", ItemType::Foreground),
            (4, "Lava", ItemType::Foreground),
            (MAIN_DOOR, "Main Door", ItemType::MainDoor),
            (BEDROCK, "Bedrock", ItemType::Bedrock),
            (10, "Rock", ItemType::Foreground),
            (12, "Door", ItemType::Door),
            (CAVE_BACKGROUND, "Cave Background", ItemType::Background),
            (SIGN, "Wooden Sign", ItemType::Sign),
            (SMALL_LOCK, "Small Lock", ItemType::Lock),
            (BIG_LOCK, "Big Lock", ItemType::Lock),
            (HUGE_LOCK, "Huge Lock", ItemType::Lock),
            (WORLD_LOCK, "World Lock", ItemType::Lock),
            (1422, "Display Block", ItemType::DisplayBlock),
            (DIAMOND_LOCK, "Diamond Lock", ItemType::Lock),
            (EMERALD_LOCK, "Emerald Lock", ItemType::Lock),
            (BUILDERS_LOCK, "Builder's Lock", ItemType::Lock),
            (ROYAL_LOCK, "Royal Lock", ItemType::Lock),
        ];
        let mut catalog = Self::new();
        for (id, name, ty) in table {
            catalog.insert(ItemMetadata::new(id, name, ty));
        }
        catalog
    }

    pub fn from_json_str(text: &str) -> Result<Self, TileGateError> {
        let entries: Vec<ItemMetadata> = serde_json::from_str(text)?;
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry);
        }
        Ok(catalog)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TileGateError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl ItemLookup for ItemCatalog {
    fn lookup(&self, id: u16) -> Option<&ItemMetadata> {
        self.items.get(&id)
    }
}
