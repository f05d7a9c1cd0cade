//! # World model
//!
//! A world is a fixed-size grid of [`Block`]s (row-major, `index = y * width + x`),
//! a collection of dropped items, and the set of peers currently inside.
//!
//! - [`block`] - tile record with typed feature extensions
//! - [`items`] - item metadata catalog
//! - [`locks`] - registry of world-level locks
//! - [`manager`] - loaded worlds and the per-world mutation lock
//! - [`clear`] - the confirmation-gated "clear world" mutation

pub mod block;
pub mod clear;
pub mod items;
pub mod locks;
pub mod manager;

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use block::{Block, TileExtension, EMPTY};
pub use clear::{clear_blocks, ClearReport, ClearRules, WorldMutationEngine};
pub use items::{ItemCatalog, ItemLookup, ItemMetadata, ItemType};
pub use locks::LockRegistry;
pub use manager::{WorldHandle, WorldManager};

pub const WORLD_SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedItem {
    pub uid: u32,
    pub id: u16,
    pub amount: u8,
    pub x: f32,
    pub y: f32,
}

/// Items lying on the floor. `uid` is the last id handed out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DroppedItems {
    pub uid: u32,
    pub items: Vec<DroppedItem>,
}

impl DroppedItems {
    pub fn is_reset(&self) -> bool {
        self.uid == 0 && self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub schema_version: u8,
    pub name: String,
    pub width: u16,
    pub height: u16,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub blocks: Vec<Block>,
    pub dropped: DroppedItems,
    /// Peer ids currently inside. Never persisted.
    #[serde(skip)]
    pub occupants: BTreeSet<String>,
}

impl World {
    /// An empty world with every tile set to air.
    pub fn empty(name: &str, width: u16, height: u16) -> Self {
        let mut blocks = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                blocks.push(Block::new(x, y));
            }
        }
        Self {
            schema_version: WORLD_SCHEMA_VERSION,
            name: name.to_string(),
            width,
            height,
            owner_id: None,
            blocks,
            dropped: DroppedItems::default(),
            occupants: BTreeSet::new(),
        }
    }

    /// A fresh world: bedrock on the bottom row, the main door just above it in
    /// a random column away from the edges, dirt underneath everything else in
    /// the lower half.
    pub fn generate(name: &str, width: u16, height: u16, door_id: u16, bedrock_id: u16) -> Self {
        let mut world = Self::empty(name, width, height);
        let dirt_top = height / 2;
        let door_x = if width > 4 {
            rand::thread_rng().gen_range(2..width - 2)
        } else {
            0
        };
        for block in world.blocks.iter_mut() {
            let (x, y) = (block.x(), block.y());
            if y == height - 1 {
                block.fg = bedrock_id;
            } else if y == height - 2 && x == door_x {
                block.fg = door_id;
            } else if y >= dirt_top {
                block.fg = items::DIRT;
                block.bg = items::CAVE_BACKGROUND;
            }
        }
        world
    }

    pub fn index_of(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    pub fn block(&self, x: u16, y: u16) -> Option<&Block> {
        self.index_of(x, y).and_then(|i| self.blocks.get(i))
    }

    pub fn block_mut(&mut self, x: u16, y: u16) -> Option<&mut Block> {
        match self.index_of(x, y) {
            Some(i) => self.blocks.get_mut(i),
            None => None,
        }
    }

    /// Place an item in the foreground. Returns false when out of bounds.
    pub fn place_foreground(&mut self, x: u16, y: u16, item: u16) -> bool {
        match self.block_mut(x, y) {
            Some(b) => {
                b.fg = item;
                true
            }
            None => false,
        }
    }

    pub fn place_background(&mut self, x: u16, y: u16, item: u16) -> bool {
        match self.block_mut(x, y) {
            Some(b) => {
                b.bg = item;
                true
            }
            None => false,
        }
    }

    /// Drop `amount` of `id` at pixel position (x, y); returns the new uid.
    pub fn drop_item(&mut self, id: u16, amount: u8, x: f32, y: f32) -> u32 {
        self.dropped.uid += 1;
        let uid = self.dropped.uid;
        self.dropped.items.push(DroppedItem {
            uid,
            id,
            amount,
            x,
            y,
        });
        uid
    }

    pub fn has_occupant(&self, peer_id: &str) -> bool {
        self.occupants.contains(peer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_row_major() {
        let w = World::empty("TEST", 4, 3);
        assert_eq!(w.blocks.len(), 12);
        assert_eq!(w.index_of(1, 2), Some(9));
        assert_eq!(w.blocks[9].x(), 1);
        assert_eq!(w.blocks[9].y(), 2);
        assert_eq!(w.index_of(4, 0), None);
    }

    #[test]
    fn generated_world_has_bedrock_and_door() {
        let w = World::generate("START", 20, 10, 6, 8);
        assert!(w.blocks.iter().filter(|b| b.y() == 9).all(|b| b.fg == 8));
        assert_eq!(w.blocks.iter().filter(|b| b.fg == 6).count(), 1);
        let door = w.blocks.iter().find(|b| b.fg == 6).unwrap();
        assert_eq!(door.y(), 8);
        assert!(door.x() >= 2 && door.x() < 18);
    }

    #[test]
    fn dropped_uids_increase() {
        let mut w = World::empty("TEST", 2, 2);
        assert!(w.dropped.is_reset());
        assert_eq!(w.drop_item(2, 5, 1.0, 1.0), 1);
        assert_eq!(w.drop_item(2, 1, 4.0, 1.0), 2);
        assert_eq!(w.dropped.items.len(), 2);
        assert!(!w.dropped.is_reset());
    }
}
