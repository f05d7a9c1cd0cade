use serde::{Deserialize, Serialize};

/// Item id of an empty tile layer.
pub const EMPTY: u16 = 0;

/// Feature data a tile carries only when its item needs it.
///
/// A tile holds at most one extension; clearing a tile drops it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TileExtension {
    Sign {
        text: String,
    },
    Door {
        label: String,
        /// `WORLD:DOORID`, or just `:DOORID` for a door in the same world.
        destination: String,
        id: String,
    },
    Lock {
        owner_id: String,
        admins: Vec<String>,
        public: bool,
    },
    Display {
        item_id: u16,
    },
    Seed {
        planted_at: i64,
        fruit_count: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    x: u16,
    y: u16,
    pub fg: u16,
    pub bg: u16,
    /// Render flags (flipped, water, glued ...). Not meaningful without an item.
    pub flags: u16,
    pub extension: Option<TileExtension>,
}

impl Block {
    pub fn new(x: u16, y: u16) -> Self {
        Self {
            x,
            y,
            fg: EMPTY,
            bg: EMPTY,
            flags: 0,
            extension: None,
        }
    }

    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn y(&self) -> u16 {
        self.y
    }

    pub fn is_empty(&self) -> bool {
        self.fg == EMPTY && self.bg == EMPTY
    }

    /// The item that identifies this tile: foreground if set, else background.
    pub fn primary_item(&self) -> u16 {
        if self.fg != EMPTY {
            self.fg
        } else {
            self.bg
        }
    }

    /// Turn this tile back into bare air. Coordinates are kept.
    pub fn reset(&mut self) {
        self.fg = EMPTY;
        self.bg = EMPTY;
        self.flags = 0;
        self.extension = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_coordinates_only() {
        let mut b = Block::new(5, 7);
        b.fg = 20;
        b.bg = 14;
        b.flags = 0x40;
        b.extension = Some(TileExtension::Sign {
            text: "hello".into(),
        });
        b.reset();
        assert_eq!(b, Block::new(5, 7));
    }

    #[test]
    fn primary_item_prefers_foreground() {
        let mut b = Block::new(0, 0);
        b.bg = 14;
        assert_eq!(b.primary_item(), 14);
        b.fg = 2;
        assert_eq!(b.primary_item(), 2);
    }
}
