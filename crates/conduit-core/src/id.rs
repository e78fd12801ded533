use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a storage endpoint attached to a storage registry.
    pub struct StorageId;

    /// Identifies a configured transfer binding in the engine.
    pub struct BindingId;
}

/// Identifies an item type. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a fluid type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FluidTypeId(pub u32);

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position in the given direction.
    pub fn offset(self, side: Side) -> Self {
        let (dx, dy, dz) = side.delta();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

/// One of the six faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Side {
    pub const ALL: [Side; 6] = [
        Side::Down,
        Side::Up,
        Side::North,
        Side::South,
        Side::West,
        Side::East,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Side::Down => Side::Up,
            Side::Up => Side::Down,
            Side::North => Side::South,
            Side::South => Side::North,
            Side::West => Side::East,
            Side::East => Side::West,
        }
    }

    fn delta(self) -> (i32, i32, i32) {
        match self {
            Side::Down => (0, -1, 0),
            Side::Up => (0, 1, 0),
            Side::North => (0, 0, -1),
            Side::South => (0, 0, 1),
            Side::West => (-1, 0, 0),
            Side::East => (1, 0, 0),
        }
    }

    pub(crate) fn index(self) -> u8 {
        self as u8
    }
}

/// A block position together with the face being addressed.
///
/// This is the address under which endpoints register in a routing table
/// and under which storages are attached to a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartPos {
    pub pos: BlockPos,
    pub side: Side,
}

impl PartPos {
    pub const fn new(pos: BlockPos, side: Side) -> Self {
        Self { pos, side }
    }
}

/// The acting endpoint (`center`) and the endpoint it operates on (`target`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartTarget {
    pub center: PartPos,
    pub target: PartPos,
}

impl PartTarget {
    pub const fn new(center: PartPos, target: PartPos) -> Self {
        Self { center, target }
    }

    /// A part mounted on `side` of `pos`, targeting the face of the
    /// neighbouring block that looks back at it.
    pub fn facing(pos: BlockPos, side: Side) -> Self {
        Self {
            center: PartPos::new(pos, side),
            target: PartPos::new(pos.offset(side), side.opposite()),
        }
    }
}
