//! Deterministic hashing used for change suppression.
//!
//! A [`TransferFingerprint`] summarises the semantic content of a predicate
//! and a [`ConnectionHash`] summarises one target's full routing decision.
//! Neither is ever used to decide whether something matches; they only tell
//! a binder whether its configuration moved since the previous tick.
//!
//! Both are built with [`FingerprintHasher`], an FNV-1a hasher whose output
//! is stable across processes and releases.

use crate::id::{BlockPos, PartPos};
use serde::{Deserialize, Serialize};

/// FNV-1a accumulator.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintHasher(u64);

impl FingerprintHasher {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write(&v.to_le_bytes());
    }

    /// Length-prefixed so that adjacent strings cannot collide by shifting.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    pub fn write_block_pos(&mut self, pos: BlockPos) {
        self.write_i32(pos.x);
        self.write_i32(pos.y);
        self.write_i32(pos.z);
    }

    pub fn write_part_pos(&mut self, pos: PartPos) {
        self.write_block_pos(pos.pos);
        self.write_u8(pos.side.index());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash of a predicate's semantic content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferFingerprint(pub u64);

/// Hash of a target's routing decision: direction, addresses, channel, slot
/// and predicate fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionHash(pub u64);
