//! Positioned routing tables.
//!
//! A [`RoutingTable`] records which addresses participate in routing for
//! one component kind, each with a priority and a channel. Resolution for a
//! channel yields addresses bucketed by priority, highest first, so a lower
//! priority is never attempted before every higher-priority address.
//!
//! # Round-robin
//!
//! Each (channel, priority) bucket has a cursor. With round-robin enabled,
//! resolution starts the bucket at its cursor and wraps. The cursor only
//! moves through [`RoutingTable::advance`], which callers invoke once per
//! committed pass for every bucket that pass visited. Simulated passes
//! leave cursors alone, so a simulation and its commit see the same order.
//!
//! # Channels
//!
//! Channel [`WILDCARD_CHANNEL`] is special on both sides: resolving it
//! yields every address regardless of channel, and an address registered on
//! it is reachable from every channel.

use crate::id::PartPos;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Channel used when none is configured.
pub const DEFAULT_CHANNEL: i32 = 0;
/// Channel that matches every channel.
pub const WILDCARD_CHANNEL: i32 = -1;

/// One registered address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    pub pos: PartPos,
    pub priority: i32,
    pub channel: i32,
    /// Registration order; ties within a bucket resolve by it.
    seq: u64,
}

impl RoutingEntry {
    fn visible_on(&self, channel: i32) -> bool {
        channel == WILDCARD_CHANNEL || self.channel == WILDCARD_CHANNEL || self.channel == channel
    }
}

/// The addresses of one priority level, in attempt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityBucket {
    pub priority: i32,
    pub positions: Vec<PartPos>,
}

/// Attempt order for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub channel: i32,
    pub buckets: Vec<PriorityBucket>,
}

impl Resolution {
    /// (priority, address) pairs in attempt order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, PartPos)> + '_ {
        self.buckets
            .iter()
            .flat_map(|b| b.positions.iter().map(move |p| (b.priority, *p)))
    }

    pub fn first(&self) -> Option<PartPos> {
        self.iter().next().map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.positions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registered addresses of one component kind in one network.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: BTreeMap<PartPos, RoutingEntry>,
    cursors: BTreeMap<(i32, i32), usize>,
    disabled: BTreeSet<PartPos>,
    next_seq: u64,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pos`. Repeating an identical registration does nothing;
    /// different parameters re-register it at the back of its new bucket.
    /// Returns whether the table changed.
    pub fn add_position(&mut self, pos: PartPos, priority: i32, channel: i32) -> bool {
        if let Some(existing) = self.entries.get(&pos) {
            if existing.priority == priority && existing.channel == channel {
                return false;
            }
            self.remove_position(pos);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            pos,
            RoutingEntry {
                pos,
                priority,
                channel,
                seq,
            },
        );
        debug!("registered {pos:?} at priority {priority} on channel {channel}");
        true
    }

    /// Unregister `pos`. Returns whether it was registered.
    pub fn remove_position(&mut self, pos: PartPos) -> bool {
        let removed = self.entries.remove(&pos).is_some();
        if removed {
            self.disabled.remove(&pos);
            self.prune_cursors();
            debug!("unregistered {pos:?}");
        }
        removed
    }

    /// Change the priority and channel of `pos`, as remove followed by add.
    pub fn update_position(&mut self, pos: PartPos, priority: i32, channel: i32) {
        self.remove_position(pos);
        self.add_position(pos, priority, channel);
    }

    /// Keep `pos` registered but skip it during resolution.
    pub fn disable_position(&mut self, pos: PartPos) {
        if self.entries.contains_key(&pos) {
            self.disabled.insert(pos);
        }
    }

    pub fn enable_position(&mut self, pos: PartPos) {
        self.disabled.remove(&pos);
    }

    pub fn is_position_disabled(&self, pos: PartPos) -> bool {
        self.disabled.contains(&pos)
    }

    pub fn entry(&self, pos: PartPos) -> Option<&RoutingEntry> {
        self.entries.get(&pos)
    }

    pub fn contains(&self, pos: PartPos) -> bool {
        self.entries.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enabled buckets for `channel`, in registration order.
    fn buckets(&self, channel: i32) -> BTreeMap<i32, Vec<&RoutingEntry>> {
        let mut buckets: BTreeMap<i32, Vec<&RoutingEntry>> = BTreeMap::new();
        let enabled = self
            .entries
            .values()
            .filter(|e| e.visible_on(channel) && !self.disabled.contains(&e.pos));
        for entry in enabled {
            buckets.entry(entry.priority).or_default().push(entry);
        }
        for bucket in buckets.values_mut() {
            bucket.sort_by_key(|e| e.seq);
        }
        buckets
    }

    /// Attempt order for `channel`. Does not change any state.
    ///
    /// The cursor indexes the enabled addresses of a bucket only, so a
    /// target's own disabled address never takes a turn.
    pub fn resolve(&self, channel: i32, round_robin: bool) -> Resolution {
        let buckets = self
            .buckets(channel)
            .into_iter()
            .rev()
            .map(|(priority, entries)| {
                let start = if round_robin {
                    self.cursors.get(&(channel, priority)).copied().unwrap_or(0) % entries.len()
                } else {
                    0
                };
                let positions =
                    entries[start..].iter().chain(&entries[..start]).map(|e| e.pos).collect();
                PriorityBucket { priority, positions }
            })
            .collect();
        Resolution { channel, buckets }
    }

    /// Rotate the (channel, priority) bucket by one enabled address.
    pub fn advance(&mut self, channel: i32, priority: i32) {
        let size = self
            .entries
            .values()
            .filter(|e| e.priority == priority && e.visible_on(channel))
            .filter(|e| !self.disabled.contains(&e.pos))
            .count();
        if size == 0 {
            return;
        }
        let cursor = self.cursors.entry((channel, priority)).or_insert(0);
        *cursor = (*cursor + 1) % size;
    }

    /// Drop cursors whose bucket no longer has any address.
    fn prune_cursors(&mut self) {
        let entries = &self.entries;
        self.cursors.retain(|&(channel, priority), _| {
            entries.values().any(|e| e.priority == priority && e.visible_on(channel))
        });
    }

    #[cfg(test)]
    fn cursor_count(&self) -> usize {
        self.cursors.len()
    }
}
