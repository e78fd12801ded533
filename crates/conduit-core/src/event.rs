//! Transfer events.
//!
//! The engine records what its bindings did during a tick in an
//! [`EventLog`]: a bounded queue that drops its oldest entries when full.
//! Callers drain it between ticks. Event kinds can be suppressed, in which
//! case they are never recorded.

use std::collections::VecDeque;

use crate::fingerprint::ConnectionHash;
use crate::id::{BindingId, PartTarget};
use crate::ingredient::{ComponentKind, Quantity};

/// Tick counter.
pub type Tick = u64;

/// Default number of events an [`EventLog`] keeps.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Something a binding did. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A binding's connection hash changed, including its first execution.
    TargetChanged {
        binding: BindingId,
        target: PartTarget,
        connection: ConnectionHash,
        tick: Tick,
    },
    /// A binding moved a non-zero quantity.
    Transferred {
        binding: BindingId,
        kind: ComponentKind,
        quantity: Quantity,
        tick: Tick,
    },
}

/// Discriminant of [`TransferEvent`], used for suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TargetChanged,
    Transferred,
}

impl TransferEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TransferEvent::TargetChanged { .. } => EventKind::TargetChanged,
            TransferEvent::Transferred { .. } => EventKind::Transferred,
        }
    }

    pub fn binding(&self) -> BindingId {
        match self {
            TransferEvent::TargetChanged { binding, .. }
            | TransferEvent::Transferred { binding, .. } => *binding,
        }
    }

    pub fn tick(&self) -> Tick {
        match self {
            TransferEvent::TargetChanged { tick, .. } | TransferEvent::Transferred { tick, .. } => {
                *tick
            }
        }
    }
}

/// Bounded event queue, oldest first.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<TransferEvent>,
    capacity: usize,
    suppressed: Vec<EventKind>,
    total_written: u64,
}

impl EventLog {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            suppressed: Vec::new(),
            total_written: 0,
        }
    }

    pub fn suppress(&mut self, kind: EventKind) {
        if !self.suppressed.contains(&kind) {
            self.suppressed.push(kind);
        }
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed.contains(&kind)
    }

    pub fn push(&mut self, event: TransferEvent) {
        if self.is_suppressed(event.kind()) {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events recorded since creation, including dropped ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity as u64)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TransferEvent> {
        self.events.iter()
    }

    /// Remove and return every buffered event, oldest first.
    pub fn drain(&mut self) -> Vec<TransferEvent> {
        self.events.drain(..).collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
