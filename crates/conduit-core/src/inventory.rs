//! In-memory storages.
//!
//! [`SlotInventory`] models chests and tanks: a fixed number of slots, each
//! holding one stack up to a shared capacity. [`EnergyBattery`] models an
//! energy buffer with per-call receive and extract limits. Both honour the
//! simulate/commit contract by planning every change before applying it.

use crate::ingredient::{EnergyComponent, IngredientComponent, MatchCondition, Quantity};
use crate::storage::{IngredientStorage, SlottedStorage};

// ---------------------------------------------------------------------------
// Slot inventory
// ---------------------------------------------------------------------------

/// Fixed-size slot storage.
#[derive(Debug, Clone)]
pub struct SlotInventory<C: IngredientComponent> {
    slots: Vec<C::Instance>,
    slot_capacity: Quantity,
}

impl<C: IngredientComponent> SlotInventory<C> {
    pub fn new(slots: usize, slot_capacity: Quantity) -> Self {
        Self {
            slots: vec![C::empty(); slots],
            slot_capacity,
        }
    }

    /// A single-slot storage, e.g. a fluid tank.
    pub fn tank(capacity: Quantity) -> Self {
        Self::new(1, capacity)
    }

    pub fn contents(&self) -> &[C::Instance] {
        &self.slots
    }

    /// Total quantity held of instances stacking with `kind`.
    pub fn quantity_of(&self, kind: &C::Instance) -> Quantity {
        self.slots
            .iter()
            .filter(|held| !C::is_empty(held) && C::stacks_with(held, kind))
            .map(C::quantity)
            .sum()
    }

    fn space_in(&self, slot: usize, instance: &C::Instance) -> Quantity {
        let held = &self.slots[slot];
        if C::is_empty(held) {
            self.slot_capacity
        } else if C::stacks_with(held, instance) {
            self.slot_capacity.saturating_sub(C::quantity(held))
        } else {
            0
        }
    }

    fn add_to_slot(&mut self, slot: usize, instance: &C::Instance, amount: Quantity) {
        let held = &self.slots[slot];
        let total = if C::is_empty(held) { amount } else { C::quantity(held) + amount };
        self.slots[slot] = C::with_quantity(instance, total);
    }

    fn remove_from_slot(&mut self, slot: usize, amount: Quantity) {
        let held = &self.slots[slot];
        let next = C::with_quantity(held, C::quantity(held).saturating_sub(amount));
        self.slots[slot] = next;
    }

    /// Extract up to `wanted` of instances stacking with `kind`, draining
    /// slots front to back.
    fn take_kind(
        &mut self,
        kind: &C::Instance,
        wanted: Quantity,
        all_or_nothing: bool,
        simulate: bool,
    ) -> C::Instance {
        let available = self.quantity_of(kind);
        if wanted == 0 || (all_or_nothing && available < wanted) {
            return C::empty();
        }
        let take = wanted.min(available);
        if !simulate {
            let mut left = take;
            for slot in 0..self.slots.len() {
                if left == 0 {
                    break;
                }
                let held = &self.slots[slot];
                if C::is_empty(held) || !C::stacks_with(held, kind) {
                    continue;
                }
                let n = C::quantity(held).min(left);
                self.remove_from_slot(slot, n);
                left -= n;
            }
        }
        C::with_quantity(kind, take)
    }
}

impl<C: IngredientComponent> IngredientStorage<C> for SlotInventory<C> {
    fn iter(&self) -> Box<dyn Iterator<Item = C::Instance> + '_> {
        Box::new(self.slots.iter().filter(|s| !C::is_empty(s)).cloned())
    }

    fn max_quantity(&self) -> Quantity {
        self.slot_capacity
    }

    fn insert(&mut self, instance: C::Instance, simulate: bool) -> C::Instance {
        if C::is_empty(&instance) {
            return instance;
        }
        let mut remaining = C::quantity(&instance);
        let mut plan = Vec::new();

        // Top up matching stacks before opening empty slots.
        let merging = (0..self.slots.len()).filter(|&i| !C::is_empty(&self.slots[i]));
        let opening = (0..self.slots.len()).filter(|&i| C::is_empty(&self.slots[i]));
        for slot in merging.chain(opening) {
            if remaining == 0 {
                break;
            }
            let n = self.space_in(slot, &instance).min(remaining);
            if n > 0 {
                plan.push((slot, n));
                remaining -= n;
            }
        }

        if !simulate {
            for (slot, n) in plan {
                self.add_to_slot(slot, &instance, n);
            }
        }
        C::with_quantity(&instance, remaining)
    }

    fn extract_matching(
        &mut self,
        prototype: &C::Instance,
        condition: MatchCondition,
        simulate: bool,
    ) -> C::Instance {
        let loose = condition.without_quantity();
        let Some(kind) = self
            .slots
            .iter()
            .find(|held| !C::is_empty(held) && C::matches(prototype, held, loose))
            .cloned()
        else {
            return C::empty();
        };
        self.take_kind(&kind, C::quantity(prototype), condition.quantity, simulate)
    }

    fn extract(&mut self, max_quantity: Quantity, simulate: bool) -> C::Instance {
        let Some(kind) = self.slots.iter().find(|held| !C::is_empty(held)).cloned() else {
            return C::empty();
        };
        self.take_kind(&kind, max_quantity, false, simulate)
    }

    fn as_slotted_mut(&mut self) -> Option<&mut dyn SlottedStorage<C>> {
        Some(self)
    }
}

impl<C: IngredientComponent> SlottedStorage<C> for SlotInventory<C> {
    fn slots(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, slot: usize) -> C::Instance {
        self.slots.get(slot).cloned().unwrap_or_else(C::empty)
    }

    fn slot_capacity(&self) -> Quantity {
        self.slot_capacity
    }

    fn insert_into_slot(
        &mut self,
        slot: usize,
        instance: C::Instance,
        simulate: bool,
    ) -> C::Instance {
        if slot >= self.slots.len() || C::is_empty(&instance) {
            return instance;
        }
        let n = self.space_in(slot, &instance).min(C::quantity(&instance));
        if !simulate && n > 0 {
            self.add_to_slot(slot, &instance, n);
        }
        C::with_quantity(&instance, C::quantity(&instance) - n)
    }

    fn extract_from_slot(
        &mut self,
        slot: usize,
        max_quantity: Quantity,
        simulate: bool,
    ) -> C::Instance {
        let Some(held) = self.slots.get(slot).cloned() else {
            return C::empty();
        };
        let n = C::quantity(&held).min(max_quantity);
        if !simulate && n > 0 {
            self.remove_from_slot(slot, n);
        }
        C::with_quantity(&held, n)
    }
}

// ---------------------------------------------------------------------------
// Energy battery
// ---------------------------------------------------------------------------

/// An energy buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyBattery {
    stored: Quantity,
    capacity: Quantity,
    /// Maximum accepted per insert call.
    max_receive: Quantity,
    /// Maximum released per extract call.
    max_extract: Quantity,
}

impl EnergyBattery {
    pub fn new(capacity: Quantity) -> Self {
        Self {
            stored: 0,
            capacity,
            max_receive: capacity,
            max_extract: capacity,
        }
    }

    pub fn with_stored(mut self, stored: Quantity) -> Self {
        self.stored = stored.min(self.capacity);
        self
    }

    pub fn with_limits(mut self, max_receive: Quantity, max_extract: Quantity) -> Self {
        self.max_receive = max_receive;
        self.max_extract = max_extract;
        self
    }

    pub fn stored(&self) -> Quantity {
        self.stored
    }

    pub fn capacity(&self) -> Quantity {
        self.capacity
    }

    fn extractable(&self) -> Quantity {
        self.stored.min(self.max_extract)
    }
}

impl IngredientStorage<EnergyComponent> for EnergyBattery {
    fn iter(&self) -> Box<dyn Iterator<Item = Quantity> + '_> {
        Box::new((self.stored > 0).then_some(self.stored).into_iter())
    }

    fn max_quantity(&self) -> Quantity {
        self.capacity
    }

    fn insert(&mut self, amount: Quantity, simulate: bool) -> Quantity {
        let accepted = amount
            .min(self.capacity.saturating_sub(self.stored))
            .min(self.max_receive);
        if !simulate {
            self.stored += accepted;
        }
        amount - accepted
    }

    fn extract_matching(
        &mut self,
        prototype: &Quantity,
        condition: MatchCondition,
        simulate: bool,
    ) -> Quantity {
        if condition.quantity && self.extractable() < *prototype {
            return 0;
        }
        self.extract(*prototype, simulate)
    }

    fn extract(&mut self, max_quantity: Quantity, simulate: bool) -> Quantity {
        let n = self.extractable().min(max_quantity);
        if !simulate {
            self.stored -= n;
        }
        n
    }
}
