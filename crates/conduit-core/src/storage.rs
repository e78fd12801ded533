//! The two-phase storage contract and the registry of attached storages.
//!
//! Every endpoint the engine moves ingredients through implements
//! [`IngredientStorage`]. Each mutating call takes a `simulate` flag:
//!
//! - `simulate = true` must not change any observable state and must return
//!   the same result every time it is called against unchanged state.
//! - `simulate = false` performs the mutation the matching simulated call
//!   predicted.
//!
//! [`StorageRegistry`] owns the storages of one component kind, keyed by the
//! address they are exposed on. A storage can be checked out while a target
//! drives it, which hides it from channel routing for the duration.

use crate::id::{PartPos, StorageId};
use crate::ingredient::{IngredientComponent, MatchCondition, Quantity};
use slotmap::SlotMap;
use std::collections::BTreeMap;

/// An endpoint holding ingredients of kind `C`.
///
/// `extract_matching` and `extract` are the prototype-driven and
/// amount-driven forms of extraction.
pub trait IngredientStorage<C: IngredientComponent> {
    /// Currently held instances. Bounded, and restarted on every call.
    fn iter(&self) -> Box<dyn Iterator<Item = C::Instance> + '_>;

    /// Largest quantity a single held instance may reach.
    fn max_quantity(&self) -> Quantity;

    /// Insert `instance`, returning the remainder that was not accepted.
    #[must_use = "the remainder was not inserted"]
    fn insert(&mut self, instance: C::Instance, simulate: bool) -> C::Instance;

    /// Extract up to the prototype's quantity of instances matching it.
    ///
    /// With `condition.quantity` the extraction is all-or-nothing.
    #[must_use = "the extracted instance leaves the storage"]
    fn extract_matching(
        &mut self,
        prototype: &C::Instance,
        condition: MatchCondition,
        simulate: bool,
    ) -> C::Instance;

    /// Extract up to `max_quantity` of whatever is extractable first.
    #[must_use = "the extracted instance leaves the storage"]
    fn extract(&mut self, max_quantity: Quantity, simulate: bool) -> C::Instance;

    fn stored_quantity(&self) -> Quantity {
        self.iter().map(|i| C::quantity(&i)).sum()
    }

    /// Slot-level access, for storages that are divided into slots.
    fn as_slotted_mut(&mut self) -> Option<&mut dyn SlottedStorage<C>> {
        None
    }
}

/// A storage made of individually addressable slots.
pub trait SlottedStorage<C: IngredientComponent> {
    fn slots(&self) -> usize;

    /// Contents of `slot`, empty when out of range.
    fn slot(&self, slot: usize) -> C::Instance;

    fn slot_capacity(&self) -> Quantity;

    #[must_use = "the remainder was not inserted"]
    fn insert_into_slot(
        &mut self,
        slot: usize,
        instance: C::Instance,
        simulate: bool,
    ) -> C::Instance;

    #[must_use = "the extracted instance leaves the storage"]
    fn extract_from_slot(
        &mut self,
        slot: usize,
        max_quantity: Quantity,
        simulate: bool,
    ) -> C::Instance;
}

/// Restricts a slotted storage to a single slot.
pub struct SlotRestricted<'a, C: IngredientComponent> {
    inner: &'a mut dyn SlottedStorage<C>,
    slot: usize,
}

impl<'a, C: IngredientComponent> SlotRestricted<'a, C> {
    /// Returns `None` when `slot` does not exist.
    pub fn new(inner: &'a mut dyn SlottedStorage<C>, slot: usize) -> Option<Self> {
        (slot < inner.slots()).then_some(Self { inner, slot })
    }
}

impl<C: IngredientComponent> IngredientStorage<C> for SlotRestricted<'_, C> {
    fn iter(&self) -> Box<dyn Iterator<Item = C::Instance> + '_> {
        let held = self.inner.slot(self.slot);
        Box::new((!C::is_empty(&held)).then_some(held).into_iter())
    }

    fn max_quantity(&self) -> Quantity {
        self.inner.slot_capacity()
    }

    fn insert(&mut self, instance: C::Instance, simulate: bool) -> C::Instance {
        self.inner.insert_into_slot(self.slot, instance, simulate)
    }

    fn extract_matching(
        &mut self,
        prototype: &C::Instance,
        condition: MatchCondition,
        simulate: bool,
    ) -> C::Instance {
        let held = self.inner.slot(self.slot);
        let wanted = C::quantity(prototype);
        if C::is_empty(&held)
            || !C::matches(prototype, &held, condition.without_quantity())
            || (condition.quantity && C::quantity(&held) < wanted)
        {
            return C::empty();
        }
        self.inner.extract_from_slot(self.slot, wanted, simulate)
    }

    fn extract(&mut self, max_quantity: Quantity, simulate: bool) -> C::Instance {
        self.inner.extract_from_slot(self.slot, max_quantity, simulate)
    }
}

pub type BoxedStorage<C> = Box<dyn IngredientStorage<C>>;

/// Storages of one component kind, addressed by position.
pub struct StorageRegistry<C: IngredientComponent> {
    storages: SlotMap<StorageId, Option<BoxedStorage<C>>>,
    addresses: BTreeMap<PartPos, StorageId>,
}

impl<C: IngredientComponent> std::fmt::Debug for StorageRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("kind", &C::KIND)
            .field("addresses", &self.addresses)
            .finish_non_exhaustive()
    }
}

impl<C: IngredientComponent> StorageRegistry<C> {
    pub fn new() -> Self {
        Self {
            storages: SlotMap::with_key(),
            addresses: BTreeMap::new(),
        }
    }

    /// Expose `storage` at `pos`, replacing whatever was there.
    pub fn attach(
        &mut self,
        pos: PartPos,
        storage: impl IngredientStorage<C> + 'static,
    ) -> StorageId {
        self.attach_boxed(pos, Box::new(storage))
    }

    pub fn attach_boxed(&mut self, pos: PartPos, storage: BoxedStorage<C>) -> StorageId {
        if let Some(old) = self.addresses.remove(&pos) {
            self.storages.remove(old);
        }
        let id = self.storages.insert(Some(storage));
        self.addresses.insert(pos, id);
        id
    }

    /// Remove the storage at `pos`. A checked-out storage is dropped when
    /// its check-out ends.
    pub fn detach(&mut self, pos: PartPos) -> Option<BoxedStorage<C>> {
        let id = self.addresses.remove(&pos)?;
        self.storages.remove(id).flatten()
    }

    pub fn id_at(&self, pos: PartPos) -> Option<StorageId> {
        self.addresses.get(&pos).copied()
    }

    pub fn contains(&self, pos: PartPos) -> bool {
        self.addresses.contains_key(&pos)
    }

    /// The storage at `pos`, unless absent or checked out.
    pub fn get(&self, pos: PartPos) -> Option<&(dyn IngredientStorage<C> + 'static)> {
        let id = self.addresses.get(&pos)?;
        self.storages.get(*id)?.as_deref()
    }

    pub fn get_mut(&mut self, pos: PartPos) -> Option<&mut (dyn IngredientStorage<C> + 'static)> {
        let id = self.addresses.get(&pos)?;
        self.storages.get_mut(*id)?.as_deref_mut()
    }

    /// Run `f` with the storage at `pos` removed from the registry.
    ///
    /// While `f` runs, lookups of `pos` through the registry find nothing.
    /// Returns `None` without calling `f` when no storage is available.
    pub fn with_checked_out<R>(
        &mut self,
        pos: PartPos,
        f: impl FnOnce(&mut dyn IngredientStorage<C>, &mut Self) -> R,
    ) -> Option<R> {
        let id = *self.addresses.get(&pos)?;
        let mut storage = self.storages.get_mut(id)?.take()?;
        let result = f(storage.as_mut(), self);
        if let Some(slot) = self.storages.get_mut(id) {
            *slot = Some(storage);
        }
        Some(result)
    }

    pub fn positions(&self) -> impl Iterator<Item = PartPos> + '_ {
        self.addresses.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl<C: IngredientComponent> Default for StorageRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{BlockPos, ItemTypeId, Side};
    use crate::ingredient::{ItemComponent, ItemStack};
    use crate::inventory::SlotInventory;

    fn at(x: i32) -> PartPos {
        PartPos::new(BlockPos::new(x, 0, 0), Side::Up)
    }

    fn iron(count: Quantity) -> ItemStack {
        ItemStack::new(ItemTypeId(0), count)
    }

    fn copper(count: Quantity) -> ItemStack {
        ItemStack::new(ItemTypeId(1), count)
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn attach_replaces_existing_storage() {
        let mut reg = StorageRegistry::<ItemComponent>::new();
        let first = reg.attach(at(0), SlotInventory::<ItemComponent>::new(1, 64));
        let second = reg.attach(at(0), SlotInventory::<ItemComponent>::new(2, 64));
        assert_ne!(first, second);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.id_at(at(0)), Some(second));
    }

    #[test]
    fn detach_removes_address() {
        let mut reg = StorageRegistry::<ItemComponent>::new();
        reg.attach(at(0), SlotInventory::<ItemComponent>::new(1, 64));
        assert!(reg.detach(at(0)).is_some());
        assert!(reg.get(at(0)).is_none());
        assert!(reg.detach(at(0)).is_none());
    }

    #[test]
    fn checked_out_storage_is_hidden() {
        let mut reg = StorageRegistry::<ItemComponent>::new();
        reg.attach(at(0), SlotInventory::<ItemComponent>::new(1, 64));
        reg.attach(at(1), SlotInventory::<ItemComponent>::new(1, 64));
        let seen = reg.with_checked_out(at(0), |storage, reg| {
            let _ = storage.insert(iron(5), false);
            (reg.get(at(0)).is_none(), reg.get(at(1)).is_some())
        });
        assert_eq!(seen, Some((true, true)));
        assert_eq!(reg.get(at(0)).map(|s| s.stored_quantity()), Some(5));
    }

    #[test]
    fn check_out_of_missing_storage_does_not_run() {
        let mut reg = StorageRegistry::<ItemComponent>::new();
        let mut ran = false;
        assert!(reg.with_checked_out(at(3), |_, _| ran = true).is_none());
        assert!(!ran);
    }

    // -----------------------------------------------------------------------
    // Slot restriction
    // -----------------------------------------------------------------------

    #[test]
    fn slot_restriction_only_touches_one_slot() {
        let mut inv = SlotInventory::<ItemComponent>::new(2, 64);
        let _ = inv.insert_into_slot(0, iron(10), false);
        let _ = inv.insert_into_slot(1, copper(10), false);
        {
            let mut slot = SlotRestricted::new(&mut inv, 1).unwrap();
            assert_eq!(slot.iter().collect::<Vec<_>>(), vec![copper(10)]);
            assert!(slot.extract_matching(&iron(5), MatchCondition::IDENTITY, false).count == 0);
            assert_eq!(slot.extract(4, false), copper(4));
            let rest = slot.insert(iron(3), false);
            assert_eq!(rest, iron(3));
        }
        assert_eq!(inv.slot(0), iron(10));
        assert_eq!(inv.slot(1), copper(6));
    }

    #[test]
    fn slot_restriction_rejects_out_of_range_slot() {
        let mut inv = SlotInventory::<ItemComponent>::new(2, 64);
        assert!(SlotRestricted::new(&mut inv, 2).is_none());
    }

    #[test]
    fn slot_exact_extraction_is_all_or_nothing() {
        let mut inv = SlotInventory::<ItemComponent>::new(1, 64);
        let _ = inv.insert_into_slot(0, iron(6), false);
        let mut slot = SlotRestricted::new(&mut inv, 0).unwrap();
        let cond = MatchCondition {
            quantity: true,
            ..MatchCondition::IDENTITY
        };
        assert!(slot.extract_matching(&iron(10), cond, true).is_empty());
        assert_eq!(slot.extract_matching(&iron(6), cond, true), iron(6));
    }
}
