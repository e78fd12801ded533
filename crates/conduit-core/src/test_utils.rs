//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::cell::Cell;
use std::rc::Rc;

use crate::id::*;
use crate::ingredient::*;
use crate::inventory::{EnergyBattery, SlotInventory};
use crate::storage::IngredientStorage;

// ===========================================================================
// Ingredient constructors
// ===========================================================================

pub fn iron() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn copper() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn gear() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn water() -> FluidTypeId {
    FluidTypeId(0)
}
pub fn lava() -> FluidTypeId {
    FluidTypeId(1)
}

pub fn items(item: ItemTypeId, count: Quantity) -> ItemStack {
    ItemStack::new(item, count)
}

pub fn fluid(fluid: FluidTypeId, amount: Quantity) -> FluidStack {
    FluidStack::new(fluid, amount)
}

// ===========================================================================
// Addresses
// ===========================================================================

/// Up-facing part at `(x, 0, 0)`.
pub fn at(x: i32) -> PartPos {
    PartPos::new(BlockPos::new(x, 0, 0), Side::Up)
}

/// A part at `(x, 64, 0)` facing the storage at `at(target)`.
pub fn aimed_at(x: i32, target: i32) -> PartTarget {
    PartTarget::new(PartPos::new(BlockPos::new(x, 64, 0), Side::Down), at(target))
}

// ===========================================================================
// Storages
// ===========================================================================

pub type Chest = SlotInventory<ItemComponent>;
pub type Tank = SlotInventory<FluidComponent>;

/// A 27-slot chest of 64-item stacks, filled with `contents`.
pub fn chest(contents: &[ItemStack]) -> Chest {
    let mut chest = Chest::new(27, 64);
    for stack in contents {
        let _ = chest.insert(stack.clone(), false);
    }
    chest
}

pub fn tank(capacity: Quantity, contents: Option<FluidStack>) -> Tank {
    let mut tank = Tank::tank(capacity);
    if let Some(contents) = contents {
        let _ = tank.insert(contents, false);
    }
    tank
}

pub fn battery(capacity: Quantity, stored: Quantity) -> EnergyBattery {
    EnergyBattery::new(capacity).with_stored(stored)
}

// ===========================================================================
// Call counting
// ===========================================================================

/// Wraps a storage and counts every call made through the storage contract.
/// Clones of [`CountingStorage::calls`] observe the count after the storage
/// has been moved into a registry.
pub struct CountingStorage<S> {
    inner: S,
    calls: Rc<Cell<usize>>,
}

impl<S> CountingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl<C, S> IngredientStorage<C> for CountingStorage<S>
where
    C: IngredientComponent,
    S: IngredientStorage<C>,
{
    fn iter(&self) -> Box<dyn Iterator<Item = C::Instance> + '_> {
        self.count();
        self.inner.iter()
    }

    fn max_quantity(&self) -> Quantity {
        self.count();
        self.inner.max_quantity()
    }

    fn insert(&mut self, instance: C::Instance, simulate: bool) -> C::Instance {
        self.count();
        self.inner.insert(instance, simulate)
    }

    fn extract_matching(
        &mut self,
        prototype: &C::Instance,
        condition: MatchCondition,
        simulate: bool,
    ) -> C::Instance {
        self.count();
        self.inner.extract_matching(prototype, condition, simulate)
    }

    fn extract(&mut self, max_quantity: Quantity, simulate: bool) -> C::Instance {
        self.count();
        self.inner.extract(max_quantity, simulate)
    }
}
