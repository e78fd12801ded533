//! Sorting network example: one mixed chest feeding two filtered chests.
//!
//! An importer drains copper out of the mixed chest into the network. The
//! copper chest has the highest priority, so it fills first and the overflow
//! chest only receives what no longer fits. A second, round-robin importer
//! spreads iron across two equal-priority chests.
//!
//! Run with: `cargo run -p conduit-core --example sorting_network`

use conduit_core::engine::TransferEngine;
use conduit_core::event::TransferEvent;
use conduit_core::id::*;
use conduit_core::ingredient::*;
use conduit_core::inventory::SlotInventory;
use conduit_core::properties::{PropertyKey, PropertyPreset};
use conduit_core::storage::IngredientStorage;
use conduit_core::target::TransferDirection;
use conduit_core::value::Value;

const IRON: ItemTypeId = ItemTypeId(0);
const COPPER: ItemTypeId = ItemTypeId(1);

type Chest = SlotInventory<ItemComponent>;

fn face(x: i32) -> PartPos {
    PartPos::new(BlockPos::new(x, 0, 0), Side::Up)
}

fn held(engine: &TransferEngine, x: i32) -> String {
    let Some(storage) = engine.storage::<ItemComponent>(face(x)) else {
        return "-".to_string();
    };
    let copper: Quantity = storage.iter().filter(|s| s.item == COPPER).map(|s| s.count).sum();
    let iron: Quantity = storage.iter().filter(|s| s.item == IRON).map(|s| s.count).sum();
    format!("copper {copper:>3}, iron {iron:>3}")
}

fn main() {
    let mut engine = TransferEngine::new();

    // --- Storages ---

    let mut mixed = Chest::new(9, 64);
    let contents = [(COPPER, 64), (COPPER, 40), (IRON, 48)];
    for (item, count) in contents {
        let stack = ItemStack::new(item, count);
        let _ = mixed.insert(stack, false);
    }
    engine.add_interface::<ItemComponent>(face(0), 0, 0, mixed);
    // Copper chest: one slot, highest priority.
    engine.add_interface::<ItemComponent>(face(1), 10, 0, Chest::new(1, 64));
    // Overflow.
    engine.add_interface::<ItemComponent>(face(2), 0, 0, Chest::new(9, 64));
    // Iron chests on channel 1.
    engine.add_interface::<ItemComponent>(face(3), 5, 1, Chest::new(9, 64));
    engine.add_interface::<ItemComponent>(face(4), 5, 1, Chest::new(9, 64));

    // --- Bindings ---

    let above = |x: i32| PartPos::new(BlockPos::new(x, 1, 0), Side::Down);

    let copper = engine.add_binding(
        ComponentKind::Item,
        PartTarget::new(above(0), face(0)),
        TransferDirection::Import,
        PropertyPreset::RateChecks,
    );
    engine.edit_binding_property(copper, PropertyKey::Rate, 32).unwrap();
    engine
        .set_binding_value(copper, Some(Value::Item(ItemStack::new(COPPER, 1))))
        .unwrap();

    // The iron importer reads from the mixed chest but routes on channel 1.
    let iron = engine.add_binding(
        ComponentKind::Item,
        PartTarget::new(PartPos::new(BlockPos::new(0, 2, 0), Side::Down), face(0)),
        TransferDirection::Import,
        PropertyPreset::RateChecks,
    );
    engine.edit_binding_property(iron, PropertyKey::Channel, 1).unwrap();
    engine.edit_binding_property(iron, PropertyKey::Rate, 8).unwrap();
    engine.edit_binding_property(iron, PropertyKey::RoundRobin, true).unwrap();
    engine
        .set_binding_value(iron, Some(Value::Item(ItemStack::new(IRON, 1))))
        .unwrap();

    // --- Run ---

    for _ in 0..6 {
        let result = engine.step();
        println!(
            "tick {:>2}: {} bindings ran, {} moved something",
            result.tick, result.executed, result.transferred
        );
        for event in engine.drain_events() {
            match event {
                TransferEvent::TargetChanged { binding, connection, .. } => {
                    println!("  {binding:?} now connected as {:016x}", connection.0);
                }
                TransferEvent::Transferred { binding, quantity, .. } => {
                    println!("  {binding:?} moved {quantity}");
                }
            }
        }
    }

    println!();
    for (x, name) in [(0, "mixed"), (1, "copper"), (2, "overflow"), (3, "iron a"), (4, "iron b")] {
        println!("{name:>8}: {}", held(&engine, x));
    }
}
