#![no_main]
use arbitrary::Arbitrary;
use conduit_core::engine::TransferEngine;
use conduit_core::id::BindingId;
use conduit_core::ingredient::{ComponentKind, ItemComponent, Quantity};
use conduit_core::properties::{PropertyKey, PropertyPreset};
use conduit_core::target::TransferDirection;
use conduit_core::test_utils::*;
use conduit_core::value::Value;
use libfuzzer_sys::fuzz_target;

/// A structured mutation of a network.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    AddChest { x: u8, priority: i8, channel: i8, fill: u8 },
    RemoveChest { x: u8 },
    Reroute { x: u8, priority: i8, channel: i8 },
    AddBinding { target: u8, export: bool, round_robin: bool, exact: bool },
    EditRate { index: u8, rate: u8 },
    RemoveBinding { index: u8 },
    Step,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn total(engine: &TransferEngine, xs: &[i32]) -> Quantity {
    xs.iter()
        .filter_map(|x| engine.storage::<ItemComponent>(at(*x)))
        .map(|s| s.stored_quantity())
        .sum()
}

fuzz_target!(|input: FuzzInput| {
    let mut engine = TransferEngine::new();
    let mut chests: Vec<i32> = Vec::new();
    let mut bindings: Vec<BindingId> = Vec::new();

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        match op {
            FuzzOp::AddChest { x, priority, channel, fill } => {
                let x = i32::from(*x % 16);
                let contents = [items(iron(), Quantity::from(*fill % 65))];
                let (priority, channel) = (i32::from(*priority), i32::from(*channel % 4));
                engine.add_interface::<ItemComponent>(at(x), priority, channel, chest(&contents));
                if !chests.contains(&x) {
                    chests.push(x);
                }
            }
            FuzzOp::RemoveChest { x } => {
                let x = i32::from(*x % 16);
                engine.remove_interface(ComponentKind::Item, at(x));
                chests.retain(|c| *c != x);
            }
            FuzzOp::Reroute { x, priority, channel } => {
                let x = i32::from(*x % 16);
                let (priority, channel) = (i32::from(*priority), i32::from(*channel % 4));
                engine.set_priority_and_channel(ComponentKind::Item, at(x), priority, channel);
            }
            FuzzOp::AddBinding { target, export, round_robin, exact } => {
                let direction =
                    if *export { TransferDirection::Export } else { TransferDirection::Import };
                let id = engine.add_binding(
                    ComponentKind::Item,
                    aimed_at(100, i32::from(*target % 16)),
                    direction,
                    PropertyPreset::RateSlot,
                );
                let _ = engine.edit_binding_property(id, PropertyKey::RoundRobin, *round_robin);
                let _ = engine.edit_binding_property(id, PropertyKey::ExactAmount, *exact);
                let _ = engine.set_binding_value(id, Some(Value::Boolean(true)));
                bindings.push(id);
            }
            FuzzOp::EditRate { index, rate } => {
                if !bindings.is_empty() {
                    let id = bindings[*index as usize % bindings.len()];
                    let _ = engine.edit_binding_property(id, PropertyKey::Rate, i64::from(*rate));
                }
            }
            FuzzOp::RemoveBinding { index } => {
                if !bindings.is_empty() {
                    let id = bindings.remove(*index as usize % bindings.len());
                    engine.remove_binding(id);
                }
            }
            FuzzOp::Step => {
                let before = total(&engine, &chests);
                engine.step();
                assert_eq!(total(&engine, &chests), before, "a step created or destroyed items");
            }
        }
    }
});
