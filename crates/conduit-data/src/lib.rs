//! Loading general configuration and network layouts from data files.
//!
//! A data directory may contain `config.{ron,toml,json}` (a
//! [`GeneralConfig`], optional) and `layout.{ron,toml,json}` (a
//! [`LayoutData`], required by [`load_network`]).

pub mod loader;
pub mod schema;

use std::path::Path;

use conduit_core::config::GeneralConfig;
use conduit_core::engine::TransferEngine;
use conduit_core::id::BindingId;
use conduit_core::ingredient::{FluidComponent, ItemComponent};
use conduit_core::inventory::{EnergyBattery, SlotInventory};
use conduit_core::storage::IngredientStorage;
use log::{debug, warn};

pub use loader::{DataLoadError, Format, deserialize_file, detect_format, find_data_file};
pub use schema::{BindingData, InterfaceData, LayoutData, StorageData, ValueData};

/// Read `config.*` from `dir`, or the defaults when there is none.
pub fn load_general_config(dir: &Path) -> Result<GeneralConfig, DataLoadError> {
    match find_data_file(dir, "config")? {
        Some(path) => deserialize_file(&path),
        None => {
            debug!("no config file in {}, using defaults", dir.display());
            Ok(GeneralConfig::default())
        }
    }
}

pub fn load_layout(path: &Path) -> Result<LayoutData, DataLoadError> {
    deserialize_file(path)
}

/// Attach every interface of `layout` and add its bindings, in file order.
/// Returns the ids of the added bindings.
///
/// Stops at the first invalid entry. Entries before it stay applied.
pub fn apply_layout(
    engine: &mut TransferEngine,
    layout: &LayoutData,
) -> Result<Vec<BindingId>, DataLoadError> {
    for (index, interface) in layout.interfaces.iter().enumerate() {
        attach_interface(engine, index, interface);
    }

    let mut ids = Vec::with_capacity(layout.bindings.len());
    for (index, data) in layout.bindings.iter().enumerate() {
        let id = engine.add_binding(data.kind, data.part_target(), data.direction, data.preset);
        let value = data.value.as_ref().map(ValueData::to_value);
        let configured = engine
            .set_binding_properties(id, &data.properties)
            .and_then(|()| engine.set_binding_value(id, value));
        if let Err(source) = configured {
            warn!("layout binding {index} rejected: {source}");
            let _ = engine.remove_binding(id);
            return Err(DataLoadError::Binding { index, source });
        }
        ids.push(id);
    }
    Ok(ids)
}

fn attach_interface(engine: &mut TransferEngine, index: usize, data: &InterfaceData) {
    let pos = data.at.to_part_pos();
    match &data.storage {
        StorageData::Chest {
            slots,
            stack_size,
            contents,
        } => {
            let mut chest = SlotInventory::<ItemComponent>::new(*slots, *stack_size);
            for stack in contents {
                let rest = chest.insert(stack.to_stack(), false);
                if !rest.is_empty() {
                    warn!("interface {index}: {} items did not fit", rest.count);
                }
            }
            engine.add_interface(pos, data.priority, data.channel, chest);
        }
        StorageData::Tank { capacity, contents } => {
            let mut tank = SlotInventory::<FluidComponent>::tank(*capacity);
            if let Some(fluid) = contents {
                let rest = tank.insert(fluid.to_stack(), false);
                if !rest.is_empty() {
                    warn!("interface {index}: {} fluid did not fit", rest.amount);
                }
            }
            engine.add_interface(pos, data.priority, data.channel, tank);
        }
        StorageData::Battery {
            capacity,
            stored,
            max_receive,
            max_extract,
        } => {
            let battery = EnergyBattery::new(*capacity).with_stored(*stored).with_limits(
                max_receive.unwrap_or(*capacity),
                max_extract.unwrap_or(*capacity),
            );
            engine.add_interface(pos, data.priority, data.channel, battery);
        }
    }
}

/// Build an engine from `config.*` and `layout.*` in `dir`.
pub fn load_network(dir: &Path) -> Result<(TransferEngine, Vec<BindingId>), DataLoadError> {
    let config = load_general_config(dir)?;
    let layout_path = loader::require_data_file(dir, "layout")?;
    let layout = load_layout(&layout_path)?;
    let mut engine = TransferEngine::with_config(config);
    let bindings = apply_layout(&mut engine, &layout)?;
    debug!(
        "loaded {} interfaces and {} bindings from {}",
        layout.interfaces.len(),
        bindings.len(),
        layout_path.display()
    );
    Ok((engine, bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{cleanup, make_test_dir};
    use conduit_core::error::{ConfigError, EngineError};
    use conduit_core::ingredient::{ComponentKind, Quantity};
    use conduit_core::test_utils::at;
    use std::fs;

    const LAYOUT: &str = r#"{
        "interfaces": [
            {"at": {"x": 0, "y": 0, "z": 0, "side": "Up"}, "storage": {"type": "chest", "slots": 4, "contents": [{"item": 0, "count": 20}]}},
            {"at": {"x": 1, "y": 0, "z": 0, "side": "Up"}, "priority": 5, "storage": {"type": "chest", "slots": 4}}
        ],
        "bindings": [
            {
                "kind": "Item",
                "direction": "Import",
                "center": {"x": 0, "y": 64, "z": 0, "side": "Down"},
                "target": {"x": 0, "y": 0, "z": 0, "side": "Up"},
                "preset": "RateSlot",
                "properties": {"rate": 5},
                "value": {"boolean": true}
            }
        ]
    }"#;

    fn stored(engine: &TransferEngine, x: i32) -> Quantity {
        engine
            .storage::<ItemComponent>(at(x))
            .map(|s| s.stored_quantity())
            .unwrap_or(0)
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = make_test_dir("lib_no_config");
        assert_eq!(load_general_config(&dir).unwrap(), GeneralConfig::default());
        cleanup(&dir);
    }

    #[test]
    fn network_loads_and_runs() {
        let dir = make_test_dir("lib_network");
        fs::write(dir.join("layout.json"), LAYOUT).unwrap();
        let (mut engine, bindings) = load_network(&dir).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(engine.network().table(ComponentKind::Item).len(), 2);

        engine.step();
        assert_eq!(stored(&engine, 0), 15);
        assert_eq!(stored(&engine, 1), 5);
        cleanup(&dir);
    }

    #[test]
    fn config_limits_apply_to_layout_bindings() {
        let dir = make_test_dir("lib_limits");
        fs::write(dir.join("layout.json"), LAYOUT).unwrap();
        fs::write(dir.join("config.toml"), "item_rate_limit = 4\n").unwrap();
        match load_network(&dir) {
            Err(DataLoadError::Binding {
                index: 0,
                source: EngineError::Config(ConfigError::Validation(_)),
            }) => {}
            other => panic!("expected a rejected binding, got {:?}", other.map(|(_, ids)| ids)),
        }
        cleanup(&dir);
    }

    #[test]
    fn layout_file_is_required() {
        let dir = make_test_dir("lib_no_layout");
        assert!(matches!(load_network(&dir), Err(DataLoadError::MissingRequired { .. })));
        cleanup(&dir);
    }
}
