//! The transfer engine: owns the network, the storages and the bindings,
//! and runs every active binding once per tick.
//!
//! # Architecture
//!
//! The `TransferEngine` owns:
//! - A [`Network`] with one routing table per component kind
//! - One [`StorageRegistry`] per component kind, keyed by part address
//! - The bindings, in a slotmap keyed by [`BindingId`]
//! - An [`EventLog`] of what bindings did
//!
//! Configuration (values and property edits) is validated and compiled when
//! it is set. [`TransferEngine::step`] only reads compiled state, so a tick
//! never fails.

use log::{debug, trace};
use slotmap::SlotMap;

use crate::aspect::{ChanneledTargetInformation, compile};
use crate::config::GeneralConfig;
use crate::error::{ConfigError, EngineError};
use crate::event::{EventLog, Tick, TransferEvent};
use crate::fingerprint::{ConnectionHash, TransferFingerprint};
use crate::id::{BindingId, PartPos, PartTarget, StorageId};
use crate::ingredient::{
    ComponentKind, EnergyComponent, FluidComponent, IngredientComponent, ItemComponent, Quantity,
};
use crate::network::Network;
use crate::properties::{
    AspectProperties, PropertyKey, PropertyPreset, PropertySchema, PropertyValue,
};
use crate::routing::RoutingTable;
use crate::storage::{IngredientStorage, StorageRegistry};
use crate::target::{Target, TargetBinder, TargetSettings, TransferDirection, TransferHooks};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Component dispatch
// ---------------------------------------------------------------------------

/// A component kind the engine keeps a storage registry for.
pub trait NetworkComponent: IngredientComponent {
    fn registry(engine: &TransferEngine) -> &StorageRegistry<Self>;
    fn registry_mut(engine: &mut TransferEngine) -> &mut StorageRegistry<Self>;
}

impl NetworkComponent for ItemComponent {
    fn registry(engine: &TransferEngine) -> &StorageRegistry<Self> {
        &engine.items
    }

    fn registry_mut(engine: &mut TransferEngine) -> &mut StorageRegistry<Self> {
        &mut engine.items
    }
}

impl NetworkComponent for FluidComponent {
    fn registry(engine: &TransferEngine) -> &StorageRegistry<Self> {
        &engine.fluids
    }

    fn registry_mut(engine: &mut TransferEngine) -> &mut StorageRegistry<Self> {
        &mut engine.fluids
    }
}

impl NetworkComponent for EnergyComponent {
    fn registry(engine: &TransferEngine) -> &StorageRegistry<Self> {
        &engine.energy
    }

    fn registry_mut(engine: &mut TransferEngine) -> &mut StorageRegistry<Self> {
        &mut engine.energy
    }
}

/// Compiled target information of whichever kind a binding moves.
#[derive(Debug, Clone)]
enum Compiled {
    Item(ChanneledTargetInformation<ItemComponent>),
    Fluid(ChanneledTargetInformation<FluidComponent>),
    Energy(ChanneledTargetInformation<EnergyComponent>),
}

impl Compiled {
    fn compile(
        kind: ComponentKind,
        value: &Value,
        props: &AspectProperties,
    ) -> Result<Self, ConfigError> {
        Ok(match kind {
            ComponentKind::Item => Compiled::Item(compile(value, props)?),
            ComponentKind::Fluid => Compiled::Fluid(compile(value, props)?),
            ComponentKind::Energy => Compiled::Energy(compile(value, props)?),
        })
    }

    fn deactivated(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Item => Compiled::Item(ChanneledTargetInformation::deactivated()),
            ComponentKind::Fluid => Compiled::Fluid(ChanneledTargetInformation::deactivated()),
            ComponentKind::Energy => Compiled::Energy(ChanneledTargetInformation::deactivated()),
        }
    }

    fn fingerprint(&self) -> TransferFingerprint {
        match self {
            Compiled::Item(info) => info.fingerprint,
            Compiled::Fluid(info) => info.fingerprint,
            Compiled::Energy(info) => info.fingerprint,
        }
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// A configured transfer between one storage and its channel.
#[derive(Debug, Clone)]
pub struct Binding {
    kind: ComponentKind,
    part_target: PartTarget,
    direction: TransferDirection,
    schema: PropertySchema,
    properties: AspectProperties,
    value: Option<Value>,
    compiled: Compiled,
    active: bool,
    binder: TargetBinder,
}

impl Binding {
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn part_target(&self) -> PartTarget {
        self.part_target
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn preset(&self) -> PropertyPreset {
        self.schema.preset()
    }

    pub fn properties(&self) -> &AspectProperties {
        &self.properties
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Whether the binding holds a value that compiled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn fingerprint(&self) -> TransferFingerprint {
        self.compiled.fingerprint()
    }

    pub fn last_connection(&self) -> Option<ConnectionHash> {
        self.binder.last_connection()
    }

    fn recompile(&mut self) -> Result<(), ConfigError> {
        let Some(value) = &self.value else {
            self.compiled = Compiled::deactivated(self.kind);
            self.active = false;
            return Ok(());
        };
        match Compiled::compile(self.kind, value, &self.properties) {
            Ok(compiled) => {
                self.compiled = compiled;
                self.active = true;
                Ok(())
            }
            Err(e) => {
                debug!("binding at {:?} deactivated: {e}", self.part_target.target);
                self.compiled = Compiled::deactivated(self.kind);
                self.active = false;
                Err(e)
            }
        }
    }
}

/// Records a binding's execution into the event log.
struct EventHooks<'a> {
    binding: BindingId,
    kind: ComponentKind,
    tick: Tick,
    events: &'a mut EventLog,
    moved: Quantity,
}

impl TransferHooks for EventHooks<'_> {
    fn post_transfer(&mut self, _target: &PartTarget, moved: Quantity) {
        self.moved = moved;
        if moved > 0 {
            self.events.push(TransferEvent::Transferred {
                binding: self.binding,
                kind: self.kind,
                quantity: moved,
                tick: self.tick,
            });
        }
    }

    fn on_change(&mut self, target: &PartTarget, connection: ConnectionHash) {
        self.events.push(TransferEvent::TargetChanged {
            binding: self.binding,
            target: *target,
            connection,
            tick: self.tick,
        });
    }
}

fn execute<C: IngredientComponent>(
    binding: &Binding,
    info: &ChanneledTargetInformation<C>,
    binder: &mut TargetBinder,
    table: &mut RoutingTable,
    registry: &mut StorageRegistry<C>,
    hooks: &mut EventHooks<'_>,
) -> bool {
    let settings = TargetSettings::from_properties(&binding.properties);
    Target::new(binding.part_target, binding.direction, info, settings)
        .execute(binder, table, registry, hooks)
        .is_some()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Outcome of one [`TransferEngine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepResult {
    pub tick: Tick,
    /// Bindings whose target was valid and ran.
    pub executed: usize,
    /// Executed bindings that moved a non-zero quantity.
    pub transferred: usize,
}

#[derive(Debug)]
pub struct TransferEngine {
    config: GeneralConfig,
    network: Network,
    items: StorageRegistry<ItemComponent>,
    fluids: StorageRegistry<FluidComponent>,
    energy: StorageRegistry<EnergyComponent>,
    bindings: SlotMap<BindingId, Binding>,
    events: EventLog,
    tick: Tick,
}

impl TransferEngine {
    pub fn new() -> Self {
        Self::with_config(GeneralConfig::default())
    }

    pub fn with_config(config: GeneralConfig) -> Self {
        Self {
            config,
            network: Network::new(),
            items: StorageRegistry::new(),
            fluids: StorageRegistry::new(),
            energy: StorageRegistry::new(),
            bindings: SlotMap::with_key(),
            events: EventLog::default(),
            tick: 0,
        }
    }

    pub fn config(&self) -> &GeneralConfig {
        &self.config
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    // -----------------------------------------------------------------------
    // Interfaces
    // -----------------------------------------------------------------------

    /// Attach `storage` at `pos` and register it on the network. Replaces any
    /// storage of the same kind already there.
    pub fn add_interface<C: NetworkComponent>(
        &mut self,
        pos: PartPos,
        priority: i32,
        channel: i32,
        storage: impl IngredientStorage<C> + 'static,
    ) -> StorageId {
        let id = C::registry_mut(self).attach(pos, storage);
        self.network.table_mut(C::KIND).add_position(pos, priority, channel);
        id
    }

    /// Detach the storage of `kind` at `pos` and unregister it. Returns
    /// whether anything was there.
    pub fn remove_interface(&mut self, kind: ComponentKind, pos: PartPos) -> bool {
        let detached = match kind {
            ComponentKind::Item => self.items.detach(pos).is_some(),
            ComponentKind::Fluid => self.fluids.detach(pos).is_some(),
            ComponentKind::Energy => self.energy.detach(pos).is_some(),
        };
        let unregistered = self.network.table_mut(kind).remove_position(pos);
        detached || unregistered
    }

    /// Move a registered interface to another priority or channel.
    pub fn set_priority_and_channel(
        &mut self,
        kind: ComponentKind,
        pos: PartPos,
        priority: i32,
        channel: i32,
    ) -> bool {
        let table = self.network.table_mut(kind);
        if !table.contains(pos) {
            return false;
        }
        table.update_position(pos, priority, channel);
        true
    }

    pub fn storage<C: NetworkComponent>(
        &self,
        pos: PartPos,
    ) -> Option<&(dyn IngredientStorage<C> + 'static)> {
        C::registry(self).get(pos)
    }

    pub fn storage_mut<C: NetworkComponent>(
        &mut self,
        pos: PartPos,
    ) -> Option<&mut (dyn IngredientStorage<C> + 'static)> {
        C::registry_mut(self).get_mut(pos)
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    /// Add an inactive binding with the preset's default properties.
    pub fn add_binding(
        &mut self,
        kind: ComponentKind,
        part_target: PartTarget,
        direction: TransferDirection,
        preset: PropertyPreset,
    ) -> BindingId {
        let schema = PropertySchema::new(preset, kind, &self.config);
        let binding = Binding {
            kind,
            part_target,
            direction,
            properties: schema.defaults(),
            schema,
            value: None,
            compiled: Compiled::deactivated(kind),
            active: false,
            binder: TargetBinder::new(),
        };
        self.bindings.insert(binding)
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings.iter()
    }

    /// Set (or clear) the value a binding is configured with. A value that
    /// does not compile leaves the binding inactive.
    pub fn set_binding_value(
        &mut self,
        id: BindingId,
        value: Option<Value>,
    ) -> Result<(), EngineError> {
        let binding = self.bindings.get_mut(id).ok_or(EngineError::UnknownBinding(id))?;
        binding.value = value;
        binding.recompile()?;
        Ok(())
    }

    /// Validate and apply one property edit. A rejected edit changes nothing.
    pub fn edit_binding_property(
        &mut self,
        id: BindingId,
        key: PropertyKey,
        value: impl Into<PropertyValue>,
    ) -> Result<(), EngineError> {
        let binding = self.bindings.get_mut(id).ok_or(EngineError::UnknownBinding(id))?;
        binding.schema.edit(&mut binding.properties, key, value)?;
        binding.recompile()?;
        Ok(())
    }

    /// Replace every property of a binding with the preset defaults overlaid
    /// by `overrides`.
    pub fn set_binding_properties(
        &mut self,
        id: BindingId,
        overrides: &AspectProperties,
    ) -> Result<(), EngineError> {
        let binding = self.bindings.get_mut(id).ok_or(EngineError::UnknownBinding(id))?;
        binding.properties = binding.schema.apply(overrides)?;
        binding.recompile()?;
        Ok(())
    }

    pub fn remove_binding(&mut self, id: BindingId) -> Option<Binding> {
        self.bindings.remove(id)
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run every active binding once, in slot order.
    pub fn step(&mut self) -> StepResult {
        self.tick += 1;
        let mut result = StepResult {
            tick: self.tick,
            ..StepResult::default()
        };
        let Self {
            network,
            items,
            fluids,
            energy,
            bindings,
            events,
            tick,
            ..
        } = self;

        for (id, binding) in bindings.iter_mut() {
            if !binding.active {
                continue;
            }
            let mut hooks = EventHooks {
                binding: id,
                kind: binding.kind,
                tick: *tick,
                events: &mut *events,
                moved: 0,
            };
            let mut binder = std::mem::take(&mut binding.binder);
            let table = network.table_mut(binding.kind);
            let ran = match &binding.compiled {
                Compiled::Item(info) => {
                    execute(binding, info, &mut binder, table, &mut *items, &mut hooks)
                }
                Compiled::Fluid(info) => {
                    execute(binding, info, &mut binder, table, &mut *fluids, &mut hooks)
                }
                Compiled::Energy(info) => {
                    execute(binding, info, &mut binder, table, &mut *energy, &mut hooks)
                }
            };
            binding.binder = binder;
            if ran {
                result.executed += 1;
                if hooks.moved > 0 {
                    result.transferred += 1;
                }
            } else {
                trace!("binding at {:?} skipped on tick {tick}", binding.part_target.target);
            }
        }
        result
    }

    /// Remove and return every recorded event, oldest first.
    pub fn drain_events(&mut self) -> Vec<TransferEvent> {
        self.events.drain()
    }
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::event::EventKind;
    use crate::id::{BlockPos, ItemTypeId, Side};
    use crate::ingredient::ItemStack;
    use crate::inventory::{EnergyBattery, SlotInventory};
    use crate::routing::DEFAULT_CHANNEL;

    fn pos(x: i32) -> PartPos {
        PartPos::new(BlockPos::new(x, 0, 0), Side::Up)
    }

    fn iron(count: Quantity) -> ItemStack {
        ItemStack::new(ItemTypeId(0), count)
    }

    fn chest_with(count: Quantity) -> SlotInventory<ItemComponent> {
        let mut chest = SlotInventory::new(4, 64);
        let _ = chest.insert(iron(count), false);
        chest
    }

    fn item_stored(engine: &TransferEngine, x: i32) -> Quantity {
        engine
            .storage::<ItemComponent>(pos(x))
            .map(|s| s.stored_quantity())
            .unwrap_or(0)
    }

    fn importer(engine: &mut TransferEngine, from: i32) -> BindingId {
        engine.add_binding(
            ComponentKind::Item,
            PartTarget::new(pos(100), pos(from)),
            TransferDirection::Import,
            PropertyPreset::RateSlot,
        )
    }

    // -----------------------------------------------------------------------
    // Interfaces
    // -----------------------------------------------------------------------

    #[test]
    fn interfaces_register_on_their_kind_table() {
        let mut engine = TransferEngine::new();
        engine.add_interface::<ItemComponent>(pos(0), 0, DEFAULT_CHANNEL, chest_with(0));
        engine.add_interface::<EnergyComponent>(pos(1), 0, DEFAULT_CHANNEL, EnergyBattery::new(10));
        assert!(engine.network().table(ComponentKind::Item).contains(pos(0)));
        assert!(!engine.network().table(ComponentKind::Item).contains(pos(1)));
        assert!(engine.network().table(ComponentKind::Energy).contains(pos(1)));

        assert!(engine.remove_interface(ComponentKind::Item, pos(0)));
        assert!(!engine.remove_interface(ComponentKind::Item, pos(0)));
        assert!(engine.storage::<ItemComponent>(pos(0)).is_none());
    }

    #[test]
    fn priority_and_channel_can_be_changed() {
        let mut engine = TransferEngine::new();
        engine.add_interface::<ItemComponent>(pos(0), 0, DEFAULT_CHANNEL, chest_with(0));
        assert!(engine.set_priority_and_channel(ComponentKind::Item, pos(0), 7, 2));
        let entry = engine.network().table(ComponentKind::Item).entry(pos(0)).copied();
        assert_eq!(entry.map(|e| (e.priority, e.channel)), Some((7, 2)));
        assert!(!engine.set_priority_and_channel(ComponentKind::Item, pos(9), 1, 1));
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    #[test]
    fn new_binding_is_inactive_until_valued() {
        let mut engine = TransferEngine::new();
        engine.add_interface::<ItemComponent>(pos(0), 0, DEFAULT_CHANNEL, chest_with(10));
        engine.add_interface::<ItemComponent>(pos(1), 0, DEFAULT_CHANNEL, chest_with(0));
        let id = importer(&mut engine, 0);
        assert!(!engine.binding(id).is_some_and(Binding::is_active));
        assert_eq!(engine.step().executed, 0);

        engine.set_binding_value(id, Some(Value::Boolean(true))).unwrap();
        let result = engine.step();
        assert_eq!(result.executed, 1);
        assert_eq!(result.transferred, 1);
        assert_eq!(item_stored(&engine, 0), 0);
        assert_eq!(item_stored(&engine, 1), 10);
    }

    #[test]
    fn bad_value_deactivates_and_reports() {
        let mut engine = TransferEngine::new();
        let id = importer(&mut engine, 0);
        engine.set_binding_value(id, Some(Value::Boolean(true))).unwrap();
        let err = engine
            .set_binding_value(id, Some(Value::Fluid(crate::ingredient::FluidStack::EMPTY)))
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::UnsupportedValue { .. })));
        assert!(!engine.binding(id).is_some_and(Binding::is_active));
    }

    #[test]
    fn rejected_edit_changes_nothing() {
        let mut engine = TransferEngine::with_config(GeneralConfig {
            item_rate_limit: 16,
            ..GeneralConfig::default()
        });
        let id = importer(&mut engine, 0);
        let err = engine.edit_binding_property(id, PropertyKey::Rate, 17).unwrap_err();
        assert_eq!(
            err,
            EngineError::Config(ConfigError::Validation(ValidationError::AboveLimit {
                key: PropertyKey::Rate,
                limit: 16,
                value: 17,
            }))
        );
        let rate = |engine: &TransferEngine| {
            engine.binding(id).and_then(|b| b.properties().get_int(PropertyKey::Rate))
        };
        assert_eq!(rate(&engine), Some(64));
        engine.edit_binding_property(id, PropertyKey::Rate, 16).unwrap();
        assert_eq!(rate(&engine), Some(16));
    }

    #[test]
    fn property_edit_recompiles() {
        let mut engine = TransferEngine::new();
        let id = importer(&mut engine, 0);
        engine.set_binding_value(id, Some(Value::Boolean(true))).unwrap();
        let before = engine.binding(id).map(Binding::fingerprint);
        engine.edit_binding_property(id, PropertyKey::Rate, 8).unwrap();
        assert_ne!(engine.binding(id).map(Binding::fingerprint), before);
    }

    #[test]
    fn unknown_binding_is_an_error() {
        let mut engine = TransferEngine::new();
        let id = importer(&mut engine, 0);
        assert!(engine.remove_binding(id).is_some());
        assert_eq!(
            engine.set_binding_value(id, None),
            Err(EngineError::UnknownBinding(id))
        );
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    #[test]
    fn events_record_change_once_and_every_transfer() {
        let mut engine = TransferEngine::new();
        engine.add_interface::<ItemComponent>(pos(0), 0, DEFAULT_CHANNEL, chest_with(10));
        engine.add_interface::<ItemComponent>(pos(1), 0, DEFAULT_CHANNEL, chest_with(0));
        let id = importer(&mut engine, 0);
        engine.edit_binding_property(id, PropertyKey::Rate, 4).unwrap();
        engine.set_binding_value(id, Some(Value::Boolean(true))).unwrap();

        for _ in 0..4 {
            engine.step();
        }
        let events = engine.drain_events();
        let changes = events.iter().filter(|e| e.kind() == EventKind::TargetChanged).count();
        let moved: Vec<Quantity> = events
            .iter()
            .filter_map(|e| match e {
                TransferEvent::Transferred { quantity, .. } => Some(*quantity),
                _ => None,
            })
            .collect();
        assert_eq!(changes, 1);
        assert_eq!(moved, vec![4, 4, 2]);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn missing_target_records_nothing() {
        let mut engine = TransferEngine::new();
        engine.add_interface::<ItemComponent>(pos(1), 0, DEFAULT_CHANNEL, chest_with(0));
        let id = importer(&mut engine, 0);
        engine.set_binding_value(id, Some(Value::Boolean(true))).unwrap();
        let result = engine.step();
        assert_eq!(result.executed, 0);
        assert!(engine.drain_events().is_empty());
        assert_eq!(engine.binding(id).and_then(Binding::last_connection), None);
    }
}
