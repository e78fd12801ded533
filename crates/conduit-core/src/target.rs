//! Binding compiled information to a storage for one tick.
//!
//! A [`Target`] is rebuilt every tick from a binding's part target, its
//! compiled [`ChanneledTargetInformation`] and the [`TargetSettings`] read
//! from its properties. [`Target::execute`] runs one bounded transfer
//! between the target's storage and its channel, wrapped in pre/post hooks,
//! and reports a change of the connection hash through [`TransferHooks`].

use log::trace;
use serde::{Deserialize, Serialize};

use crate::aspect::ChanneledTargetInformation;
use crate::fingerprint::{ConnectionHash, FingerprintHasher};
use crate::id::PartTarget;
use crate::ingredient::{ComponentKind, IngredientComponent, Quantity};
use crate::network::ChannelStorage;
use crate::properties::{AspectProperties, PropertyKey};
use crate::routing::{DEFAULT_CHANNEL, RoutingTable};
use crate::storage::{IngredientStorage, SlotRestricted, StorageRegistry};
use crate::transfer::move_single;

/// Which way a binding moves resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferDirection {
    /// From the channel into the target storage.
    Export,
    /// From the target storage into the channel.
    Import,
}

impl TransferDirection {
    fn hash_into(self, h: &mut FingerprintHasher) {
        h.write_u8(match self {
            TransferDirection::Export => 0,
            TransferDirection::Import => 1,
        });
    }
}

/// Per-tick settings read from a binding's properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSettings {
    pub channel: i32,
    pub round_robin: bool,
    /// `None` when the binding has no rate property.
    pub rate: Option<Quantity>,
    pub exact_amount: bool,
    /// `None` addresses every slot.
    pub slot: Option<usize>,
}

impl TargetSettings {
    pub fn from_properties(props: &AspectProperties) -> Self {
        Self {
            channel: props
                .get_int(PropertyKey::Channel)
                .and_then(|c| i32::try_from(c).ok())
                .unwrap_or(DEFAULT_CHANNEL),
            round_robin: props.bool_or(PropertyKey::RoundRobin, false),
            rate: props.get_int(PropertyKey::Rate).map(|r| Quantity::try_from(r).unwrap_or(0)),
            exact_amount: props.bool_or(PropertyKey::ExactAmount, false),
            slot: props.get_int(PropertyKey::Slot).and_then(|s| usize::try_from(s).ok()),
        }
    }
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self::from_properties(&AspectProperties::new())
    }
}

/// Callbacks around a target's execution. Every method defaults to a no-op.
pub trait TransferHooks {
    fn pre_transfer(&mut self, _target: &PartTarget) {}

    /// Runs after every valid execution, including ones that moved nothing.
    fn post_transfer(&mut self, _target: &PartTarget, _moved: Quantity) {}

    /// The connection hash differs from the previous execution.
    fn on_change(&mut self, _target: &PartTarget, _connection: ConnectionHash) {}
}

impl TransferHooks for () {}

/// State a binding keeps between ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetBinder {
    last_connection: Option<ConnectionHash>,
}

impl TargetBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_connection(&self) -> Option<ConnectionHash> {
        self.last_connection
    }

    /// Record `connection`, returning whether it differs from the last one.
    pub fn observe(&mut self, connection: ConnectionHash) -> bool {
        self.last_connection.replace(connection) != Some(connection)
    }

    /// Forget the last connection so the next execution notifies again.
    pub fn reset(&mut self) {
        self.last_connection = None;
    }
}

/// One executable transfer, valid for a single tick.
pub struct Target<'a, C: IngredientComponent> {
    part_target: PartTarget,
    direction: TransferDirection,
    info: &'a ChanneledTargetInformation<C>,
    settings: TargetSettings,
}

impl<'a, C: IngredientComponent> Target<'a, C> {
    pub fn new(
        part_target: PartTarget,
        direction: TransferDirection,
        info: &'a ChanneledTargetInformation<C>,
        settings: TargetSettings,
    ) -> Self {
        Self {
            part_target,
            direction,
            info,
            settings,
        }
    }

    pub fn part_target(&self) -> PartTarget {
        self.part_target
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn settings(&self) -> &TargetSettings {
        &self.settings
    }

    pub fn connection_hash(&self) -> ConnectionHash {
        let mut h = FingerprintHasher::new();
        self.direction.hash_into(&mut h);
        h.write_part_pos(self.part_target.target);
        h.write_i32(self.settings.channel);
        match self.info.slot {
            Some(slot) => {
                h.write_bool(true);
                h.write_u64(slot as u64);
            }
            None => h.write_bool(false),
        }
        h.write_u64(self.info.effective_cap());
        h.write_u64(self.info.fingerprint.0);
        ConnectionHash(h.finish())
    }

    /// Whether a storage is attached at the target address.
    pub fn has_valid_target(&self, registry: &StorageRegistry<C>) -> bool {
        registry.contains(self.part_target.target)
    }

    fn is_idle(&self) -> bool {
        C::KIND == ComponentKind::Energy && self.info.predicate.quantity() == 0
    }

    /// Run the transfer. Returns `None` when the target was skipped, otherwise
    /// what moved (possibly empty).
    pub fn execute(
        &self,
        binder: &mut TargetBinder,
        table: &mut RoutingTable,
        registry: &mut StorageRegistry<C>,
        hooks: &mut dyn TransferHooks,
    ) -> Option<C::Instance> {
        if !self.has_valid_target(registry) {
            trace!("no {} storage at {:?}, skipping", C::KIND, self.part_target.target);
            return None;
        }
        if self.is_idle() {
            return None;
        }

        let own = self.part_target.target;
        let was_disabled = table.is_position_disabled(own);
        table.disable_position(own);
        hooks.pre_transfer(&self.part_target);

        let moved = registry
            .with_checked_out(own, |storage, registry| {
                let TargetSettings { channel, round_robin, .. } = self.settings;
                let mut channel = ChannelStorage::new(&mut *table, registry, channel, round_robin);
                self.transfer(storage, &mut channel)
            })
            .unwrap_or_else(C::empty);

        if !was_disabled {
            table.enable_position(own);
        }
        hooks.post_transfer(&self.part_target, C::quantity(&moved));

        let connection = self.connection_hash();
        if binder.observe(connection) {
            hooks.on_change(&self.part_target, connection);
        }
        Some(moved)
    }

    fn transfer(
        &self,
        storage: &mut dyn IngredientStorage<C>,
        channel: &mut ChannelStorage<'_, C>,
    ) -> C::Instance {
        let Some(slot) = self.info.slot else {
            return self.transfer_with(storage, channel);
        };
        let Some(slotted) = storage.as_slotted_mut() else {
            trace!("storage at {:?} has no slots", self.part_target.target);
            return C::empty();
        };
        match SlotRestricted::new(slotted, slot) {
            Some(mut restricted) => self.transfer_with(&mut restricted, channel),
            None => C::empty(),
        }
    }

    fn transfer_with<S>(&self, storage: &mut S, channel: &mut ChannelStorage<'_, C>) -> C::Instance
    where
        S: IngredientStorage<C> + ?Sized,
    {
        let predicate = &self.info.predicate;
        let cap = self.info.effective_cap();
        match self.direction {
            TransferDirection::Export => move_single(storage, channel, predicate, cap),
            TransferDirection::Import => move_single(channel, storage, predicate, cap),
        }
    }
}
