//! Serde data file structs for network layouts.
//!
//! A layout lists the storages attached to a network (interfaces) and the
//! bindings that move resources between them. These structs define the
//! on-disk format and are deserialized from RON, JSON, or TOML, then
//! applied to a `TransferEngine` by the loader.

use conduit_core::id::{BlockPos, FluidTypeId, ItemTypeId, PartPos, PartTarget, Side};
use conduit_core::ingredient::{ComponentKind, FluidStack, ItemStack, Quantity};
use conduit_core::properties::{AspectProperties, PropertyPreset};
use conduit_core::routing::DEFAULT_CHANNEL;
use conduit_core::tag::Tag;
use conduit_core::target::TransferDirection;
use conduit_core::value::{Value, ValueList, ValueType};
use serde::Deserialize;

// ===========================================================================
// Layout
// ===========================================================================

/// A whole network layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutData {
    #[serde(default)]
    pub interfaces: Vec<InterfaceData>,
    #[serde(default)]
    pub bindings: Vec<BindingData>,
}

/// A block face: `x`, `y`, `z` plus the side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AddressData {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub side: Side,
}

impl AddressData {
    pub fn to_part_pos(self) -> PartPos {
        PartPos::new(BlockPos::new(self.x, self.y, self.z), self.side)
    }
}

// ===========================================================================
// Interfaces
// ===========================================================================

/// A storage exposed on the network.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceData {
    pub at: AddressData,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_channel")]
    pub channel: i32,
    pub storage: StorageData,
}

fn default_channel() -> i32 {
    DEFAULT_CHANNEL
}

fn default_stack_size() -> Quantity {
    64
}

/// An in-memory storage and its initial contents.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageData {
    Chest {
        slots: usize,
        #[serde(default = "default_stack_size")]
        stack_size: Quantity,
        #[serde(default)]
        contents: Vec<ItemData>,
    },
    Tank {
        capacity: Quantity,
        #[serde(default)]
        contents: Option<FluidData>,
    },
    Battery {
        capacity: Quantity,
        #[serde(default)]
        stored: Quantity,
        #[serde(default)]
        max_receive: Option<Quantity>,
        #[serde(default)]
        max_extract: Option<Quantity>,
    },
}

impl StorageData {
    /// The component kind this storage holds.
    pub fn kind(&self) -> ComponentKind {
        match self {
            StorageData::Chest { .. } => ComponentKind::Item,
            StorageData::Tank { .. } => ComponentKind::Fluid,
            StorageData::Battery { .. } => ComponentKind::Energy,
        }
    }
}

// ===========================================================================
// Ingredients
// ===========================================================================

/// An item stack in a data file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemData {
    pub item: u32,
    pub count: Quantity,
    #[serde(default)]
    pub damage: u32,
    #[serde(default)]
    pub tag: Option<Tag>,
}

impl ItemData {
    pub fn to_stack(&self) -> ItemStack {
        let stack = ItemStack::new(ItemTypeId(self.item), self.count).with_damage(self.damage);
        match &self.tag {
            Some(tag) => stack.with_tag(tag.clone()),
            None => stack,
        }
    }
}

/// A fluid volume in a data file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FluidData {
    pub fluid: u32,
    pub amount: Quantity,
    #[serde(default)]
    pub tag: Option<Tag>,
}

impl FluidData {
    pub fn to_stack(&self) -> FluidStack {
        let stack = FluidStack::new(FluidTypeId(self.fluid), self.amount);
        match &self.tag {
            Some(tag) => stack.with_tag(tag.clone()),
            None => stack,
        }
    }
}

// ===========================================================================
// Bindings
// ===========================================================================

/// A binding between a part and the storage it faces.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingData {
    pub kind: ComponentKind,
    pub direction: TransferDirection,
    pub center: AddressData,
    pub target: AddressData,
    pub preset: PropertyPreset,
    /// Overrides of the preset's defaults.
    #[serde(default)]
    pub properties: AspectProperties,
    #[serde(default)]
    pub value: Option<ValueData>,
}

impl BindingData {
    pub fn part_target(&self) -> PartTarget {
        PartTarget::new(self.center.to_part_pos(), self.target.to_part_pos())
    }
}

/// A configured value. Operators only exist at runtime and have no data form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueData {
    Boolean(bool),
    Integer(i64),
    Item(ItemData),
    Fluid(FluidData),
    Tag(Tag),
    Items(Vec<ItemData>),
    Fluids(Vec<FluidData>),
}

impl ValueData {
    pub fn to_value(&self) -> Value {
        match self {
            ValueData::Boolean(b) => Value::Boolean(*b),
            ValueData::Integer(n) => Value::Integer(*n),
            ValueData::Item(item) => Value::Item(item.to_stack()),
            ValueData::Fluid(fluid) => Value::Fluid(fluid.to_stack()),
            ValueData::Tag(tag) => Value::Tag(tag.clone()),
            ValueData::Items(items) => Value::List(ValueList::new(
                ValueType::Item,
                items.iter().map(|i| Value::Item(i.to_stack())).collect(),
            )),
            ValueData::Fluids(fluids) => Value::List(ValueList::new(
                ValueType::Fluid,
                fluids.iter().map(|f| Value::Fluid(f.to_stack())).collect(),
            )),
        }
    }
}
