//! Ingredient components: the resource kinds the engine can move.
//!
//! Each kind is a zero-sized type implementing [`IngredientComponent`]. The
//! trait supplies the matcher (how two instances compare under a
//! [`MatchCondition`]) and the quantifier (how much an instance holds and
//! how to resize it). Everything above this module is generic over it.
//!
//! # Kinds
//!
//! - [`ItemComponent`]: discrete stacks with damage and an optional tag.
//! - [`FluidComponent`]: fluid volumes with an optional tag.
//! - [`EnergyComponent`]: a bare quantity; all energy is interchangeable.

use crate::fingerprint::FingerprintHasher;
use crate::id::{FluidTypeId, ItemTypeId};
use crate::tag::{Tag, tags_equal};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount of an ingredient.
pub type Quantity = u64;

/// Runtime discriminant of an ingredient component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Item,
    Fluid,
    Energy,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 3] =
        [ComponentKind::Item, ComponentKind::Fluid, ComponentKind::Energy];

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Item => "item",
            ComponentKind::Fluid => "fluid",
            ComponentKind::Energy => "energy",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which attributes beyond identity must correspond for two instances to
/// match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MatchCondition {
    /// Quantities must be equal.
    pub quantity: bool,
    /// Damage values must be equal. Ignored by kinds without damage.
    pub damage: bool,
    /// Tags must be equal, treating an absent tag as empty.
    pub tag: bool,
}

impl MatchCondition {
    /// Identity only.
    pub const IDENTITY: MatchCondition = MatchCondition {
        quantity: false,
        damage: false,
        tag: false,
    };

    /// Every attribute, quantity included.
    pub const EXACT: MatchCondition = MatchCondition {
        quantity: true,
        damage: true,
        tag: true,
    };

    pub fn without_quantity(self) -> Self {
        Self {
            quantity: false,
            ..self
        }
    }

    pub fn hash_into(&self, h: &mut FingerprintHasher) {
        h.write_bool(self.quantity);
        h.write_bool(self.damage);
        h.write_bool(self.tag);
    }
}

/// A resource kind: matcher plus quantifier over its instance type.
pub trait IngredientComponent: fmt::Debug + Clone + Copy + 'static {
    type Instance: Clone + fmt::Debug + PartialEq;

    const KIND: ComponentKind;
    /// The value type configured instances of this kind arrive as.
    const VALUE_TYPE: ValueType;
    /// Whether instances can be told apart. Kinds that cannot only accept
    /// boolean and integer configuration.
    const FILTERABLE: bool;

    fn empty() -> Self::Instance;

    fn quantity(instance: &Self::Instance) -> Quantity;

    fn is_empty(instance: &Self::Instance) -> bool {
        Self::quantity(instance) == 0
    }

    /// A copy of `instance` holding `quantity`.
    fn with_quantity(instance: &Self::Instance, quantity: Quantity) -> Self::Instance;

    fn matches(
        prototype: &Self::Instance,
        candidate: &Self::Instance,
        condition: MatchCondition,
    ) -> bool;

    /// Whether two instances may be merged into one.
    fn stacks_with(a: &Self::Instance, b: &Self::Instance) -> bool {
        Self::matches(a, b, MatchCondition::EXACT.without_quantity())
    }

    fn tag(instance: &Self::Instance) -> Option<&Tag>;

    fn hash_instance(instance: &Self::Instance, h: &mut FingerprintHasher);

    fn to_value(instance: &Self::Instance) -> Value;

    fn from_value(value: &Value) -> Option<Self::Instance>;
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// A stack of one item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemTypeId,
    pub count: Quantity,
    #[serde(default)]
    pub damage: u32,
    #[serde(default)]
    pub tag: Option<Tag>,
}

impl ItemStack {
    pub const EMPTY: ItemStack = ItemStack {
        item: ItemTypeId(0),
        count: 0,
        damage: 0,
        tag: None,
    };

    pub fn new(item: ItemTypeId, count: Quantity) -> Self {
        Self {
            item,
            count,
            damage: 0,
            tag: None,
        }
    }

    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemComponent;

impl IngredientComponent for ItemComponent {
    type Instance = ItemStack;

    const KIND: ComponentKind = ComponentKind::Item;
    const VALUE_TYPE: ValueType = ValueType::Item;
    const FILTERABLE: bool = true;

    fn empty() -> ItemStack {
        ItemStack::EMPTY
    }

    fn quantity(instance: &ItemStack) -> Quantity {
        instance.count
    }

    fn with_quantity(instance: &ItemStack, quantity: Quantity) -> ItemStack {
        if quantity == 0 {
            return ItemStack::EMPTY;
        }
        ItemStack {
            count: quantity,
            ..instance.clone()
        }
    }

    fn matches(prototype: &ItemStack, candidate: &ItemStack, condition: MatchCondition) -> bool {
        if prototype.is_empty() || candidate.is_empty() {
            return prototype.is_empty() && candidate.is_empty();
        }
        prototype.item == candidate.item
            && (!condition.damage || prototype.damage == candidate.damage)
            && (!condition.tag || tags_equal(prototype.tag.as_ref(), candidate.tag.as_ref()))
            && (!condition.quantity || prototype.count == candidate.count)
    }

    fn tag(instance: &ItemStack) -> Option<&Tag> {
        instance.tag.as_ref()
    }

    fn hash_instance(instance: &ItemStack, h: &mut FingerprintHasher) {
        h.write_u32(instance.item.0);
        h.write_u64(instance.count);
        h.write_u32(instance.damage);
        match &instance.tag {
            Some(tag) => {
                h.write_u8(1);
                tag.hash_into(h);
            }
            None => h.write_u8(0),
        }
    }

    fn to_value(instance: &ItemStack) -> Value {
        Value::Item(instance.clone())
    }

    fn from_value(value: &Value) -> Option<ItemStack> {
        match value {
            Value::Item(stack) => Some(stack.clone()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fluids
// ---------------------------------------------------------------------------

/// A volume of one fluid type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStack {
    pub fluid: FluidTypeId,
    pub amount: Quantity,
    #[serde(default)]
    pub tag: Option<Tag>,
}

impl FluidStack {
    pub const EMPTY: FluidStack = FluidStack {
        fluid: FluidTypeId(0),
        amount: 0,
        tag: None,
    };

    pub fn new(fluid: FluidTypeId, amount: Quantity) -> Self {
        Self {
            fluid,
            amount,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FluidComponent;

impl IngredientComponent for FluidComponent {
    type Instance = FluidStack;

    const KIND: ComponentKind = ComponentKind::Fluid;
    const VALUE_TYPE: ValueType = ValueType::Fluid;
    const FILTERABLE: bool = true;

    fn empty() -> FluidStack {
        FluidStack::EMPTY
    }

    fn quantity(instance: &FluidStack) -> Quantity {
        instance.amount
    }

    fn with_quantity(instance: &FluidStack, quantity: Quantity) -> FluidStack {
        if quantity == 0 {
            return FluidStack::EMPTY;
        }
        FluidStack {
            amount: quantity,
            ..instance.clone()
        }
    }

    fn matches(prototype: &FluidStack, candidate: &FluidStack, condition: MatchCondition) -> bool {
        if prototype.is_empty() || candidate.is_empty() {
            return prototype.is_empty() && candidate.is_empty();
        }
        prototype.fluid == candidate.fluid
            && (!condition.tag || tags_equal(prototype.tag.as_ref(), candidate.tag.as_ref()))
            && (!condition.quantity || prototype.amount == candidate.amount)
    }

    fn tag(instance: &FluidStack) -> Option<&Tag> {
        instance.tag.as_ref()
    }

    fn hash_instance(instance: &FluidStack, h: &mut FingerprintHasher) {
        h.write_u32(instance.fluid.0);
        h.write_u64(instance.amount);
        match &instance.tag {
            Some(tag) => {
                h.write_u8(1);
                tag.hash_into(h);
            }
            None => h.write_u8(0),
        }
    }

    fn to_value(instance: &FluidStack) -> Value {
        Value::Fluid(instance.clone())
    }

    fn from_value(value: &Value) -> Option<FluidStack> {
        match value {
            Value::Fluid(stack) => Some(stack.clone()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Energy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyComponent;

impl IngredientComponent for EnergyComponent {
    type Instance = Quantity;

    const KIND: ComponentKind = ComponentKind::Energy;
    const VALUE_TYPE: ValueType = ValueType::Integer;
    const FILTERABLE: bool = false;

    fn empty() -> Quantity {
        0
    }

    fn quantity(instance: &Quantity) -> Quantity {
        *instance
    }

    fn with_quantity(_instance: &Quantity, quantity: Quantity) -> Quantity {
        quantity
    }

    fn matches(prototype: &Quantity, candidate: &Quantity, condition: MatchCondition) -> bool {
        !condition.quantity || prototype == candidate
    }

    fn tag(_instance: &Quantity) -> Option<&Tag> {
        None
    }

    fn hash_instance(instance: &Quantity, h: &mut FingerprintHasher) {
        h.write_u64(*instance);
    }

    fn to_value(instance: &Quantity) -> Value {
        Value::Integer(i64::try_from(*instance).unwrap_or(i64::MAX))
    }

    fn from_value(value: &Value) -> Option<Quantity> {
        match value {
            Value::Integer(n) => Quantity::try_from(*n).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagValue;

    fn iron(count: Quantity) -> ItemStack {
        ItemStack::new(ItemTypeId(0), count)
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    #[test]
    fn item_identity_ignores_quantity_by_default() {
        assert!(ItemComponent::matches(&iron(1), &iron(64), MatchCondition::IDENTITY));
        assert!(!ItemComponent::matches(&iron(1), &iron(64), MatchCondition::EXACT));
    }

    #[test]
    fn item_damage_flag() {
        let worn = iron(1).with_damage(5);
        assert!(ItemComponent::matches(&iron(1), &worn, MatchCondition::IDENTITY));
        let cond = MatchCondition {
            damage: true,
            ..MatchCondition::IDENTITY
        };
        assert!(!ItemComponent::matches(&iron(1), &worn, cond));
    }

    #[test]
    fn item_tag_flag_treats_absent_as_empty() {
        let cond = MatchCondition {
            tag: true,
            ..MatchCondition::IDENTITY
        };
        assert!(ItemComponent::matches(&iron(1), &iron(1).with_tag(Tag::new()), cond));
        let named = iron(1).with_tag(Tag::new().with("name", TagValue::Str("x".into())));
        assert!(!ItemComponent::matches(&iron(1), &named, cond));
    }

    #[test]
    fn different_items_never_match() {
        let copper = ItemStack::new(ItemTypeId(1), 1);
        assert!(!ItemComponent::matches(&iron(1), &copper, MatchCondition::IDENTITY));
    }

    #[test]
    fn empty_only_matches_empty() {
        let e = ItemComponent::empty();
        assert!(ItemComponent::matches(&e, &e, MatchCondition::EXACT));
        assert!(!ItemComponent::matches(&e, &iron(1), MatchCondition::IDENTITY));
    }

    #[test]
    fn with_quantity_zero_is_empty() {
        assert!(ItemComponent::is_empty(&ItemComponent::with_quantity(&iron(4), 0)));
        assert_eq!(ItemComponent::with_quantity(&iron(4), 9).count, 9);
    }

    // -----------------------------------------------------------------------
    // Fluids and energy
    // -----------------------------------------------------------------------

    #[test]
    fn fluid_match_ignores_damage_flag() {
        let water = FluidStack::new(FluidTypeId(0), 1000);
        let damage = MatchCondition { damage: true, ..MatchCondition::IDENTITY };
        assert!(FluidComponent::matches(&water, &FluidStack::new(FluidTypeId(0), 5), damage));
    }

    #[test]
    fn energy_is_interchangeable() {
        assert!(EnergyComponent::matches(&10, &20, MatchCondition::IDENTITY));
        assert!(!EnergyComponent::matches(&10, &20, MatchCondition::EXACT));
    }

    #[test]
    fn energy_value_round_trip_rejects_negative() {
        assert_eq!(EnergyComponent::from_value(&Value::Integer(40)), Some(40));
        assert_eq!(EnergyComponent::from_value(&Value::Integer(-1)), None);
    }
}
