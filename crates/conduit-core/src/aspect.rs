//! Compiling configured values into target information.
//!
//! A binding is configured with a [`Value`] and an [`AspectProperties`] map.
//! [`compile`] turns the pair into a [`ChanneledTargetInformation`] once,
//! when configuration changes, so malformed configuration is reported at
//! that boundary and never during a tick.
//!
//! | Value             | Predicate                                          |
//! |-------------------|----------------------------------------------------|
//! | `true`            | anything, up to the rate                           |
//! | `false`           | nothing                                            |
//! | integer `n`       | anything, up to `n` (no rate cap)                  |
//! | instance          | that instance under the configured match flags     |
//! | list of instances | any element                                        |
//! | tag               | instances whose tag compares under the tag flags   |
//! | operator          | instances the operator maps to `true`              |
//!
//! Blacklist inverts every filtered row except the operator, whose result
//! is taken as is.

use crate::error::ConfigError;
use crate::fingerprint::TransferFingerprint;
use crate::ingredient::{IngredientComponent, MatchCondition, Quantity};
use crate::predicate::{EmptyBehaviour, IngredientPredicate};
use crate::properties::{AspectProperties, PropertyKey, default_rate};
use crate::tag::TagFilter;
use crate::target::TargetSettings;
use crate::value::Value;

/// What a target moves, and from which slot.
#[derive(Debug, Clone)]
pub struct ChanneledTargetInformation<C: IngredientComponent> {
    pub predicate: IngredientPredicate<C>,
    pub fingerprint: TransferFingerprint,
    pub slot: Option<usize>,
    /// Most one execution may move. `None` is uncapped.
    pub rate_cap: Option<Quantity>,
}

impl<C: IngredientComponent> ChanneledTargetInformation<C> {
    pub fn new(predicate: IngredientPredicate<C>, slot: Option<usize>) -> Self {
        Self {
            fingerprint: predicate.fingerprint(),
            predicate,
            slot,
            rate_cap: None,
        }
    }

    pub fn with_rate_cap(mut self, rate_cap: Option<Quantity>) -> Self {
        self.rate_cap = rate_cap;
        self
    }

    /// The cap as a plain quantity.
    pub fn effective_cap(&self) -> Quantity {
        self.rate_cap.unwrap_or(Quantity::MAX)
    }

    /// Moves nothing.
    pub fn deactivated() -> Self {
        Self::new(IngredientPredicate::match_none(), None)
    }
}

fn match_condition(props: &AspectProperties) -> MatchCondition {
    MatchCondition {
        quantity: props.bool_or(PropertyKey::CheckQuantity, false),
        damage: props.bool_or(PropertyKey::CheckDamage, true),
        tag: props.bool_or(PropertyKey::CheckTag, true),
    }
}

fn tag_filter(props: &AspectProperties) -> TagFilter {
    TagFilter {
        subset: props.bool_or(PropertyKey::TagSubset, true),
        superset: props.bool_or(PropertyKey::TagSuperset, true),
        require: props.bool_or(PropertyKey::TagRequire, true),
        recursive: props.bool_or(PropertyKey::TagRecursive, true),
    }
}

/// Compile `value` under `props` for component `C`.
pub fn compile<C: IngredientComponent>(
    value: &Value,
    props: &AspectProperties,
) -> Result<ChanneledTargetInformation<C>, ConfigError> {
    let settings = TargetSettings::from_properties(props);
    let rate = settings
        .rate
        .unwrap_or_else(|| default_rate(C::KIND).max(0) as Quantity);
    let exact = settings.exact_amount;
    let blacklist = props.bool_or(PropertyKey::Blacklist, false);

    if !C::FILTERABLE && !matches!(value, Value::Boolean(_) | Value::Integer(_)) {
        return Err(ConfigError::UnsupportedValue {
            kind: C::KIND,
            found: value.value_type(),
        });
    }

    let predicate = match value {
        Value::Boolean(true) => IngredientPredicate::match_all(rate, exact),
        Value::Boolean(false) => IngredientPredicate::match_none(),
        Value::Integer(n) => {
            IngredientPredicate::match_all(Quantity::try_from(*n).unwrap_or(0), exact)
        }
        Value::List(list) => IngredientPredicate::from_list(list, match_condition(props), rate)?
            .with_exact_amount(exact)
            .with_blacklist(blacklist),
        // The operator decides on its own; blacklist does not invert it.
        Value::Operator(op) => {
            IngredientPredicate::from_operator(op.clone(), rate)?.with_exact_amount(exact)
        }
        Value::Tag(tag) => IngredientPredicate::from_tag(tag.clone(), tag_filter(props), rate)
            .with_exact_amount(exact)
            .with_blacklist(blacklist),
        other => {
            let prototype = C::from_value(other).ok_or(ConfigError::UnsupportedValue {
                kind: C::KIND,
                found: other.value_type(),
            })?;
            let condition = match_condition(props);
            let empty_is_any = props.bool_or(PropertyKey::EmptyIsAny, false);
            let empty = EmptyBehaviour::from_empty_is_any(empty_is_any);
            // A quantity check moves exactly the prototype's quantity.
            let (quantity, exact) = if condition.quantity {
                (C::quantity(&prototype), true)
            } else {
                (rate, exact)
            };
            IngredientPredicate::from_prototype(prototype, condition, quantity, empty)
                .with_exact_amount(exact)
                .with_blacklist(blacklist)
        }
    };
    // An integer value is its own amount and ignores the rate.
    let cap = match value {
        Value::Integer(_) => None,
        _ => settings.rate,
    };
    Ok(ChanneledTargetInformation::new(predicate, settings.slot).with_rate_cap(cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneralConfig;
    use crate::id::{FluidTypeId, ItemTypeId};
    use crate::ingredient::{
        ComponentKind, EnergyComponent, FluidComponent, FluidStack, ItemComponent, ItemStack,
    };
    use crate::properties::{PropertyPreset, PropertySchema};
    use crate::tag::{Tag, TagValue};
    use crate::value::{Operator, ValueList, ValueType};

    fn props(preset: PropertyPreset, kind: ComponentKind) -> AspectProperties {
        PropertySchema::new(preset, kind, &GeneralConfig::default()).defaults()
    }

    fn iron(count: Quantity) -> ItemStack {
        ItemStack::new(ItemTypeId(0), count)
    }

    #[test]
    fn boolean_true_matches_all_up_to_rate() {
        let p = props(PropertyPreset::RateSlot, ComponentKind::Item);
        let info = compile::<ItemComponent>(&Value::Boolean(true), &p).unwrap();
        assert_eq!(info.predicate.quantity(), 64);
        assert!(info.predicate.matches(&iron(1)));
        assert_eq!(info.slot, None);
    }

    #[test]
    fn boolean_false_deactivates() {
        let p = props(PropertyPreset::RateSlot, ComponentKind::Item);
        let info = compile::<ItemComponent>(&Value::Boolean(false), &p).unwrap();
        assert!(info.predicate.is_match_none());
        let deactivated = ChanneledTargetInformation::<ItemComponent>::deactivated();
        assert_eq!(info.fingerprint, deactivated.fingerprint);
    }

    #[test]
    fn integer_sets_amount() {
        let p = props(PropertyPreset::Plain, ComponentKind::Energy);
        let info = compile::<EnergyComponent>(&Value::Integer(250), &p).unwrap();
        assert_eq!(info.predicate.quantity(), 250);
        let negative = compile::<EnergyComponent>(&Value::Integer(-5), &p).unwrap();
        assert_eq!(negative.predicate.quantity(), 0);
    }

    #[test]
    fn integer_ignores_rate_property() {
        let p = props(PropertyPreset::RateSlot, ComponentKind::Item);
        let info = compile::<ItemComponent>(&Value::Integer(100), &p).unwrap();
        assert_eq!(info.predicate.quantity(), 100);
        assert_eq!(info.rate_cap, None);
        assert_eq!(info.effective_cap(), Quantity::MAX);

        let toggle = compile::<ItemComponent>(&Value::Boolean(true), &p).unwrap();
        assert_eq!(toggle.rate_cap, Some(64));
    }

    #[test]
    fn slot_property_is_carried() {
        let p = props(PropertyPreset::RateSlot, ComponentKind::Item).with(PropertyKey::Slot, 3);
        let info = compile::<ItemComponent>(&Value::Boolean(true), &p).unwrap();
        assert_eq!(info.slot, Some(3));
    }

    #[test]
    fn instance_honours_blacklist_and_flags() {
        let p = props(PropertyPreset::RateChecks, ComponentKind::Item)
            .with(PropertyKey::Blacklist, true);
        let info = compile::<ItemComponent>(&Value::Item(iron(1)), &p).unwrap();
        assert!(!info.predicate.matches(&iron(5)));
        assert!(info.predicate.matches(&ItemStack::new(ItemTypeId(1), 5)));
    }

    #[test]
    fn quantity_check_moves_prototype_quantity_exactly() {
        let p = props(PropertyPreset::RateChecks, ComponentKind::Item)
            .with(PropertyKey::CheckQuantity, true);
        let info = compile::<ItemComponent>(&Value::Item(iron(16)), &p).unwrap();
        assert_eq!(info.predicate.quantity(), 16);
        assert!(info.predicate.exact_amount());
    }

    #[test]
    fn empty_instance_with_empty_is_any_is_wildcard() {
        let p = props(PropertyPreset::RateChecks, ComponentKind::Item);
        let info = compile::<ItemComponent>(&Value::Item(ItemStack::EMPTY), &p).unwrap();
        assert!(info.predicate.matches(&iron(2)));
    }

    #[test]
    fn fluid_instance_compiles() {
        let water = FluidStack::new(FluidTypeId(0), 1000);
        let p = props(PropertyPreset::RateChecks, ComponentKind::Fluid);
        let info = compile::<FluidComponent>(&Value::Fluid(water.clone()), &p).unwrap();
        assert!(info.predicate.matches(&water));
        assert_eq!(info.predicate.quantity(), 1000);
    }

    #[test]
    fn item_value_for_fluid_target_is_unsupported() {
        let p = props(PropertyPreset::RateChecks, ComponentKind::Fluid);
        let err = compile::<FluidComponent>(&Value::Item(iron(1)), &p).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedValue {
                kind: ComponentKind::Fluid,
                found: ValueType::Item,
            }
        );
    }

    #[test]
    fn energy_rejects_filters() {
        let p = props(PropertyPreset::Rate, ComponentKind::Energy);
        assert!(compile::<EnergyComponent>(&Value::Tag(Tag::new()), &p).is_err());
        let list = ValueList::new(ValueType::Integer, vec![Value::Integer(1)]);
        assert!(matches!(
            compile::<EnergyComponent>(&Value::List(list), &p),
            Err(ConfigError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn list_and_operator_errors_surface() {
        let p = props(PropertyPreset::RateChecksList, ComponentKind::Item);
        let list = ValueList::new(ValueType::Fluid, vec![]);
        assert!(matches!(
            compile::<ItemComponent>(&Value::List(list), &p),
            Err(ConfigError::InvalidListValueType { .. })
        ));
        let op = Operator::predicate("f", ValueType::Fluid, |_| true);
        assert!(matches!(
            compile::<ItemComponent>(&Value::Operator(op), &p),
            Err(ConfigError::InvalidOperatorType { .. })
        ));
    }

    #[test]
    fn blacklist_does_not_invert_operators() {
        let p = props(PropertyPreset::RateChecksList, ComponentKind::Item)
            .with(PropertyKey::Blacklist, true);
        let is_iron = Operator::predicate("is_iron", ValueType::Item, |v| {
            matches!(v, Value::Item(stack) if stack.item == ItemTypeId(0))
        });
        let info = compile::<ItemComponent>(&Value::Operator(is_iron), &p).unwrap();
        assert!(!info.predicate.blacklist());
        assert!(info.predicate.matches(&iron(1)));
        assert!(!info.predicate.matches(&ItemStack::new(ItemTypeId(1), 1)));
    }

    #[test]
    fn tag_uses_tag_flags() {
        let p =
            props(PropertyPreset::Tag, ComponentKind::Item).with(PropertyKey::TagSuperset, false);
        let proto = Tag::new().with("k", TagValue::Int(1));
        let info = compile::<ItemComponent>(&Value::Tag(proto.clone()), &p).unwrap();
        let wider = proto.with("extra", TagValue::Bool(true));
        assert!(info.predicate.matches(&iron(1).with_tag(wider)));
    }

    #[test]
    fn changed_property_changes_fingerprint() {
        let base = props(PropertyPreset::RateChecks, ComponentKind::Item);
        let a = compile::<ItemComponent>(&Value::Item(iron(1)), &base).unwrap();
        let loose = base.clone().with(PropertyKey::CheckDamage, false);
        let b = compile::<ItemComponent>(&Value::Item(iron(1)), &loose).unwrap();
        let c = compile::<ItemComponent>(&Value::Item(iron(1)), &base).unwrap();
        assert_ne!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint, c.fingerprint);
    }
}
