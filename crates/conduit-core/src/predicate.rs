//! Ingredient predicates: immutable filters plus a quantity policy.
//!
//! A predicate decides whether a candidate instance is acceptable. It is
//! built once when configuration changes and then shared by every transfer
//! until the next change.
//!
//! # Matching
//!
//! 1. An empty candidate matches iff the predicate's [`EmptyBehaviour`] is
//!    `Any`. The blacklist flag does not apply to this outcome.
//! 2. Otherwise the filter must accept the candidate and, when
//!    `exact_amount` is set, the candidate must hold at least the
//!    predicate's quantity.
//! 3. The result of step 2 is inverted when `blacklist` is set.

use crate::error::ConfigError;
use crate::fingerprint::{FingerprintHasher, TransferFingerprint};
use crate::ingredient::{IngredientComponent, MatchCondition, Quantity};
use crate::tag::{Tag, TagFilter};
use crate::value::{Operator, ValueList, ValueType};
use serde::{Deserialize, Serialize};

/// How an empty or absent candidate is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmptyBehaviour {
    /// Empty candidates match, and an empty prototype is a wildcard.
    Any,
    /// Empty candidates never match.
    None,
}

impl EmptyBehaviour {
    pub fn from_empty_is_any(empty_is_any: bool) -> Self {
        if empty_is_any { EmptyBehaviour::Any } else { EmptyBehaviour::None }
    }
}

/// What a predicate accepts, before quantity and blacklist are applied.
#[derive(Debug, Clone)]
pub enum Filter<C: IngredientComponent> {
    Any,
    Nothing,
    Prototype {
        prototype: C::Instance,
        condition: MatchCondition,
    },
    AnyOf {
        prototypes: Vec<C::Instance>,
        condition: MatchCondition,
    },
    Tag {
        tag: Tag,
        filter: TagFilter,
    },
    Operator(Operator),
}

impl<C: IngredientComponent> Filter<C> {
    fn accepts(&self, candidate: &C::Instance) -> bool {
        match self {
            Filter::Any => true,
            Filter::Nothing => false,
            Filter::Prototype { prototype, condition } => {
                C::matches(prototype, candidate, condition.without_quantity())
            }
            Filter::AnyOf { prototypes, condition } => prototypes
                .iter()
                .any(|p| C::matches(p, candidate, condition.without_quantity())),
            Filter::Tag { tag, filter } => filter.accepts(tag, C::tag(candidate)),
            Filter::Operator(op) => op
                .evaluate(&[C::to_value(candidate)])
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }

    /// Quantity equality demanded by the match condition, if any.
    fn required_quantity(&self) -> Option<Quantity> {
        match self {
            Filter::Prototype { prototype, condition } if condition.quantity => {
                Some(C::quantity(prototype))
            }
            _ => None,
        }
    }

    fn hash_into(&self, h: &mut FingerprintHasher) {
        match self {
            Filter::Any => h.write_u8(0),
            Filter::Nothing => h.write_u8(1),
            Filter::Prototype { prototype, condition } => {
                h.write_u8(2);
                C::hash_instance(prototype, h);
                condition.hash_into(h);
            }
            Filter::AnyOf { prototypes, condition } => {
                h.write_u8(3);
                h.write_u64(prototypes.len() as u64);
                for p in prototypes {
                    C::hash_instance(p, h);
                }
                condition.hash_into(h);
            }
            Filter::Tag { tag, filter } => {
                h.write_u8(4);
                tag.hash_into(h);
                filter.hash_into(h);
            }
            Filter::Operator(op) => {
                h.write_u8(5);
                h.write_u64(op.id());
                h.write_str(op.name());
                h.write_str(&op.signature());
            }
        }
    }
}

/// An immutable filter with a target quantity.
#[derive(Debug, Clone)]
pub struct IngredientPredicate<C: IngredientComponent> {
    filter: Filter<C>,
    quantity: Quantity,
    exact_amount: bool,
    blacklist: bool,
    empty_behaviour: EmptyBehaviour,
}

impl<C: IngredientComponent> IngredientPredicate<C> {
    pub fn new(filter: Filter<C>, quantity: Quantity) -> Self {
        Self {
            filter,
            quantity,
            exact_amount: false,
            blacklist: false,
            empty_behaviour: EmptyBehaviour::None,
        }
    }

    /// Accepts any non-empty candidate.
    pub fn match_all(quantity: Quantity, exact_amount: bool) -> Self {
        Self::new(Filter::Any, quantity).with_exact_amount(exact_amount)
    }

    /// Accepts nothing. Represents a deactivated target.
    pub fn match_none() -> Self {
        Self::new(Filter::Nothing, 0)
    }

    /// A predicate for one prototype instance.
    ///
    /// An empty prototype under [`EmptyBehaviour::Any`] becomes a wildcard.
    pub fn from_prototype(
        prototype: C::Instance,
        condition: MatchCondition,
        quantity: Quantity,
        empty_behaviour: EmptyBehaviour,
    ) -> Self {
        let filter = if C::is_empty(&prototype) && empty_behaviour == EmptyBehaviour::Any {
            Filter::Any
        } else {
            Filter::Prototype {
                prototype,
                condition,
            }
        };
        Self::new(filter, quantity).with_empty_behaviour(empty_behaviour)
    }

    /// A predicate accepting any element of `list`.
    pub fn from_list(
        list: &ValueList,
        condition: MatchCondition,
        quantity: Quantity,
    ) -> Result<Self, ConfigError> {
        if !C::FILTERABLE || !list.element_type.corresponds_to(C::VALUE_TYPE) {
            return Err(ConfigError::InvalidListValueType {
                expected: C::VALUE_TYPE,
                found: list.element_type,
            });
        }
        let prototypes = list
            .values
            .iter()
            .map(|v| {
                C::from_value(v).ok_or(ConfigError::InvalidListValueType {
                    expected: C::VALUE_TYPE,
                    found: v.value_type(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(Filter::AnyOf { prototypes, condition }, quantity))
    }

    /// A predicate evaluating `op` against each candidate.
    ///
    /// The operator must take exactly one input of this component's value
    /// type and produce a boolean.
    pub fn from_operator(op: Operator, quantity: Quantity) -> Result<Self, ConfigError> {
        let fits = C::FILTERABLE
            && op.inputs().len() == 1
            && op.inputs()[0].corresponds_to(C::VALUE_TYPE)
            && op.output().corresponds_to(ValueType::Boolean);
        if !fits {
            return Err(ConfigError::InvalidOperatorType {
                expected: format!("{} -> {}", C::VALUE_TYPE, ValueType::Boolean),
                found: op.signature(),
            });
        }
        Ok(Self::new(Filter::Operator(op), quantity))
    }

    pub fn from_tag(tag: Tag, filter: TagFilter, quantity: Quantity) -> Self {
        Self::new(Filter::Tag { tag, filter }, quantity)
    }

    pub fn with_exact_amount(mut self, exact_amount: bool) -> Self {
        self.exact_amount = exact_amount;
        self
    }

    pub fn with_blacklist(mut self, blacklist: bool) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_empty_behaviour(mut self, empty_behaviour: EmptyBehaviour) -> Self {
        self.empty_behaviour = empty_behaviour;
        self
    }

    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn filter(&self) -> &Filter<C> {
        &self.filter
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn exact_amount(&self) -> bool {
        self.exact_amount
    }

    pub fn blacklist(&self) -> bool {
        self.blacklist
    }

    pub fn empty_behaviour(&self) -> EmptyBehaviour {
        self.empty_behaviour
    }

    /// Whether nothing can ever be moved under this predicate.
    pub fn is_match_none(&self) -> bool {
        matches!(self.filter, Filter::Nothing) && !self.blacklist
    }

    /// Acceptance test for a candidate.
    pub fn matches(&self, candidate: &C::Instance) -> bool {
        if C::is_empty(candidate) {
            return self.empty_behaviour == EmptyBehaviour::Any;
        }
        let quantity_ok = (!self.exact_amount || C::quantity(candidate) >= self.quantity)
            && self
                .filter
                .required_quantity()
                .is_none_or(|q| C::quantity(candidate) == q);
        (self.filter.accepts(candidate) && quantity_ok) != self.blacklist
    }

    /// Whether the candidate's kind may be extracted under this predicate.
    ///
    /// Quantity is left out: the transfer sizes extraction itself.
    pub fn matches_kind(&self, candidate: &C::Instance) -> bool {
        !C::is_empty(candidate) && self.filter.accepts(candidate) != self.blacklist
    }

    pub fn fingerprint(&self) -> TransferFingerprint {
        let mut h = FingerprintHasher::new();
        h.write_u8(C::KIND.index() as u8);
        self.filter.hash_into(&mut h);
        h.write_u64(self.quantity);
        h.write_bool(self.exact_amount);
        h.write_bool(self.blacklist);
        h.write_bool(self.empty_behaviour == EmptyBehaviour::Any);
        TransferFingerprint(h.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ItemTypeId;
    use crate::ingredient::{EnergyComponent, ItemComponent, ItemStack};
    use crate::tag::TagValue;
    use crate::value::Value;

    type ItemPredicate = IngredientPredicate<ItemComponent>;

    fn iron(count: Quantity) -> ItemStack {
        ItemStack::new(ItemTypeId(0), count)
    }

    fn copper(count: Quantity) -> ItemStack {
        ItemStack::new(ItemTypeId(1), count)
    }

    fn iron_filter() -> ItemPredicate {
        ItemPredicate::from_prototype(iron(1), MatchCondition::IDENTITY, 8, EmptyBehaviour::None)
    }

    // -----------------------------------------------------------------------
    // Basic matching
    // -----------------------------------------------------------------------

    #[test]
    fn prototype_matches_same_item_only() {
        let p = iron_filter();
        assert!(p.matches(&iron(3)));
        assert!(!p.matches(&copper(3)));
    }

    #[test]
    fn blacklist_inverts_non_empty_outcome() {
        let p = iron_filter().with_blacklist(true);
        assert!(!p.matches(&iron(3)));
        assert!(p.matches(&copper(3)));
    }

    #[test]
    fn blacklist_does_not_touch_empty_outcome() {
        let empty = ItemComponent::empty();
        let any = iron_filter().with_empty_behaviour(EmptyBehaviour::Any);
        assert!(any.matches(&empty));
        assert!(any.clone().with_blacklist(true).matches(&empty));

        let none = iron_filter();
        assert!(!none.matches(&empty));
        assert!(!none.with_blacklist(true).matches(&empty));
    }

    #[test]
    fn exact_amount_requires_sufficient_candidate() {
        let p = ItemPredicate::match_all(10, true);
        assert!(!p.matches(&iron(6)));
        assert!(p.matches(&iron(10)));
        assert!(p.matches(&iron(12)));
        assert!(ItemPredicate::match_all(10, false).matches(&iron(6)));
    }

    #[test]
    fn quantity_condition_requires_equality() {
        let p =
            ItemPredicate::from_prototype(iron(4), MatchCondition::EXACT, 64, EmptyBehaviour::None);
        assert!(p.matches(&iron(4)));
        assert!(!p.matches(&iron(5)));
        assert!(p.matches_kind(&iron(5)));
    }

    #[test]
    fn match_none_matches_nothing() {
        let p = ItemPredicate::match_none();
        assert!(!p.matches(&iron(1)));
        assert!(!p.matches(&ItemComponent::empty()));
        assert!(p.is_match_none());
    }

    #[test]
    fn empty_prototype_with_any_is_wildcard() {
        let empty = ItemComponent::empty();
        let p = ItemPredicate::from_prototype(empty, MatchCondition::EXACT, 1, EmptyBehaviour::Any);
        assert!(matches!(p.filter(), Filter::Any));
        assert!(p.matches(&copper(9)));

        let strict = ItemPredicate::from_prototype(
            ItemComponent::empty(),
            MatchCondition::EXACT,
            1,
            EmptyBehaviour::None,
        );
        assert!(!strict.matches(&copper(9)));
    }

    // -----------------------------------------------------------------------
    // Lists, tags and operators
    // -----------------------------------------------------------------------

    #[test]
    fn list_matches_any_element() {
        let list =
            ValueList::new(ValueType::Item, vec![Value::Item(iron(1)), Value::Item(copper(1))]);
        let p = ItemPredicate::from_list(&list, MatchCondition::IDENTITY, 64).unwrap();
        assert!(p.matches(&iron(2)));
        assert!(p.matches(&copper(2)));
        assert!(!p.matches(&ItemStack::new(ItemTypeId(9), 2)));
    }

    #[test]
    fn list_with_wrong_element_type_is_rejected() {
        let list = ValueList::new(ValueType::Integer, vec![Value::Integer(3)]);
        let err = ItemPredicate::from_list(&list, MatchCondition::IDENTITY, 64).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidListValueType {
                expected: ValueType::Item,
                found: ValueType::Integer,
            }
        );
    }

    #[test]
    fn any_typed_list_rejects_foreign_elements() {
        let list = ValueList::new(ValueType::Any, vec![Value::Item(iron(1)), Value::Boolean(true)]);
        let err = ItemPredicate::from_list(&list, MatchCondition::IDENTITY, 64).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidListValueType { found: ValueType::Boolean, .. }));
    }

    #[test]
    fn tag_predicate_uses_filter_flags() {
        let proto = Tag::new().with("color", TagValue::Str("red".into()));
        let subset = TagFilter {
            subset: true,
            superset: false,
            require: true,
            recursive: false,
        };
        let p = ItemPredicate::from_tag(proto.clone(), subset, 64);
        let red = iron(1).with_tag(proto.clone().with("shiny", TagValue::Bool(true)));
        assert!(p.matches(&red));
        assert!(!p.matches(&iron(1)));
    }

    #[test]
    fn operator_predicate_evaluates_candidate() {
        let op = Operator::predicate("is_iron", ValueType::Item, |v| {
            matches!(v, Value::Item(s) if s.item == ItemTypeId(0))
        });
        let p = ItemPredicate::from_operator(op, 64).unwrap();
        assert!(p.matches(&iron(1)));
        assert!(!p.matches(&copper(1)));
    }

    #[test]
    fn operator_with_wrong_input_is_rejected() {
        let op = Operator::predicate("positive", ValueType::Integer, |_| true);
        let err = ItemPredicate::from_operator(op, 64).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidOperatorType {
                expected: "Item -> Boolean".into(),
                found: "Integer -> Boolean".into(),
            }
        );
    }

    #[test]
    fn operator_with_two_inputs_is_rejected() {
        let inputs = vec![ValueType::Item, ValueType::Item];
        let op = Operator::new("eq", inputs, ValueType::Boolean, |_| None);
        assert!(ItemPredicate::from_operator(op, 64).is_err());
    }

    #[test]
    fn operator_with_non_boolean_output_is_rejected() {
        let op = Operator::new("count", vec![ValueType::Item], ValueType::Integer, |_| None);
        assert!(ItemPredicate::from_operator(op, 64).is_err());
    }

    #[test]
    fn energy_rejects_operators() {
        let op = Operator::predicate("t", ValueType::Any, |_| true);
        assert!(IngredientPredicate::<EnergyComponent>::from_operator(op, 10).is_err());
    }

    // -----------------------------------------------------------------------
    // Fingerprints
    // -----------------------------------------------------------------------

    #[test]
    fn identical_predicates_share_fingerprint() {
        assert_eq!(iron_filter().fingerprint(), iron_filter().fingerprint());
    }

    #[test]
    fn each_flag_changes_fingerprint() {
        let base = iron_filter().fingerprint();
        assert_ne!(base, iron_filter().with_blacklist(true).fingerprint());
        assert_ne!(base, iron_filter().with_exact_amount(true).fingerprint());
        assert_ne!(base, iron_filter().with_empty_behaviour(EmptyBehaviour::Any).fingerprint());
        assert_ne!(base, iron_filter().with_quantity(9).fingerprint());
        let damage = ItemPredicate::from_prototype(
            iron(1),
            MatchCondition {
                damage: true,
                ..MatchCondition::IDENTITY
            },
            8,
            EmptyBehaviour::None,
        );
        assert_ne!(base, damage.fingerprint());
    }

    #[test]
    fn fingerprint_depends_on_component_kind() {
        let items = ItemPredicate::match_all(10, false).fingerprint();
        let energy = IngredientPredicate::<EnergyComponent>::match_all(10, false).fingerprint();
        assert_ne!(items, energy);
    }

    #[test]
    fn operators_with_same_signature_have_distinct_fingerprints() {
        let accept = Operator::predicate("f", ValueType::Item, |_| true);
        let reject = Operator::predicate("f", ValueType::Item, |_| false);
        let accept = ItemPredicate::from_operator(accept, 64).unwrap();
        let reject = ItemPredicate::from_operator(reject, 64).unwrap();
        assert!(accept.matches(&iron(1)));
        assert!(!reject.matches(&iron(1)));
        assert_ne!(accept.fingerprint(), reject.fingerprint());
        // A clone is the same operator.
        assert_eq!(accept.fingerprint(), accept.clone().fingerprint());
    }
}
