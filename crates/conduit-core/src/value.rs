//! Typed configuration values.
//!
//! Bindings are configured with a [`Value`]: a boolean toggle, an integer
//! amount, a concrete ingredient instance, a list of instances, a tag, or an
//! [`Operator`] (a user function evaluated against candidates). The
//! [`aspect`](crate::aspect) module compiles values into predicates.

use crate::ingredient::{FluidStack, ItemStack};
use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The static type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Matches every other type.
    Any,
    Boolean,
    Integer,
    Item,
    Fluid,
    Tag,
    List,
    Operator,
}

impl ValueType {
    /// Type compatibility, with [`ValueType::Any`] corresponding to everything.
    pub fn corresponds_to(self, other: ValueType) -> bool {
        self == other || self == ValueType::Any || other == ValueType::Any
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Any => "Any",
            ValueType::Boolean => "Boolean",
            ValueType::Integer => "Integer",
            ValueType::Item => "Item",
            ValueType::Fluid => "Fluid",
            ValueType::Tag => "Tag",
            ValueType::List => "List",
            ValueType::Operator => "Operator",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type OperatorFn = dyn Fn(&[Value]) -> Option<Value> + Send + Sync;

static NEXT_OPERATOR_ID: AtomicU64 = AtomicU64::new(0);

/// A named function over values with a declared signature.
///
/// Evaluation returns `None` when the function cannot produce a result for
/// the given arguments. Every [`Operator::new`] call gets a fresh id that
/// clones share, so two operators with the same name and signature are
/// still told apart.
#[derive(Clone)]
pub struct Operator {
    id: u64,
    name: String,
    inputs: Vec<ValueType>,
    output: ValueType,
    func: Arc<OperatorFn>,
}

impl Operator {
    pub fn new<F>(
        name: impl Into<String>,
        inputs: Vec<ValueType>,
        output: ValueType,
        func: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            id: NEXT_OPERATOR_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            inputs,
            output,
            func: Arc::new(func),
        }
    }

    /// A one-argument boolean test.
    pub fn predicate<F>(name: impl Into<String>, input: ValueType, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(name, vec![input], ValueType::Boolean, move |args| {
            args.first().map(|v| Value::Boolean(test(v)))
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[ValueType] {
        &self.inputs
    }

    pub fn output(&self) -> ValueType {
        self.output
    }

    /// Human-readable signature, e.g. `Item -> Boolean`.
    pub fn signature(&self) -> String {
        let inputs: Vec<&str> = self.inputs.iter().map(|t| t.name()).collect();
        format!("{} -> {}", inputs.join(", "), self.output)
    }

    pub fn evaluate(&self, args: &[Value]) -> Option<Value> {
        if args.len() != self.inputs.len() {
            return None;
        }
        (self.func)(args)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("signature", &self.signature())
            .finish()
    }
}

/// A homogeneous list of values.
#[derive(Debug, Clone)]
pub struct ValueList {
    pub element_type: ValueType,
    pub values: Vec<Value>,
}

impl ValueList {
    pub fn new(element_type: ValueType, values: Vec<Value>) -> Self {
        Self {
            element_type,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A typed configuration value.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Item(ItemStack),
    Fluid(FluidStack),
    Tag(Tag),
    List(ValueList),
    Operator(Operator),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Item(_) => ValueType::Item,
            Value::Fluid(_) => ValueType::Fluid,
            Value::Tag(_) => ValueType::Tag,
            Value::List(_) => ValueType::List,
            Value::Operator(_) => ValueType::Operator,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_corresponds_both_ways() {
        assert!(ValueType::Any.corresponds_to(ValueType::Item));
        assert!(ValueType::Fluid.corresponds_to(ValueType::Any));
        assert!(!ValueType::Item.corresponds_to(ValueType::Fluid));
    }

    #[test]
    fn signature_lists_inputs_and_output() {
        let inputs = vec![ValueType::Boolean, ValueType::Boolean];
        let op = Operator::new("and", inputs, ValueType::Boolean, |_| None);
        assert_eq!(op.signature(), "Boolean, Boolean -> Boolean");
    }

    #[test]
    fn predicate_operator_evaluates_single_argument() {
        let op = Operator::predicate("positive", ValueType::Integer, |v| {
            matches!(v, Value::Integer(n) if *n > 0)
        });
        assert_eq!(op.evaluate(&[Value::Integer(3)]).and_then(|v| v.as_bool()), Some(true));
        assert_eq!(op.evaluate(&[Value::Integer(-3)]).and_then(|v| v.as_bool()), Some(false));
    }

    #[test]
    fn evaluate_rejects_wrong_arity() {
        let op = Operator::predicate("t", ValueType::Any, |_| true);
        assert!(op.evaluate(&[]).is_none());
        assert!(op.evaluate(&[Value::Integer(1), Value::Integer(2)]).is_none());
    }
}
