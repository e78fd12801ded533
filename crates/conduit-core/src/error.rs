//! Configuration errors.
//!
//! These are only produced when configuration is authored or compiled into
//! a predicate. The per-tick transfer path never fails: missing endpoints
//! and exact-amount shortfalls simply move nothing.

use crate::id::BindingId;
use crate::ingredient::ComponentKind;
use crate::properties::PropertyKey;
use crate::value::ValueType;

/// A configured value could not be compiled into a predicate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The operator's declared signature does not fit the component.
    #[error("invalid operator type: expected {expected}, got {found}")]
    InvalidOperatorType { expected: String, found: String },

    /// A list holds elements of the wrong type.
    #[error("invalid list element type: expected {expected}, got {found}")]
    InvalidListValueType { expected: ValueType, found: ValueType },

    /// The component cannot be configured with values of this type.
    #[error("{kind} targets do not accept {found} values")]
    UnsupportedValue { kind: ComponentKind, found: ValueType },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    /// Localisation key for presenting the error to players.
    pub fn translation_key(&self) -> &'static str {
        match self {
            ConfigError::InvalidOperatorType { .. } => "conduit.error.operator.invalid_type",
            ConfigError::InvalidListValueType { .. } => "conduit.error.list.invalid_value_type",
            ConfigError::UnsupportedValue { .. } => "conduit.error.value.unsupported",
            ConfigError::Validation(e) => e.translation_key(),
        }
    }
}

/// A property edit was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("property '{key}' is not defined for this aspect")]
    UnknownProperty { key: PropertyKey },

    #[error("property '{key}' expects a {expected} value")]
    TypeMismatch { key: PropertyKey, expected: &'static str },

    #[error("property '{key}' must not be below {min}, got {value}")]
    BelowMinimum { key: PropertyKey, min: i64, value: i64 },

    #[error("property '{key}' must not exceed {limit}, got {value}")]
    AboveLimit { key: PropertyKey, limit: i64, value: i64 },
}

impl ValidationError {
    pub fn translation_key(&self) -> &'static str {
        match self {
            ValidationError::UnknownProperty { .. } => "conduit.error.property.unknown",
            ValidationError::TypeMismatch { .. } => "conduit.error.property.type",
            ValidationError::BelowMinimum { .. } => "conduit.error.property.below_minimum",
            ValidationError::AboveLimit { .. } => "conduit.error.property.above_limit",
        }
    }
}

/// An engine operation failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no binding with id {0:?}")]
    UnknownBinding(BindingId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::Config(ConfigError::Validation(e))
    }
}
