//! Aspect properties: the key/value configuration of a binding.
//!
//! A [`PropertySchema`] fixes which keys a binding accepts, their defaults
//! and their bounds. Edits go through [`PropertySchema::edit`], which
//! rejects invalid values before they are stored, so the per-tick path can
//! read an [`AspectProperties`] map without revalidating it.

use crate::config::GeneralConfig;
use crate::error::ValidationError;
use crate::ingredient::ComponentKind;
use crate::routing::DEFAULT_CHANNEL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Names of the configurable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKey {
    Channel,
    RoundRobin,
    Blacklist,
    Rate,
    ExactAmount,
    Slot,
    CheckQuantity,
    CheckDamage,
    CheckTag,
    EmptyIsAny,
    TagSubset,
    TagSuperset,
    TagRequire,
    TagRecursive,
}

impl PropertyKey {
    pub fn name(self) -> &'static str {
        match self {
            PropertyKey::Channel => "channel",
            PropertyKey::RoundRobin => "roundRobin",
            PropertyKey::Blacklist => "blacklist",
            PropertyKey::Rate => "rate",
            PropertyKey::ExactAmount => "exactAmount",
            PropertyKey::Slot => "slot",
            PropertyKey::CheckQuantity => "checkQuantity",
            PropertyKey::CheckDamage => "checkDamage",
            PropertyKey::CheckTag => "checkTag",
            PropertyKey::EmptyIsAny => "emptyIsAny",
            PropertyKey::TagSubset => "tagSubset",
            PropertyKey::TagSuperset => "tagSuperset",
            PropertyKey::TagRequire => "tagRequire",
            PropertyKey::TagRecursive => "tagRecursive",
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
}

impl PropertyValue {
    fn type_name(self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Int(_) => "integer",
        }
    }

    fn same_type(self, other: PropertyValue) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Int(n as i64)
    }
}

/// The property map of one binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AspectProperties {
    values: BTreeMap<PropertyKey, PropertyValue>,
}

impl AspectProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: PropertyKey) -> Option<PropertyValue> {
        self.values.get(&key).copied()
    }

    pub fn get_bool(&self, key: PropertyKey) -> Option<bool> {
        match self.get(key)? {
            PropertyValue::Bool(b) => Some(b),
            PropertyValue::Int(_) => None,
        }
    }

    pub fn get_int(&self, key: PropertyKey) -> Option<i64> {
        match self.get(key)? {
            PropertyValue::Int(n) => Some(n),
            PropertyValue::Bool(_) => None,
        }
    }

    pub fn bool_or(&self, key: PropertyKey, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn contains(&self, key: PropertyKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyKey, PropertyValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Unvalidated insert. Use [`PropertySchema::edit`] for authored values.
    pub fn with(mut self, key: PropertyKey, value: impl Into<PropertyValue>) -> Self {
        self.values.insert(key, value.into());
        self
    }
}

/// Which property set a binding exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyPreset {
    /// Channel, round-robin and exact amount. Integer amounts.
    Plain,
    /// Plain plus a slot. Integer item amounts.
    Slot,
    /// Plain plus a rate. Boolean toggles of fluids and energy.
    Rate,
    /// Rate plus a slot. Boolean toggles of items.
    RateSlot,
    /// Rate, slot, blacklist, match flags and empty handling. Single instances.
    RateChecks,
    /// Like `RateChecks` without empty handling. Lists and operators.
    RateChecksList,
    /// Rate, slot, blacklist and tag comparison flags. Tags.
    Tag,
}

impl PropertyPreset {
    fn keys(self, kind: ComponentKind) -> Vec<PropertyKey> {
        use PropertyKey::*;
        let slotted = kind == ComponentKind::Item;
        let mut keys = vec![Channel, RoundRobin, ExactAmount];
        match self {
            PropertyPreset::Plain => {}
            PropertyPreset::Slot => keys.push(Slot),
            PropertyPreset::Rate => keys.push(Rate),
            PropertyPreset::RateSlot => keys.extend([Rate, Slot]),
            PropertyPreset::RateChecks | PropertyPreset::RateChecksList => {
                keys.extend([Blacklist, Rate, CheckQuantity, CheckTag]);
                if slotted {
                    keys.extend([Slot, CheckDamage]);
                }
                if self == PropertyPreset::RateChecks {
                    keys.push(EmptyIsAny);
                }
            }
            PropertyPreset::Tag => {
                keys.extend([Blacklist, Rate, TagSubset, TagSuperset, TagRequire, TagRecursive]);
                if slotted {
                    keys.push(Slot);
                }
            }
        }
        if !slotted {
            keys.retain(|k| *k != Slot);
        }
        keys
    }
}

/// Default rate for a component kind.
pub fn default_rate(kind: ComponentKind) -> i64 {
    match kind {
        ComponentKind::Item => 64,
        ComponentKind::Fluid | ComponentKind::Energy => 1000,
    }
}

fn default_value(key: PropertyKey, kind: ComponentKind) -> PropertyValue {
    use PropertyKey::*;
    match key {
        Channel => PropertyValue::Int(DEFAULT_CHANNEL as i64),
        Rate => PropertyValue::Int(default_rate(kind)),
        Slot => PropertyValue::Int(-1),
        RoundRobin | Blacklist | ExactAmount | CheckQuantity => PropertyValue::Bool(false),
        CheckDamage | CheckTag | EmptyIsAny => PropertyValue::Bool(true),
        TagSubset | TagSuperset | TagRequire | TagRecursive => PropertyValue::Bool(true),
    }
}

/// Keys, defaults and bounds of one binding's properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySchema {
    preset: PropertyPreset,
    kind: ComponentKind,
    keys: Vec<PropertyKey>,
    rate_limit: i64,
}

impl PropertySchema {
    pub fn new(preset: PropertyPreset, kind: ComponentKind, config: &GeneralConfig) -> Self {
        Self {
            preset,
            kind,
            keys: preset.keys(kind),
            rate_limit: config.rate_limit(kind),
        }
    }

    pub fn preset(&self) -> PropertyPreset {
        self.preset
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn keys(&self) -> &[PropertyKey] {
        &self.keys
    }

    pub fn defaults(&self) -> AspectProperties {
        self.keys
            .iter()
            .fold(AspectProperties::new(), |props, &key| {
                props.with(key, default_value(key, self.kind))
            })
    }

    pub fn validate_value(
        &self,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<(), ValidationError> {
        if !self.keys.contains(&key) {
            return Err(ValidationError::UnknownProperty { key });
        }
        let default = default_value(key, self.kind);
        if !value.same_type(default) {
            return Err(ValidationError::TypeMismatch {
                key,
                expected: default.type_name(),
            });
        }
        match (key, value) {
            (PropertyKey::Rate, PropertyValue::Int(n)) if n < 0 => {
                Err(ValidationError::BelowMinimum { key, min: 0, value: n })
            }
            (PropertyKey::Rate, PropertyValue::Int(n)) if n > self.rate_limit => {
                Err(ValidationError::AboveLimit {
                    key,
                    limit: self.rate_limit,
                    value: n,
                })
            }
            (PropertyKey::Slot, PropertyValue::Int(n)) if n < -1 => {
                Err(ValidationError::BelowMinimum { key, min: -1, value: n })
            }
            _ => Ok(()),
        }
    }

    /// Validate and apply one edit. Rejected edits leave `props` unchanged.
    pub fn edit(
        &self,
        props: &mut AspectProperties,
        key: PropertyKey,
        value: impl Into<PropertyValue>,
    ) -> Result<(), ValidationError> {
        let value = value.into();
        self.validate_value(key, value)?;
        props.values.insert(key, value);
        Ok(())
    }

    /// Defaults with `overrides` applied, all validated.
    pub fn apply(&self, overrides: &AspectProperties) -> Result<AspectProperties, ValidationError> {
        let mut props = self.defaults();
        for (key, value) in overrides.iter() {
            self.edit(&mut props, key, value)?;
        }
        Ok(props)
    }
}
