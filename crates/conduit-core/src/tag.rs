//! Structured auxiliary data attached to ingredient instances.
//!
//! A [`Tag`] is an ordered compound of named values. Tag predicates compare
//! a configured prototype tag against a candidate's tag using the flags in
//! [`TagFilter`].
//!
//! # Comparison rules
//!
//! - `subset`: every key of the prototype is present in the candidate with
//!   an equal value.
//! - `superset`: every key of the candidate is present in the prototype
//!   with an equal value. With `subset` as well this is plain equality.
//! - `recursive`: nested compounds are compared with the same subset or
//!   superset rule instead of requiring exact equality.
//! - `require`: a candidate without any tag fails. Without this flag a
//!   missing tag is compared as an empty compound.

use crate::fingerprint::FingerprintHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single tag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagValue {
    Int(i64),
    Str(String),
    Bool(bool),
    List(Vec<TagValue>),
    Compound(Tag),
}

impl TagValue {
    fn hash_into(&self, h: &mut FingerprintHasher) {
        match self {
            TagValue::Int(v) => {
                h.write_u8(0);
                h.write_i64(*v);
            }
            TagValue::Str(s) => {
                h.write_u8(1);
                h.write_str(s);
            }
            TagValue::Bool(b) => {
                h.write_u8(2);
                h.write_bool(*b);
            }
            TagValue::List(values) => {
                h.write_u8(3);
                h.write_u64(values.len() as u64);
                for v in values {
                    v.hash_into(h);
                }
            }
            TagValue::Compound(tag) => {
                h.write_u8(4);
                tag.hash_into(h);
            }
        }
    }
}

/// An ordered compound of named tag values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(BTreeMap<String, TagValue>);

impl Tag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: TagValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: TagValue) -> Option<TagValue> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether every entry of `self` appears in `other`.
    ///
    /// With `recursive`, nested compounds only need to be contained rather
    /// than equal.
    pub fn is_contained_in(&self, other: &Tag, recursive: bool) -> bool {
        self.0.iter().all(|(key, value)| match (value, other.0.get(key)) {
            (_, None) => false,
            (TagValue::Compound(inner), Some(TagValue::Compound(other_inner))) if recursive => {
                inner.is_contained_in(other_inner, true)
            }
            (value, Some(other_value)) => value == other_value,
        })
    }

    pub fn hash_into(&self, h: &mut FingerprintHasher) {
        h.write_u64(self.0.len() as u64);
        for (key, value) in &self.0 {
            h.write_str(key);
            value.hash_into(h);
        }
    }
}

/// Tags that compare equal when absent and empty.
pub fn tags_equal(a: Option<&Tag>, b: Option<&Tag>) -> bool {
    let empty = Tag::new();
    a.unwrap_or(&empty) == b.unwrap_or(&empty)
}

/// Flags selecting how a prototype tag is compared against candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagFilter {
    pub subset: bool,
    pub superset: bool,
    pub require: bool,
    pub recursive: bool,
}

impl Default for TagFilter {
    fn default() -> Self {
        Self {
            subset: true,
            superset: true,
            require: true,
            recursive: true,
        }
    }
}

impl TagFilter {
    /// Compare `prototype` against the candidate's (possibly absent) tag.
    pub fn accepts(&self, prototype: &Tag, candidate: Option<&Tag>) -> bool {
        let empty = Tag::new();
        let candidate = match candidate {
            Some(tag) => tag,
            None if self.require => return false,
            None => &empty,
        };
        (!self.subset || prototype.is_contained_in(candidate, self.recursive))
            && (!self.superset || candidate.is_contained_in(prototype, self.recursive))
    }

    pub fn hash_into(&self, h: &mut FingerprintHasher) {
        h.write_bool(self.subset);
        h.write_bool(self.superset);
        h.write_bool(self.require);
        h.write_bool(self.recursive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enchanted(level: i64) -> Tag {
        Tag::new().with(
            "ench",
            TagValue::Compound(Tag::new().with("lvl", TagValue::Int(level))),
        )
    }

    fn filter(subset: bool, superset: bool, require: bool, recursive: bool) -> TagFilter {
        TagFilter {
            subset,
            superset,
            require,
            recursive,
        }
    }

    // -----------------------------------------------------------------------
    // Containment
    // -----------------------------------------------------------------------

    #[test]
    fn empty_tag_is_contained_in_anything() {
        assert!(Tag::new().is_contained_in(&enchanted(1), false));
        assert!(Tag::new().is_contained_in(&Tag::new(), false));
    }

    #[test]
    fn containment_requires_equal_values() {
        let proto = Tag::new().with("a", TagValue::Int(1));
        let cand = Tag::new()
            .with("a", TagValue::Int(2))
            .with("b", TagValue::Bool(true));
        assert!(!proto.is_contained_in(&cand, false));
    }

    #[test]
    fn recursive_containment_descends_into_compounds() {
        let proto = Tag::new().with("ench", TagValue::Compound(Tag::new()));
        let cand = enchanted(3);
        assert!(!proto.is_contained_in(&cand, false));
        assert!(proto.is_contained_in(&cand, true));
    }

    // -----------------------------------------------------------------------
    // Filter flags
    // -----------------------------------------------------------------------

    #[test]
    fn subset_accepts_candidates_with_extra_keys() {
        let proto = Tag::new().with("a", TagValue::Int(1));
        let cand = proto.clone().with("b", TagValue::Int(2));
        assert!(filter(true, false, true, false).accepts(&proto, Some(&cand)));
        assert!(!filter(false, true, true, false).accepts(&proto, Some(&cand)));
    }

    #[test]
    fn superset_accepts_candidates_with_fewer_keys() {
        let proto = Tag::new()
            .with("a", TagValue::Int(1))
            .with("b", TagValue::Int(2));
        let cand = Tag::new().with("a", TagValue::Int(1));
        assert!(filter(false, true, true, false).accepts(&proto, Some(&cand)));
        assert!(!filter(true, false, true, false).accepts(&proto, Some(&cand)));
    }

    #[test]
    fn subset_and_superset_mean_equality() {
        let f = filter(true, true, true, false);
        assert!(f.accepts(&enchanted(2), Some(&enchanted(2))));
        assert!(!f.accepts(&enchanted(2), Some(&enchanted(3))));
    }

    #[test]
    fn require_rejects_missing_tag() {
        let proto = Tag::new();
        assert!(!filter(true, false, true, false).accepts(&proto, None));
        assert!(filter(true, false, false, false).accepts(&proto, None));
    }

    #[test]
    fn missing_tag_without_require_is_empty() {
        let proto = enchanted(1);
        assert!(!filter(true, false, false, false).accepts(&proto, None));
        assert!(filter(false, true, false, false).accepts(&proto, None));
    }

    #[test]
    fn absent_and_empty_tags_are_equal() {
        assert!(tags_equal(None, Some(&Tag::new())));
        assert!(!tags_equal(None, Some(&enchanted(1))));
    }

    #[test]
    fn hash_distinguishes_nested_values() {
        let mut a = FingerprintHasher::new();
        enchanted(1).hash_into(&mut a);
        let mut b = FingerprintHasher::new();
        enchanted(2).hash_into(&mut b);
        assert_ne!(a.finish(), b.finish());
    }
}
