//! Key-case transformer
//!
//! Rewrites every non-reserved mapping key in a [`StructuredValue`], at every
//! nesting level, and leaves everything else alone. Values are only inspected
//! to recurse into lists and mappings.

use crate::casing::Casing;
use crate::pointer::push_pointer_token;
use crate::reserved::ReservedKeySet;
use crate::value::{Mapping, StructuredValue};
use serde::Serialize;
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

/// Sentinel key carried by UI-framework element objects (`$$typeof`)
///
/// Only consulted when a transformer is built with
/// [`KeyTransformer::with_sentinel_key`]. Any plain data mapping that happens
/// to contain the sentinel is skipped entirely, keys and all.
pub const DEFAULT_SENTINEL_KEY: &str = "$$typeof";

/// Counters collected while transforming
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    /// Mapping keys examined
    pub keys_visited: u64,
    /// Keys whose spelling changed
    pub keys_rewritten: u64,
    /// Keys kept because they were reserved
    pub keys_reserved: u64,
    /// Mappings returned untouched because they carried the sentinel key
    pub sentinel_bypasses: u64,
    /// Keys that collided with an earlier key after rewriting
    pub collisions: u64,
}

impl TransformStats {
    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &TransformStats) {
        self.keys_visited += other.keys_visited;
        self.keys_rewritten += other.keys_rewritten;
        self.keys_reserved += other.keys_reserved;
        self.sentinel_bypasses += other.sentinel_bypasses;
        self.collisions += other.collisions;
    }
}

/// A key the transformer would rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRewrite {
    /// JSON Pointer to the key, spelled with the original keys
    pub pointer: String,
    /// Key as found
    pub from: String,
    /// Key after rewriting
    pub to: String,
}

/// Rewrites mapping keys into one [`Casing`]
///
/// Cheap to clone; the reserved set is shared.
#[derive(Debug, Clone)]
pub struct KeyTransformer {
    casing: Casing,
    reserved: Arc<ReservedKeySet>,
    sentinel_key: Option<String>,
}

impl KeyTransformer {
    /// Build a transformer for `casing` guarded by `reserved`.
    pub fn new(casing: Casing, reserved: ReservedKeySet) -> Self {
        Self {
            casing,
            reserved: Arc::new(reserved),
            sentinel_key: None,
        }
    }

    /// snake_case → camelCase with the default reserved set
    pub fn camel() -> Self {
        Self::new(Casing::Camel, ReservedKeySet::default())
    }

    /// camelCase → snake_case with the default reserved set
    pub fn snake() -> Self {
        Self::new(Casing::Snake, ReservedKeySet::default())
    }

    /// Skip any mapping that contains `key`.
    ///
    /// This is a compatibility shim for callers that cannot model framework
    /// objects as [`StructuredValue::Opaque`].
    pub fn with_sentinel_key(mut self, key: impl Into<String>) -> Self {
        self.sentinel_key = Some(key.into());
        self
    }

    /// Same transformer pointed the other way
    pub fn inverse(&self) -> Self {
        Self {
            casing: self.casing.inverse(),
            reserved: Arc::clone(&self.reserved),
            sentinel_key: self.sentinel_key.clone(),
        }
    }

    /// Target casing
    pub fn casing(&self) -> Casing {
        self.casing
    }

    /// Reserved keys in effect
    pub fn reserved(&self) -> &ReservedKeySet {
        &self.reserved
    }

    /// Sentinel key, when the shim is enabled
    pub fn sentinel_key(&self) -> Option<&str> {
        self.sentinel_key.as_deref()
    }

    /// Rewrite a single key. Reserved keys come back unchanged.
    pub fn transform_key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        if self.reserved.is_reserved(key) {
            Cow::Borrowed(key)
        } else {
            self.casing.convert(key)
        }
    }

    /// Return a transformed copy of `value`.
    pub fn transform(&self, value: &StructuredValue) -> StructuredValue {
        self.transform_owned(value.clone())
    }

    /// Transform `value` in place of a copy.
    pub fn transform_owned(&self, value: StructuredValue) -> StructuredValue {
        let mut stats = TransformStats::default();
        self.apply(value, &mut stats)
    }

    /// Transform `value` and report what happened.
    pub fn transform_with_stats(
        &self,
        value: StructuredValue,
    ) -> (StructuredValue, TransformStats) {
        let mut stats = TransformStats::default();
        let value = self.apply(value, &mut stats);
        (value, stats)
    }

    /// List every key that [`transform`](Self::transform) would rewrite,
    /// in document order.
    pub fn audit(&self, value: &StructuredValue) -> Vec<KeyRewrite> {
        let mut rewrites = Vec::new();
        let mut pointer = String::new();
        self.audit_into(value, &mut pointer, &mut rewrites);
        rewrites
    }

    fn apply(&self, value: StructuredValue, stats: &mut TransformStats) -> StructuredValue {
        match value {
            StructuredValue::List(items) => StructuredValue::List(
                items
                    .into_iter()
                    .map(|item| self.apply(item, stats))
                    .collect(),
            ),
            StructuredValue::Mapping(map) => {
                if self.is_framework_object(&map) {
                    stats.sentinel_bypasses += 1;
                    return StructuredValue::Mapping(map);
                }

                let mut out = Mapping::with_capacity(map.len());
                for (key, child) in map {
                    stats.keys_visited += 1;
                    let key = if self.reserved.is_reserved(&key) {
                        stats.keys_reserved += 1;
                        key
                    } else {
                        let rewritten = match self.casing.convert(&key) {
                            Cow::Borrowed(_) => None,
                            Cow::Owned(new_key) => Some(new_key),
                        };
                        match rewritten {
                            Some(new_key) => {
                                stats.keys_rewritten += 1;
                                new_key
                            }
                            None => key,
                        }
                    };

                    let child = self.apply(child, stats);
                    if out.insert(key, child).is_some() {
                        stats.collisions += 1;
                    }
                }
                StructuredValue::Mapping(out)
            }
            other => other,
        }
    }

    fn audit_into(
        &self,
        value: &StructuredValue,
        pointer: &mut String,
        out: &mut Vec<KeyRewrite>,
    ) {
        match value {
            StructuredValue::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let len = pointer.len();
                    push_pointer_token(pointer, &idx.to_string());
                    self.audit_into(item, pointer, out);
                    pointer.truncate(len);
                }
            }
            StructuredValue::Mapping(map) => {
                if self.is_framework_object(map) {
                    return;
                }
                for (key, child) in map {
                    let len = pointer.len();
                    push_pointer_token(pointer, key);
                    if let Cow::Owned(to) = self.transform_key(key) {
                        out.push(KeyRewrite {
                            pointer: pointer.clone(),
                            from: key.clone(),
                            to,
                        });
                    }
                    self.audit_into(child, pointer, out);
                    pointer.truncate(len);
                }
            }
            _ => {}
        }
    }

    fn is_framework_object(&self, map: &Mapping) -> bool {
        self.sentinel_key
            .as_deref()
            .is_some_and(|sentinel| map.contains_key(sentinel))
    }
}

fn default_camel() -> &'static KeyTransformer {
    static CAMEL: OnceLock<KeyTransformer> = OnceLock::new();
    CAMEL.get_or_init(KeyTransformer::camel)
}

fn default_snake() -> &'static KeyTransformer {
    static SNAKE: OnceLock<KeyTransformer> = OnceLock::new();
    SNAKE.get_or_init(KeyTransformer::snake)
}

/// Rewrite snake_case keys to camelCase using the default reserved set.
pub fn to_camel(value: &StructuredValue) -> StructuredValue {
    default_camel().transform(value)
}

/// Rewrite camelCase keys to snake_case using the default reserved set.
pub fn to_snake(value: &StructuredValue) -> StructuredValue {
    default_snake().transform(value)
}

/// Whether the default reserved set protects `key`.
pub fn is_reserved(key: &str) -> bool {
    default_camel().reserved().is_reserved(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OpaqueHandle;
    use serde_json::json;

    fn sv(value: serde_json::Value) -> StructuredValue {
        StructuredValue::from(value)
    }

    #[test]
    fn concrete_example_roundtrip() {
        let original = sv(json!({
            "final_amount": 1000,
            "created_at": "2024-01-01",
            "onClick": "noop",
            "nested": {"total_students": 5}
        }));
        let camel = to_camel(&original);
        assert_eq!(
            camel,
            sv(json!({
                "finalAmount": 1000,
                "createdAt": "2024-01-01",
                "onClick": "noop",
                "nested": {"totalStudents": 5}
            }))
        );
        assert_eq!(to_snake(&camel), original);
    }

    #[test]
    fn input_is_not_mutated() {
        let original = sv(json!({"user_id": 1}));
        let before = original.clone();
        let _ = to_camel(&original);
        assert_eq!(original, before);
    }

    #[test]
    fn lists_of_mappings_are_traversed() {
        let value = sv(json!([{"course_id": 1}, [{"lesson_title": "x"}], 3, null]));
        assert_eq!(
            to_camel(&value),
            sv(json!([{"courseId": 1}, [{"lessonTitle": "x"}], 3, null]))
        );
    }

    #[test]
    fn string_values_are_not_rewritten() {
        let value = sv(json!({"status_text": "created_at"}));
        assert_eq!(to_camel(&value), sv(json!({"statusText": "created_at"})));
    }

    #[test]
    fn reserved_keys_untouched_in_both_directions() {
        let value = sv(json!({"className": "x", "data-test_id": 1, "aria-label": "y"}));
        assert_eq!(to_snake(&value), value);
        assert_eq!(to_camel(&value), value);
    }

    #[test]
    fn reserved_check_uses_original_key() {
        // "class_name" is not reserved, even though its camel form is.
        let value = sv(json!({"class_name": "x"}));
        assert_eq!(to_camel(&value), sv(json!({"className": "x"})));
    }

    #[test]
    fn opaque_handles_pass_through() {
        let handle = OpaqueHandle::new("component", "<Button/>");
        let mut map = Mapping::new();
        map.insert("render_fn", StructuredValue::Opaque(handle.clone()));
        let out = to_camel(&StructuredValue::Mapping(map));
        assert_eq!(out.get("renderFn"), Some(&StructuredValue::Opaque(handle)));
    }

    #[test]
    fn sentinel_disabled_by_default() {
        let value = sv(json!({"$$typeof": "react.element", "prop_name": 1}));
        assert!(to_camel(&value).get("propName").is_some());
    }

    #[test]
    fn sentinel_bypasses_whole_mapping() {
        let transformer = KeyTransformer::camel().with_sentinel_key(DEFAULT_SENTINEL_KEY);
        let element = json!({"$$typeof": "react.element", "prop_name": {"inner_key": 1}});
        let value = sv(json!({"outer_key": element.clone()}));
        let (out, stats) = transformer.transform_with_stats(value);
        assert_eq!(out, sv(json!({"outerKey": element})));
        assert_eq!(stats.sentinel_bypasses, 1);
        assert_eq!(stats.keys_rewritten, 1);
    }

    #[test]
    fn collisions_keep_first_position_and_last_value() {
        let mut map = Mapping::new();
        map.insert("user_id", StructuredValue::from(1i64));
        map.insert("name", StructuredValue::from("a"));
        map.insert("userId", StructuredValue::from(2i64));
        let (out, stats) =
            KeyTransformer::camel().transform_with_stats(StructuredValue::Mapping(map));
        let out = out.as_mapping().unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["userId", "name"]);
        assert_eq!(out.get("userId"), Some(&StructuredValue::from(2i64)));
        assert_eq!(stats.collisions, 1);
    }

    #[test]
    fn stats_count_keys() {
        let value = sv(json!({"a_b": {"c_d": 1, "e": 2}, "onClick": 3}));
        let (_, stats) = KeyTransformer::camel().transform_with_stats(value);
        assert_eq!(
            stats,
            TransformStats {
                keys_visited: 4,
                keys_rewritten: 2,
                keys_reserved: 1,
                sentinel_bypasses: 0,
                collisions: 0,
            }
        );
    }

    #[test]
    fn custom_reserved_set_is_injected() {
        let transformer =
            KeyTransformer::new(Casing::Camel, ReservedKeySet::empty().with_key("tenant_id"));
        let value = sv(json!({"tenant_id": 1, "user_id": 2}));
        assert_eq!(
            transformer.transform(&value),
            sv(json!({"tenant_id": 1, "userId": 2}))
        );
    }

    #[test]
    fn transform_key_respects_reserved() {
        let transformer = KeyTransformer::snake();
        assert_eq!(transformer.transform_key("createdAt"), "created_at");
        assert_eq!(transformer.transform_key("onChange"), "onChange");
        assert_eq!(transformer.transform_key("htmlFor"), "htmlFor");
    }

    #[test]
    fn audit_reports_pointers() {
        let value = sv(json!({
            "student_count": 1,
            "rows": [{"created_at": 1, "id": 2}],
            "a/b_c": 3,
            "onClick": 4
        }));
        let rewrites = KeyTransformer::camel().audit(&value);
        let pointers: Vec<_> = rewrites.iter().map(|r| r.pointer.as_str()).collect();
        assert_eq!(pointers.len(), 3);
        assert!(pointers.contains(&"/student_count"));
        assert!(pointers.contains(&"/rows/0/created_at"));
        assert!(pointers.contains(&"/a~1b_c"));
        let created = rewrites.iter().find(|r| r.from == "created_at").unwrap();
        assert_eq!(created.to, "createdAt");
    }

    #[test]
    fn audit_empty_for_conforming_input() {
        let value = sv(json!({"createdAt": 1, "nested": [{"totalStudents": 2}]}));
        assert!(KeyTransformer::camel().audit(&value).is_empty());
    }

    #[test]
    fn inverse_shares_configuration() {
        let transformer = KeyTransformer::new(Casing::Camel, ReservedKeySet::empty())
            .with_sentinel_key("__meta");
        let inverse = transformer.inverse();
        assert_eq!(inverse.casing(), Casing::Snake);
        assert_eq!(inverse.sentinel_key(), Some("__meta"));
        assert!(!inverse.reserved().is_reserved("className"));
    }

    #[test]
    fn default_is_reserved_alias() {
        assert!(is_reserved("onClick"));
        assert!(!is_reserved("onclick"));
    }

    #[test]
    fn transformer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KeyTransformer>();
        assert_send_sync::<StructuredValue>();
    }
}
