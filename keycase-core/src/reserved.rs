//! Reserved-key guard
//!
//! Keys that belong to the UI framework's own naming conventions must never be
//! rewritten, in either direction. A [`ReservedKeySet`] is an immutable value:
//! build one, hand it to a [`KeyTransformer`](crate::KeyTransformer), and share it.

use crate::error::{KeycaseError, Result};
use ahash::AHashSet;
use std::fmt;

/// Exact keys protected by the default set
pub const DEFAULT_RESERVED_KEYS: &[&str] = &[
    "className",
    "displayName",
    "htmlFor",
    "tabIndex",
    "role",
    "key",
    "ref",
    "children",
    "style",
    "dangerouslySetInnerHTML",
    "defaultValue",
    "defaultChecked",
    "autoComplete",
    "autoFocus",
    "readOnly",
    "form",
    "formAction",
    "formMethod",
    "formTarget",
    "formNoValidate",
];

/// Default event-handler prefix (`onClick`, `onSubmit`, ...)
pub const DEFAULT_EVENT_PREFIX: &str = "on";

/// Default accessibility / custom-data attribute prefixes
pub const DEFAULT_ATTRIBUTE_PREFIXES: &[&str] = &["aria-", "data-"];

/// Which rule protected a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedRule {
    /// Exact member of the fixed key list
    Exact,
    /// Event-handler shape: prefix followed by an uppercase letter
    EventHandler,
    /// Accessibility or custom-data attribute prefix
    AttributePrefix,
}

impl ReservedRule {
    /// Short label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ReservedRule::Exact => "exact",
            ReservedRule::EventHandler => "event-handler",
            ReservedRule::AttributePrefix => "attribute-prefix",
        }
    }
}

impl fmt::Display for ReservedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keys and key shapes that bypass casing transformation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedKeySet {
    exact: AHashSet<String>,
    event_prefix: Option<String>,
    attribute_prefixes: Vec<String>,
}

impl Default for ReservedKeySet {
    fn default() -> Self {
        Self {
            exact: DEFAULT_RESERVED_KEYS.iter().map(|k| k.to_string()).collect(),
            event_prefix: Some(DEFAULT_EVENT_PREFIX.to_string()),
            attribute_prefixes: DEFAULT_ATTRIBUTE_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl ReservedKeySet {
    /// A set that protects nothing
    pub fn empty() -> Self {
        Self {
            exact: AHashSet::new(),
            event_prefix: None,
            attribute_prefixes: Vec::new(),
        }
    }

    /// Add one exact key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.exact.insert(key.into());
        self
    }

    /// Add several exact keys.
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exact.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Drop every exact key, keeping the prefix rules.
    pub fn without_exact_keys(mut self) -> Self {
        self.exact.clear();
        self
    }

    /// Replace the event-handler prefix.
    ///
    /// The prefix must be non-empty ASCII lowercase, otherwise the
    /// "followed by an uppercase letter" test is meaningless.
    pub fn with_event_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(KeycaseError::InvalidReservedRule(format!(
                "event prefix '{}' must be non-empty ASCII lowercase",
                prefix
            )));
        }
        self.event_prefix = Some(prefix);
        Ok(self)
    }

    /// Disable the event-handler rule.
    pub fn without_event_prefix(mut self) -> Self {
        self.event_prefix = None;
        self
    }

    /// Add an attribute prefix such as `aria-`.
    pub fn with_attribute_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(KeycaseError::InvalidReservedRule(
                "attribute prefix must not be empty".to_string(),
            ));
        }
        if !self.attribute_prefixes.contains(&prefix) {
            self.attribute_prefixes.push(prefix);
        }
        Ok(self)
    }

    /// Drop every attribute prefix.
    pub fn without_attribute_prefixes(mut self) -> Self {
        self.attribute_prefixes.clear();
        self
    }

    /// Whether `key` must be left untouched.
    pub fn is_reserved(&self, key: &str) -> bool {
        self.classify(key).is_some()
    }

    /// Report which rule protects `key`, checking exact membership first.
    pub fn classify(&self, key: &str) -> Option<ReservedRule> {
        if self.exact.contains(key) {
            return Some(ReservedRule::Exact);
        }

        if let Some(prefix) = &self.event_prefix {
            let is_handler = key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.chars().next())
                .is_some_and(|ch| ch.is_ascii_uppercase());
            if is_handler {
                return Some(ReservedRule::EventHandler);
            }
        }

        if self
            .attribute_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
        {
            return Some(ReservedRule::AttributePrefix);
        }

        None
    }

    /// Exact keys in sorted order
    pub fn exact_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.exact.iter().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Current event-handler prefix, if the rule is enabled
    pub fn event_prefix(&self) -> Option<&str> {
        self.event_prefix.as_deref()
    }

    /// Current attribute prefixes
    pub fn attribute_prefixes(&self) -> &[String] {
        &self.attribute_prefixes
    }
}
