//! Key casing rules
//!
//! Both directions only look at ASCII letters. Keys made of digits, symbols or
//! non-ASCII text have nothing to rewrite and come back borrowed.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Target naming convention for mapping keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Casing {
    /// `createdAt`
    Camel,
    /// `created_at`
    Snake,
}

impl Casing {
    /// Rewrite `key` into this casing.
    pub fn convert<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self {
            Casing::Camel => snake_to_camel(key),
            Casing::Snake => camel_to_snake(key),
        }
    }

    /// Whether `key` is already in this casing (converting it is a no-op).
    pub fn conforms(&self, key: &str) -> bool {
        matches!(self.convert(key), Cow::Borrowed(_))
    }

    /// The opposite direction
    pub fn inverse(&self) -> Casing {
        match self {
            Casing::Camel => Casing::Snake,
            Casing::Snake => Casing::Camel,
        }
    }

    /// Lowercase display name
    pub fn name(&self) -> &'static str {
        match self {
            Casing::Camel => "camel",
            Casing::Snake => "snake",
        }
    }
}

impl fmt::Display for Casing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Convert a snake_case key to camelCase.
///
/// Every `_` immediately followed by an ASCII lowercase letter is dropped and the
/// letter uppercased. Matches do not overlap, so `a__b` becomes `a_B`.
pub fn snake_to_camel(key: &str) -> Cow<'_, str> {
    let bytes = key.as_bytes();
    let needs_rewrite = bytes
        .windows(2)
        .any(|pair| pair[0] == b'_' && pair[1].is_ascii_lowercase());
    if !needs_rewrite {
        return Cow::Borrowed(key);
    }

    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '_' {
            if let Some(next) = chars.peek().copied().filter(char::is_ascii_lowercase) {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(ch);
    }
    Cow::Owned(out)
}

/// Convert a camelCase key to snake_case.
///
/// Every ASCII uppercase letter after the first character is lowercased and
/// prefixed with `_`. A leading uppercase letter is left alone.
pub fn camel_to_snake(key: &str) -> Cow<'_, str> {
    let needs_rewrite = key
        .char_indices()
        .any(|(idx, ch)| idx > 0 && ch.is_ascii_uppercase());
    if !needs_rewrite {
        return Cow::Borrowed(key);
    }

    let mut out = String::with_capacity(key.len() + 4);
    for (idx, ch) in key.char_indices() {
        if idx > 0 && ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}
