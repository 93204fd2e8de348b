//! keycase core - key-casing boundary layer
//!
//! Rewrites mapping keys between the database's `snake_case` column names and
//! the application's `camelCase` field names. This crate has no I/O
//! dependencies. It includes:
//!
//! - The [`StructuredValue`] model (scalars, lists, mappings, opaque handles)
//! - snake_case ↔ camelCase key rules
//! - The reserved-key guard for UI-framework attribute names
//! - The recursive [`KeyTransformer`] and key audit
//! - Input limits and error types
//!
//! ```
//! use keycase_core::{to_camel, StructuredValue};
//! use serde_json::json;
//!
//! let row = StructuredValue::from(json!({"created_at": "2024-01-01", "onClick": "noop"}));
//! let out = to_camel(&row);
//! assert!(out.get("createdAt").is_some());
//! assert!(out.get("onClick").is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod casing;
pub mod error;
pub mod limits;
pub mod pointer;
pub mod reserved;
pub mod transform;
pub mod value;

// Re-export commonly used types
pub use casing::{camel_to_snake, snake_to_camel, Casing};
pub use error::{KeycaseError, Result};
pub use limits::Limits;
pub use reserved::{ReservedKeySet, ReservedRule, DEFAULT_RESERVED_KEYS};
pub use transform::{
    is_reserved, to_camel, to_snake, KeyRewrite, KeyTransformer, TransformStats,
    DEFAULT_SENTINEL_KEY,
};
pub use value::{Mapping, OpaqueHandle, StructuredValue};
