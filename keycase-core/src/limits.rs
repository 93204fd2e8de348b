//! Input limits and configuration

use crate::error::{KeycaseError, Result};

/// Hard ceiling for a buffered JSON document (1 GiB)
pub const HARD_MAX_DOCUMENT_BYTES: usize = 1024 * 1024 * 1024;
/// Hard ceiling for a single NDJSON line (256 MiB)
pub const HARD_MAX_LINE_BYTES: usize = 256 * 1024 * 1024;

/// Limits on how much input is buffered at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a whole JSON document (default: 64 MiB, hard: 1 GiB)
    pub max_document_bytes: usize,
    /// Maximum size of one NDJSON record line (default: 16 MiB, hard: 256 MiB)
    pub max_line_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_document_bytes: 64 * 1024 * 1024,
            max_line_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// Reject zero limits and limits above the hard ceilings.
    pub fn validate(&self) -> Result<()> {
        check("max_document_bytes", self.max_document_bytes, HARD_MAX_DOCUMENT_BYTES)?;
        check("max_line_bytes", self.max_line_bytes, HARD_MAX_LINE_BYTES)
    }
}

fn check(name: &str, value: usize, hard_max: usize) -> Result<()> {
    if value == 0 {
        return Err(KeycaseError::Config(format!("{} must be greater than zero", name)));
    }
    if value > hard_max {
        return Err(KeycaseError::Config(format!(
            "{} = {} exceeds hard limit {}",
            name, value, hard_max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_valid() {
        assert!(Limits::default().validate().is_ok());
    }

    #[test]
    fn zero_limit_rejected() {
        let limits = Limits {
            max_line_bytes: 0,
            ..Limits::default()
        };
        assert!(matches!(limits.validate(), Err(KeycaseError::Config(_))));
    }

    #[test]
    fn limit_above_hard_ceiling_rejected() {
        let limits = Limits {
            max_document_bytes: HARD_MAX_DOCUMENT_BYTES + 1,
            ..Limits::default()
        };
        let err = limits.validate().unwrap_err();
        assert!(err.to_string().contains("max_document_bytes"));
    }
}
