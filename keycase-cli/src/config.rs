//! `keycase.toml` loading and merging with command-line flags

use keycase_io::{
    Casing, KeyTransformer, KeycaseError, Limits, ParallelConfig, ReservedKeySet, Result,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "keycase.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeycaseConfig {
    pub reserved: ReservedSection,
    pub transform: TransformSection,
    pub limits: LimitsSection,
    pub parallel: ParallelSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReservedSection {
    /// Start from the built-in exact keys; prefix rules are separate
    pub include_defaults: bool,
    pub keys: Vec<String>,
    /// `Some("")` turns the event-handler rule off
    pub event_prefix: Option<String>,
    /// Replaces the built-in prefixes when present
    pub attribute_prefixes: Option<Vec<String>>,
}

impl Default for ReservedSection {
    fn default() -> Self {
        Self {
            include_defaults: true,
            keys: Vec::new(),
            event_prefix: None,
            attribute_prefixes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformSection {
    pub sentinel_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsSection {
    pub max_document_bytes: Option<usize>,
    pub max_line_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallelSection {
    pub threads: Option<usize>,
    pub batch_records: Option<usize>,
}

/// Reserved-key and sentinel flags given on the command line
#[derive(Debug, Clone, Default)]
pub struct TransformOverrides {
    pub reserve: Vec<String>,
    pub no_default_reserved: bool,
    pub sentinel_key: Option<String>,
}

impl KeycaseConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            KeycaseError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        Self::parse(&text)
            .map_err(|err| KeycaseError::Config(format!("{}: {}", path.display(), err)))
    }

    fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load `explicit` if given, else `keycase.toml` in `cwd` if it exists,
    /// else the built-in defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Ok((Self::load(&candidate)?, Some(candidate)));
        }
        Ok((Self::default(), None))
    }

    /// Build the reserved set from this config plus command-line flags.
    pub fn reserved_set(&self, overrides: &TransformOverrides) -> Result<ReservedKeySet> {
        let section = &self.reserved;
        let mut set = ReservedKeySet::default();
        if !section.include_defaults || overrides.no_default_reserved {
            set = set.without_exact_keys();
        }

        match section.event_prefix.as_deref() {
            Some("") => set = set.without_event_prefix(),
            Some(prefix) => set = set.with_event_prefix(prefix)?,
            None => {}
        }

        if let Some(prefixes) = &section.attribute_prefixes {
            set = set.without_attribute_prefixes();
            for prefix in prefixes {
                set = set.with_attribute_prefix(prefix.as_str())?;
            }
        }

        Ok(set
            .with_keys(section.keys.iter().cloned())
            .with_keys(overrides.reserve.iter().cloned()))
    }

    /// Build a transformer toward `casing`.
    pub fn transformer(
        &self,
        casing: Casing,
        overrides: &TransformOverrides,
    ) -> Result<KeyTransformer> {
        let transformer = KeyTransformer::new(casing, self.reserved_set(overrides)?);
        let sentinel = overrides
            .sentinel_key
            .as_ref()
            .or(self.transform.sentinel_key.as_ref());
        Ok(match sentinel {
            Some(key) => transformer.with_sentinel_key(key.clone()),
            None => transformer,
        })
    }

    /// Limits with config values applied over the defaults.
    pub fn limits(&self) -> Result<Limits> {
        let defaults = Limits::default();
        let limits = Limits {
            max_document_bytes: self
                .limits
                .max_document_bytes
                .unwrap_or(defaults.max_document_bytes),
            max_line_bytes: self.limits.max_line_bytes.unwrap_or(defaults.max_line_bytes),
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Parallel settings; command-line values win.
    pub fn parallel(
        &self,
        threads: Option<usize>,
        batch_records: Option<usize>,
    ) -> Result<ParallelConfig> {
        let defaults = ParallelConfig::default();
        let config = ParallelConfig {
            threads: threads.or(self.parallel.threads),
            batch_records: batch_records
                .or(self.parallel.batch_records)
                .unwrap_or(defaults.batch_records),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config = KeycaseConfig::parse("").unwrap();
        let set = config.reserved_set(&TransformOverrides::default()).unwrap();
        assert_eq!(set, ReservedKeySet::default());
        assert_eq!(config.limits().unwrap(), Limits::default());
        assert_eq!(
            config.parallel(None, None).unwrap(),
            ParallelConfig::default()
        );
    }

    #[test]
    fn full_file_parses() {
        let config = KeycaseConfig::parse(
            r#"
            [reserved]
            include_defaults = false
            keys = ["customerId"]
            event_prefix = "handle"
            attribute_prefixes = ["x-"]

            [transform]
            sentinel_key = "$$typeof"

            [limits]
            max_line_bytes = 1024

            [parallel]
            threads = 3
            batch_records = 50
            "#,
        )
        .unwrap();

        let set = config.reserved_set(&TransformOverrides::default()).unwrap();
        assert!(set.is_reserved("customerId"));
        assert!(set.is_reserved("handleClick"));
        assert!(set.is_reserved("x-trace_id"));
        assert!(!set.is_reserved("className"));
        assert!(!set.is_reserved("onClick"));
        assert!(!set.is_reserved("data-test_id"));

        let transformer = config
            .transformer(Casing::Camel, &TransformOverrides::default())
            .unwrap();
        assert_eq!(transformer.sentinel_key(), Some("$$typeof"));

        let limits = config.limits().unwrap();
        assert_eq!(limits.max_line_bytes, 1024);
        assert_eq!(limits.max_document_bytes, Limits::default().max_document_bytes);

        let parallel = config.parallel(None, None).unwrap();
        assert_eq!(parallel.threads, Some(3));
        assert_eq!(parallel.batch_records, 50);
    }

    #[test]
    fn empty_event_prefix_disables_rule() {
        let config = KeycaseConfig::parse("[reserved]\nevent_prefix = \"\"\n").unwrap();
        let set = config.reserved_set(&TransformOverrides::default()).unwrap();
        assert!(!set.is_reserved("onClick"));
        assert!(set.is_reserved("className"));
    }

    #[test]
    fn invalid_event_prefix_rejected() {
        let config = KeycaseConfig::parse("[reserved]\nevent_prefix = \"On\"\n").unwrap();
        assert!(matches!(
            config.reserved_set(&TransformOverrides::default()),
            Err(KeycaseError::InvalidReservedRule(_))
        ));
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(KeycaseConfig::parse("[reserved]\nextra = 1\n").is_err());
        assert!(KeycaseConfig::parse("[output]\npretty = true\n").is_err());
    }

    #[test]
    fn command_line_overrides_config() {
        let config = KeycaseConfig::parse(
            "[transform]\nsentinel_key = \"__meta\"\n[parallel]\nthreads = 8\nbatch_records = 10\n",
        )
        .unwrap();
        let overrides = TransformOverrides {
            reserve: vec!["tenant_id".to_string()],
            no_default_reserved: true,
            sentinel_key: Some("$$typeof".to_string()),
        };

        let transformer = config.transformer(Casing::Snake, &overrides).unwrap();
        assert_eq!(transformer.sentinel_key(), Some("$$typeof"));
        assert!(transformer.reserved().is_reserved("tenant_id"));
        assert!(!transformer.reserved().is_reserved("className"));
        // Only the exact defaults are dropped; prefix rules stay.
        assert!(transformer.reserved().is_reserved("onClick"));

        let parallel = config.parallel(Some(1), None).unwrap();
        assert_eq!(parallel.threads, Some(1));
        assert_eq!(parallel.batch_records, 10);
    }

    #[test]
    fn invalid_limits_rejected() {
        let config = KeycaseConfig::parse("[limits]\nmax_document_bytes = 0\n").unwrap();
        assert!(matches!(config.limits(), Err(KeycaseError::Config(_))));
    }

    #[test]
    fn discover_prefers_explicit_then_cwd() {
        let dir = TempDir::new().unwrap();
        let (config, path) = KeycaseConfig::discover(None, dir.path()).unwrap();
        assert!(path.is_none());
        assert!(config.reserved.include_defaults);

        fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[reserved]\nkeys = [\"fromCwd\"]\n",
        )
        .unwrap();
        let (config, path) = KeycaseConfig::discover(None, dir.path()).unwrap();
        assert_eq!(path, Some(dir.path().join(DEFAULT_CONFIG_FILE)));
        assert_eq!(config.reserved.keys, vec!["fromCwd".to_string()]);

        let explicit = dir.path().join("other.toml");
        fs::write(&explicit, "[reserved]\nkeys = [\"explicit\"]\n").unwrap();
        let (config, _) = KeycaseConfig::discover(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.reserved.keys, vec!["explicit".to_string()]);
    }

    #[test]
    fn missing_explicit_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            KeycaseConfig::discover(Some(&missing), dir.path()),
            Err(KeycaseError::Config(_))
        ));
    }
}
