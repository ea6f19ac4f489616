//! # Model Settings
//!
//! Knobs that change how a model is bound. Settings are an explicit value
//! handed to the binder or the constructible model; nothing is read from
//! process-wide state.
//!
//! Sources, lowest precedence first:
//! 1. `ModelSettings::default()`
//! 2. a TOML document (`ModelSettings::from_toml_str`)
//! 3. `EDMKIT_*` environment variables (`ModelSettings::with_env_overrides`)
//!
//! ```toml
//! allow_annotation_override = true
//! synthesize_partners = true
//! inherit_keys = true
//! ```

use crate::types::EdmError;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `allow_annotation_override`.
pub const ENV_ALLOW_ANNOTATION_OVERRIDE: &str = "EDMKIT_ALLOW_ANNOTATION_OVERRIDE";

/// Environment variable overriding `synthesize_partners`.
pub const ENV_SYNTHESIZE_PARTNERS: &str = "EDMKIT_SYNTHESIZE_PARTNERS";

/// Environment variable overriding `inherit_keys`.
pub const ENV_INHERIT_KEYS: &str = "EDMKIT_INHERIT_KEYS";

/// Binding behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    /// Let transient annotations shadow (or tombstone) baseline annotations.
    /// When `false`, such writes fail with `EdmError::AnnotationOverride`.
    pub allow_annotation_override: bool,

    /// Give one-sided navigation declarations a silent partner on the
    /// target type. When `false`, such navigations have no partner.
    pub synthesize_partners: bool,

    /// Entity types without a declared key inherit the key of their base type.
    pub inherit_keys: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            allow_annotation_override: true,
            synthesize_partners: true,
            inherit_keys: true,
        }
    }
}

impl ModelSettings {
    /// Parse settings from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, EdmError> {
        toml::from_str(source).map_err(|e| EdmError::InvalidSettings(e.to_string()))
    }

    /// Apply `EDMKIT_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, EdmError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EdmError> {
        if let Some(raw) = lookup(ENV_ALLOW_ANNOTATION_OVERRIDE) {
            self.allow_annotation_override = parse_flag(ENV_ALLOW_ANNOTATION_OVERRIDE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SYNTHESIZE_PARTNERS) {
            self.synthesize_partners = parse_flag(ENV_SYNTHESIZE_PARTNERS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_INHERIT_KEYS) {
            self.inherit_keys = parse_flag(ENV_INHERIT_KEYS, &raw)?;
        }
        Ok(self)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, EdmError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EdmError::InvalidSettings(format!(
            "{key} expects a boolean, got '{other}'"
        ))),
    }
}
