//! Comparator options
//!
//! Options are plain data so that embedding tools can read them from their own
//! configuration files. Keys use camelCase to match the names used in
//! deployment tooling (`unsafeAllowCustomTypes`, ...).
//!
//! ```
//! use slotlint_core::config::ComparatorOptions;
//!
//! let options = ComparatorOptions::from_toml_str("unsafeAllowRenames = true").unwrap();
//! assert!(options.unsafe_allow_renames);
//! assert!(!options.unsafe_allow_custom_types);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, Result};

/// Scalar type labels that may be swapped for one another when neither side
/// carries layout metadata.
pub fn default_known_compatible() -> Vec<Vec<String>> {
    vec![vec!["uint8".to_string(), "bool".to_string()]]
}

/// Options controlling one comparator session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ComparatorOptions {
    /// Treat structs and enums without member information as compatible
    pub unsafe_allow_custom_types: bool,
    /// Never report renamed fields
    pub unsafe_allow_renames: bool,
    /// Groups of type labels that are interchangeable when layout metadata is absent
    pub known_compatible: Vec<Vec<String>>,
}

impl Default for ComparatorOptions {
    fn default() -> Self {
        Self {
            unsafe_allow_custom_types: false,
            unsafe_allow_renames: false,
            known_compatible: default_known_compatible(),
        }
    }
}

impl ComparatorOptions {
    pub fn with_unsafe_allow_custom_types(mut self, allow: bool) -> Self {
        self.unsafe_allow_custom_types = allow;
        self
    }

    pub fn with_unsafe_allow_renames(mut self, allow: bool) -> Self {
        self.unsafe_allow_renames = allow;
        self
    }

    /// Add a group of interchangeable type labels
    pub fn with_known_compatible<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_compatible
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    /// Parse options from a TOML document and validate them
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` — the document is not valid TOML, has unknown keys,
    ///   or fails [`ComparatorOptions::validate`]
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let options: ComparatorOptions = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Check that every known-compatible group names at least two labels
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` — a group has fewer than two entries or an empty label
    pub fn validate(&self) -> Result<()> {
        for (index, group) in self.known_compatible.iter().enumerate() {
            if group.len() < 2 {
                return Err(LayoutError::InvalidConfig {
                    reason: format!(
                        "knownCompatible group {} must list at least two type labels",
                        index
                    ),
                });
            }
            if group.iter().any(|label| label.trim().is_empty()) {
                return Err(LayoutError::InvalidConfig {
                    reason: format!("knownCompatible group {} contains an empty label", index),
                });
            }
        }
        Ok(())
    }

    /// True if both labels appear together in one allow-list group
    pub fn is_known_compatible(&self, original: &str, updated: &str) -> bool {
        self.known_compatible.iter().any(|group| {
            group.iter().any(|l| l == original) && group.iter().any(|l| l == updated)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ComparatorOptions::default();
        assert!(!options.unsafe_allow_custom_types);
        assert!(!options.unsafe_allow_renames);
        assert!(options.is_known_compatible("uint8", "bool"));
        assert!(options.is_known_compatible("bool", "uint8"));
        assert!(!options.is_known_compatible("uint8", "uint16"));
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let options = ComparatorOptions::from_toml_str("").unwrap();
        assert_eq!(options, ComparatorOptions::default());
    }

    #[test]
    fn test_toml_overrides() {
        let options = ComparatorOptions::from_toml_str(
            r#"
            unsafeAllowCustomTypes = true
            knownCompatible = [["uint8", "bool"], ["bytes1", "uint8"]]
            "#,
        )
        .unwrap();
        assert!(options.unsafe_allow_custom_types);
        assert!(options.is_known_compatible("bytes1", "uint8"));
        assert!(!options.is_known_compatible("bytes1", "bool"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ComparatorOptions::from_toml_str("allowEverything = true").unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfig { .. }));
    }

    #[test]
    fn test_single_label_group_rejected() {
        let err = ComparatorOptions::from_toml_str(r#"knownCompatible = [["uint8"]]"#).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfig { .. }));
    }

    #[test]
    fn test_builder_adds_group() {
        let options = ComparatorOptions::default().with_known_compatible(["int8", "bytes1"]);
        assert!(options.is_known_compatible("int8", "bytes1"));
    }
}
