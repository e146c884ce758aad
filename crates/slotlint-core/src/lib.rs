//! slotlint core - storage layout compatibility engine
//!
//! Given the storage layout of a deployed contract and the layout of its
//! proposed upgrade, decide whether every existing persisted value stays
//! correctly addressed and typed. This crate provides:
//! - Layout data model with a per-layout type arena ([`layout`])
//! - Import of the compiler's storage layout JSON ([`layout::import`])
//! - Cost-driven field alignment and type equivalence checks ([`compare`])
//! - Storage gap handling ([`compare::gap`])
//! - Human-readable compatibility reports ([`report`])
//!
//! ```
//! use serde_json::json;
//! use slotlint_core::{compare_layouts, ComparatorOptions, DetailedLayout};
//!
//! let v1 = DetailedLayout::from_json_value(json!({
//!     "storage": [
//!         { "label": "owner", "contract": "Vault", "type": "t_address", "slot": "0", "offset": 0 }
//!     ],
//!     "types": { "t_address": { "label": "address", "numberOfBytes": "20" } }
//! })).unwrap();
//! let v2 = DetailedLayout::from_json_value(json!({
//!     "storage": [
//!         { "label": "owner", "contract": "Vault", "type": "t_address", "slot": "0", "offset": 0 },
//!         { "label": "paused", "contract": "Vault", "type": "t_bool", "slot": "0", "offset": 20 }
//!     ],
//!     "types": {
//!         "t_address": { "label": "address", "numberOfBytes": "20" },
//!         "t_bool": { "label": "bool", "numberOfBytes": "1" }
//!     }
//! })).unwrap();
//!
//! let report = compare_layouts(&v1, &v2, ComparatorOptions::default()).unwrap();
//! assert!(report.ok());
//! ```

pub mod compare;
pub mod config;
pub mod errors;
pub mod layout;
pub mod logging_facility;
pub mod report;

// Re-exported for the logging macros
pub use slotlint_core_types;

// Re-export commonly used types
pub use compare::{StorageLayoutComparator, TypeChangeKind};
pub use config::ComparatorOptions;
pub use errors::{ExError, ExErrorKind, LayoutError, Result};
pub use layout::{DetailedLayout, Field, TypeArena, TypeId, TypeItem};
pub use report::CompatibilityReport;

/// Compare two layouts with a fresh comparator session
///
/// # Errors
///
/// - `InvalidConfig` — `options` fail validation
/// - any error of [`StorageLayoutComparator::compare_layouts`]
pub fn compare_layouts(
    original: &DetailedLayout,
    updated: &DetailedLayout,
    options: ComparatorOptions,
) -> Result<CompatibilityReport> {
    options.validate()?;
    StorageLayoutComparator::new(options).compare_layouts(original, updated)
}
