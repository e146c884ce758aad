//! Layout comparison
//!
//! - [`mod@levenshtein`]: generic minimum-cost alignment
//! - [`comparator`]: field and type classification plus the unsafe-operation filter
//! - [`gap`]: storage gap recognition
//! - [`model`]: operations and change descriptions

pub mod comparator;
pub mod gap;
pub mod levenshtein;
pub mod model;

pub use comparator::{enum_size, strip_contract_substrings, ArenaPair, StorageLayoutComparator};
pub use gap::{end_matches_gap, is_gap};
pub use levenshtein::{levenshtein, Cost, Operation};
pub use model::{
    ChangeKind, EnumOperation, EnumReplace, LayoutChange, OperationKind, StorageChange,
    StorageOperation, Transition, TypeChange, TypeChangeDetail, TypeChangeKind,
};
