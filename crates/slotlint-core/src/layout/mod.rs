//! Storage layout data model
//!
//! A [`DetailedLayout`] is an ordered list of [`Field`]s whose types live in a
//! per-layout [`TypeArena`]. Layouts are built programmatically through the
//! arena API or imported from the compiler's storage layout JSON.

pub mod field;
pub mod import;
pub mod type_id;
pub mod types;

pub use field::{DetailedLayout, Field, FieldView, WORD_SIZE};
pub use primitive_types::U256;
pub use import::{MembersDescriptor, NumberLike, StorageItem, StorageLayout, TypeDescriptor};
pub use type_id::{parse_type_id, ParsedTypeId};
pub use types::{
    normalize_memory_pointer, ArrayLength, FunctionVisibility, Members, TypeArena, TypeHead,
    TypeId, TypeItem, TypeNode,
};
