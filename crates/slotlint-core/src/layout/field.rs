use std::sync::Arc;

use primitive_types::U256;
use serde::Serialize;

use crate::layout::types::{TypeArena, TypeId, TypeNode};

/// Size of one storage word in bytes
pub const WORD_SIZE: u64 = 32;

/// One storage slot occupant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub label: String,
    #[serde(rename = "type")]
    pub ty: TypeId,
    /// Storage slots span the full 256-bit key space
    pub slot: Option<U256>,
    pub offset: Option<u64>,
    /// Name of the declaring contract
    pub contract: String,
    pub src: Option<String>,
    pub renamed_from: Option<String>,
    pub retyped_from: Option<String>,
}

impl Field {
    pub fn new(label: impl Into<String>, ty: TypeId, contract: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ty,
            slot: None,
            offset: None,
            contract: contract.into(),
            src: None,
            renamed_from: None,
            retyped_from: None,
        }
    }

    pub fn with_position(self, slot: u64, offset: u64) -> Self {
        self.with_slot(U256::from(slot), offset)
    }

    /// Like [`Field::with_position`] for slots beyond `u64`
    pub fn with_slot(mut self, slot: U256, offset: u64) -> Self {
        self.slot = Some(slot);
        self.offset = Some(offset);
        self
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_renamed_from(mut self, label: impl Into<String>) -> Self {
        self.renamed_from = Some(label.into());
        self
    }

    pub fn with_retyped_from(mut self, type_label: impl Into<String>) -> Self {
        self.retyped_from = Some(type_label.into());
        self
    }

    /// Heading used in reports: source location, else declaring contract
    pub fn heading(&self) -> &str {
        self.src.as_deref().unwrap_or(&self.contract)
    }
}

/// A field paired with the arena its type lives in
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub field: &'a Field,
    pub types: &'a TypeArena,
}

impl<'a> FieldView<'a> {
    pub fn new(field: &'a Field, types: &'a TypeArena) -> Self {
        Self { field, types }
    }

    pub fn type_node(&self) -> Option<&'a TypeNode> {
        self.types.get(self.field.ty)
    }

    pub fn type_label(&self) -> &'a str {
        self.type_node().map_or("<unresolved>", TypeNode::label)
    }

    pub fn number_of_bytes(&self) -> Option<u64> {
        self.type_node().and_then(|node| node.item.number_of_bytes)
    }

    /// Absolute byte position of the first byte
    pub fn begin(&self) -> Option<U256> {
        let slot = self.field.slot?;
        let offset = U256::from(self.field.offset?);
        slot.checked_mul(U256::from(WORD_SIZE))?.checked_add(offset)
    }

    /// Absolute byte position one past the last byte
    pub fn end(&self) -> Option<U256> {
        self.begin()?
            .checked_add(U256::from(self.number_of_bytes()?))
    }

    /// True when slot, offset and size are all known
    pub fn has_layout(&self) -> bool {
        self.field.slot.is_some() && self.field.offset.is_some() && self.number_of_bytes().is_some()
    }
}

/// Ordered fields of one storage layout plus their type graph
#[derive(Debug, Clone)]
pub struct DetailedLayout {
    fields: Vec<Field>,
    types: Arc<TypeArena>,
}

impl DetailedLayout {
    pub fn new(fields: Vec<Field>, types: TypeArena) -> Self {
        Self {
            fields,
            types: Arc::new(types),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn types(&self) -> &TypeArena {
        &self.types
    }

    /// Shared handle on the arena, kept alive by reports
    pub fn shared_types(&self) -> Arc<TypeArena> {
        Arc::clone(&self.types)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn view<'a>(&'a self, field: &'a Field) -> FieldView<'a> {
        FieldView::new(field, &self.types)
    }

    pub fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::TypeItem;

    fn arena_with_uint(bytes: u64) -> (TypeArena, TypeId) {
        let mut arena = TypeArena::new();
        let id = arena
            .define("t_uint128", TypeItem::new("uint128").with_bytes(bytes))
            .unwrap();
        (arena, id)
    }

    #[test]
    fn test_begin_and_end() {
        let (arena, ty) = arena_with_uint(16);
        let field = Field::new("a", ty, "C").with_position(2, 16);
        let view = FieldView::new(&field, &arena);
        assert_eq!(view.begin(), Some(U256::from(80u64)));
        assert_eq!(view.end(), Some(U256::from(96u64)));
        assert!(view.has_layout());
    }

    #[test]
    fn test_missing_offset_gives_no_position() {
        let (arena, ty) = arena_with_uint(16);
        let mut field = Field::new("a", ty, "C");
        field.slot = Some(U256::one());
        let view = FieldView::new(&field, &arena);
        assert_eq!(view.begin(), None);
        assert_eq!(view.end(), None);
        assert!(!view.has_layout());
    }

    #[test]
    fn test_overflowing_slot_gives_no_position() {
        let (arena, ty) = arena_with_uint(16);
        let field = Field::new("a", ty, "C").with_slot(U256::MAX, 0);
        assert_eq!(FieldView::new(&field, &arena).begin(), None);
    }

    #[test]
    fn test_slot_at_top_of_key_space() {
        let (arena, ty) = arena_with_uint(16);
        let base = U256::one() << 255;
        let field = Field::new("a", ty, "C").with_slot(base, 0);
        let view = FieldView::new(&field, &arena);
        // 2**255 * 32 does not fit in 256 bits
        assert_eq!(view.begin(), None);
        assert!(view.has_layout());
    }

    #[test]
    fn test_heading_falls_back_to_contract() {
        let (_, ty) = arena_with_uint(16);
        let field = Field::new("a", ty, "Vault");
        assert_eq!(field.heading(), "Vault");
        assert_eq!(field.clone().with_src("Vault.sol:12").heading(), "Vault.sol:12");
    }
}
