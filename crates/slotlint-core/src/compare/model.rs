//! Edit operations produced by layout comparison.

use crate::compare::levenshtein::{Cost, Operation};
use crate::layout::{Field, TypeId, U256};

pub const DEFAULT_SUBSTITUTION_COST: u32 = 2;
pub const TYPECHANGE_COST: u32 = 1;
pub const LAYOUTCHANGE_COST: u32 = 1;
pub const FINISHGAP_COST: u32 = 1;
pub const SHRINKGAP_COST: u32 = 0;
pub const RENAME_COST: u32 = 0;

/// A value before and after the upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<T> {
    pub from: T,
    pub to: T,
}

impl<T: PartialEq> Transition<T> {
    /// `Some` only if the value actually changed
    pub fn between(from: T, to: T) -> Option<Self> {
        (from != to).then_some(Transition { from, to })
    }
}

/// Change in physical position or width of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutChange {
    /// Both sides carry full layout metadata; at least one transition is set
    Certain {
        slot: Option<Transition<U256>>,
        offset: Option<Transition<u64>>,
        bytes: Option<Transition<u64>>,
    },
    /// One side lacks layout metadata
    Uncertain { known_compatible: bool },
}

impl LayoutChange {
    pub fn is_uncertain(&self) -> bool {
        matches!(self, LayoutChange::Uncertain { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeChangeKind {
    VisibilityChange,
    ObviousMismatch,
    MissingMembers,
    TypeResize,
    MappingKey,
    MappingValue,
    ArrayValue,
    ArrayShrink,
    ArrayGrow,
    ArrayDynamic,
    StructMembers,
    EnumMembers,
    Unknown,
}

impl TypeChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeChangeKind::VisibilityChange => "visibility change",
            TypeChangeKind::ObviousMismatch => "obvious mismatch",
            TypeChangeKind::MissingMembers => "missing members",
            TypeChangeKind::TypeResize => "type resize",
            TypeChangeKind::MappingKey => "mapping key",
            TypeChangeKind::MappingValue => "mapping value",
            TypeChangeKind::ArrayValue => "array value",
            TypeChangeKind::ArrayShrink => "array shrink",
            TypeChangeKind::ArrayGrow => "array grow",
            TypeChangeKind::ArrayDynamic => "array dynamic",
            TypeChangeKind::StructMembers => "struct members",
            TypeChangeKind::EnumMembers => "enum members",
            TypeChangeKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TypeChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a type differs between the two layouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeChangeDetail {
    VisibilityChange,
    ObviousMismatch,
    MissingMembers,
    TypeResize,
    MappingKey(Box<TypeChange>),
    MappingValue(Box<TypeChange>),
    ArrayValue(Box<TypeChange>),
    ArrayShrink,
    ArrayGrow,
    ArrayDynamic,
    StructMembers {
        ops: Vec<StorageOperation>,
        allow_append: bool,
    },
    EnumMembers {
        ops: Vec<EnumOperation>,
    },
    Unknown,
}

/// A type difference; `original` and `updated` index the respective arenas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeChange {
    pub original: TypeId,
    pub updated: TypeId,
    pub detail: TypeChangeDetail,
}

impl TypeChange {
    pub fn new(original: TypeId, updated: TypeId, detail: TypeChangeDetail) -> Self {
        Self {
            original,
            updated,
            detail,
        }
    }

    pub fn kind(&self) -> TypeChangeKind {
        match &self.detail {
            TypeChangeDetail::VisibilityChange => TypeChangeKind::VisibilityChange,
            TypeChangeDetail::ObviousMismatch => TypeChangeKind::ObviousMismatch,
            TypeChangeDetail::MissingMembers => TypeChangeKind::MissingMembers,
            TypeChangeDetail::TypeResize => TypeChangeKind::TypeResize,
            TypeChangeDetail::MappingKey(_) => TypeChangeKind::MappingKey,
            TypeChangeDetail::MappingValue(_) => TypeChangeKind::MappingValue,
            TypeChangeDetail::ArrayValue(_) => TypeChangeKind::ArrayValue,
            TypeChangeDetail::ArrayShrink => TypeChangeKind::ArrayShrink,
            TypeChangeDetail::ArrayGrow => TypeChangeKind::ArrayGrow,
            TypeChangeDetail::ArrayDynamic => TypeChangeKind::ArrayDynamic,
            TypeChangeDetail::StructMembers { .. } => TypeChangeKind::StructMembers,
            TypeChangeDetail::EnumMembers { .. } => TypeChangeKind::EnumMembers,
            TypeChangeDetail::Unknown => TypeChangeKind::Unknown,
        }
    }

    /// Innermost change reached through mapping and array wrappers
    pub fn innermost(&self) -> &TypeChange {
        match &self.detail {
            TypeChangeDetail::MappingKey(inner)
            | TypeChangeDetail::MappingValue(inner)
            | TypeChangeDetail::ArrayValue(inner) => inner.innermost(),
            _ => self,
        }
    }
}

/// Classification of a field-level substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageChange {
    Replace {
        original: Field,
        updated: Field,
    },
    /// Same type under a new name; `layout` is set when the position moved
    /// or is not known on both sides
    Rename {
        original: Field,
        updated: Field,
        layout: Option<LayoutChange>,
    },
    TypeChange {
        original: Field,
        updated: Field,
        change: TypeChange,
    },
    LayoutChange {
        original: Field,
        updated: Field,
        change: LayoutChange,
    },
    /// A gap replaced by a field ending where the gap ended
    FinishGap {
        original: Field,
        updated: Field,
    },
    /// A gap shrunk so that it still ends where it ended
    ShrinkGap {
        original: Field,
        updated: Field,
        change: TypeChange,
    },
}

impl StorageChange {
    pub fn original(&self) -> &Field {
        match self {
            StorageChange::Replace { original, .. }
            | StorageChange::Rename { original, .. }
            | StorageChange::TypeChange { original, .. }
            | StorageChange::LayoutChange { original, .. }
            | StorageChange::FinishGap { original, .. }
            | StorageChange::ShrinkGap { original, .. } => original,
        }
    }

    pub fn updated(&self) -> &Field {
        match self {
            StorageChange::Replace { updated, .. }
            | StorageChange::Rename { updated, .. }
            | StorageChange::TypeChange { updated, .. }
            | StorageChange::LayoutChange { updated, .. }
            | StorageChange::FinishGap { updated, .. }
            | StorageChange::ShrinkGap { updated, .. } => updated,
        }
    }
}

impl Cost for StorageChange {
    fn cost(&self) -> u32 {
        match self {
            StorageChange::Replace { .. } => DEFAULT_SUBSTITUTION_COST,
            StorageChange::Rename { layout: None, .. } => RENAME_COST,
            StorageChange::Rename { layout: Some(_), .. } => LAYOUTCHANGE_COST,
            StorageChange::TypeChange { .. } => TYPECHANGE_COST,
            StorageChange::LayoutChange { .. } => LAYOUTCHANGE_COST,
            StorageChange::FinishGap { .. } => FINISHGAP_COST,
            StorageChange::ShrinkGap { .. } => SHRINKGAP_COST,
        }
    }
}

/// A renamed enum member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumReplace {
    pub original: String,
    pub updated: String,
}

impl Cost for EnumReplace {
    fn cost(&self) -> u32 {
        DEFAULT_SUBSTITUTION_COST
    }
}

pub type StorageOperation = Operation<Field, StorageChange>;
pub type EnumOperation = Operation<String, EnumReplace>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Equal,
    Insert,
    Append,
    Delete,
    Replace,
    Rename,
    TypeChange,
    LayoutChange,
    FinishGap,
    ShrinkGap,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Equal => "equal",
            OperationKind::Insert => "insert",
            OperationKind::Append => "append",
            OperationKind::Delete => "delete",
            OperationKind::Replace => "replace",
            OperationKind::Rename => "rename",
            OperationKind::TypeChange => "typechange",
            OperationKind::LayoutChange => "layoutchange",
            OperationKind::FinishGap => "finishgap",
            OperationKind::ShrinkGap => "shrinkgap",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substitutions that know which operation kind they represent
pub trait ChangeKind {
    fn kind(&self) -> OperationKind;
}

impl ChangeKind for StorageChange {
    fn kind(&self) -> OperationKind {
        match self {
            StorageChange::Replace { .. } => OperationKind::Replace,
            StorageChange::Rename { .. } => OperationKind::Rename,
            StorageChange::TypeChange { .. } => OperationKind::TypeChange,
            StorageChange::LayoutChange { .. } => OperationKind::LayoutChange,
            StorageChange::FinishGap { .. } => OperationKind::FinishGap,
            StorageChange::ShrinkGap { .. } => OperationKind::ShrinkGap,
        }
    }
}

impl ChangeKind for EnumReplace {
    fn kind(&self) -> OperationKind {
        OperationKind::Replace
    }
}

impl<T, C: ChangeKind + Cost> Operation<T, C> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Equal { .. } => OperationKind::Equal,
            Operation::Insert { .. } => OperationKind::Insert,
            Operation::Append { .. } => OperationKind::Append,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Change(change) => change.kind(),
        }
    }

    pub fn cost(&self) -> u32 {
        match self {
            Operation::Equal { .. } => 0,
            Operation::Insert { .. } | Operation::Append { .. } => {
                crate::compare::levenshtein::INSERTION_COST
            }
            Operation::Delete { .. } => crate::compare::levenshtein::DELETION_COST,
            Operation::Change(change) => change.cost(),
        }
    }
}

impl StorageOperation {
    /// The original-side field, if the operation has one
    pub fn original_field(&self) -> Option<&Field> {
        match self {
            Operation::Equal { original, .. } | Operation::Delete { original } => Some(original),
            Operation::Insert { .. } | Operation::Append { .. } => None,
            Operation::Change(change) => Some(change.original()),
        }
    }

    /// The updated-side field, if the operation has one
    pub fn updated_field(&self) -> Option<&Field> {
        match self {
            Operation::Equal { updated, .. }
            | Operation::Insert { updated }
            | Operation::Append { updated } => Some(updated),
            Operation::Delete { .. } => None,
            Operation::Change(change) => Some(change.updated()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TypeArena;

    fn field(label: &str) -> Field {
        let mut arena = TypeArena::new();
        let ty = arena.intern("t_uint256").unwrap();
        Field::new(label, ty, "C")
    }

    #[test]
    fn test_costs() {
        let rename = StorageChange::Rename {
            original: field("a"),
            updated: field("b"),
            layout: None,
        };
        let moved_rename = StorageChange::Rename {
            original: field("a"),
            updated: field("b"),
            layout: Some(LayoutChange::Certain {
                slot: Transition::between(U256::zero(), U256::one()),
                offset: None,
                bytes: None,
            }),
        };
        let replace = StorageChange::Replace {
            original: field("a"),
            updated: field("b"),
        };
        assert_eq!(rename.cost(), 0);
        assert_eq!(moved_rename.cost(), 1);
        assert_eq!(replace.cost(), 2);
        assert_eq!(
            EnumReplace {
                original: "A".into(),
                updated: "B".into()
            }
            .cost(),
            2
        );
    }

    #[test]
    fn test_operation_kind_strings() {
        let op: StorageOperation = Operation::Append { updated: field("x") };
        assert_eq!(op.kind().as_str(), "append");
        assert_eq!(op.updated_field().map(|f| f.label.as_str()), Some("x"));
        assert!(op.original_field().is_none());

        let op: StorageOperation = Operation::Change(StorageChange::FinishGap {
            original: field("__gap"),
            updated: field("x"),
        });
        assert_eq!(op.kind().to_string(), "finishgap");
    }

    #[test]
    fn test_transition_between() {
        assert_eq!(Transition::between(1u64, 1u64), None);
        assert_eq!(Transition::between(1u64, 2u64), Some(Transition { from: 1, to: 2 }));
    }
}
