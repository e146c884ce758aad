//! Human-readable explanations of unsafe operations

use crate::compare::gap::is_gap;
use crate::compare::levenshtein::Operation;
use crate::compare::model::{
    EnumOperation, LayoutChange, StorageChange, StorageOperation, TypeChange, TypeChangeDetail,
};
use crate::compare::ArenaPair;
use crate::layout::{ArrayLength, Field, FieldView, TypeArena, TypeId, TypeNode, U256};
use crate::report::text::{itemize, itemize_with};

/// Where an operation appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainContext {
    /// Top-level variables of a contract
    Layout,
    /// Members of a struct; `allow_append` if trailing members may be added
    Struct { allow_append: bool },
}

pub(crate) struct Explainer<'a> {
    arenas: ArenaPair<'a>,
}

impl<'a> Explainer<'a> {
    pub(crate) fn new(arenas: ArenaPair<'a>) -> Self {
        Self { arenas }
    }

    pub(crate) fn storage_operation(&self, op: &StorageOperation, ctx: ExplainContext) -> String {
        match op {
            Operation::Change(StorageChange::TypeChange {
                original,
                updated,
                change,
            })
            | Operation::Change(StorageChange::ShrinkGap {
                original,
                updated,
                change,
            }) => self.incompatible_type(original, updated, change, ctx),

            Operation::Change(StorageChange::FinishGap { original, updated }) => format!(
                "Converted end of storage gap {} to {}",
                label(original),
                label(updated)
            ),

            Operation::Change(StorageChange::Rename { original, updated, .. }) => {
                format!("Renamed {} to {}", label(original), label(updated))
            }

            Operation::Change(StorageChange::Replace { original, updated }) => format!(
                "Replaced {} with {} of incompatible type",
                label(original),
                label(updated)
            ),

            Operation::Change(StorageChange::LayoutChange {
                original,
                updated,
                change,
            }) => {
                let verb = if change.is_uncertain() {
                    "could have changed"
                } else {
                    "changed"
                };
                let title = format!(
                    "Layout {} for {} ({} -> {})\n{}",
                    verb,
                    label(updated),
                    type_label(self.arenas.original, original.ty),
                    type_label(self.arenas.updated, updated.ty),
                    describe_layout_transition(change)
                );
                let mut hints = Vec::new();
                if is_gap(self.original_view(original)) {
                    hints.extend(self.suggest_gap_size(original, updated));
                }
                print_with_hints(&title, &hints)
            }

            Operation::Insert { updated } => {
                let hint = match ctx {
                    ExplainContext::Struct { allow_append: true } => {
                        "New struct members should be placed after existing ones"
                    }
                    ExplainContext::Struct { allow_append: false } => {
                        "New struct members are not allowed here. Define a new struct"
                    }
                    ExplainContext::Layout => {
                        "New variables should be placed after all existing inherited variables"
                    }
                };
                print_with_hints(&format!("Inserted `{}`", updated.label), &[hint])
            }

            Operation::Delete { original } => print_with_hints(
                &format!("Deleted `{}`", original.label),
                &["Keep the variable even if unused"],
            ),

            Operation::Append { updated } => format!("Added `{}`", updated.label),

            Operation::Equal { updated, .. } => format!("Kept `{}`", updated.label),
        }
    }

    fn incompatible_type(
        &self,
        original: &Field,
        updated: &Field,
        change: &TypeChange,
        ctx: ExplainContext,
    ) -> String {
        let mut items = vec![self.type_change(change, original)];
        if ctx == ExplainContext::Layout {
            for detail in all_type_changes(change)
                .into_iter()
                .filter_map(|ch| self.type_change_details(ch))
            {
                if !items.contains(&detail) {
                    items.push(detail);
                }
            }
        }

        let mut hints = Vec::new();
        if is_gap(self.original_view(original)) && matches!(change.detail, TypeChangeDetail::ArrayShrink)
        {
            hints.extend(self.suggest_gap_size(original, updated));
        }

        print_with_hints(
            &format!(
                "Upgraded {} to an incompatible type\n{}",
                label(updated),
                itemize(&items)
            ),
            &hints,
        )
    }

    fn type_change(&self, ch: &TypeChange, original_field: &Field) -> String {
        let updated_label = type_label(self.arenas.updated, ch.updated);
        match &ch.detail {
            TypeChangeDetail::VisibilityChange => format!(
                "Bad upgrade {}\nDifferent visibility",
                self.describe_transition(ch)
            ),
            TypeChangeDetail::ObviousMismatch
            | TypeChangeDetail::StructMembers { .. }
            | TypeChangeDetail::EnumMembers { .. } => {
                format!("Bad upgrade {}", self.describe_transition(ch))
            }
            TypeChangeDetail::TypeResize => format!(
                "Bad upgrade {}\nDifferent representation sizes",
                self.describe_transition(ch)
            ),
            TypeChangeDetail::MappingKey(inner) => format!(
                "In key of {}\n{}",
                updated_label,
                itemize(&[self.type_change(inner, original_field)])
            ),
            TypeChangeDetail::MappingValue(inner) | TypeChangeDetail::ArrayValue(inner) => format!(
                "In {}\n{}",
                updated_label,
                itemize(&[self.type_change(inner, original_field)])
            ),
            TypeChangeDetail::ArrayShrink | TypeChangeDetail::ArrayGrow => {
                let shrink = matches!(ch.detail, TypeChangeDetail::ArrayShrink);
                let original_size = array_size(self.arenas.original.get(ch.original));
                let updated_size = array_size(self.arenas.updated.get(ch.updated));
                if is_gap(self.original_view(original_field)) {
                    let note = if shrink {
                        "Size decrease must match with corresponding variable inserts"
                    } else {
                        "Size cannot increase"
                    };
                    format!(
                        "Bad storage gap resize from {} to {}\n{}",
                        original_size, updated_size, note
                    )
                } else {
                    let note = if shrink {
                        "Size cannot decrease"
                    } else {
                        "Size cannot increase here"
                    };
                    format!(
                        "Bad array resize from {} to {}\n{}",
                        original_size, updated_size, note
                    )
                }
            }
            TypeChangeDetail::ArrayDynamic => {
                let original_is_dynamic = self
                    .arenas
                    .original
                    .get(ch.original)
                    .and_then(TypeNode::array_length)
                    == Some(ArrayLength::Dynamic);
                let (from, to) = if original_is_dynamic {
                    ("dynamic", "fixed")
                } else {
                    ("fixed", "dynamic")
                };
                format!("Bad upgrade from {} to {} size array", from, to)
            }
            TypeChangeDetail::MissingMembers => {
                let category = self
                    .arenas
                    .updated
                    .get(ch.updated)
                    .map_or("type", |node| node.head.category_name());
                format!(
                    "Insufficient data to compare {}s\nManually assess compatibility, then use option `unsafeAllowCustomTypes: true`",
                    category
                )
            }
            TypeChangeDetail::Unknown => format!("Unknown type {}", updated_label),
        }
    }

    fn type_change_details(&self, ch: &TypeChange) -> Option<String> {
        let updated_label = type_label(self.arenas.updated, ch.updated);
        match &ch.detail {
            TypeChangeDetail::StructMembers { ops, allow_append } => {
                let ctx = ExplainContext::Struct {
                    allow_append: *allow_append,
                };
                let members: Vec<String> = ops
                    .iter()
                    .enumerate()
                    .filter(|(i, op)| !(*i != 0 && is_layout_change(op)))
                    .map(|(_, op)| self.storage_operation(op, ctx))
                    .collect();
                Some(format!("In {}\n{}", updated_label, itemize(&members)))
            }
            TypeChangeDetail::EnumMembers { ops } => {
                let members: Vec<String> = ops.iter().map(enum_operation).collect();
                Some(format!("In {}\n{}", updated_label, itemize(&members)))
            }
            _ => None,
        }
    }

    fn describe_transition(&self, ch: &TypeChange) -> String {
        let original = type_label(self.arenas.original, ch.original);
        let updated = type_label(self.arenas.updated, ch.updated);
        if original == updated {
            format!("to {}", updated)
        } else {
            format!("from {} to {}", original, updated)
        }
    }

    fn suggest_gap_size(&self, original: &Field, updated: &Field) -> Option<String> {
        self.expected_gap_size(original, updated)
            .map(|size| format!("Set {} array to size {}", updated.label, size))
    }

    /// Gap length that would make the updated gap end where the original did
    fn expected_gap_size(&self, original: &Field, updated: &Field) -> Option<U256> {
        let original_view = self.original_view(original);
        let original_end = original_view.end()?;
        let updated_start = FieldView::new(updated, self.arenas.updated).begin()?;
        let original_bytes = U256::from(original_view.number_of_bytes()?);
        let length = match original_view.type_node()?.array_length()? {
            ArrayLength::Fixed(n) if n > 0 => U256::from(n),
            _ => return None,
        };
        let bytes_per_item = original_bytes / length;
        if bytes_per_item.is_zero() {
            return None;
        }
        Some(original_end.checked_sub(updated_start)? / bytes_per_item)
    }

    fn original_view<'f>(&self, field: &'f Field) -> FieldView<'f>
    where
        'a: 'f,
    {
        FieldView::new(field, self.arenas.original)
    }
}

pub(crate) fn is_layout_change(op: &StorageOperation) -> bool {
    matches!(op, Operation::Change(StorageChange::LayoutChange { .. }))
}

/// The root change plus nested changes worth explaining in detail
fn all_type_changes(root: &TypeChange) -> Vec<&TypeChange> {
    let mut list = vec![root];
    let mut i = 0;
    while i < list.len() {
        let ch = list[i];
        match &ch.detail {
            TypeChangeDetail::MappingValue(inner) | TypeChangeDetail::ArrayValue(inner) => {
                list.push(inner.as_ref())
            }
            TypeChangeDetail::StructMembers { ops, .. } => {
                for op in ops {
                    if let Operation::Change(StorageChange::TypeChange { change, .. }) = op {
                        list.push(change);
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    list
}

fn enum_operation(op: &EnumOperation) -> String {
    match op {
        Operation::Change(replace) => {
            format!("Replaced `{}` with `{}`", replace.original, replace.updated)
        }
        Operation::Delete { original } => format!("Deleted `{}`", original),
        Operation::Insert { updated } => format!("Inserted `{}`", updated),
        Operation::Append { updated } => format!("Added `{}`", updated),
        Operation::Equal { updated, .. } => format!("Kept `{}`", updated),
    }
}

fn describe_layout_transition(change: &LayoutChange) -> String {
    let mut lines = Vec::new();
    if let LayoutChange::Certain {
        slot,
        offset,
        bytes,
    } = change
    {
        if let Some(t) = slot {
            lines.push(format!("Slot changed from {} to {}", t.from, t.to));
        }
        if let Some(t) = offset {
            lines.push(format!("Offset changed from {} to {}", t.from, t.to));
        }
        if let Some(t) = bytes {
            lines.push(format!("Number of bytes changed from {} to {}", t.from, t.to));
        }
    }
    itemize(&lines)
}

fn print_with_hints<S: AsRef<str>>(title: &str, hints: &[S]) -> String {
    format!("{}\n{}", title, itemize_with(">", hints))
        .trim_end()
        .to_string()
}

fn label(field: &Field) -> String {
    format!("`{}`", field.label)
}

fn type_label(arena: &TypeArena, id: TypeId) -> &str {
    arena.get(id).map_or("<unresolved>", TypeNode::label)
}

fn array_size(node: Option<&TypeNode>) -> String {
    match node.and_then(TypeNode::array_length) {
        Some(length) => length.to_string(),
        None => "?".to_string(),
    }
}
