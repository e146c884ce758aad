//! Storage layout comparator
//!
//! Aligns the fields of two layouts, classifies every substitution by
//! comparing field names, declared types and physical positions, and keeps
//! only the operations that would corrupt existing storage.
//!
//! Type comparison recurses through structs, mappings and arrays. Results are
//! memoized per `(original, updated, allow_append)` triple, and a triple that
//! is re-entered while still being compared is a recursive type, which is a
//! fatal error.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use slotlint_core_types::{ComparisonContext, SessionId};
use tracing::{debug, warn};

use crate::compare::gap::{end_matches_gap, is_gap};
use crate::compare::levenshtein::{levenshtein, Operation};
use crate::compare::model::{
    EnumReplace, LayoutChange, StorageChange, StorageOperation, Transition, TypeChange,
    TypeChangeDetail, TypeChangeKind,
};
use crate::config::ComparatorOptions;
use crate::errors::{LayoutError, Result};
use crate::layout::{
    ArrayLength, DetailedLayout, Field, FieldView, Members, TypeArena, TypeHead, TypeId, TypeNode,
    U256,
};
use crate::report::CompatibilityReport;
use crate::{log_op_end, log_op_error, log_op_start};

/// The two type arenas a comparison reads from
#[derive(Debug, Clone, Copy)]
pub struct ArenaPair<'a> {
    pub original: &'a TypeArena,
    pub updated: &'a TypeArena,
}

impl<'a> ArenaPair<'a> {
    pub fn new(original: &'a TypeArena, updated: &'a TypeArena) -> Self {
        Self { original, updated }
    }

    pub fn from_layouts(original: &'a DetailedLayout, updated: &'a DetailedLayout) -> Self {
        Self::new(original.types(), updated.types())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TypeKey {
    original: TypeId,
    updated: TypeId,
    allow_append: bool,
}

/// One comparison session
pub struct StorageLayoutComparator {
    options: ComparatorOptions,
    context: ComparisonContext,
    has_allowed_unchecked_custom_types: bool,
    stack: HashSet<TypeKey>,
    cache: HashMap<TypeKey, Option<TypeChange>>,
}

impl Default for StorageLayoutComparator {
    fn default() -> Self {
        Self::new(ComparatorOptions::default())
    }
}

impl StorageLayoutComparator {
    pub fn new(options: ComparatorOptions) -> Self {
        Self {
            options,
            context: ComparisonContext::new(),
            has_allowed_unchecked_custom_types: false,
            stack: HashSet::new(),
            cache: HashMap::new(),
        }
    }

    /// Attach a caller-provided correlation context to the session's log events
    pub fn with_context(mut self, context: ComparisonContext) -> Self {
        self.context = context;
        self
    }

    pub fn options(&self) -> &ComparatorOptions {
        &self.options
    }

    pub fn session_id(&self) -> &SessionId {
        &self.context.session_id
    }

    /// Set once a struct or enum without member information was accepted
    /// because `unsafe_allow_custom_types` is enabled
    pub fn has_allowed_unchecked_custom_types(&self) -> bool {
        self.has_allowed_unchecked_custom_types
    }

    /// Forget memoized type comparisons.
    ///
    /// Memo entries are keyed by type ids, which are only meaningful for one
    /// pair of arenas.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.cache.clear();
    }

    /// Compare two layouts and report the unsafe operations
    ///
    /// # Errors
    ///
    /// - `RecursiveType` — a type contains itself
    /// - `InvariantViolation` — a type graph breaks compiler invariants
    ///   (mapping with non-value key, array without length, ...)
    /// - `UnresolvedType` — a field references a type missing from its arena
    pub fn compare_layouts(
        &mut self,
        original: &DetailedLayout,
        updated: &DetailedLayout,
    ) -> Result<CompatibilityReport> {
        let op = "compare_layouts";
        let start = Instant::now();
        let subject = self.context.subject.clone().unwrap_or_default();

        log_op_start!(
            op,
            session_id = %self.context.session_id,
            subject = %subject,
            original_len = original.len(),
            updated_len = updated.len()
        );

        self.reset();
        let arenas = ArenaPair::from_layouts(original, updated);
        let result = self.layout_levenshtein(arenas, original.fields(), updated.fields(), true);
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(ops) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    session_id = %self.context.session_id,
                    unsafe_ops = ops.len()
                );
                Ok(CompatibilityReport::new(
                    ops,
                    original.shared_types(),
                    updated.shared_types(),
                ))
            }
            Err(err) => {
                log_op_error!(
                    op,
                    err.clone(),
                    duration_ms = duration_ms,
                    session_id = %self.context.session_id
                );
                Err(err)
            }
        }
    }

    /// Align two field lists and keep only the unsafe operations
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StorageLayoutComparator::field_change`].
    pub(crate) fn layout_levenshtein(
        &mut self,
        arenas: ArenaPair<'_>,
        original: &[Field],
        updated: &[Field],
        allow_append: bool,
    ) -> Result<Vec<StorageOperation>> {
        let ops = levenshtein(original, updated, |a, b| self.field_change(arenas, a, b))?;

        Ok(ops
            .into_iter()
            .filter(|op| is_unsafe(arenas, op, original, allow_append))
            .collect())
    }

    /// Classify the difference between two fields, `None` if they are the same
    ///
    /// # Errors
    ///
    /// Propagates errors from [`StorageLayoutComparator::type_change`].
    pub(crate) fn field_change(
        &mut self,
        arenas: ArenaPair<'_>,
        original: &Field,
        updated: &Field,
    ) -> Result<Option<StorageChange>> {
        let original_view = FieldView::new(original, arenas.original);
        let updated_view = FieldView::new(updated, arenas.updated);

        let name_change = !self.options.unsafe_allow_renames
            && updated.renamed_from.as_deref() != Some(original.label.as_str())
            && (updated.label != original.label
                || (updated.renamed_from.is_some() && updated.renamed_from != original.renamed_from));

        let retyped_from_original = is_retyped_from(original_view, updated);
        let type_change = if retyped_from_original {
            None
        } else {
            self.type_change(arenas, original.ty, updated.ty, false)?
        };
        let layout_change = self.layout_change(original_view, updated_view);

        let owned = || (original.clone(), updated.clone());

        if retyped_from_original {
            if let Some(change) = layout_change
                .clone()
                .filter(|c| !matches!(c, LayoutChange::Uncertain { known_compatible: true }))
            {
                let (original, updated) = owned();
                return Ok(Some(StorageChange::LayoutChange {
                    original,
                    updated,
                    change,
                }));
            }
        }

        if name_change && end_matches_gap(original_view, updated_view) {
            let (original, updated) = owned();
            return Ok(Some(StorageChange::FinishGap { original, updated }));
        }

        let change = match (type_change, name_change) {
            (Some(change), _)
                if change.kind() == TypeChangeKind::ArrayShrink
                    && end_matches_gap(original_view, updated_view) =>
            {
                let (original, updated) = owned();
                Some(StorageChange::ShrinkGap {
                    original,
                    updated,
                    change,
                })
            }
            (Some(_), true) => {
                let (original, updated) = owned();
                Some(StorageChange::Replace { original, updated })
            }
            (None, true) => {
                let (original, updated) = owned();
                Some(StorageChange::Rename {
                    original,
                    updated,
                    layout: layout_change,
                })
            }
            (Some(change), false) => {
                let (original, updated) = owned();
                Some(StorageChange::TypeChange {
                    original,
                    updated,
                    change,
                })
            }
            (None, false) => match layout_change {
                Some(change @ LayoutChange::Certain { .. }) => {
                    let (original, updated) = owned();
                    Some(StorageChange::LayoutChange {
                        original,
                        updated,
                        change,
                    })
                }
                _ => None,
            },
        };

        Ok(change)
    }

    fn layout_change(&self, original: FieldView<'_>, updated: FieldView<'_>) -> Option<LayoutChange> {
        match (position_of(original), position_of(updated)) {
            (Some((os, oo, ob)), Some((us, uo, ub))) => {
                let slot = Transition::between(os, us);
                let offset = Transition::between(oo, uo);
                let bytes = Transition::between(ob, ub);
                (slot.is_some() || offset.is_some() || bytes.is_some())
                    .then_some(LayoutChange::Certain {
                        slot,
                        offset,
                        bytes,
                    })
            }
            _ => Some(LayoutChange::Uncertain {
                known_compatible: self
                    .options
                    .is_known_compatible(original.type_label(), updated.type_label()),
            }),
        }
    }

    /// Compare two types, `None` if they are storage compatible
    ///
    /// Mapping values may grow (`allow_append`); everywhere else a struct that
    /// gains trailing members is a change.
    ///
    /// # Errors
    ///
    /// - `RecursiveType` — the pair is already being compared further up
    /// - `InvariantViolation` — a type graph breaks compiler invariants
    /// - `UnresolvedType` — an id is missing from its arena
    pub(crate) fn type_change(
        &mut self,
        arenas: ArenaPair<'_>,
        original: TypeId,
        updated: TypeId,
        allow_append: bool,
    ) -> Result<Option<TypeChange>> {
        let key = TypeKey {
            original,
            updated,
            allow_append,
        };

        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        if !self.stack.insert(key) {
            let type_label = node(arenas.original, original, "original")?
                .label()
                .to_string();
            debug!(
                session_id = %self.context.session_id,
                type_label = %type_label,
                "Recursion detected while comparing types"
            );
            return Err(LayoutError::RecursiveType { type_label });
        }

        let result = self.uncached_type_change(arenas, original, updated, allow_append);
        self.stack.remove(&key);

        let change = result?;
        self.cache.insert(key, change.clone());
        Ok(change)
    }

    fn uncached_type_change(
        &mut self,
        arenas: ArenaPair<'_>,
        original_id: TypeId,
        updated_id: TypeId,
        allow_append: bool,
    ) -> Result<Option<TypeChange>> {
        let original = node(arenas.original, original_id, "original")?;
        let updated = node(arenas.updated, updated_id, "updated")?;
        let change = |detail: TypeChangeDetail| -> Result<Option<TypeChange>> {
            Ok(Some(TypeChange::new(original_id, updated_id, detail)))
        };

        if let TypeHead::Function(updated_visibility) = &updated.head {
            return match &original.head {
                TypeHead::Function(original_visibility)
                    if original_visibility == updated_visibility =>
                {
                    Ok(None)
                }
                TypeHead::Function(_) => change(TypeChangeDetail::VisibilityChange),
                _ => change(TypeChangeDetail::ObviousMismatch),
            };
        }

        if matches!(
            (&original.head, &updated.head),
            (TypeHead::Contract, TypeHead::Address) | (TypeHead::Address, TypeHead::Contract)
        ) {
            return Ok(None);
        }

        if !original.head.same_category(&updated.head) {
            return change(TypeChangeDetail::ObviousMismatch);
        }

        let (original_args, updated_args) = match (&original.args, &updated.args) {
            (Some(o), Some(u)) => (o, u),
            (None, None) => return Ok(None),
            _ => {
                return Err(invariant(
                    original,
                    "only one side of the comparison has type arguments",
                ))
            }
        };

        match &original.head {
            TypeHead::Contract => Ok(None),

            TypeHead::Struct => {
                match (&original.item.members, &updated.item.members) {
                    (Some(Members::Struct(o)), Some(Members::Struct(u))) => {
                        let ops = self.layout_levenshtein(arenas, o, u, allow_append)?;
                        if ops.is_empty() {
                            Ok(None)
                        } else {
                            change(TypeChangeDetail::StructMembers { ops, allow_append })
                        }
                    }
                    (Some(_), Some(_)) => Err(invariant(original, "struct has enum members")),
                    _ => self.missing_members(original_id, updated_id, original),
                }
            }

            TypeHead::Enum => match (&original.item.members, &updated.item.members) {
                (Some(Members::Enum(o)), Some(Members::Enum(u))) => {
                    if enum_size(o.len()) != enum_size(u.len()) {
                        return change(TypeChangeDetail::TypeResize);
                    }
                    let ops = levenshtein(o, u, |a, b| {
                        Ok::<_, LayoutError>((a != b).then(|| EnumReplace {
                            original: a.clone(),
                            updated: b.clone(),
                        }))
                    })?
                    .into_iter()
                    .filter(|op| !op.is_equal() && !op.is_append())
                    .collect::<Vec<_>>();
                    if ops.is_empty() {
                        Ok(None)
                    } else {
                        change(TypeChangeDetail::EnumMembers { ops })
                    }
                }
                (Some(_), Some(_)) => Err(invariant(original, "enum has struct members")),
                _ => self.missing_members(original_id, updated_id, original),
            },

            TypeHead::Mapping => {
                let (&[original_key, original_value], &[updated_key, updated_value]) =
                    (original_args.as_slice(), updated_args.as_slice())
                else {
                    return Err(invariant(original, "mapping must have a key and a value type"));
                };

                let original_key_node = node(arenas.original, original_key, "original")?;
                let updated_key_node = node(arenas.updated, updated_key, "updated")?;
                if !original_key_node.is_value_type() || !updated_key_node.is_value_type() {
                    return Err(invariant(original, "mapping key is not a value type"));
                }

                // keys recorded by legacy tooling match any key type
                let key_change = if original_key_node.head == TypeHead::Unknown {
                    None
                } else {
                    self.type_change(arenas, original_key, updated_key, false)?
                };

                if let Some(inner) = key_change {
                    return change(TypeChangeDetail::MappingKey(Box::new(inner)));
                }

                match self.type_change(arenas, original_value, updated_value, true)? {
                    Some(inner) => change(TypeChangeDetail::MappingValue(Box::new(inner))),
                    None => Ok(None),
                }
            }

            TypeHead::Array => {
                let (Some(original_length), Some(updated_length)) =
                    (original.array_length(), updated.array_length())
                else {
                    return Err(invariant(original, "array type has no length"));
                };

                match (original_length, updated_length) {
                    (ArrayLength::Dynamic, ArrayLength::Fixed(_))
                    | (ArrayLength::Fixed(_), ArrayLength::Dynamic) => {
                        return change(TypeChangeDetail::ArrayDynamic)
                    }
                    (ArrayLength::Fixed(o), ArrayLength::Fixed(u)) if u < o => {
                        return change(TypeChangeDetail::ArrayShrink)
                    }
                    (ArrayLength::Fixed(o), ArrayLength::Fixed(u)) if u > o && !allow_append => {
                        return change(TypeChangeDetail::ArrayGrow)
                    }
                    _ => {}
                }

                let (Some(&original_element), Some(&updated_element)) =
                    (original_args.first(), updated_args.first())
                else {
                    return Err(invariant(original, "array type has no element type"));
                };

                match self.type_change(arenas, original_element, updated_element, false)? {
                    Some(inner) => change(TypeChangeDetail::ArrayValue(Box::new(inner))),
                    None => Ok(None),
                }
            }

            TypeHead::UserDefinedValueType => {
                let underlying_match = match (original.item.underlying, updated.item.underlying) {
                    (Some(o), Some(u)) => {
                        node(arenas.original, o, "original")?.id
                            == node(arenas.updated, u, "updated")?.id
                    }
                    _ => false,
                };

                let (original_bytes, updated_bytes) =
                    (original.item.number_of_bytes, updated.item.number_of_bytes);
                if (original_bytes.is_none() || updated_bytes.is_none()) && !underlying_match {
                    return change(TypeChangeDetail::Unknown);
                }
                if original_bytes != updated_bytes {
                    change(TypeChangeDetail::TypeResize)
                } else {
                    Ok(None)
                }
            }

            _ => change(TypeChangeDetail::Unknown),
        }
    }

    fn missing_members(
        &mut self,
        original_id: TypeId,
        updated_id: TypeId,
        original: &TypeNode,
    ) -> Result<Option<TypeChange>> {
        if self.options.unsafe_allow_custom_types {
            self.has_allowed_unchecked_custom_types = true;
            warn!(
                session_id = %self.context.session_id,
                type_label = %original.label(),
                "Storage layout of custom type was not checked because member information is missing"
            );
            return Ok(None);
        }
        Ok(Some(TypeChange::new(
            original_id,
            updated_id,
            TypeChangeDetail::MissingMembers,
        )))
    }
}

/// True if the operation would corrupt existing storage
fn is_unsafe(
    arenas: ArenaPair<'_>,
    op: &StorageOperation,
    original: &[Field],
    allow_append: bool,
) -> bool {
    match op {
        Operation::Equal { .. } => false,
        Operation::Insert { updated } => {
            let inserted = FieldView::new(updated, arenas.updated);
            let (Some(start), Some(end)) = (inserted.begin(), inserted.end()) else {
                return true;
            };
            original
                .iter()
                .map(|field| FieldView::new(field, arenas.original))
                .filter(|view| !is_gap(*view))
                .any(|view| match (view.begin(), view.end()) {
                    (Some(field_start), Some(field_end)) => field_start < end && start < field_end,
                    _ => true,
                })
        }
        Operation::Append { .. } => !allow_append,
        Operation::Change(
            change @ (StorageChange::ShrinkGap { .. } | StorageChange::FinishGap { .. }),
        ) => !end_matches_gap(
            FieldView::new(change.original(), arenas.original),
            FieldView::new(change.updated(), arenas.updated),
        ),
        _ => true,
    }
}

fn node<'a>(arena: &'a TypeArena, id: TypeId, side: &str) -> Result<&'a TypeNode> {
    arena.get(id).ok_or_else(|| LayoutError::UnresolvedType {
        type_id: id.index(),
        side: side.to_string(),
    })
}

fn invariant(node: &TypeNode, reason: &str) -> LayoutError {
    LayoutError::InvariantViolation {
        type_label: node.label().to_string(),
        reason: reason.to_string(),
    }
}

fn position_of(view: FieldView<'_>) -> Option<(U256, u64, u64)> {
    Some((view.field.slot?, view.field.offset?, view.number_of_bytes()?))
}

/// Bytes needed to store an enum with `member_count` members
pub fn enum_size(member_count: usize) -> u32 {
    let n = member_count.max(2) as u64;
    let bits = u64::BITS - (n - 1).leading_zeros();
    (bits + 7) / 8
}

fn is_retyped_from(original: FieldView<'_>, updated: &Field) -> bool {
    updated
        .retyped_from
        .as_deref()
        .map_or(false, |retyped_from| {
            strip_contract_substrings(retyped_from.trim())
                == strip_contract_substrings(original.type_label())
        })
}

/// Drop `contract `, `struct ` and `enum ` keywords from a type label
pub fn strip_contract_substrings(label: &str) -> String {
    const KEYWORDS: [&str; 3] = ["contract ", "struct ", "enum "];

    let mut out = String::with_capacity(label.len());
    let mut rest = label;
    let mut after_word_char = false;

    'scan: while let Some(c) = rest.chars().next() {
        if !after_word_char {
            for keyword in KEYWORDS {
                if let Some(after) = rest.strip_prefix(keyword) {
                    rest = after;
                    continue 'scan;
                }
            }
        }
        out.push(c);
        after_word_char = c.is_ascii_alphanumeric() || c == '_';
        rest = &rest[c.len_utf8()..];
    }

    out
}
