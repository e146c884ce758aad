//! Storage gaps
//!
//! A gap is a fixed-size array of elementary values reserved at the end of a
//! contract's storage so that later versions can claim the space, e.g.
//! `uint256[49] __gap`.

use crate::layout::{ArrayLength, FieldView, TypeHead};

pub fn is_gap_label(label: &str) -> bool {
    label == "__gap" || label.starts_with("__gap_")
}

pub fn is_gap(view: FieldView<'_>) -> bool {
    if !is_gap_label(&view.field.label) {
        return false;
    }
    let Some(node) = view.type_node() else {
        return false;
    };
    if node.head != TypeHead::Array || !matches!(node.array_length(), Some(ArrayLength::Fixed(_))) {
        return false;
    }
    node.args
        .as_ref()
        .and_then(|args| args.first())
        .and_then(|element| view.types.get(*element))
        .map_or(false, |element| matches!(element.head, TypeHead::Elementary(_)))
}

/// True if `original` is a gap and `updated` ends exactly where it ended
pub fn end_matches_gap(original: FieldView<'_>, updated: FieldView<'_>) -> bool {
    if !is_gap(original) {
        return false;
    }
    match (original.end(), updated.end()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Field, TypeArena, TypeItem};

    fn arena() -> TypeArena {
        let mut arena = TypeArena::new();
        arena
            .define("t_uint256", TypeItem::new("uint256").with_bytes(32))
            .unwrap();
        arena
            .define(
                "t_array(t_uint256)49_storage",
                TypeItem::new("uint256[49]").with_bytes(49 * 32),
            )
            .unwrap();
        arena
            .define(
                "t_array(t_uint256)dyn_storage",
                TypeItem::new("uint256[]").with_bytes(32),
            )
            .unwrap();
        arena
    }

    #[test]
    fn test_gap_labels() {
        assert!(is_gap_label("__gap"));
        assert!(is_gap_label("__gap_Vault"));
        assert!(!is_gap_label("__gapX"));
        assert!(!is_gap_label("gap"));
    }

    #[test]
    fn test_gap_requires_fixed_elementary_array() {
        let arena = arena();
        let fixed = arena.lookup("t_array(t_uint256)49_storage").unwrap();
        let dynamic = arena.lookup("t_array(t_uint256)dyn_storage").unwrap();
        let scalar = arena.lookup("t_uint256").unwrap();

        let gap = Field::new("__gap", fixed, "C").with_position(1, 0);
        let dyn_gap = Field::new("__gap", dynamic, "C").with_position(1, 0);
        let scalar_gap = Field::new("__gap", scalar, "C").with_position(1, 0);
        let named = Field::new("reserved", fixed, "C").with_position(1, 0);

        assert!(is_gap(FieldView::new(&gap, &arena)));
        assert!(!is_gap(FieldView::new(&dyn_gap, &arena)));
        assert!(!is_gap(FieldView::new(&scalar_gap, &arena)));
        assert!(!is_gap(FieldView::new(&named, &arena)));
    }

    #[test]
    fn test_end_matches_gap() {
        let arena = arena();
        let fixed = arena.lookup("t_array(t_uint256)49_storage").unwrap();
        let scalar = arena.lookup("t_uint256").unwrap();

        let gap = Field::new("__gap", fixed, "C").with_position(1, 0);
        let at_end = Field::new("x", scalar, "C").with_position(49, 0);
        let early = Field::new("x", scalar, "C").with_position(48, 0);

        assert!(end_matches_gap(
            FieldView::new(&gap, &arena),
            FieldView::new(&at_end, &arena)
        ));
        assert!(!end_matches_gap(
            FieldView::new(&gap, &arena),
            FieldView::new(&early, &arena)
        ));
        assert!(!end_matches_gap(
            FieldView::new(&at_end, &arena),
            FieldView::new(&at_end, &arena)
        ));
    }
}
