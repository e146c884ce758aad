//! Compatibility reports
//!
//! A [`CompatibilityReport`] holds the unsafe operations found by a
//! comparison, in edit-script order. An empty report means the upgrade is
//! safe.

pub mod explain;
pub mod text;

use std::sync::Arc;

use crate::compare::model::{OperationKind, StorageOperation};
use crate::compare::ArenaPair;
use crate::layout::TypeArena;

pub use explain::ExplainContext;

use explain::{is_layout_change, Explainer};
use text::{indent, Style};

#[derive(Debug, Clone)]
pub struct CompatibilityReport {
    ops: Vec<StorageOperation>,
    original_types: Arc<TypeArena>,
    updated_types: Arc<TypeArena>,
}

impl CompatibilityReport {
    pub fn new(
        ops: Vec<StorageOperation>,
        original_types: Arc<TypeArena>,
        updated_types: Arc<TypeArena>,
    ) -> Self {
        Self {
            ops,
            original_types,
            updated_types,
        }
    }

    /// True if no unsafe operation was found
    pub fn ok(&self) -> bool {
        self.pass()
    }

    pub fn pass(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn operations(&self) -> &[StorageOperation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn kinds(&self) -> Vec<OperationKind> {
        self.ops.iter().map(|op| op.kind()).collect()
    }

    /// Type arenas the reported fields refer to
    pub fn arenas(&self) -> ArenaPair<'_> {
        ArenaPair::new(&self.original_types, &self.updated_types)
    }

    /// Render every operation as a block headed by its source location.
    ///
    /// Layout changes after the first operation are skipped since an earlier
    /// operation usually explains them.
    pub fn explain(&self, colorize: bool) -> String {
        let style = Style::new(colorize);
        let explainer = Explainer::new(self.arenas());

        self.ops
            .iter()
            .enumerate()
            .filter(|(i, op)| !(*i != 0 && is_layout_change(op)))
            .map(|(_, op)| {
                let heading = match op.updated_field() {
                    Some(updated) => updated.heading(),
                    None => op
                        .original_field()
                        .map_or("", |original| original.contract.as_str()),
                };
                format!(
                    "{}{}{}:{}",
                    style.bold(),
                    heading,
                    style.normal(),
                    indent(
                        &explainer.storage_operation(op, ExplainContext::Layout),
                        2,
                        1
                    )
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl std::fmt::Display for CompatibilityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.explain(false))
    }
}
