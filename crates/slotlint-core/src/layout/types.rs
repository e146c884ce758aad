//! Type graph for detailed storage layouts.
//!
//! Types live in a [`TypeArena`] and are addressed by [`TypeId`] handles.
//! Struct members refer back into the same arena, so a struct that contains
//! itself (directly or through a mapping or array) is represented by a cycle
//! of ids rather than by shared pointers.

use std::collections::HashMap;

use serde::Serialize;

use crate::errors::{LayoutError, Result};
use crate::layout::field::Field;
use crate::layout::type_id::parse_type_id;

/// Handle to a type node inside one [`TypeArena`].
///
/// Ids are only meaningful for the arena that produced them.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize)]
pub struct TypeId(u32);

impl TypeId {
    /// Get the raw index (for debugging/serialization)
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Calling convention of a function type stored in a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionVisibility {
    Internal,
    External,
}

/// Category of a type, taken from the head of its type identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeHead {
    Struct,
    Enum,
    Mapping,
    Array,
    Contract,
    Address,
    Function(FunctionVisibility),
    UserDefinedValueType,
    /// Key type lost by legacy deployment records; matches any key
    Unknown,
    /// Any other value type, keeping the raw head (`t_uint256`, `t_string_storage`, ...)
    Elementary(String),
}

impl TypeHead {
    /// Classify the head of a type identifier
    pub fn parse(head: &str) -> Self {
        match head {
            "t_struct" => TypeHead::Struct,
            "t_enum" => TypeHead::Enum,
            "t_mapping" => TypeHead::Mapping,
            "t_array" => TypeHead::Array,
            "t_contract" => TypeHead::Contract,
            "t_address" => TypeHead::Address,
            "t_userDefinedValueType" => TypeHead::UserDefinedValueType,
            "unknown" => TypeHead::Unknown,
            h if h.starts_with("t_function_internal") => {
                TypeHead::Function(FunctionVisibility::Internal)
            }
            h if h.starts_with("t_function_external") => {
                TypeHead::Function(FunctionVisibility::External)
            }
            h => TypeHead::Elementary(h.to_string()),
        }
    }

    /// Short human name of the category (`struct`, `enum`, `uint256`, ...)
    pub fn category_name(&self) -> &str {
        match self {
            TypeHead::Struct => "struct",
            TypeHead::Enum => "enum",
            TypeHead::Mapping => "mapping",
            TypeHead::Array => "array",
            TypeHead::Contract => "contract",
            TypeHead::Address => "address",
            TypeHead::Function(_) => "function",
            TypeHead::UserDefinedValueType => "userDefinedValueType",
            TypeHead::Unknown => "unknown",
            TypeHead::Elementary(h) => h.strip_prefix("t_").unwrap_or(h),
        }
    }

    /// Category equality, treating `_memory_ptr` and `_memory` spellings alike
    pub fn same_category(&self, other: &TypeHead) -> bool {
        match (self, other) {
            (TypeHead::Elementary(a), TypeHead::Elementary(b)) => {
                normalize_memory_pointer(a) == normalize_memory_pointer(b)
            }
            (a, b) => a == b,
        }
    }
}

/// Some compiler versions spell memory locations `_memory_ptr`, others `_memory`.
pub fn normalize_memory_pointer(type_identifier: &str) -> String {
    const PTR: &str = "_memory_ptr";
    let mut out = String::with_capacity(type_identifier.len());
    let mut rest = type_identifier;
    while let Some(pos) = rest.find(PTR) {
        let after = &rest[pos + PTR.len()..];
        let at_boundary = after
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'));
        out.push_str(&rest[..pos]);
        out.push_str(if at_boundary { "_memory" } else { PTR });
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Declared length of an array type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLength {
    Fixed(u64),
    Dynamic,
}

impl ArrayLength {
    /// Read the length prefix of an array tail (`49_storage`, `dyn_storage`)
    pub fn from_tail(tail: &str) -> Option<Self> {
        if tail.starts_with("dyn") {
            return Some(ArrayLength::Dynamic);
        }
        let digits: &str = &tail[..tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len())];
        digits.parse().ok().map(ArrayLength::Fixed)
    }
}

impl std::fmt::Display for ArrayLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArrayLength::Fixed(n) => write!(f, "{}", n),
            ArrayLength::Dynamic => write!(f, "dyn"),
        }
    }
}

/// Members of a user-defined aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Members {
    Struct(Vec<Field>),
    Enum(Vec<String>),
}

/// The declaration a type node refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeItem {
    pub label: String,
    pub number_of_bytes: Option<u64>,
    /// `None` when the declaration's source was not available
    pub members: Option<Members>,
    /// Underlying type of a user-defined value type
    pub underlying: Option<TypeId>,
}

impl TypeItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            number_of_bytes: None,
            members: None,
            underlying: None,
        }
    }

    pub fn with_bytes(mut self, number_of_bytes: u64) -> Self {
        self.number_of_bytes = Some(number_of_bytes);
        self
    }

    pub fn with_struct_members(mut self, members: Vec<Field>) -> Self {
        self.members = Some(Members::Struct(members));
        self
    }

    pub fn with_enum_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = Some(Members::Enum(members.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_underlying(mut self, underlying: TypeId) -> Self {
        self.underlying = Some(underlying);
        self
    }
}

/// One node of the type graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    /// Full type identifier, e.g. `t_mapping(t_address,t_uint256)`
    pub id: String,
    pub head: TypeHead,
    /// Child types; `None` for leaf types
    pub args: Option<Vec<TypeId>>,
    pub tail: Option<String>,
    pub item: TypeItem,
}

impl TypeNode {
    pub fn label(&self) -> &str {
        &self.item.label
    }

    pub fn array_length(&self) -> Option<ArrayLength> {
        self.tail.as_deref().and_then(ArrayLength::from_tail)
    }

    /// Value types are the only types allowed as mapping keys
    pub fn is_value_type(&self) -> bool {
        self.args.is_none()
            || matches!(
                self.head,
                TypeHead::Contract | TypeHead::Enum | TypeHead::UserDefinedValueType
            )
    }
}

/// Per-layout storage of type nodes with deduplication by type identifier
#[derive(Debug, Clone, Default)]
pub struct TypeArena {
    nodes: Vec<TypeNode>,
    by_id: HashMap<String, TypeId>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Find the node interned for a type identifier
    pub fn lookup(&self, type_id: &str) -> Option<TypeId> {
        self.by_id.get(type_id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (TypeId(i as u32), node))
    }

    /// Intern a type identifier, creating placeholder nodes for it and its arguments.
    ///
    /// A freshly interned node has the identifier as label and no size until
    /// [`TypeArena::set_item`] fills in the declaration.
    ///
    /// # Errors
    ///
    /// - `MalformedTypeId` — the identifier cannot be parsed
    pub fn intern(&mut self, type_id: &str) -> Result<TypeId> {
        if let Some(existing) = self.lookup(type_id) {
            return Ok(existing);
        }

        let parsed = parse_type_id(type_id)?;
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(TypeNode {
            id: type_id.to_string(),
            head: TypeHead::parse(&parsed.head),
            args: None,
            tail: parsed.tail,
            item: TypeItem::new(type_id),
        });
        self.by_id.insert(type_id.to_string(), id);

        if let Some(raw_args) = parsed.args {
            let mut args = Vec::with_capacity(raw_args.len());
            for arg in &raw_args {
                args.push(self.intern(arg)?);
            }
            self.nodes[id.0 as usize].args = Some(args);
        }

        Ok(id)
    }

    /// Intern a type identifier and attach its declaration
    ///
    /// # Errors
    ///
    /// - `MalformedTypeId` — the identifier cannot be parsed
    pub fn define(&mut self, type_id: &str, item: TypeItem) -> Result<TypeId> {
        let id = self.intern(type_id)?;
        self.set_item(id, item)?;
        Ok(id)
    }

    /// Replace the declaration of an interned node
    ///
    /// # Errors
    ///
    /// - `UnresolvedType` — the id does not belong to this arena
    pub fn set_item(&mut self, id: TypeId, item: TypeItem) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| LayoutError::UnresolvedType {
                type_id: id.0,
                side: "target".to_string(),
            })?;
        node.item = item;
        Ok(())
    }
}
