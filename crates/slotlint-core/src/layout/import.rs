//! Import of the compiler's storage layout JSON document
//!
//! ```json
//! {
//!   "storage": [
//!     { "label": "owner", "contract": "Vault", "type": "t_address", "slot": "0", "offset": 0 }
//!   ],
//!   "types": {
//!     "t_address": { "label": "address", "numberOfBytes": "20" }
//!   }
//! }
//! ```
//!
//! Numbers may be given either as JSON numbers or as decimal strings.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::{LayoutError, Result};
use crate::layout::field::{DetailedLayout, Field};
use crate::layout::types::{Members, TypeArena, TypeHead, TypeId, TypeItem};
use crate::layout::U256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageLayout {
    pub storage: Vec<StorageItem>,
    #[serde(default)]
    pub types: BTreeMap<String, TypeDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageItem {
    pub label: String,
    #[serde(default)]
    pub contract: String,
    #[serde(rename = "type")]
    pub type_id: String,
    #[serde(default)]
    pub slot: Option<NumberLike>,
    #[serde(default)]
    pub offset: Option<NumberLike>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub renamed_from: Option<String>,
    #[serde(default)]
    pub retyped_from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    pub label: String,
    #[serde(default)]
    pub number_of_bytes: Option<NumberLike>,
    #[serde(default)]
    pub members: Option<MembersDescriptor>,
    #[serde(default)]
    pub underlying: Option<String>,
}

/// Struct members are storage items, enum members are plain names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MembersDescriptor {
    Names(Vec<String>),
    Items(Vec<StorageItem>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(u64),
    Text(String),
}

impl NumberLike {
    fn parse<T: std::str::FromStr + From<u64>>(&self) -> Option<T> {
        match self {
            NumberLike::Number(n) => Some(T::from(*n)),
            NumberLike::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Slots are decimal; `U256::from_str` would read hex
    fn slot(&self) -> Option<U256> {
        match self {
            NumberLike::Number(n) => Some(U256::from(*n)),
            NumberLike::Text(s) => {
                let digits = s.trim();
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                U256::from_dec_str(digits).ok()
            }
        }
    }

    fn raw(&self) -> String {
        match self {
            NumberLike::Number(n) => n.to_string(),
            NumberLike::Text(s) => s.clone(),
        }
    }
}

impl DetailedLayout {
    /// Build a layout from a deserialized storage layout document
    ///
    /// # Errors
    ///
    /// - `MalformedTypeId` — a type identifier cannot be parsed
    /// - `InvalidFieldAttribute` — a slot, offset or size is not a valid number
    /// - `InvalidLayout` — a struct lists member names or an enum lists storage items
    pub fn from_storage_layout(layout: &StorageLayout) -> Result<Self> {
        let mut importer = Importer {
            descriptors: &layout.types,
            arena: TypeArena::new(),
            described: HashSet::new(),
        };

        let fields = layout
            .storage
            .iter()
            .map(|item| importer.field(item))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            fields = fields.len(),
            types = importer.arena.len(),
            "Imported storage layout"
        );

        Ok(DetailedLayout::new(fields, importer.arena))
    }

    /// # Errors
    ///
    /// - `Serialization` — the value is not a storage layout document
    /// - any error of [`DetailedLayout::from_storage_layout`]
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let layout: StorageLayout = serde_json::from_value(value)?;
        Self::from_storage_layout(&layout)
    }

    /// # Errors
    ///
    /// - `Serialization` — the text is not a storage layout document
    /// - any error of [`DetailedLayout::from_storage_layout`]
    pub fn from_json_str(source: &str) -> Result<Self> {
        let layout: StorageLayout = serde_json::from_str(source)?;
        Self::from_storage_layout(&layout)
    }
}

struct Importer<'a> {
    descriptors: &'a BTreeMap<String, TypeDescriptor>,
    arena: TypeArena,
    /// Nodes whose declaration has been (or is being) filled in
    described: HashSet<TypeId>,
}

impl Importer<'_> {
    fn resolve(&mut self, type_id: &str) -> Result<TypeId> {
        let id = self.arena.intern(type_id)?;
        if !self.described.insert(id) {
            return Ok(id);
        }

        let args: Vec<String> = self
            .arena
            .get(id)
            .and_then(|node| node.args.as_ref())
            .map(|args| {
                args.iter()
                    .filter_map(|arg| self.arena.get(*arg).map(|n| n.id.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for arg in &args {
            self.resolve(arg)?;
        }

        let descriptors = self.descriptors;
        if let Some(descriptor) = descriptors.get(type_id) {
            let item = self.item(id, type_id, descriptor)?;
            self.arena.set_item(id, item)?;
        }

        Ok(id)
    }

    fn item(&mut self, id: TypeId, type_id: &str, descriptor: &TypeDescriptor) -> Result<TypeItem> {
        let number_of_bytes = descriptor
            .number_of_bytes
            .as_ref()
            .map(|n| {
                n.parse::<u64>().ok_or_else(|| LayoutError::InvalidFieldAttribute {
                    field_label: type_id.to_string(),
                    attribute: "numberOfBytes".to_string(),
                    value: n.raw(),
                })
            })
            .transpose()?;

        let head = self.arena.get(id).map(|node| node.head.clone());
        let is_struct = head == Some(TypeHead::Struct);
        let mismatched = |expected: &str| LayoutError::InvalidLayout {
            reason: format!("{} lists {} as members", type_id, expected),
        };

        let members = match &descriptor.members {
            None => None,
            Some(MembersDescriptor::Names(names)) if is_struct && names.is_empty() => {
                Some(Members::Struct(Vec::new()))
            }
            Some(MembersDescriptor::Names(_)) if is_struct => return Err(mismatched("names")),
            Some(MembersDescriptor::Names(names)) => Some(Members::Enum(names.clone())),
            Some(MembersDescriptor::Items(_)) if head == Some(TypeHead::Enum) => {
                return Err(mismatched("storage items"));
            }
            Some(MembersDescriptor::Items(items)) => Some(Members::Struct(
                items
                    .iter()
                    .map(|item| self.field(item))
                    .collect::<Result<Vec<_>>>()?,
            )),
        };

        let underlying = descriptor
            .underlying
            .as_deref()
            .map(|u| self.resolve(u))
            .transpose()?;

        Ok(TypeItem {
            label: descriptor.label.clone(),
            number_of_bytes,
            members,
            underlying,
        })
    }

    fn field(&mut self, item: &StorageItem) -> Result<Field> {
        let ty = self.resolve(&item.type_id)?;

        let invalid = |attribute: &str, value: &NumberLike| LayoutError::InvalidFieldAttribute {
            field_label: item.label.clone(),
            attribute: attribute.to_string(),
            value: value.raw(),
        };

        let slot = item
            .slot
            .as_ref()
            .map(|s| s.slot().ok_or_else(|| invalid("slot", s)))
            .transpose()?;
        let offset = item
            .offset
            .as_ref()
            .map(|o| o.parse::<u64>().ok_or_else(|| invalid("offset", o)))
            .transpose()?;

        Ok(Field {
            label: item.label.clone(),
            ty,
            slot,
            offset,
            contract: item.contract.clone(),
            src: item.src.clone(),
            renamed_from: item.renamed_from.clone(),
            retyped_from: item.retyped_from.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_like_accepts_both_forms() {
        assert_eq!(NumberLike::Number(3).parse::<u64>(), Some(3));
        assert_eq!(NumberLike::Text("42".into()).parse::<u64>(), Some(42));
        assert_eq!(NumberLike::Text("x".into()).parse::<u64>(), None);
    }

    #[test]
    fn test_slot_is_decimal_only() {
        assert_eq!(NumberLike::Number(3).slot(), Some(U256::from(3u64)));
        assert_eq!(NumberLike::Text(" 10 ".into()).slot(), Some(U256::from(10u64)));
        assert_eq!(NumberLike::Text("0x10".into()).slot(), None);
        assert_eq!(NumberLike::Text("ff".into()).slot(), None);
        assert_eq!(NumberLike::Text("".into()).slot(), None);
        assert_eq!(NumberLike::Text("-1".into()).slot(), None);
    }

    #[test]
    fn test_import_self_referencing_struct() {
        let layout = DetailedLayout::from_json_value(json!({
            "storage": [
                { "label": "head", "contract": "List", "type": "t_struct(Node)3_storage", "slot": "0", "offset": 0 }
            ],
            "types": {
                "t_struct(Node)3_storage": {
                    "label": "struct List.Node",
                    "numberOfBytes": "64",
                    "members": [
                        { "label": "value", "type": "t_uint256", "slot": "0", "offset": 0 },
                        { "label": "next", "type": "t_mapping(t_uint256,t_struct(Node)3_storage)", "slot": "1", "offset": 0 }
                    ]
                },
                "t_mapping(t_uint256,t_struct(Node)3_storage)": { "label": "mapping(uint256 => struct List.Node)", "numberOfBytes": "32" },
                "t_uint256": { "label": "uint256", "numberOfBytes": "32" }
            }
        }))
        .unwrap();

        let node = layout.types().get(layout.fields()[0].ty).unwrap();
        match &node.item.members {
            Some(Members::Struct(members)) => {
                let mapping = layout.types().get(members[1].ty).unwrap();
                let value = mapping.args.as_ref().unwrap()[1];
                assert_eq!(value, layout.fields()[0].ty);
            }
            other => panic!("expected struct members, got {:?}", other),
        }
    }
}
