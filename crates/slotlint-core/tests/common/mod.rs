use serde_json::{json, Map, Value};
use slotlint_core::DetailedLayout;

/// Builds storage layout JSON documents for tests
///
/// Common elementary types are pre-registered; anything else is added with
/// [`LayoutBuilder::ty`] or one of the shortcut methods.
#[derive(Clone)]
#[allow(dead_code)]
pub struct LayoutBuilder {
    contract: String,
    storage: Vec<Value>,
    types: Map<String, Value>,
}

#[allow(dead_code)]
impl LayoutBuilder {
    pub fn new(contract: &str) -> Self {
        let mut builder = Self {
            contract: contract.to_string(),
            storage: Vec::new(),
            types: Map::new(),
        };
        for (id, label, bytes) in [
            ("t_uint256", "uint256", 32),
            ("t_uint128", "uint128", 16),
            ("t_uint64", "uint64", 8),
            ("t_uint8", "uint8", 1),
            ("t_bool", "bool", 1),
            ("t_address", "address", 20),
        ] {
            builder = builder.ty(id, json!({ "label": label, "numberOfBytes": bytes.to_string() }));
        }
        builder
    }

    /// Register a type descriptor
    pub fn ty(mut self, id: &str, descriptor: Value) -> Self {
        self.types.insert(id.to_string(), descriptor);
        self
    }

    /// Add a variable at `slot`/`offset`
    pub fn var(self, label: &str, type_id: &str, slot: u64, offset: u64) -> Self {
        let contract = self.contract.clone();
        self.item(json!({
            "label": label,
            "contract": contract,
            "type": type_id,
            "slot": slot.to_string(),
            "offset": offset,
        }))
    }

    /// Add a variable without slot or offset information
    pub fn var_without_layout(self, label: &str, type_id: &str) -> Self {
        let contract = self.contract.clone();
        self.item(json!({ "label": label, "contract": contract, "type": type_id }))
    }

    /// Add a raw storage item
    pub fn item(mut self, item: Value) -> Self {
        self.storage.push(item);
        self
    }

    /// Set an attribute on the most recently added variable
    pub fn with(mut self, key: &str, value: Value) -> Self {
        if let Some(Value::Object(last)) = self.storage.last_mut() {
            last.insert(key.to_string(), value);
        }
        self
    }

    /// Add `uint256[len] label` starting at `slot`
    pub fn gap(self, label: &str, len: u64, slot: u64) -> Self {
        let id = uint_array(len);
        self.ty(
            &id,
            json!({ "label": format!("uint256[{}]", len), "numberOfBytes": (len * 32).to_string() }),
        )
        .var(label, &id, slot, 0)
    }

    pub fn json(&self) -> Value {
        json!({ "storage": self.storage, "types": self.types })
    }

    pub fn build(&self) -> DetailedLayout {
        DetailedLayout::from_json_value(self.json()).expect("test layout should import")
    }
}

/// Type id of `uint256[len]` in storage
#[allow(dead_code)]
pub fn uint_array(len: u64) -> String {
    format!("t_array(t_uint256){}_storage", len)
}

/// Struct member descriptor
#[allow(dead_code)]
pub fn member(label: &str, type_id: &str, slot: u64, offset: u64) -> Value {
    json!({ "label": label, "type": type_id, "slot": slot.to_string(), "offset": offset })
}
