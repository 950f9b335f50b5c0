use std::collections::{btree_map, BTreeMap};

/// Value is a configuration node as delivered by a provider and held by the
/// merged store. Interior nodes are [`Map`]s from case-preserved keys to
/// child nodes; leaves are scalars, byte strings, or arrays.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// An integer which is strictly less than zero.
    NegInt(i64),
    /// An integer which is greater than or equal to zero.
    PosInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(Map),
}

/// Case selects how keys and path segments are folded before comparison.
/// It's fixed when a tree is built: every key is folded once on ingress,
/// and lookups fold their probe the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Case {
    /// Keys compare under Unicode default case folding.
    #[default]
    Insensitive,
    /// Keys compare verbatim.
    Sensitive,
}

impl Case {
    pub fn fold(&self, key: &str) -> String {
        match self {
            Case::Insensitive => caseless::default_case_fold_str(key),
            Case::Sensitive => key.to_string(),
        }
    }
}

/// Map is an object node: an ordered mapping from *folded* key to the entry
/// holding the key's original spelling and its value. The first spelling
/// encountered for a slot is the one retained.
#[derive(Debug, Clone, Default)]
pub struct Map {
    pub(crate) entries: BTreeMap<String, Entry>,
}

/// Entry packs a value together with the original spelling of its key,
/// which folding would otherwise lose.
#[derive(Debug, Clone)]
pub struct Entry {
    pub spelling: String,
    pub value: Value,
}

impl Map {
    pub fn new() -> Map {
        Map::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `key`, folding it with `case` first.
    pub fn get(&self, case: Case, key: &str) -> Option<&Value> {
        self.entries.get(&case.fold(key)).map(|e| &e.value)
    }

    /// Look up an already-folded key, returning its full entry.
    pub fn get_entry(&self, folded: &str) -> Option<&Entry> {
        self.entries.get(folded)
    }

    /// Insert `value` under `key`. An existing slot keeps its original
    /// spelling; only its value is replaced.
    pub fn insert(&mut self, case: Case, key: String, value: Value) {
        match self.entries.entry(case.fold(&key)) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(Entry {
                    spelling: key,
                    value,
                });
            }
            btree_map::Entry::Occupied(mut slot) => slot.get_mut().value = value,
        }
    }

    /// Iterate entries in folded-key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Entry> {
        self.entries.iter()
    }

    /// Build a Map from a JSON object, folding keys with `case`.
    pub fn from_json(object: serde_json::Map<String, serde_json::Value>, case: Case) -> Map {
        let mut map = Map::new();
        for (key, value) in object {
            map.insert(case, key, Value::from_json(value, case));
        }
        map
    }
}

impl IntoIterator for Map {
    type Item = (String, Entry);
    type IntoIter = btree_map::IntoIter<String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Value {
    /// Build a Value from a JSON document, folding object keys with `case`.
    pub fn from_json(value: serde_json::Value, case: Case) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(n) = n.as_u64() {
                    Value::PosInt(n)
                } else if let Some(n) = n.as_i64() {
                    Value::NegInt(n)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| Value::from_json(item, case))
                    .collect(),
            ),
            serde_json::Value::Object(fields) => Value::Object(Map::from_json(fields, case)),
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

// Values are deeply ordered; equality is structural.
mod compare;
pub use compare::compare;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other) == std::cmp::Ordering::Equal
    }
}

// Object trees may be merged, with the source winning scalar conflicts.
mod merge;
pub use merge::merge;

// Dotted-path split and descent.
pub mod path;

// Leaf redaction for provenance output.
pub mod redact;

// Values serialize with original spellings; bytes as base64.
mod ser;
