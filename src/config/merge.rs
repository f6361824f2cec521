//! Recursive configuration merge
//!
//! Maps present on both sides are merged key by key; any other value
//! (scalar, list, null) on the incoming side replaces what was there.

use serde_json::{Map, Value};

/// Deep-merge `incoming` into `target`
pub fn merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => merge_maps(existing, incoming),
        (slot, incoming) => *slot = incoming,
    }
}

/// Deep-merge one map into another
pub fn merge_maps(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match target.get_mut(&key) {
            Some(existing) => merge(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

/// Empty configuration tree
pub fn empty_tree() -> Value {
    Value::Object(Map::new())
}

/// Sub-tree stored under `key`, if `tree` is a map and has it
pub fn subtree<'a>(tree: &'a Value, key: &str) -> Option<&'a Value> {
    tree.as_object().and_then(|map| map.get(key))
}
