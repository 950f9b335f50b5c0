use super::{Map, Value};
use std::collections::btree_map;

/// merge folds `src` into `dst` in place. Object slots present in both
/// recurse; every other collision is replaced by the source value, arrays
/// included. Slots absent from `src` are untouched. An existing slot keeps
/// the spelling it was first created with.
pub fn merge(dst: &mut Map, src: Map) {
    for (folded, src_entry) in src.entries {
        match dst.entries.entry(folded) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(src_entry);
            }
            btree_map::Entry::Occupied(mut slot) => {
                match (&mut slot.get_mut().value, src_entry.value) {
                    (Value::Object(dst_map), Value::Object(src_map)) => merge(dst_map, src_map),
                    (dst_value, src_value) => *dst_value = src_value,
                }
            }
        }
    }
}
