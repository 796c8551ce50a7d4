// Deep merge of frame fragments. Always builds a new map; inputs are never mutated.

use serde_json::{Map, Value};

/// Merge `overlay` onto `base`. Nested maps merge key by key; any other overlay value
/// (including lists) replaces the base value outright.
pub fn deep_merge(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let combined = match (merged.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                Value::Object(deep_merge(existing, incoming))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

/// Merge a chain of fragments, lowest precedence first.
pub fn merge_all<'a, I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    layers
        .into_iter()
        .fold(Map::new(), |acc, layer| deep_merge(&acc, layer))
}

/// Element-wise merge of two lists of maps: position `i` of the result is
/// `base[i]` deep-merged with `overlay[i]`. The longer list supplies the tail.
/// Non-map elements in the overlay replace the base element.
pub fn merge_lists_by_index(base: &[Value], overlay: &[Value]) -> Vec<Value> {
    let len = base.len().max(overlay.len());
    (0..len)
        .map(|i| match (base.get(i), overlay.get(i)) {
            (Some(Value::Object(b)), Some(Value::Object(o))) => Value::Object(deep_merge(b, o)),
            (_, Some(o)) => o.clone(),
            (Some(b), None) => b.clone(),
            (None, None) => Value::Null,
        })
        .collect()
}
