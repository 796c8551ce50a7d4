// Deep placeholder substitution with the `NAME#SELECTOR` list mini-language.
// One Substituter lives for exactly one resolution pass; its UNIQ cursors are pass state.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::types::ParameterSet;

/// Selector half of a `NAME#SELECTOR` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// `#3`: element at that position.
    Index(i64),
    /// `#RAND`: one element, uniformly at random.
    Random,
    /// `#PERM`: the whole list, shuffled.
    Permute,
    /// `#UNIQ`: next element of a per-pass shuffled rotation through the list.
    Unique,
}

impl Selector {
    pub fn parse(selector: &str) -> Option<Selector> {
        match selector {
            "RAND" => Some(Selector::Random),
            "PERM" => Some(Selector::Permute),
            "UNIQ" => Some(Selector::Unique),
            other => other
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|n| Selector::Index(n.round() as i64)),
        }
    }
}

/// Shuffled order for one UNIQ list and the position of the next draw.
#[derive(Debug, Clone)]
struct UniqueCursor {
    source: Vec<Value>,
    order: Vec<Value>,
    next: usize,
}

/// Replaces string leaves of nested JSON according to a replacement map.
pub struct Substituter {
    rng: StdRng,
    unique: HashMap<String, UniqueCursor>,
}

impl Substituter {
    pub fn new(rng: StdRng) -> Self {
        Substituter {
            rng,
            unique: HashMap::new(),
        }
    }

    /// Substitute every string leaf of `value`. Returns a new value.
    ///
    /// Selector references to names declared deeper inside `value` (nested `parameters`
    /// or `parameterSets`) are left for the layer that declares them.
    pub fn replace_values(
        &mut self,
        value: &Value,
        replacements: &ParameterSet,
    ) -> Result<Value, ResolveError> {
        let mut deferred = HashSet::new();
        collect_declared_names(value, &mut deferred);
        self.replace_value(value, replacements, &deferred)
    }

    /// Substitute every field of a map (keys are left alone).
    pub fn replace_in_map(
        &mut self,
        map: &Map<String, Value>,
        replacements: &ParameterSet,
    ) -> Result<Map<String, Value>, ResolveError> {
        let mut deferred = HashSet::new();
        collect_declared_names_in_map(map, &mut deferred);
        self.replace_map(map, replacements, &deferred)
    }

    fn replace_value(
        &mut self,
        value: &Value,
        replacements: &ParameterSet,
        deferred: &HashSet<String>,
    ) -> Result<Value, ResolveError> {
        match value {
            Value::String(text) => self.replace_string(text, replacements, deferred),
            Value::Array(items) => items
                .iter()
                .map(|item| self.replace_value(item, replacements, deferred))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => self
                .replace_map(map, replacements, deferred)
                .map(Value::Object),
            scalar => Ok(scalar.clone()),
        }
    }

    fn replace_map(
        &mut self,
        map: &Map<String, Value>,
        replacements: &ParameterSet,
        deferred: &HashSet<String>,
    ) -> Result<Map<String, Value>, ResolveError> {
        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            out.insert(key.clone(), self.replace_value(value, replacements, deferred)?);
        }
        Ok(out)
    }

    fn replace_string(
        &mut self,
        text: &str,
        replacements: &ParameterSet,
        deferred: &HashSet<String>,
    ) -> Result<Value, ResolveError> {
        if let Some(exact) = replacements.get(text) {
            return Ok(exact.clone());
        }

        let Some((name, selector)) = text.split_once('#') else {
            return Ok(Value::String(text.to_string()));
        };

        match replacements.get(name) {
            Some(Value::Array(items)) => {
                let parsed = Selector::parse(selector).ok_or_else(|| {
                    ResolveError::UnrecognizedSelector {
                        value: text.to_string(),
                        selector: selector.to_string(),
                    }
                })?;
                self.apply_selector(text, name, parsed, items)
            }
            Some(_) => Err(ResolveError::SelectorOnNonList {
                value: text.to_string(),
                name: name.to_string(),
            }),
            // An unknown name with a valid selector is a broken reference; anything
            // else containing '#' (colours, URL fragments) is plain text.
            None if !name.is_empty()
                && !deferred.contains(name)
                && Selector::parse(selector).is_some() =>
            {
                Err(ResolveError::UnknownSelectorTarget {
                    value: text.to_string(),
                    name: name.to_string(),
                })
            }
            None => Ok(Value::String(text.to_string())),
        }
    }

    fn apply_selector(
        &mut self,
        text: &str,
        name: &str,
        selector: Selector,
        items: &[Value],
    ) -> Result<Value, ResolveError> {
        let out_of_range = |index: i64| ResolveError::SelectorIndexOutOfRange {
            value: text.to_string(),
            index,
            len: items.len(),
        };

        match selector {
            Selector::Index(index) => usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| out_of_range(index)),
            Selector::Random => items
                .choose(&mut self.rng)
                .cloned()
                .ok_or_else(|| out_of_range(0)),
            Selector::Permute => {
                let mut shuffled = items.to_vec();
                shuffled.shuffle(&mut self.rng);
                Ok(Value::Array(shuffled))
            }
            Selector::Unique => {
                if items.is_empty() {
                    return Err(out_of_range(0));
                }
                self.next_unique(name, items)
            }
        }
    }

    fn next_unique(&mut self, name: &str, items: &[Value]) -> Result<Value, ResolveError> {
        let rng = &mut self.rng;
        let cursor = self
            .unique
            .entry(name.to_string())
            .or_insert_with(|| UniqueCursor {
                source: Vec::new(),
                order: Vec::new(),
                next: 0,
            });

        // A different list under the same name starts a fresh rotation.
        if cursor.source != items {
            let mut order = items.to_vec();
            order.shuffle(rng);
            *cursor = UniqueCursor {
                source: items.to_vec(),
                order,
                next: 0,
            };
        }

        let value = cursor.order[cursor.next].clone();
        cursor.next = (cursor.next + 1) % cursor.order.len();
        Ok(value)
    }
}

/// Names declared by `parameters` maps and `parameterSets` entries anywhere inside `value`.
fn collect_declared_names(value: &Value, names: &mut HashSet<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_declared_names(item, names)),
        Value::Object(map) => collect_declared_names_in_map(map, names),
        _ => {}
    }
}

fn collect_declared_names_in_map(map: &Map<String, Value>, names: &mut HashSet<String>) {
    for (key, value) in map {
        match (key.as_str(), value) {
            ("parameters", Value::Object(declared)) => names.extend(declared.keys().cloned()),
            ("parameterSets", Value::Array(sets)) => {
                for set in sets.iter().filter_map(Value::as_object) {
                    names.extend(set.keys().cloned());
                }
            }
            _ => {}
        }
        collect_declared_names(value, names);
    }
}
