//! Dot-path reads and writes on a nested state tree.
//!
//! `user.profile.name` addresses nested objects; missing intermediate objects are
//! created on write. A key ending in `[]` appends to the array at the path instead
//! of overwriting it.

use serde_json::{Map, Value};

const APPEND_SUFFIX: &str = "[]";

/// A parsed state key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateKey<'a> {
    pub segments: Vec<&'a str>,
    pub append: bool,
}

impl<'a> StateKey<'a> {
    pub fn parse(key: &'a str) -> Self {
        let (path, append) = match key.strip_suffix(APPEND_SUFFIX) {
            Some(path) => (path, true),
            None => (key, false),
        };
        StateKey {
            segments: path.split('.').collect(),
            append,
        }
    }
}

/// Read the value at a dot path.
///
/// Returns `None` when any intermediate segment is not an object.
pub fn get_path<'v>(root: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    let parsed = StateKey::parse(key);
    let (last, parents) = parsed.segments.split_last()?;

    let mut current = root;
    for segment in parents {
        current = match current.get(*segment)? {
            Value::Object(map) => map,
            _ => return None,
        };
    }
    current.get(*last)
}

/// Write a value at a dot path.
///
/// Intermediate segments holding a non-object are replaced by a fresh object. With
/// append semantics, an existing array is extended and anything else is replaced by
/// a one-element array.
pub fn set_path(root: &mut Map<String, Value>, key: &str, value: Value) {
    let parsed = StateKey::parse(key);
    let Some((last, parents)) = parsed.segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(map) = slot else {
            return;
        };
        current = map;
    }

    if parsed.append {
        match current.get_mut(*last) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                current.insert(last.to_string(), Value::Array(vec![value]));
            }
        }
    } else {
        current.insert(last.to_string(), value);
    }
}
