//! Record flattening
//!
//! Collapses a nested JSON object into a single-level map with dotted keys:
//!
//! ```text
//! { "a": "1", "b": { "b1": 12, "b2": null } }
//!   -> { "a": "1", "b.b1": 12, "b.b2": null }
//! ```
//!
//! Arrays are kept as leaf values. Key order follows the input object.

use serde_json::{Map, Value};

/// A flattened record: dotted key -> primitive value, in encounter order
pub type FlatRecord = Map<String, Value>;

/// Flatten one nested record
pub fn flatten_record(record: &Map<String, Value>) -> FlatRecord {
    let mut flat = FlatRecord::new();
    flatten_into(record, &mut Vec::new(), &mut flat);
    flat
}

fn flatten_into<'a>(object: &'a Map<String, Value>, path: &mut Vec<&'a str>, out: &mut FlatRecord) {
    for (key, value) in object {
        path.push(key);
        match value {
            Value::Object(nested) => flatten_into(nested, path, out),
            leaf => {
                out.insert(path.join("."), leaf.clone());
            }
        }
        path.pop();
    }
}
