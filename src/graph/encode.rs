//! Reference encoder - the inverse of the decoder.
//!
//! Objects are written in full the first time they are reached and as
//! `"$ref:N"` afterwards, with `N` counted in the same depth-first,
//! field-order traversal the decoder uses to build its table.

use std::collections::HashMap;

use super::{ObjectGraph, ObjId, Value, REF_PREFIX, TYPENAME_FIELD};

/// Encode the graph reachable from `root` into a reference-compressed tree.
pub fn encode(graph: &ObjectGraph, root: &Value) -> serde_json::Value {
    let mut encoder = Encoder {
        graph,
        seen: HashMap::new(),
    };
    encoder.emit(root)
}

struct Encoder<'g> {
    graph: &'g ObjectGraph,
    seen: HashMap<ObjId, usize>,
}

impl Encoder<'_> {
    fn emit(&mut self, value: &Value) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(|v| self.emit(v)).collect())
            }
            Value::Object(id) => {
                if let Some(index) = self.seen.get(id) {
                    return serde_json::Value::String(format!("{REF_PREFIX}{index}"));
                }
                let Ok(object) = self.graph.get(*id) else {
                    return serde_json::Value::Null;
                };
                let index = self.seen.len();
                self.seen.insert(*id, index);

                let mut map = serde_json::Map::new();
                if let Some(name) = object.type_name() {
                    map.insert(TYPENAME_FIELD.to_string(), name.into());
                }
                for (key, field) in object.fields() {
                    let encoded = self.emit(field);
                    map.insert(key.clone(), encoded);
                }
                serde_json::Value::Object(map)
            }
        }
    }
}
