//! Graph decoder - turns a reference-compressed JSON tree into a linked graph.
//!
//! Every keyed mapping is entered into a first-appearance table *before* its
//! children are visited. A string of the form `"$ref:N"` anywhere in the tree
//! is replaced by a handle to `table[N]`. Because the slot exists before the
//! children are rewritten, a child pointing back at its own ancestor resolves
//! to the (still filling) ancestor slot, which is how cycles are recovered.
//!
//! Arrays are walked element-wise and never enter the table.

use tracing::debug;

use super::{Object, ObjectGraph, ObjId, Value, TYPENAME_FIELD};
use crate::error::GraphError;
use crate::registry;

/// Prefix of a back-reference marker.
pub const REF_PREFIX: &str = "$ref:";

/// Result of decoding one payload.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// Arena holding every mapping of the payload.
    pub graph: ObjectGraph,
    /// Rewritten root value (usually an object handle).
    pub root: Value,
}

impl Decoded {
    /// Root object handle, if the payload root is a mapping.
    pub fn root_id(&self) -> Option<ObjId> {
        self.root.as_object()
    }
}

/// Decode a parsed tree.
///
/// Unresolvable markers (index out of range) stay in place as plain strings.
pub fn decode(tree: &serde_json::Value) -> Decoded {
    let mut decoder = Decoder::default();
    let root = decoder.visit(tree);
    debug!(
        objects = decoder.graph.len(),
        resolved = decoder.resolved,
        unresolved = decoder.unresolved,
        "decoded payload"
    );
    Decoded {
        graph: decoder.graph,
        root,
    }
}

/// Parse JSON text and decode it. Empty text yields `None`.
pub fn parse(text: &str) -> Result<Option<Decoded>, GraphError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let tree: serde_json::Value =
        serde_json::from_str(text).map_err(|e| GraphError::MalformedPayload(e.to_string()))?;
    Ok(Some(decode(&tree)))
}

/// Index carried by a `"$ref:N"` marker.
pub(crate) fn parse_ref(s: &str) -> Option<usize> {
    let digits = s.strip_prefix(REF_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Default)]
struct Decoder {
    graph: ObjectGraph,
    // first-appearance order of mappings; scoped to one decode call
    table: Vec<ObjId>,
    resolved: usize,
    unresolved: usize,
}

impl Decoder {
    fn visit(&mut self, node: &serde_json::Value) -> Value {
        match node {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.clone()),
            serde_json::Value::String(s) => self.resolve(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.visit(item)).collect())
            }
            serde_json::Value::Object(map) => {
                let type_name = map
                    .get(TYPENAME_FIELD)
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let typed = type_name.is_some();
                let id = self.graph.alloc(Object::new(type_name));
                self.table.push(id);

                for (key, field) in map {
                    if typed && key == TYPENAME_FIELD {
                        continue;
                    }
                    let value = self.visit(field);
                    self.graph.objects[id.index()].set(key.clone(), value);
                }

                registry::attach_operations(&mut self.graph.objects[id.index()]);
                Value::Object(id)
            }
        }
    }

    fn resolve(&mut self, s: &str) -> Value {
        match parse_ref(s) {
            Some(index) if index < self.table.len() => {
                self.resolved += 1;
                Value::Object(self.table[index])
            }
            Some(_) => {
                self.unresolved += 1;
                Value::String(s.to_string())
            }
            None => Value::String(s.to_string()),
        }
    }
}
