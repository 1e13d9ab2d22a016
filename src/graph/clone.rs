//! Structural cloner - deep copies that keep aliasing and survive cycles.
//!
//! The cloner remembers every (source, clone) pair it has produced. The pair
//! is recorded *before* the clone is populated, so a field that leads back to
//! an object still being copied picks up the pending clone instead of
//! recursing again. Two paths to one source object end at one clone.
//!
//! A target may be supplied: if it is a mapping (or array) it is populated in
//! place rather than replaced, which is what trait composition relies on.

use std::collections::HashMap;

use super::{Object, ObjectGraph, ObjId, Value, TYPENAME_FIELD};
use crate::registry;

/// Stateful deep-copy helper. One instance per logical copy operation.
#[derive(Debug, Default)]
pub struct Cloner {
    clones: HashMap<ObjId, ObjId>,
}

impl Cloner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone produced so far for a source object.
    pub fn clone_of(&self, source: ObjId) -> Option<ObjId> {
        self.clones.get(&source).copied()
    }

    /// Copy `value` (living in `src`) into `dst`, merging into `target`.
    ///
    /// - scalars are copied by value and replace the target,
    /// - arrays append their cloned elements to a target array, or start a new one,
    /// - mappings populate a target object field by field, or a fresh slot.
    pub fn extend(
        &mut self,
        dst: &mut ObjectGraph,
        target: Option<Value>,
        src: &ObjectGraph,
        value: &Value,
    ) -> Value {
        match value {
            Value::Array(items) => {
                let mut out = match target {
                    Some(Value::Array(existing)) => existing,
                    _ => Vec::with_capacity(items.len()),
                };
                for item in items {
                    let cloned = self.extend(dst, None, src, item);
                    out.push(cloned);
                }
                Value::Array(out)
            }
            Value::Object(source) => {
                if let Some(clone) = self.clone_of(*source) {
                    return Value::Object(clone);
                }
                let Ok(source_object) = src.get(*source) else {
                    return Value::Null;
                };
                let into = match target.and_then(|t| t.as_object()) {
                    Some(existing) if dst.get(existing).is_ok() => existing,
                    _ => dst.alloc(Object::new(source_object.type_name.clone())),
                };
                self.clones.insert(*source, into);

                if dst.objects[into.index()].type_name.is_none() {
                    dst.objects[into.index()].type_name = source_object.type_name.clone();
                }
                for (key, field) in source_object.fields() {
                    let current = dst.objects[into.index()].get(key).cloned();
                    let merged = self.extend(dst, current, src, field);
                    dst.objects[into.index()].set(key.clone(), merged);
                }
                registry::attach_operations(&mut dst.objects[into.index()]);
                Value::Object(into)
            }
            scalar => scalar.clone(),
        }
    }

    /// Merge a plain JSON tree into `target`, with the same rules as [`Cloner::extend`].
    pub fn extend_json(
        &mut self,
        dst: &mut ObjectGraph,
        target: Option<Value>,
        tree: &serde_json::Value,
    ) -> Value {
        match tree {
            serde_json::Value::Array(items) => {
                let mut out = match target {
                    Some(Value::Array(existing)) => existing,
                    _ => Vec::with_capacity(items.len()),
                };
                for item in items {
                    let cloned = self.extend_json(dst, None, item);
                    out.push(cloned);
                }
                Value::Array(out)
            }
            serde_json::Value::Object(map) => {
                let type_name = map
                    .get(TYPENAME_FIELD)
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let into = match target.and_then(|t| t.as_object()) {
                    Some(existing) if dst.get(existing).is_ok() => existing,
                    _ => dst.alloc(Object::new(type_name.clone())),
                };
                if dst.objects[into.index()].type_name.is_none() {
                    dst.objects[into.index()].type_name = type_name;
                }
                for (key, field) in map {
                    if key == TYPENAME_FIELD {
                        continue;
                    }
                    let current = dst.objects[into.index()].get(key).cloned();
                    let merged = self.extend_json(dst, current, field);
                    dst.objects[into.index()].set(key.clone(), merged);
                }
                registry::attach_operations(&mut dst.objects[into.index()]);
                Value::Object(into)
            }
            other => dst.insert_tree(other),
        }
    }
}

impl ObjectGraph {
    /// Independent copy of everything reachable from `id`, in a new graph.
    pub fn deep_clone(&self, id: ObjId) -> (ObjectGraph, ObjId) {
        let mut out = ObjectGraph::new();
        let root = Cloner::new().extend(&mut out, None, self, &Value::Object(id));
        // the source id was checked by the caller's graph; fall back to an empty slot
        let root = root
            .as_object()
            .unwrap_or_else(|| out.alloc(Object::new(None)));
        (out, root)
    }

    /// Copy everything reachable from `id` into fresh slots of this graph.
    ///
    /// Only the reachable part is copied out first, never the whole arena.
    pub fn clone_object(&mut self, id: ObjId) -> Value {
        if self.get(id).is_err() {
            return Value::Null;
        }
        let (reachable, root) = self.deep_clone(id);
        Cloner::new().extend(self, None, &reachable, &Value::Object(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diamond() -> (ObjectGraph, ObjId, ObjId) {
        // root -> a -> c, root -> b -> c
        let mut graph = ObjectGraph::new();
        let root = graph.alloc(Object::new(None));
        let a = graph.alloc(Object::new(None));
        let b = graph.alloc(Object::new(None));
        let c = graph.alloc(Object::typed("TObjString"));
        graph.set_field(c, "fString", "c").unwrap();
        graph.set_field(a, "ref", c).unwrap();
        graph.set_field(b, "ref", c).unwrap();
        graph.set_field(root, "a", a).unwrap();
        graph.set_field(root, "b", b).unwrap();
        (graph, root, c)
    }

    fn follow(graph: &ObjectGraph, id: ObjId, path: &[&str]) -> ObjId {
        path.iter().fold(id, |cur, name| {
            graph.field(cur, name).unwrap().unwrap().as_object().unwrap()
        })
    }

    #[test]
    fn test_deep_clone_preserves_aliasing() {
        let (graph, root, _) = diamond();
        let (copy, copy_root) = graph.deep_clone(root);
        let via_a = follow(&copy, copy_root, &["a", "ref"]);
        let via_b = follow(&copy, copy_root, &["b", "ref"]);
        assert_eq!(via_a, via_b);
        assert_eq!(copy.len(), 4);
    }

    #[test]
    fn test_clone_is_independent() {
        let (mut graph, root, c) = diamond();
        let copy_root = graph.clone_object(root).as_object().unwrap();
        let copy_c = follow(&graph, copy_root, &["a", "ref"]);
        assert_ne!(copy_c, c);

        graph.set_field(copy_c, "fString", "changed").unwrap();
        assert_eq!(graph.field(c, "fString").unwrap(), Some(&Value::from("c")));
    }

    #[test]
    fn test_clone_terminates_on_cycle() {
        let mut graph = ObjectGraph::new();
        let a = graph.alloc(Object::new(None));
        let b = graph.alloc(Object::new(None));
        graph.set_field(a, "next", b).unwrap();
        graph.set_field(b, "next", a).unwrap();

        let (copy, root) = graph.deep_clone(a);
        assert_eq!(copy.len(), 2);
        assert_eq!(follow(&copy, root, &["next", "next"]), root);
    }

    #[test]
    fn test_extend_into_existing_target() {
        let mut graph = ObjectGraph::new();
        let target = graph.alloc(Object::typed("TH1I"));
        graph.set_field(target, "fName", "kept").unwrap();
        graph
            .set_field(target, "fArray", Value::Array(vec![Value::from(1i64)]))
            .unwrap();

        let mut cloner = Cloner::new();
        let out = cloner.extend_json(
            &mut graph,
            Some(Value::Object(target)),
            &json!({"fTitle": "t", "fArray": [2]}),
        );

        assert_eq!(out, Value::Object(target));
        assert_eq!(graph.field(target, "fName").unwrap(), Some(&Value::from("kept")));
        assert_eq!(graph.field(target, "fTitle").unwrap(), Some(&Value::from("t")));
        assert_eq!(
            graph.field(target, "fArray").unwrap(),
            Some(&Value::Array(vec![Value::from(1i64), Value::from(2i64)]))
        );
    }

    #[test]
    fn test_clone_object_copies_only_reachable() {
        let mut graph = ObjectGraph::new();
        let root = graph.alloc(Object::new(None));
        let child = graph.alloc(Object::new(None));
        graph.set_field(root, "child", child).unwrap();
        for _ in 0..5 {
            graph.alloc(Object::typed("TNamed"));
        }
        let before = graph.len();

        let copy = graph.clone_object(root).as_object().unwrap();
        assert_eq!(graph.len(), before + 2);
        assert_ne!(copy, root);
        assert_eq!(graph.clone_object(ObjId::new(999)), Value::Null);
    }
}
