//! Graph-level operations for tags whose state is made of references:
//! bit fields, lists, text paves and function parameters.

use super::Capabilities;
use crate::error::GraphError;
use crate::graph::{Object, ObjectGraph, ObjId, Value};

/// Only the low 24 bits of `fBits` are user-toggleable.
pub const USER_BITS_MASK: u32 = 0x00ff_ffff;

impl ObjectGraph {
    // =========================================================================
    // BITS
    // =========================================================================

    fn bits(&self, id: ObjId) -> Result<u32, GraphError> {
        let object = self.require(id, Capabilities::BITS)?;
        object
            .get("fBits")
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .map(|v| v as u32)
            .ok_or_else(|| GraphError::FieldShape {
                id,
                field: "fBits".to_string(),
                expected: "a number",
            })
    }

    /// True if any bit of `mask` is set in `fBits`.
    pub fn test_bit(&self, id: ObjId, mask: u32) -> Result<bool, GraphError> {
        Ok(self.bits(id)? & mask != 0)
    }

    /// Toggle the bits of `mask` (restricted to the user bits).
    pub fn invert_bit(&mut self, id: ObjId, mask: u32) -> Result<(), GraphError> {
        let bits = self.bits(id)? ^ (mask & USER_BITS_MASK);
        self.set_field(id, "fBits", bits)
    }

    // =========================================================================
    // LISTS
    // =========================================================================

    fn with_list<R>(
        &mut self,
        id: ObjId,
        f: impl FnOnce(&mut Vec<Value>, &mut Vec<Value>) -> R,
    ) -> Result<R, GraphError> {
        self.require(id, Capabilities::LIST)?;
        let object = self.get_mut(id)?;
        let mut arr = take_array(object, "arr");
        let mut opt = take_array(object, "opt");
        let result = f(&mut arr, &mut opt);
        object.set("arr", Value::Array(arr));
        object.set("opt", Value::Array(opt));
        Ok(result)
    }

    /// Remove all entries.
    pub fn list_clear(&mut self, id: ObjId) -> Result<(), GraphError> {
        self.with_list(id, |arr, opt| {
            arr.clear();
            opt.clear();
        })
    }

    /// Append an entry; the option defaults to the empty string.
    pub fn list_add(&mut self, id: ObjId, item: Value, opt: Option<&str>) -> Result<(), GraphError> {
        self.with_list(id, |arr, opts| {
            arr.push(item);
            opts.push(Value::from(opt.unwrap_or("")));
        })
    }

    /// Prepend an entry.
    pub fn list_add_first(
        &mut self,
        id: ObjId,
        item: Value,
        opt: Option<&str>,
    ) -> Result<(), GraphError> {
        self.with_list(id, |arr, opts| {
            arr.insert(0, item);
            opts.insert(0, Value::from(opt.unwrap_or("")));
        })
    }

    /// Remove the entry at `index`; out-of-range indices are ignored.
    pub fn list_remove_at(&mut self, id: ObjId, index: usize) -> Result<Option<Value>, GraphError> {
        self.with_list(id, |arr, opts| {
            if index >= arr.len() {
                return None;
            }
            if index < opts.len() {
                opts.remove(index);
            }
            Some(arr.remove(index))
        })
    }

    /// Entries paired with their options.
    pub fn list_entries(&self, id: ObjId) -> Result<Vec<(Value, String)>, GraphError> {
        let object = self.require(id, Capabilities::LIST)?;
        let arr = object.get("arr").and_then(Value::as_array);
        let opt = object.get("opt").and_then(Value::as_array);
        Ok(arr
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let option = opt
                            .and_then(|o| o.get(i))
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string();
                        (item.clone(), option)
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn list_len(&self, id: ObjId) -> Result<usize, GraphError> {
        let object = self.require(id, Capabilities::LIST)?;
        Ok(object.get("arr").and_then(Value::as_array).map_or(0, Vec::len))
    }

    // =========================================================================
    // TEXT PAVES
    // =========================================================================

    fn pave_lines(&self, id: ObjId) -> Result<ObjId, GraphError> {
        let object = self.require(id, Capabilities::PAVE_TEXT)?;
        object
            .get("fLines")
            .and_then(Value::as_object)
            .ok_or_else(|| GraphError::FieldShape {
                id,
                field: "fLines".to_string(),
                expected: "a list object",
            })
    }

    /// Append a text line `{fTitle: txt, fTextColor: 1}`.
    pub fn pave_add_text(&mut self, id: ObjId, txt: &str) -> Result<ObjId, GraphError> {
        let lines = self.pave_lines(id)?;
        let mut line = Object::new(None);
        line.set("fTitle", txt);
        line.set("fTextColor", 1i64);
        let line = self.alloc(line);
        self.list_add(lines, Value::Object(line), None)?;
        Ok(line)
    }

    /// Remove all text lines.
    pub fn pave_clear(&mut self, id: ObjId) -> Result<(), GraphError> {
        let lines = self.pave_lines(id)?;
        self.list_clear(lines)
    }

    // =========================================================================
    // FUNCTIONS
    // =========================================================================

    fn indexed(&self, holder: Option<&Value>, field: &str, n: usize) -> Option<Value> {
        let holder = self.get(holder?.as_object()?).ok()?;
        holder.get(field)?.as_array()?.get(n).cloned()
    }

    /// Name of parameter `n`, falling back to `Par<n>`.
    pub fn par_name(&self, id: ObjId, n: usize) -> Result<String, GraphError> {
        let object = self.require(id, Capabilities::FUNCTION)?;

        let from_formula = self
            .indexed(object.get("fFormula"), "fParams", n)
            .and_then(|p| p.as_object())
            .and_then(|p| self.get(p).ok())
            .and_then(|p| p.get("first"))
            .and_then(|v| v.as_str().map(str::to_string));
        if let Some(name) = from_formula {
            return Ok(name);
        }

        let from_names = object
            .get("fNames")
            .and_then(Value::as_array)
            .and_then(|names| names.get(n))
            .and_then(|v| v.as_str().map(str::to_string));
        Ok(from_names.unwrap_or_else(|| format!("Par{n}")))
    }

    /// Value of parameter `n`, if stored.
    pub fn par_value(&self, id: ObjId, n: usize) -> Result<Option<f64>, GraphError> {
        let object = self.require(id, Capabilities::FUNCTION)?;

        if let Some(v) = self.indexed(object.get("fFormula"), "fClingParameters", n) {
            return Ok(v.as_f64());
        }
        Ok(object
            .get("fParams")
            .and_then(Value::as_array)
            .and_then(|params| params.get(n))
            .and_then(Value::as_f64))
    }
}

fn take_array(object: &mut Object, name: &str) -> Vec<Value> {
    match object.get_mut(name) {
        Some(Value::Array(items)) => std::mem::take(items),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::decode;
    use serde_json::json;

    fn list_graph() -> (ObjectGraph, ObjId) {
        let decoded = decode(&json!({"_typename": "TList", "name": "TList", "arr": [], "opt": []}));
        let root = decoded.root_id().unwrap();
        (decoded.graph, root)
    }

    #[test]
    fn test_list_add_and_remove() {
        let (mut graph, list) = list_graph();
        graph.list_add(list, Value::from("a"), None).unwrap();
        graph.list_add(list, Value::from("b"), Some("same")).unwrap();
        graph.list_add_first(list, Value::from("z"), Some("first")).unwrap();
        assert_eq!(graph.list_len(list).unwrap(), 3);

        let entries = graph.list_entries(list).unwrap();
        assert_eq!(entries[0], (Value::from("z"), "first".to_string()));
        assert_eq!(entries[2], (Value::from("b"), "same".to_string()));

        assert_eq!(graph.list_remove_at(list, 0).unwrap(), Some(Value::from("z")));
        assert_eq!(graph.list_remove_at(list, 10).unwrap(), None);
        graph.list_clear(list).unwrap();
        assert_eq!(graph.list_len(list).unwrap(), 0);
    }

    #[test]
    fn test_list_allows_duplicates() {
        let (mut graph, list) = list_graph();
        graph.list_add(list, Value::from(1i64), None).unwrap();
        graph.list_add(list, Value::from(1i64), None).unwrap();
        assert_eq!(graph.list_len(list).unwrap(), 2);
    }

    #[test]
    fn test_bits() {
        let decoded = decode(&json!({"_typename": "TObject", "fBits": 8}));
        let mut graph = decoded.graph;
        let id = decoded.root.as_object().unwrap();
        assert!(graph.test_bit(id, 8).unwrap());
        graph.invert_bit(id, 8 | 0x0100_0000).unwrap();
        assert!(!graph.test_bit(id, 8).unwrap());
        assert_eq!(graph.field(id, "fBits").unwrap(), Some(&Value::from(0u32)));
    }

    #[test]
    fn test_bits_require_field() {
        let decoded = decode(&json!({"_typename": "TObject"}));
        let id = decoded.root.as_object().unwrap();
        assert!(decoded.graph.test_bit(id, 1).is_err());
    }

    #[test]
    fn test_function_parameters() {
        let decoded = decode(&json!({
            "_typename": "TF1",
            "fNames": ["mean"],
            "fParams": [1.5, 2.5]
        }));
        let id = decoded.root.as_object().unwrap();
        assert_eq!(decoded.graph.par_name(id, 0).unwrap(), "mean");
        assert_eq!(decoded.graph.par_name(id, 1).unwrap(), "Par1");
        assert_eq!(decoded.graph.par_value(id, 1).unwrap(), Some(2.5));
        assert_eq!(decoded.graph.par_value(id, 5).unwrap(), None);
    }

    #[test]
    fn test_function_parameters_from_formula() {
        let decoded = decode(&json!({
            "_typename": "TF1",
            "fFormula": {
                "fParams": [{"first": "Constant", "second": 0}],
                "fClingParameters": [42.0]
            }
        }));
        let id = decoded.root.as_object().unwrap();
        assert_eq!(decoded.graph.par_name(id, 0).unwrap(), "Constant");
        assert_eq!(decoded.graph.par_value(id, 0).unwrap(), Some(42.0));
    }
}
