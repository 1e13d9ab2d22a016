//! Arena-backed object graph.
//!
//! Decoded payloads become an [`ObjectGraph`]: every keyed mapping is an
//! [`Object`] living in an indexed slot, and fields refer to other mappings
//! through [`ObjId`] handles. Shared and cyclic structure is therefore just
//! two fields holding the same id.
//!
//! ```text
//! ObjectGraph
//! └── objects: [Object]
//!     ├── type_name        (reserved `_typename` field)
//!     ├── capabilities     (attached by the registry)
//!     └── fields: { name -> Value }
//!                            └── Value::Object(ObjId) -> another slot
//! ```
//!
//! Arrays are stored inline and are never shared; only mappings get slots.

mod clone;
mod decode;
mod encode;
mod view;

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;

use crate::error::GraphError;
use crate::registry::{self, Capabilities};

pub use clone::Cloner;
pub use decode::{decode, parse, Decoded, REF_PREFIX};
pub use encode::encode;
pub use view::TypedView;

/// Reserved field carrying an object's type name on the wire.
pub const TYPENAME_FIELD: &str = "_typename";

/// Handle of an object slot inside an [`ObjectGraph`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(usize);

impl ObjId {
    /// Wrap a raw slot index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Raw slot index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjId({})", self.0)
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A field value. Mappings are held by reference, everything else inline.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Object(ObjId),
}

impl Value {
    /// Numeric value; non-finite numbers are stored as `Null` and read as NaN.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::Null => Some(f64::NAN),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<ObjId> for Value {
    fn from(id: ObjId) -> Self {
        Value::Object(id)
    }
}

/// Ordered field map of one object.
pub type Fields = IndexMap<String, Value>;

/// One keyed mapping of the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    type_name: Option<String>,
    capabilities: Capabilities,
    fields: Fields,
}

impl Object {
    /// Create an empty object, optionally tagged with a type name.
    pub fn new(type_name: Option<String>) -> Self {
        Self {
            type_name,
            capabilities: Capabilities::empty(),
            fields: Fields::new(),
        }
    }

    pub fn typed(type_name: impl Into<String>) -> Self {
        Self::new(Some(type_name.into()))
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub(crate) fn set_capabilities(&mut self, caps: Capabilities) {
        self.capabilities = caps;
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }
}

/// Arena of objects. Released as a whole; there is no per-object teardown.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Allocate a slot. The id is stable for the graph's lifetime.
    pub fn alloc(&mut self, object: Object) -> ObjId {
        self.objects.push(object);
        ObjId(self.objects.len() - 1)
    }

    pub fn get(&self, id: ObjId) -> Result<&Object, GraphError> {
        self.objects
            .get(id.0)
            .ok_or(GraphError::UnknownObject(id, self.objects.len()))
    }

    pub fn get_mut(&mut self, id: ObjId) -> Result<&mut Object, GraphError> {
        let len = self.objects.len();
        self.objects
            .get_mut(id.0)
            .ok_or(GraphError::UnknownObject(id, len))
    }

    /// All object ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = ObjId> {
        (0..self.objects.len()).map(ObjId)
    }

    pub fn field(&self, id: ObjId, name: &str) -> Result<Option<&Value>, GraphError> {
        Ok(self.get(id)?.get(name))
    }

    pub fn set_field(
        &mut self,
        id: ObjId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        self.get_mut(id)?.set(name, value);
        Ok(())
    }

    /// Fail with [`GraphError::MissingCapability`] unless `id` carries `required`.
    pub fn require(&self, id: ObjId, required: Capabilities) -> Result<&Object, GraphError> {
        let object = self.get(id)?;
        if object.capabilities().contains(required) {
            Ok(object)
        } else {
            Err(GraphError::MissingCapability {
                id,
                type_name: object.type_name().unwrap_or("<untyped>").to_string(),
                required,
            })
        }
    }

    /// Render an object as a plain JSON tree.
    ///
    /// Shared objects are inlined at every location. A reference back to an
    /// object that is still being rendered (a cycle) becomes `null`.
    pub fn object_tree(&self, id: ObjId) -> Result<serde_json::Value, GraphError> {
        self.get(id)?;
        let mut on_path = HashSet::new();
        Ok(self.tree_of(&Value::Object(id), &mut on_path))
    }

    fn tree_of(&self, value: &Value, on_path: &mut HashSet<ObjId>) -> serde_json::Value {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(|v| self.tree_of(v, on_path)).collect())
            }
            Value::Object(id) => {
                let Some(object) = self.objects.get(id.0) else {
                    return serde_json::Value::Null;
                };
                if !on_path.insert(*id) {
                    return serde_json::Value::Null;
                }
                let mut map = serde_json::Map::new();
                if let Some(name) = object.type_name() {
                    map.insert(TYPENAME_FIELD.to_string(), name.into());
                }
                for (key, field) in object.fields() {
                    map.insert(key.clone(), self.tree_of(field, on_path));
                }
                on_path.remove(id);
                serde_json::Value::Object(map)
            }
        }
    }

    /// Insert a plain JSON tree, allocating a fresh object for every mapping.
    ///
    /// Strings are kept verbatim; no reference resolution happens here.
    pub fn insert_tree(&mut self, tree: &serde_json::Value) -> Value {
        match tree {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.clone()),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.insert_tree(item)).collect())
            }
            serde_json::Value::Object(map) => {
                let type_name = map
                    .get(TYPENAME_FIELD)
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let id = self.alloc(Object::new(type_name));
                for (key, field) in map {
                    if key == TYPENAME_FIELD {
                        continue;
                    }
                    let value = self.insert_tree(field);
                    self.objects[id.0].set(key.clone(), value);
                }
                registry::attach_operations(&mut self.objects[id.0]);
                Value::Object(id)
            }
        }
    }

    /// Write a JSON mapping into an existing object.
    ///
    /// Scalars and arrays replace the current field. A nested mapping is
    /// merged into the object the field already references, so child
    /// identity is kept; otherwise a new object is allocated.
    pub fn assign_tree(
        &mut self,
        id: ObjId,
        map: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), GraphError> {
        self.get(id)?;
        for (key, field) in map {
            if key == TYPENAME_FIELD {
                if self.objects[id.0].type_name.is_none() {
                    self.objects[id.0].type_name = field.as_str().map(str::to_string);
                }
                continue;
            }
            let existing = self.objects[id.0].get(key).and_then(Value::as_object);
            match (field, existing) {
                (serde_json::Value::Object(sub), Some(child)) => self.assign_tree(child, sub)?,
                _ => {
                    let value = self.insert_tree(field);
                    self.objects[id.0].set(key.clone(), value);
                }
            }
        }
        registry::attach_operations(&mut self.objects[id.0]);
        Ok(())
    }

    /// Read a typed model out of an object.
    pub fn view<T: TypedView>(&self, id: ObjId) -> Result<T, GraphError> {
        self.require(id, T::REQUIRED)?;
        let tree = self.object_tree(id)?;
        serde_json::from_value(tree).map_err(|e| GraphError::View {
            id,
            target: T::NAME,
            reason: e.to_string(),
        })
    }

    /// Write a typed model back into the object it was read from.
    pub fn store<T: TypedView>(&mut self, id: ObjId, model: &T) -> Result<(), GraphError> {
        self.require(id, T::REQUIRED)?;
        let tree = serde_json::to_value(model).map_err(|e| GraphError::Store {
            id,
            target: T::NAME,
            reason: e.to_string(),
        })?;
        match tree {
            serde_json::Value::Object(map) => self.assign_tree(id, &map),
            _ => Err(GraphError::Store {
                id,
                target: T::NAME,
                reason: "model did not serialize to a mapping".to_string(),
            }),
        }
    }

    /// Read, mutate and write back a typed model in one step.
    pub fn update<T, R>(&mut self, id: ObjId, f: impl FnOnce(&mut T) -> R) -> Result<R, GraphError>
    where
        T: TypedView,
    {
        let mut model: T = self.view(id)?;
        let result = f(&mut model);
        self.store(id, &model)?;
        Ok(result)
    }
}
