//! Typed views over graph objects.

use serde::{de::DeserializeOwned, Serialize};

use crate::registry::Capabilities;

/// A model that can be read from, and written back into, a graph object.
///
/// Field names follow the wire format (`fXaxis`, `fArray`, ...). Reading
/// goes through [`ObjectGraph::view`](super::ObjectGraph::view), writing
/// through [`ObjectGraph::store`](super::ObjectGraph::store).
pub trait TypedView: Serialize + DeserializeOwned {
    /// Model name used in error messages.
    const NAME: &'static str;

    /// Capability the object must carry to be viewed as this model.
    const REQUIRED: Capabilities;
}
