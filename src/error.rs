//! Error types for graph access and histogram merges.

use crate::graph::ObjId;
use crate::registry::Capabilities;
use thiserror::Error;

/// Errors raised while reading or writing the object graph.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// Payload text is not valid JSON.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// An object id does not belong to this graph.
    #[error("Unknown object: {0} (graph holds {1} objects)")]
    UnknownObject(ObjId, usize),

    /// The object lacks the capability required by the requested view.
    #[error("Object {id} ({type_name}) lacks capability {required:?}")]
    MissingCapability {
        /// Object that was asked for the view.
        id: ObjId,
        /// Its type name, or `<untyped>`.
        type_name: String,
        /// Capability the view needs.
        required: Capabilities,
    },

    /// A named field is absent or has the wrong shape.
    #[error("Object {id}: field '{field}' is missing or not {expected}")]
    FieldShape {
        /// Object holding the field.
        id: ObjId,
        /// Field name.
        field: String,
        /// Expected shape, e.g. "an array".
        expected: &'static str,
    },

    /// Typed view could not be built from the object's fields.
    #[error("Object {id}: cannot read as {target}: {reason}")]
    View {
        /// Object that was read.
        id: ObjId,
        /// Name of the typed model.
        target: &'static str,
        /// Deserializer message.
        reason: String,
    },

    /// Typed model could not be serialized for write-back.
    #[error("Object {id}: cannot store {target}: {reason}")]
    Store {
        /// Object that was written.
        id: ObjId,
        /// Name of the typed model.
        target: &'static str,
        /// Serializer message.
        reason: String,
    },

    /// A histogram operation on graph objects failed.
    #[error(transparent)]
    Histogram(#[from] HistogramError),
}

impl GraphError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::UnknownObject(..) => "UNKNOWN_OBJECT",
            Self::MissingCapability { .. } => "MISSING_CAPABILITY",
            Self::FieldShape { .. } => "FIELD_SHAPE",
            Self::View { .. } => "VIEW_FAILED",
            Self::Store { .. } => "STORE_FAILED",
            Self::Histogram(err) => err.code(),
        }
    }
}

/// Errors raised by histogram merges.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistogramError {
    /// `add` was called without a second operand.
    #[error("Attempt to add a non-existing histogram")]
    MissingOperand,

    /// Operands disagree on cell layout.
    #[error("Incompatible operands: {this_cells} cells vs {other_cells} cells")]
    IncompatibleOperand {
        /// Cell count of the receiving histogram.
        this_cells: usize,
        /// Cell count of the added histogram.
        other_cells: usize,
    },
}

impl HistogramError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingOperand => "MISSING_OPERAND",
            Self::IncompatibleOperand { .. } => "INCOMPATIBLE_OPERAND",
        }
    }
}
