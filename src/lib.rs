//! rootgraph - reference-compressed object graphs and a histogram data model.
//!
//! Payloads are JSON trees in which a repeated mapping is written once and
//! then referred to by the string `"$ref:N"`, N being the mapping's position
//! in document order. Decoding restores the sharing (and any cycles) in an
//! arena [`ObjectGraph`]. Objects are tagged by type name with the
//! operations they support, and typed models ([`Histogram`], [`Profile`],
//! [`PointSeries`]) are read out of and written back into the graph.
//!
//! # Example
//!
//! ```
//! use rootgraph::{parse, Histogram};
//!
//! let payload = r#"{"_typename": "TH1D", "fXaxis": {"_typename": "TAxis",
//!     "fNbins": 2, "fXmin": 0, "fXmax": 2}, "fNcells": 4,
//!     "fArray": [0, 1, 3, 0], "fEntries": 4}"#;
//! let decoded = parse(payload).unwrap().unwrap();
//! let root = decoded.root_id().unwrap();
//! let histogram: Histogram = decoded.graph.view(root).unwrap();
//! assert_eq!(histogram.bin_content(2), 3.0);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod math;
pub mod model;
pub mod options;
pub mod registry;

pub use config::Settings;
pub use error::{GraphError, HistogramError};
pub use graph::{
    decode, encode, parse, Cloner, Decoded, ObjId, Object, ObjectGraph, TypedView, Value,
    REF_PREFIX, TYPENAME_FIELD,
};
pub use model::{
    Axis, AxisKind, BinErrorOption, ErrorMode, Histogram, Moments, PointSeries, Profile, Range,
};
pub use registry::{attach_operations, Capabilities, Factory, TypeName};
