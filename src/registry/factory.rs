//! Zero-value construction of known types.
//!
//! A type is built by applying trait builders in a fixed order into one
//! target object, e.g. `TH1` = `TNamed` -> `TAttLine` -> `TAttFill` ->
//! `TAttMarker` -> histogram fields. Every builder merges its defaults with
//! the cloner's merge-into-target rules, so traits sharing a field coexist.

use std::fmt;

use serde_json::json;
use tracing::debug;

use super::attach_operations;
use crate::config::Settings;
use crate::error::GraphError;
use crate::graph::{Cloner, Object, ObjectGraph, ObjId, Value};
use crate::model::bits::DEFAULT_OBJECT_BITS;
use crate::model::{Axis, Histogram, PointSeries};

/// Title given to auto-named objects.
pub const DUMMY_TITLE: &str = "dummytitle";

/// `fBits` of a freshly created dummy graph.
const DUMMY_GRAPH_BITS: u32 = 0x0300_0408;

/// The closed set of types the factory knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    Object,
    Named,
    List,
    HashList,
    AttAxis,
    Axis,
    AttLine,
    AttFill,
    AttMarker,
    Box,
    Pave,
    AttText,
    PaveText,
    PaveStats,
    ObjString,
    /// Abstract histogram base of the given dimension (`TH1`, `TH2`, `TH3`).
    HistBase(u8),
    /// Concrete histogram, e.g. `TH2F` is `Hist(2, 'F')`.
    Hist(u8, char),
    Profile,
    Graph,
}

impl TypeName {
    /// Storage suffixes of concrete histogram types.
    const STORAGE: [char; 5] = ['I', 'F', 'D', 'S', 'C'];

    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name {
            "TObject" => Self::Object,
            "TNamed" => Self::Named,
            "TList" => Self::List,
            "THashList" => Self::HashList,
            "TAttAxis" => Self::AttAxis,
            "TAxis" => Self::Axis,
            "TAttLine" => Self::AttLine,
            "TAttFill" => Self::AttFill,
            "TAttMarker" => Self::AttMarker,
            "TBox" => Self::Box,
            "TPave" => Self::Pave,
            "TAttText" => Self::AttText,
            "TPaveText" => Self::PaveText,
            "TPaveStats" => Self::PaveStats,
            "TObjString" => Self::ObjString,
            "TProfile" => Self::Profile,
            "TGraph" => Self::Graph,
            _ => return Self::parse_histogram(name),
        };
        Some(kind)
    }

    fn parse_histogram(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("TH")?;
        let mut chars = rest.chars();
        let dimension = match chars.next()? {
            '1' => 1,
            '2' => 2,
            '3' => 3,
            _ => return None,
        };
        match (chars.next(), chars.next()) {
            (None, _) => Some(Self::HistBase(dimension)),
            (Some(storage), None) if Self::STORAGE.contains(&storage) => {
                Some(Self::Hist(dimension, storage))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("TObject"),
            Self::Named => f.write_str("TNamed"),
            Self::List => f.write_str("TList"),
            Self::HashList => f.write_str("THashList"),
            Self::AttAxis => f.write_str("TAttAxis"),
            Self::Axis => f.write_str("TAxis"),
            Self::AttLine => f.write_str("TAttLine"),
            Self::AttFill => f.write_str("TAttFill"),
            Self::AttMarker => f.write_str("TAttMarker"),
            Self::Box => f.write_str("TBox"),
            Self::Pave => f.write_str("TPave"),
            Self::AttText => f.write_str("TAttText"),
            Self::PaveText => f.write_str("TPaveText"),
            Self::PaveStats => f.write_str("TPaveStats"),
            Self::ObjString => f.write_str("TObjString"),
            Self::HistBase(dimension) => write!(f, "TH{dimension}"),
            Self::Hist(dimension, storage) => write!(f, "TH{dimension}{storage}"),
            Self::Profile => f.write_str("TProfile"),
            Self::Graph => f.write_str("TGraph"),
        }
    }
}

/// Construction context: settings and the auto-name counter.
#[derive(Debug, Default)]
pub struct Factory {
    settings: Settings,
    id_counter: usize,
}

impl Factory {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            id_counter: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Next auto-generated name, e.g. `dummy_histo_3`. One counter serves all kinds.
    pub fn next_name(&mut self, kind: &str) -> String {
        let name = format!("{}_{}_{}", self.settings.dummy_prefix, kind, self.id_counter);
        self.id_counter += 1;
        name
    }

    // =========================================================================
    // GRAPH CONSTRUCTION
    // =========================================================================

    /// Build a zero-value `type_name` object, into `target` if given.
    ///
    /// Unknown type names produce a bare typed object. Operations are
    /// attached in every case.
    pub fn construct(&mut self, graph: &mut ObjectGraph, type_name: &str, target: Option<ObjId>) -> ObjId {
        match TypeName::parse(type_name) {
            Some(kind) => self.build(graph, kind, target),
            None => {
                debug!(type_name, "No constructor for type, creating bare object");
                let id = target
                    .filter(|id| graph.get(*id).is_ok())
                    .unwrap_or_else(|| graph.alloc(Object::typed(type_name)));
                attach(graph, id);
                id
            }
        }
    }

    fn build(&mut self, graph: &mut ObjectGraph, kind: TypeName, target: Option<ObjId>) -> ObjId {
        let id = target
            .filter(|id| graph.get(*id).is_ok())
            .unwrap_or_else(|| graph.alloc(Object::typed(kind.to_string())));
        self.compose(graph, id, kind);
        attach(graph, id);
        id
    }

    fn compose(&mut self, graph: &mut ObjectGraph, id: ObjId, kind: TypeName) {
        match kind {
            TypeName::Object => merge(graph, id, json!({"fUniqueID": 0, "fBits": DEFAULT_OBJECT_BITS})),
            TypeName::Named => merge(
                graph,
                id,
                json!({"fUniqueID": 0, "fBits": DEFAULT_OBJECT_BITS, "fName": "", "fTitle": ""}),
            ),
            TypeName::List | TypeName::HashList => merge(
                graph,
                id,
                json!({"name": kind.to_string(), "arr": [], "opt": []}),
            ),
            TypeName::AttAxis => merge(
                graph,
                id,
                json!({
                    "fNdivisions": 510, "fAxisColor": 1, "fLabelColor": 1, "fLabelFont": 42,
                    "fLabelOffset": 0.005, "fLabelSize": 0.035, "fTickLength": 0.03,
                    "fTitleOffset": 1, "fTitleSize": 0.035, "fTitleColor": 1, "fTitleFont": 42
                }),
            ),
            TypeName::Axis => {
                self.compose(graph, id, TypeName::Named);
                self.compose(graph, id, TypeName::AttAxis);
                merge(
                    graph,
                    id,
                    json!({
                        "fNbins": 0, "fXmin": 0, "fXmax": 0, "fXbins": [], "fFirst": 0, "fLast": 0,
                        "fBits2": 0, "fTimeDisplay": false, "fTimeFormat": "", "fLabels": null
                    }),
                );
            }
            TypeName::AttLine => merge(graph, id, json!({"fLineColor": 1, "fLineStyle": 1, "fLineWidth": 1})),
            TypeName::AttFill => merge(graph, id, json!({"fFillColor": 0, "fFillStyle": 0})),
            TypeName::AttMarker => merge(graph, id, json!({"fMarkerColor": 1, "fMarkerStyle": 1, "fMarkerSize": 1.0})),
            TypeName::Box => {
                self.compose(graph, id, TypeName::Object);
                self.compose(graph, id, TypeName::AttLine);
                self.compose(graph, id, TypeName::AttFill);
                merge(graph, id, json!({"fX1": 0, "fY1": 0, "fX2": 1, "fY2": 1}));
            }
            TypeName::Pave => {
                self.compose(graph, id, TypeName::Box);
                merge(
                    graph,
                    id,
                    json!({
                        "fX1NDC": 0, "fY1NDC": 0, "fX2NDC": 1, "fY2NDC": 1,
                        "fBorderSize": 0, "fInit": 1, "fShadowColor": 1,
                        "fCornerRadius": 0, "fOption": "blNDC", "fName": "title"
                    }),
                );
            }
            TypeName::AttText => merge(
                graph,
                id,
                json!({"fTextAngle": 0, "fTextSize": 0, "fTextAlign": 22, "fTextColor": 1, "fTextFont": 42}),
            ),
            TypeName::PaveText => {
                self.compose(graph, id, TypeName::Pave);
                self.compose(graph, id, TypeName::AttText);
                merge(graph, id, json!({"fLabel": "", "fLongest": 27, "fMargin": 0.05}));
                self.child(graph, id, "fLines", TypeName::List);
            }
            TypeName::PaveStats => {
                self.compose(graph, id, TypeName::PaveText);
                merge(
                    graph,
                    id,
                    json!({"fOptFit": 0, "fOptStat": 0, "fFitFormat": "", "fStatFormat": "", "fParent": null}),
                );
            }
            TypeName::ObjString => {
                self.compose(graph, id, TypeName::Object);
                merge(graph, id, json!({"fString": ""}));
            }
            TypeName::HistBase(dimension) => self.compose_histogram(graph, id, dimension),
            TypeName::Hist(dimension, _) => {
                self.compose_histogram(graph, id, dimension);
                let cells = 1usize << dimension;
                self.compose_cells(graph, id, cells);
            }
            TypeName::Profile => {
                self.compose_histogram(graph, id, 1);
                merge(
                    graph,
                    id,
                    json!({
                        "fBinEntries": [0.0, 0.0], "fErrorMode": 0, "fYmin": 0, "fYmax": 0,
                        "fTsumwy": 0, "fTsumwy2": 0, "fBinSumw2": [], "fgApproximate": false
                    }),
                );
                self.compose_cells(graph, id, 2);
                if !self.settings.default_sumw2 {
                    // profiles always keep Σw·y²
                    merge(graph, id, json!({"fSumw2": [0.0, 0.0]}));
                }
            }
            TypeName::Graph => {
                self.compose(graph, id, TypeName::Named);
                self.compose(graph, id, TypeName::AttLine);
                self.compose(graph, id, TypeName::AttFill);
                self.compose(graph, id, TypeName::AttMarker);
                self.child(graph, id, "fFunctions", TypeName::List);
                let histogram = self.build(graph, TypeName::Hist(1, 'I'), None);
                let name = self.next_name("histo");
                merge(graph, histogram, json!({"fName": name, "fTitle": DUMMY_TITLE}));
                set(graph, id, "fHistogram", Value::Object(histogram));
                merge(
                    graph,
                    id,
                    json!({"fMaxSize": 0, "fMaximum": 0, "fMinimum": 0, "fNpoints": 0, "fX": [], "fY": []}),
                );
            }
        }
    }

    /// `TH1` fields, plus the moment sums of the higher dimensions.
    fn compose_histogram(&mut self, graph: &mut ObjectGraph, id: ObjId, dimension: u8) {
        self.compose(graph, id, TypeName::Named);
        self.compose(graph, id, TypeName::AttLine);
        self.compose(graph, id, TypeName::AttFill);
        self.compose(graph, id, TypeName::AttMarker);
        merge(graph, id, json!({"fNcells": 0}));
        for axis in ["fXaxis", "fYaxis", "fZaxis"] {
            self.child(graph, id, axis, TypeName::Axis);
        }
        merge(
            graph,
            id,
            json!({
                "fBarOffset": 0, "fBarWidth": 1000, "fEntries": 0.0,
                "fTsumw": 0.0, "fTsumw2": 0.0, "fTsumwx": 0.0, "fTsumwx2": 0.0,
                "fMaximum": -1111.0, "fMinimum": -1111.0, "fNormFactor": 0.0, "fContour": [],
                "fSumw2": [], "fOption": ""
            }),
        );
        self.child(graph, id, "fFunctions", TypeName::List);
        merge(
            graph,
            id,
            json!({
                "fBufferSize": 0, "fBuffer": [],
                "fBinStatErrOpt": self.settings.bin_error_option.code(),
                "fgStatOverflows": self.settings.stat_overflows
            }),
        );
        if dimension >= 2 {
            merge(
                graph,
                id,
                json!({"fScalefactor": 1.0, "fTsumwy": 0.0, "fTsumwy2": 0.0, "fTsumwxy": 0.0}),
            );
        }
        if dimension >= 3 {
            merge(
                graph,
                id,
                json!({"fTsumwz": 0.0, "fTsumwz2": 0.0, "fTsumwxz": 0.0, "fTsumwyz": 0.0}),
            );
        }
    }

    /// Zeroed cell storage for axes with no bins: one under/overflow pair each.
    fn compose_cells(&mut self, graph: &mut ObjectGraph, id: ObjId, cells: usize) {
        let zeros = vec![0.0; cells];
        merge(graph, id, json!({"fNcells": cells, "fArray": zeros.clone()}));
        if self.settings.default_sumw2 {
            merge(graph, id, json!({"fSumw2": zeros}));
        }
    }

    /// Build `kind` into the object `field` already references, or a new one.
    fn child(&mut self, graph: &mut ObjectGraph, id: ObjId, field: &str, kind: TypeName) {
        let existing = graph.field(id, field).ok().flatten().and_then(Value::as_object);
        let child = self.build(graph, kind, existing);
        set(graph, id, field, Value::Object(child));
    }

    // =========================================================================
    // SHORTCUTS
    // =========================================================================

    /// Auto-named `TH1I` object with `nbins` bins over `0..nbins`.
    pub fn create_th1(&mut self, graph: &mut ObjectGraph, nbins: Option<usize>) -> Result<ObjId, GraphError> {
        let id = self.construct(graph, "TH1I", None);
        let name = self.next_name("histo");
        graph.update(id, |h: &mut Histogram| {
            h.name = name;
            h.title = DUMMY_TITLE.to_string();
            if let Some(n) = nbins {
                h.xaxis.nbins = n;
                h.xaxis.xmin = 0.0;
                h.xaxis.xmax = n as f64;
                h.rebuild_cells();
            }
        })?;
        Ok(id)
    }

    /// Auto-named `TH2I` object.
    pub fn create_th2(
        &mut self,
        graph: &mut ObjectGraph,
        bins: Option<(usize, usize)>,
    ) -> Result<ObjId, GraphError> {
        let id = self.construct(graph, "TH2I", None);
        let name = self.next_name("histo");
        graph.update(id, |h: &mut Histogram| {
            h.name = name;
            h.title = DUMMY_TITLE.to_string();
            if let Some((nx, ny)) = bins {
                h.xaxis.nbins = nx;
                h.xaxis.xmin = 0.0;
                h.xaxis.xmax = nx as f64;
                h.yaxis.nbins = ny;
                h.yaxis.xmin = 0.0;
                h.yaxis.xmax = ny as f64;
                h.rebuild_cells();
            }
        })?;
        Ok(id)
    }

    /// Auto-named `TGraph` object with points `(i, i)` and framed ranges.
    pub fn create_graph(&mut self, graph: &mut ObjectGraph, npoints: usize) -> Result<ObjId, GraphError> {
        let id = self.construct(graph, "TGraph", None);
        let name = self.next_name("graph");
        let mut series: PointSeries = graph.view(id)?;
        series.bits = DUMMY_GRAPH_BITS;
        series.name = name;
        series.title = DUMMY_TITLE.to_string();
        if npoints > 0 {
            series.npoints = npoints;
            series.max_size = npoints;
            series.x = (0..npoints).map(|i| i as f64).collect();
            series.y = series.x.clone();
            series.adjust_ranges(None, self);
        }
        graph.store(id, &series)?;
        Ok(id)
    }

    // =========================================================================
    // TYPED SHORTCUTS
    // =========================================================================

    fn apply_settings(&self, histogram: &mut Histogram) {
        histogram.bin_error_option = self.settings.bin_error_option;
        histogram.stat_overflows = self.settings.stat_overflows;
        if self.settings.default_sumw2 {
            histogram.sumw2();
        }
    }

    /// In-memory counterpart of [`Factory::create_th1`].
    pub fn th1(&mut self, nbins: usize) -> Histogram {
        let name = self.next_name("histo");
        let mut histogram = Histogram::from_axes(
            "TH1I",
            &name,
            vec![Axis::uniform("xaxis", nbins, 0.0, nbins as f64)],
        );
        histogram.title = DUMMY_TITLE.to_string();
        self.apply_settings(&mut histogram);
        histogram
    }

    /// In-memory counterpart of [`Factory::create_th2`].
    pub fn th2(&mut self, nx: usize, ny: usize) -> Histogram {
        let name = self.next_name("histo");
        let mut histogram = Histogram::from_axes(
            "TH2I",
            &name,
            vec![
                Axis::uniform("xaxis", nx, 0.0, nx as f64),
                Axis::uniform("yaxis", ny, 0.0, ny as f64),
            ],
        );
        histogram.title = DUMMY_TITLE.to_string();
        self.apply_settings(&mut histogram);
        histogram
    }

    /// In-memory counterpart of [`Factory::create_graph`].
    pub fn series(&mut self, npoints: usize) -> PointSeries {
        let histogram = self.th1(0);
        let coords: Vec<f64> = (0..npoints).map(|i| i as f64).collect();
        let mut series = PointSeries::new(coords.clone(), coords);
        series.histogram = Some(histogram);
        series.bits = DUMMY_GRAPH_BITS;
        series.name = self.next_name("graph");
        series.title = DUMMY_TITLE.to_string();
        series.adjust_ranges(None, self);
        series
    }
}

fn merge(graph: &mut ObjectGraph, id: ObjId, fields: serde_json::Value) {
    Cloner::new().extend_json(graph, Some(Value::Object(id)), &fields);
}

fn set(graph: &mut ObjectGraph, id: ObjId, field: &str, value: Value) {
    if let Ok(object) = graph.get_mut(id) {
        object.set(field, value);
    }
}

fn attach(graph: &mut ObjectGraph, id: ObjId) {
    if let Ok(object) = graph.get_mut(id) {
        attach_operations(object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BinErrorOption;
    use crate::registry::Capabilities;

    fn number(graph: &ObjectGraph, id: ObjId, field: &str) -> f64 {
        graph.field(id, field).unwrap().unwrap().as_f64().unwrap()
    }

    #[test]
    fn test_type_name_parsing() {
        assert_eq!(TypeName::parse("TH2F"), Some(TypeName::Hist(2, 'F')));
        assert_eq!(TypeName::parse("TH1"), Some(TypeName::HistBase(1)));
        assert_eq!(TypeName::parse("TH1K"), None);
        assert_eq!(TypeName::parse("TMultiGraph"), None);
        assert_eq!(TypeName::Hist(3, 'D').to_string(), "TH3D");
    }

    #[test]
    fn test_axis_composes_traits() {
        let mut graph = ObjectGraph::new();
        let mut factory = Factory::default();
        let id = factory.construct(&mut graph, "TAxis", None);
        let axis = graph.get(id).unwrap();
        assert!(axis.capabilities().contains(Capabilities::AXIS | Capabilities::BITS));
        assert_eq!(number(&graph, id, "fNdivisions"), 510.0);
        assert_eq!(number(&graph, id, "fBits"), f64::from(DEFAULT_OBJECT_BITS));
        assert_eq!(graph.field(id, "fName").unwrap(), Some(&Value::from("")));
        assert_eq!(graph.field(id, "fLabels").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_pave_name_overrides_named_default() {
        let mut graph = ObjectGraph::new();
        let id = Factory::default().construct(&mut graph, "TPaveStats", None);
        assert_eq!(graph.field(id, "fName").unwrap(), Some(&Value::from("title")));
        assert!(graph.get(id).unwrap().capabilities().contains(Capabilities::PAVE_TEXT));
        graph.pave_add_text(id, "Entries = 3").unwrap();
        let lines = graph.field(id, "fLines").unwrap().unwrap().as_object().unwrap();
        assert_eq!(graph.list_len(lines).unwrap(), 1);
    }

    #[test]
    fn test_histogram_cells_match_axes() {
        let mut graph = ObjectGraph::new();
        let id = Factory::default().construct(&mut graph, "TH2F", None);
        let histogram: Histogram = graph.view(id).unwrap();
        assert_eq!(histogram.dimension(), 2);
        assert_eq!(histogram.array.len(), histogram.expected_cells());
        assert_eq!(histogram.minimum, -1111.0);
        assert_eq!(histogram.tsumwy, Some(0.0));
    }

    #[test]
    fn test_settings_are_applied() {
        let settings = Settings {
            default_sumw2: true,
            bin_error_option: BinErrorOption::Poisson,
            ..Settings::default()
        };
        let mut graph = ObjectGraph::new();
        let id = Factory::new(settings).construct(&mut graph, "TH1D", None);
        let histogram: Histogram = graph.view(id).unwrap();
        assert_eq!(histogram.sumw2.len(), 2);
        assert_eq!(histogram.bin_error_option, BinErrorOption::Poisson);
    }

    #[test]
    fn test_unknown_type_is_bare() {
        let mut graph = ObjectGraph::new();
        let id = Factory::default().construct(&mut graph, "TMysteryObject", None);
        let object = graph.get(id).unwrap();
        assert_eq!(object.type_name(), Some("TMysteryObject"));
        assert!(object.fields().is_empty());
        assert!(object.capabilities().is_empty());
    }

    #[test]
    fn test_construct_into_target_keeps_fields() {
        let mut graph = ObjectGraph::new();
        let target = graph.alloc(Object::typed("TNamed"));
        graph.set_field(target, "fName", "keep").unwrap();
        graph.set_field(target, "extra", 5i64).unwrap();
        let id = Factory::default().construct(&mut graph, "TNamed", Some(target));
        assert_eq!(id, target);
        // defaults overwrite scalars, unrelated fields survive
        assert_eq!(graph.field(id, "fName").unwrap(), Some(&Value::from("")));
        assert_eq!(graph.field(id, "extra").unwrap(), Some(&Value::from(5i64)));
    }

    #[test]
    fn test_auto_names_share_one_counter() {
        let mut graph = ObjectGraph::new();
        let mut factory = Factory::default();
        let h = factory.create_th1(&mut graph, Some(4)).unwrap();
        let g = factory.create_graph(&mut graph, 3).unwrap();

        assert_eq!(graph.field(h, "fName").unwrap(), Some(&Value::from("dummy_histo_0")));
        assert_eq!(graph.field(g, "fName").unwrap(), Some(&Value::from("dummy_graph_2")));

        let histogram: Histogram = graph.view(h).unwrap();
        assert_eq!(histogram.array.len(), 6);
        assert_eq!(histogram.xaxis.xmax, 4.0);
    }

    #[test]
    fn test_create_graph_frames_points() {
        let mut graph = ObjectGraph::new();
        let mut factory = Factory::default();
        let id = factory.create_graph(&mut graph, 3).unwrap();
        let series: PointSeries = graph.view(id).unwrap();
        assert_eq!(series.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(series.bits, DUMMY_GRAPH_BITS);
        let frame = series.histogram.unwrap();
        assert_eq!(frame.name, "dummy_histo_0");
        assert_eq!((frame.xaxis.xmin, frame.xaxis.xmax), (0.0, 2.0));
        assert_eq!((frame.yaxis.xmin, frame.yaxis.xmax), (0.0, 2.0));
    }

    #[test]
    fn test_typed_series_shortcut() {
        let mut factory = Factory::default();
        let series = factory.series(2);
        assert_eq!(series.name, "dummy_graph_1");
        assert_eq!(series.compute_range().xmax, 1.0);
    }
}
