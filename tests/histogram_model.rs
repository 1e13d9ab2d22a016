//! Histogram, profile and point-series scenarios on decoded and constructed objects.

use pretty_assertions::assert_eq;
use rootgraph::model::bits::hist;
use rootgraph::model::Moments;
use rootgraph::{
    decode, BinErrorOption, Factory, Histogram, ObjectGraph, PointSeries, Profile, Range, Settings,
    Value,
};
use serde_json::json;

fn four_bins() -> Histogram {
    Histogram::new_1d("h", 4, 0.0, 4.0)
}

#[test]
fn set_content_then_read_back_with_normal_error() {
    let mut h = four_bins();
    h.set_bin_content(2, 10.0);
    assert_eq!(h.bin_content(2), 10.0);
    assert_eq!(h.bin_error(2), 10f64.sqrt());
    assert!(!h.has_sumw2());
    // default model is Normal, so the interval is symmetric
    assert_eq!(h.bin_errors(2), (10f64.sqrt(), 10f64.sqrt()));
}

#[test]
fn negative_content_downgrades_poisson_model() {
    let mut h = four_bins();
    h.bin_error_option = BinErrorOption::Poisson;
    h.set_bin_content(3, -4.0);
    let normal = h.bin_error(3);
    assert_eq!(h.bin_error_low(3), normal);
    assert_eq!(h.bin_error_option, BinErrorOption::Normal);
}

#[test]
fn self_subtraction_on_graph_resets_everything() {
    let mut graph = ObjectGraph::new();
    let mut factory = Factory::new(Settings {
        default_sumw2: true,
        ..Settings::default()
    });
    let id = factory.create_th1(&mut graph, Some(4)).unwrap();
    graph
        .update(id, |h: &mut Histogram| {
            h.set_bin_content(1, 3.0);
            h.set_bin_content(2, 5.0);
            h.sumw2[1] = 3.0;
            h.sumw2[2] = 5.0;
            h.reset_stats();
        })
        .unwrap();

    graph.add_histogram(id, Some(id), -1.0).unwrap();
    let h: Histogram = graph.view(id).unwrap();
    assert!(h.array.iter().all(|c| *c == 0.0));
    assert!(h.sumw2.iter().all(|e| *e == 0.0));
    assert_eq!(h.entries, 0.0);
    assert_eq!(h.stats().sumw(), 0.0);
}

#[test]
fn graph_level_add_reports_missing_operand() {
    let mut graph = ObjectGraph::new();
    let id = Factory::default().create_th1(&mut graph, Some(2)).unwrap();
    let before = graph.object_tree(id).unwrap();
    let err = graph.add_histogram(id, None, 1.0).unwrap_err();
    assert_eq!(err.code(), "MISSING_OPERAND");
    assert_eq!(graph.object_tree(id).unwrap(), before);
}

#[test]
fn add_keeps_axis_identity() {
    let decoded = decode(&json!({
        "_typename": "TList",
        "arr": [
            {"_typename": "TH1D", "fName": "a", "fNcells": 4, "fArray": [0, 1, 2, 0],
             "fEntries": 3, "fXaxis": {"_typename": "TAxis", "fNbins": 2, "fXmin": 0, "fXmax": 2}},
            {"_typename": "TH1D", "fName": "b", "fNcells": 4, "fArray": [0, 4, 4, 0],
             "fEntries": 8, "fXaxis": "$ref:2"}
        ],
        "opt": ["", ""]
    }));
    let mut graph = decoded.graph;
    let list = decoded.root.as_object().unwrap();
    let entries = graph.list_entries(list).unwrap();
    let a = entries[0].0.as_object().unwrap();
    let b = entries[1].0.as_object().unwrap();
    let axis = graph.field(a, "fXaxis").unwrap().and_then(Value::as_object);

    graph.add_histogram(a, Some(b), 0.5).unwrap();
    let h: Histogram = graph.view(a).unwrap();
    assert_eq!(h.array, vec![0.0, 3.0, 4.0, 0.0]);
    assert_eq!(h.entries, 7.0);
    // the axis is still shared with `b`
    assert_eq!(graph.field(a, "fXaxis").unwrap().and_then(Value::as_object), axis);
    assert_eq!(graph.field(b, "fXaxis").unwrap().and_then(Value::as_object), axis);
}

#[test]
fn non_finite_values_round_trip_as_nan() {
    let decoded = decode(&json!({
        "_typename": "TH1F", "fNcells": 3, "fArray": [0, null, 0], "fMaximum": null,
        "fXaxis": {"_typename": "TAxis", "fNbins": 1, "fXmin": 0, "fXmax": 1}
    }));
    let root = decoded.root_id().unwrap();
    let h: Histogram = decoded.graph.view(root).unwrap();
    assert!(h.bin_content(1).is_nan());
    assert!(h.maximum.is_nan());
}

#[test]
fn labelled_rebinnable_axis_keeps_only_weight_sums() {
    let mut h = Histogram::new_1d("h", 2, 0.0, 2.0);
    h.xaxis.labels = Some(json!({"_typename": "THashList", "arr": [], "opt": []}));
    h.invert_bit(hist::CAN_REBIN);
    h.entries = 5.0;
    h.tsumw = 5.0;
    h.tsumw2 = 5.0;
    h.tsumwx = 3.0;
    h.tsumwx2 = 4.0;

    let mut expected = [0.0; Moments::LEN];
    expected[0] = 5.0;
    expected[1] = 5.0;
    assert_eq!(h.stats().0, expected);
    assert_eq!(h.mean(1), 0.0);
}

#[test]
fn square_series_range_and_inside() {
    let square = PointSeries::new(vec![0.0, 0.0, 2.0, 2.0], vec![0.0, 2.0, 2.0, 0.0]);
    assert!(square.is_inside(1.0, 1.0));
    assert!(!square.is_inside(3.0, 3.0));
    assert_eq!(
        square.compute_range(),
        Range {
            xmin: 0.0,
            xmax: 2.0,
            ymin: 0.0,
            ymax: 2.0
        }
    );
}

#[test]
fn view_requires_capability() {
    let mut graph = ObjectGraph::new();
    let id = Factory::default().construct(&mut graph, "TNamed", None);
    let err = graph.view::<Histogram>(id).unwrap_err();
    assert_eq!(err.code(), "MISSING_CAPABILITY");
}

#[test]
fn constructed_histogram_bits_and_rebin() {
    let mut graph = ObjectGraph::new();
    let id = Factory::default().construct(&mut graph, "TH1D", None);
    graph.invert_bit(id, hist::CAN_REBIN).unwrap();
    assert!(graph.test_bit(id, hist::CAN_REBIN).unwrap());

    graph
        .update(id, |h: &mut Histogram| {
            h.xaxis.nbins = 2;
            h.xaxis.xmax = 2.0;
            h.ncells = 4;
            h.array = vec![0.0; 4];
            h.set_bin_content(3, 1.0);
        })
        .unwrap();
    let h: Histogram = graph.view(id).unwrap();
    assert_eq!(h.xaxis.nbins, 4);
    assert_eq!(h.bin_content(3), 1.0);
}

#[test]
fn profile_fill_and_errors() {
    let mut graph = ObjectGraph::new();
    let id = Factory::default().construct(&mut graph, "TProfile", None);
    graph
        .update(id, |p: &mut Profile| {
            p.xaxis.nbins = 1;
            p.xaxis.xmax = 1.0;
            p.ncells = 3;
            p.array = vec![0.0; 3];
            p.sumw2 = vec![0.0; 3];
            p.bin_entries = vec![0.0; 3];
            p.fill(0.5, 1.0, 1.0);
            p.fill(0.5, 3.0, 1.0);
        })
        .unwrap();
    let p: Profile = graph.view(id).unwrap();
    assert_eq!(p.bin_content(1), 2.0);
    assert_eq!(p.bin_effective_entries(1), 2.0);
    // spread 1, two entries
    assert!((p.bin_error(1) - 1.0 / 2f64.sqrt()).abs() < 1e-12);
}
