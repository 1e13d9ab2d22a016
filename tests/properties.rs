//! Property tests: bin addressing and sharing preservation.

use std::collections::HashMap;

use proptest::prelude::*;
use rootgraph::{decode, encode, Histogram, ObjId, Object, ObjectGraph, Value};

/// Random graph: `edges[i]` lists the targets of object `i`; object 0 is the root.
fn arb_edges() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..8).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0..n, 0..3), n))
}

fn build(edges: &[Vec<usize>]) -> (ObjectGraph, ObjId) {
    let mut graph = ObjectGraph::new();
    let ids: Vec<ObjId> = (0..edges.len())
        .map(|i| {
            let mut object = Object::typed("TNamed");
            object.set("fName", format!("n{i}"));
            graph.alloc(object)
        })
        .collect();
    for (i, targets) in edges.iter().enumerate() {
        for (k, t) in targets.iter().enumerate() {
            graph.set_field(ids[i], format!("e{k}"), ids[*t]).unwrap();
        }
    }
    (graph, ids[0])
}

/// Walk both graphs in lockstep; ids must correspond one-to-one.
fn same_shape(
    a: &ObjectGraph,
    va: &Value,
    b: &ObjectGraph,
    vb: &Value,
    map: &mut HashMap<ObjId, ObjId>,
) -> bool {
    match (va, vb) {
        (Value::Object(ia), Value::Object(ib)) => {
            if let Some(seen) = map.get(ia) {
                return seen == ib;
            }
            if map.values().any(|v| v == ib) {
                return false;
            }
            map.insert(*ia, *ib);
            let (oa, ob) = (a.get(*ia).unwrap(), b.get(*ib).unwrap());
            oa.type_name() == ob.type_name()
                && oa.fields().len() == ob.fields().len()
                && oa.fields().iter().all(|(key, field)| {
                    ob.get(key)
                        .is_some_and(|other| same_shape(a, field, b, other, map))
                })
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| same_shape(a, x, b, y, map))
        }
        (x, y) => x == y,
    }
}

proptest! {
    #[test]
    fn bin_addressing_inverse(
        dims in 1usize..=3,
        nx in 0usize..12, ny in 0usize..12, nz in 0usize..12,
        fx in 0.0f64..1.0, fy in 0.0f64..1.0, fz in 0.0f64..1.0,
    ) {
        let h = match dims {
            1 => Histogram::new_1d("h", nx, 0.0, 1.0),
            2 => Histogram::new_2d("h", (nx, 0.0, 1.0), (ny, 0.0, 1.0)),
            _ => Histogram::new_3d("h", (nx, 0.0, 1.0), (ny, 0.0, 1.0), (nz, 0.0, 1.0)),
        };
        // a valid coordinate on each used axis, 0 on the others
        let coord = |f: f64, n: usize, used: bool| if used { (f * (n + 2) as f64) as usize } else { 0 };
        let x = coord(fx, nx, true);
        let y = coord(fy, ny, dims >= 2);
        let z = coord(fz, nz, dims >= 3);

        let bin = h.bin(x as i64, y as i64, z as i64);
        prop_assert!(bin < h.array.len());
        prop_assert_eq!(h.bin_xyz(bin), (x, y, z));
    }

    #[test]
    fn encode_decode_preserves_sharing(edges in arb_edges()) {
        let (graph, root) = build(&edges);
        let tree = encode(&graph, &Value::Object(root));
        let decoded = decode(&tree);
        let mut map = HashMap::new();
        prop_assert!(same_shape(&graph, &Value::Object(root), &decoded.graph, &decoded.root, &mut map));
    }

    #[test]
    fn deep_clone_preserves_sharing(edges in arb_edges()) {
        let (graph, root) = build(&edges);
        let (copy, copy_root) = graph.deep_clone(root);
        let mut map = HashMap::new();
        prop_assert!(same_shape(&graph, &Value::Object(root), &copy, &Value::Object(copy_root), &mut map));
    }
}
