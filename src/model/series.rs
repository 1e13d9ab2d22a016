//! Point series (TGraph family).

use serde::{Deserialize, Serialize};

use super::bits;
use super::float::{nan_if_null, vec_nan_if_null};
use super::histogram::Histogram;
use crate::graph::TypedView;
use crate::registry::{Capabilities, Factory};

/// Data bounds of a series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Range {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

/// Ordered (x, y) points plus a histogram used only to frame the axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointSeries {
    #[serde(rename = "_typename")]
    pub type_name: String,
    #[serde(rename = "fName")]
    pub name: String,
    #[serde(rename = "fTitle")]
    pub title: String,
    #[serde(rename = "fBits")]
    pub bits: u32,
    #[serde(rename = "fNpoints")]
    pub npoints: usize,
    #[serde(rename = "fMaxSize")]
    pub max_size: usize,
    #[serde(rename = "fX", deserialize_with = "vec_nan_if_null")]
    pub x: Vec<f64>,
    #[serde(rename = "fY", deserialize_with = "vec_nan_if_null")]
    pub y: Vec<f64>,
    #[serde(rename = "fMinimum", deserialize_with = "nan_if_null")]
    pub minimum: f64,
    #[serde(rename = "fMaximum", deserialize_with = "nan_if_null")]
    pub maximum: f64,
    #[serde(rename = "fHistogram")]
    pub histogram: Option<Histogram>,
}

impl Default for PointSeries {
    fn default() -> Self {
        Self {
            type_name: "TGraph".to_string(),
            name: String::new(),
            title: String::new(),
            bits: bits::DEFAULT_OBJECT_BITS,
            npoints: 0,
            max_size: 0,
            x: Vec::new(),
            y: Vec::new(),
            minimum: 0.0,
            maximum: 0.0,
            histogram: None,
        }
    }
}

impl TypedView for PointSeries {
    const NAME: &'static str = "PointSeries";
    const REQUIRED: Capabilities = Capabilities::GRAPH;
}

impl PointSeries {
    /// Series from coordinate vectors; the longer one is truncated.
    pub fn new(mut x: Vec<f64>, mut y: Vec<f64>) -> Self {
        let npoints = x.len().min(y.len());
        x.truncate(npoints);
        y.truncate(npoints);
        Self {
            npoints,
            max_size: npoints,
            x,
            y,
            ..Self::default()
        }
    }

    /// Points in order; never more than `npoints`.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .take(self.npoints)
            .map(|(x, y)| (*x, *y))
    }

    pub fn test_bit(&self, mask: u32) -> bool {
        self.bits & mask != 0
    }

    pub fn invert_bit(&mut self, mask: u32) {
        self.bits = bits::invert(self.bits, mask);
    }

    /// Min/max of both coordinates; all zero for an empty series.
    pub fn compute_range(&self) -> Range {
        let mut points = self.points();
        let Some((x0, y0)) = points.next() else {
            return Range::default();
        };
        points.fold(
            Range {
                xmin: x0,
                xmax: x0,
                ymin: y0,
                ymax: y0,
            },
            |r, (x, y)| Range {
                xmin: r.xmin.min(x),
                xmax: r.xmax.max(x),
                ymin: r.ymin.min(y),
                ymax: r.ymax.max(y),
            },
        )
    }

    /// Crossing-number test with the points taken as a closed polygon.
    pub fn is_inside(&self, xp: f64, yp: f64) -> bool {
        let points: Vec<(f64, f64)> = self.points().collect();
        let Some(mut j) = points.len().checked_sub(1) else {
            return false;
        };
        let mut odd = false;
        for (i, &(xi, yi)) in points.iter().enumerate() {
            let (xj, yj) = points[j];
            let crosses = (yi < yp && yj >= yp) || (yj < yp && yi >= yp);
            if crosses && xi + (yp - yi) / (yj - yi) * (xj - xi) < xp {
                odd = !odd;
            }
            j = i;
        }
        odd
    }

    /// Frame the data: write the bounds into the framing histogram's axes.
    ///
    /// A flat Y range is widened to one unit. `ygap` pushes the Y bounds
    /// outwards, twice as far on the side facing zero. A framing histogram
    /// sized to the point count is created when missing.
    pub fn adjust_ranges(&mut self, ygap: Option<f64>, factory: &mut Factory) {
        if self.npoints == 0 {
            return;
        }
        let range = self.compute_range();
        let (mut ymin, mut ymax) = (range.ymin, range.ymax);
        if ymin == ymax {
            ymax = ymin + 1.0;
        }

        let title = self.title.clone();
        let npoints = self.npoints;
        let histogram = self.histogram.get_or_insert_with(|| {
            let mut histogram = factory.th1(npoints);
            histogram.title = title;
            histogram
        });

        histogram.xaxis.xmin = range.xmin;
        histogram.xaxis.xmax = range.xmax;

        if let Some(gap) = ygap.filter(|g| *g != 0.0) {
            ymin *= if ymin > 0.0 { 1.0 - 2.0 * gap } else { 1.0 + gap };
            ymax *= if ymax > 0.0 { 1.0 + gap } else { 1.0 - 2.0 * gap };
        }
        histogram.yaxis.xmin = ymin;
        histogram.yaxis.xmax = ymax;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn square() -> PointSeries {
        PointSeries::new(vec![0.0, 0.0, 2.0, 2.0], vec![0.0, 2.0, 2.0, 0.0])
    }

    #[test]
    fn test_square_range_and_inside() {
        let s = square();
        assert!(s.is_inside(1.0, 1.0));
        assert!(!s.is_inside(3.0, 3.0));
        assert_eq!(
            s.compute_range(),
            Range {
                xmin: 0.0,
                xmax: 2.0,
                ymin: 0.0,
                ymax: 2.0
            }
        );
    }

    #[test]
    fn test_empty_series() {
        let s = PointSeries::default();
        assert_eq!(s.compute_range(), Range::default());
        assert!(!s.is_inside(0.0, 0.0));
    }

    #[test]
    fn test_npoints_limits_scan() {
        let mut s = square();
        s.x.push(100.0);
        s.y.push(100.0);
        assert_eq!(s.compute_range().xmax, 2.0);
    }

    #[test]
    fn test_adjust_ranges_creates_framing_histogram() {
        let mut factory = Factory::new(Settings::default());
        let mut s = PointSeries::new(vec![1.0, 3.0], vec![5.0, 5.0]);
        s.title = "points".to_string();
        s.adjust_ranges(None, &mut factory);

        let h = s.histogram.as_ref().unwrap();
        assert_eq!(h.title, "points");
        assert_eq!(h.xaxis.nbins, 2);
        assert_eq!((h.xaxis.xmin, h.xaxis.xmax), (1.0, 3.0));
        assert_eq!((h.yaxis.xmin, h.yaxis.xmax), (5.0, 6.0));
    }

    #[test]
    fn test_adjust_ranges_gap() {
        let mut factory = Factory::new(Settings::default());
        let mut s = PointSeries::new(vec![0.0, 1.0], vec![-2.0, 4.0]);
        s.adjust_ranges(Some(0.5), &mut factory);
        let h = s.histogram.as_ref().unwrap();
        assert_eq!((h.yaxis.xmin, h.yaxis.xmax), (-3.0, 6.0));

        let mut positive = PointSeries::new(vec![0.0, 1.0], vec![2.0, 4.0]);
        positive.adjust_ranges(Some(0.25), &mut factory);
        let h = positive.histogram.as_ref().unwrap();
        assert_eq!((h.yaxis.xmin, h.yaxis.xmax), (1.0, 5.0));
    }
}
