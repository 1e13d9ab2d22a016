//! Axis model: bin count, domain, optional explicit edges and visible range.

use serde::{Deserialize, Serialize};

use super::bits::{self, axis as axis_bits};
use super::float::{nan_if_null, vec_nan_if_null};
use crate::graph::TypedView;
use crate::registry::Capabilities;

/// One histogram axis.
///
/// Bins are numbered `1..=nbins`; bin 0 is the underflow and `nbins + 1` the
/// overflow. When `edges` holds `nbins + 1` values, bin `i` spans
/// `edges[i-1]..edges[i]`; otherwise bins are uniform over `xmin..xmax`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Axis {
    #[serde(rename = "_typename")]
    pub type_name: String,
    #[serde(rename = "fName")]
    pub name: String,
    #[serde(rename = "fTitle")]
    pub title: String,
    #[serde(rename = "fBits")]
    pub bits: u32,
    #[serde(rename = "fNbins")]
    pub nbins: usize,
    #[serde(rename = "fXmin", deserialize_with = "nan_if_null")]
    pub xmin: f64,
    #[serde(rename = "fXmax", deserialize_with = "nan_if_null")]
    pub xmax: f64,
    #[serde(rename = "fXbins", deserialize_with = "vec_nan_if_null")]
    pub edges: Vec<f64>,
    #[serde(rename = "fFirst")]
    pub first: usize,
    #[serde(rename = "fLast")]
    pub last: usize,
    #[serde(rename = "fTimeDisplay")]
    pub time_display: bool,
    /// Bin labels. Read-only here; the label list object stays in the graph.
    #[serde(rename = "fLabels", skip_serializing)]
    pub labels: Option<serde_json::Value>,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            type_name: "TAxis".to_string(),
            name: String::new(),
            title: String::new(),
            bits: bits::DEFAULT_OBJECT_BITS,
            nbins: 0,
            xmin: 0.0,
            xmax: 0.0,
            edges: Vec::new(),
            first: 0,
            last: 0,
            time_display: false,
            labels: None,
        }
    }
}

impl TypedView for Axis {
    const NAME: &'static str = "Axis";
    const REQUIRED: Capabilities = Capabilities::AXIS;
}

impl Axis {
    /// Uniform axis with `nbins` bins over `xmin..xmax`.
    pub fn uniform(name: &str, nbins: usize, xmin: f64, xmax: f64) -> Self {
        Self {
            name: name.to_string(),
            nbins,
            xmin,
            xmax,
            ..Self::default()
        }
    }

    /// Axis with explicit bin edges. The bin count is `edges.len() - 1`.
    pub fn variable(name: &str, edges: Vec<f64>) -> Self {
        let nbins = edges.len().saturating_sub(1);
        let xmin = edges.first().copied().unwrap_or(0.0);
        let xmax = edges.last().copied().unwrap_or(0.0);
        Self {
            name: name.to_string(),
            nbins,
            xmin,
            xmax,
            edges,
            ..Self::default()
        }
    }

    pub fn test_bit(&self, mask: u32) -> bool {
        self.bits & mask != 0
    }

    pub fn invert_bit(&mut self, mask: u32) {
        self.bits = bits::invert(self.bits, mask);
    }

    /// True if a visible sub-range is active.
    pub fn has_range(&self) -> bool {
        self.test_bit(axis_bits::AXIS_RANGE)
    }

    /// Restrict the visible bins to `first..=last`.
    pub fn set_range(&mut self, first: usize, last: usize) {
        self.first = first;
        self.last = last;
        self.bits |= axis_bits::AXIS_RANGE;
    }

    /// Drop the visible sub-range.
    pub fn unzoom(&mut self) {
        self.first = 0;
        self.last = 0;
        self.bits &= !axis_bits::AXIS_RANGE;
    }

    pub fn first_visible_bin(&self) -> usize {
        if self.has_range() {
            self.first
        } else {
            1
        }
    }

    pub fn last_visible_bin(&self) -> usize {
        if self.has_range() {
            self.last
        } else {
            self.nbins
        }
    }

    pub fn has_labels(&self) -> bool {
        self.labels.as_ref().is_some_and(|l| !l.is_null())
    }

    fn has_edges(&self) -> bool {
        self.nbins > 0 && self.edges.len() > self.nbins
    }

    fn in_range(&self, bin: i64) -> bool {
        bin >= 1 && bin <= self.nbins as i64
    }

    fn uniform_width(&self) -> f64 {
        (self.xmax - self.xmin) / self.nbins as f64
    }

    pub fn bin_center(&self, bin: i64) -> f64 {
        if self.has_edges() && self.in_range(bin) {
            let i = bin as usize;
            let width = self.edges[i] - self.edges[i - 1];
            return self.edges[i - 1] + 0.5 * width;
        }
        let width = self.uniform_width();
        self.xmin + (bin - 1) as f64 * width + 0.5 * width
    }

    pub fn bin_low_edge(&self, bin: i64) -> f64 {
        if self.has_edges() && self.in_range(bin) {
            return self.edges[bin as usize - 1];
        }
        self.xmin + (bin - 1) as f64 * self.uniform_width()
    }

    pub fn bin_up_edge(&self, bin: i64) -> f64 {
        if self.has_edges() && self.in_range(bin) {
            return self.edges[bin as usize];
        }
        self.xmin + bin as f64 * self.uniform_width()
    }

    /// Width of `bin`; with explicit edges the index is clamped into `1..=nbins`.
    pub fn bin_width(&self, bin: i64) -> f64 {
        if self.nbins == 0 {
            return 0.0;
        }
        if !self.has_edges() {
            return self.uniform_width();
        }
        let i = bin.clamp(1, self.nbins as i64) as usize;
        self.edges[i] - self.edges[i - 1]
    }

    /// Double the bin count, extending the domain above the old maximum.
    ///
    /// Explicit edges are continued by shifting the old ones by the old
    /// range. The visible sub-range is dropped.
    pub(crate) fn inflate(&mut self) {
        let range = self.xmax - self.xmin;
        if self.has_edges() {
            let upper: Vec<f64> = self.edges[1..=self.nbins]
                .iter()
                .map(|edge| edge + range)
                .collect();
            self.edges.truncate(self.nbins + 1);
            self.edges.extend(upper);
        }
        self.nbins *= 2;
        self.xmax = self.xmin + 2.0 * range;
        self.unzoom();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_geometry() {
        let axis = Axis::uniform("xaxis", 4, 0.0, 4.0);
        assert_eq!(axis.bin_center(2), 1.5);
        assert_eq!(axis.bin_low_edge(2), 1.0);
        assert_eq!(axis.bin_up_edge(2), 2.0);
        assert_eq!(axis.bin_width(7), 1.0);
        // under/overflow use the uniform formula
        assert_eq!(axis.bin_center(0), -0.5);
        assert_eq!(axis.bin_center(5), 4.5);
    }

    #[test]
    fn test_variable_edges() {
        let axis = Axis::variable("xaxis", vec![0.0, 1.0, 3.0, 6.0]);
        assert_eq!(axis.nbins, 3);
        assert_eq!(axis.bin_center(2), 2.0);
        assert_eq!(axis.bin_low_edge(3), 3.0);
        assert_eq!(axis.bin_up_edge(3), 6.0);
        assert_eq!(axis.bin_width(0), 1.0);
        assert_eq!(axis.bin_width(99), 3.0);
    }

    #[test]
    fn test_visible_range() {
        let mut axis = Axis::uniform("xaxis", 10, 0.0, 1.0);
        assert_eq!((axis.first_visible_bin(), axis.last_visible_bin()), (1, 10));
        axis.set_range(3, 5);
        assert_eq!((axis.first_visible_bin(), axis.last_visible_bin()), (3, 5));
        axis.invert_bit(axis_bits::AXIS_RANGE);
        assert_eq!(axis.last_visible_bin(), 10);
    }

    #[test]
    fn test_empty_axis_width() {
        assert_eq!(Axis::default().bin_width(1), 0.0);
    }

    #[test]
    fn test_inflate_extends_edges() {
        let mut axis = Axis::variable("xaxis", vec![0.0, 1.0, 3.0]);
        axis.inflate();
        assert_eq!(axis.nbins, 4);
        assert_eq!(axis.xmax, 6.0);
        assert_eq!(axis.edges, vec![0.0, 1.0, 3.0, 4.0, 6.0]);
    }
}
