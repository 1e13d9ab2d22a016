//! Histogram model (1D, 2D and 3D).
//!
//! Cells are stored in one flat array. With `N` bins on an axis, that axis
//! contributes `N + 2` coordinates: 0 is the underflow and `N + 1` the
//! overflow. The global index of a cell is
//!
//! ```text
//! bin = x + (Nx + 2) * (y + (Ny + 2) * z)
//! ```
//!
//! so `array.len()` always equals the product of `N + 2` over the used axes.
//! The optional variance array (`fSumw2`) is either empty or the same length.
//!
//! Moment accumulators (`fTsumw`, `fTsumwx`, ...) are cached on the object.
//! `fTsumw == 0` with a positive entry count marks them stale, and
//! [`Histogram::stats`] then recomputes them from the cells.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::axis::Axis;
use super::bits::{self, hist as hist_bits};
use super::float::{nan_if_null, vec_nan_if_null};
use super::BinErrorOption;
use crate::error::{GraphError, HistogramError};
use crate::graph::{ObjId, ObjectGraph, TypedView};
use crate::math;
use crate::registry::Capabilities;

/// Value of `fMinimum` / `fMaximum` when no user limit is set.
pub const UNSET_LIMIT: f64 = -1111.0;

/// Weight of a zero-error cell in a running-average merge.
const HUGE_WEIGHT: f64 = 1e200;

/// Selects one of the three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    X,
    Y,
    Z,
}

impl AxisKind {
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Parse an axis option such as `"x"` or `"Y"`; only the first character counts.
    pub fn from_option(option: &str) -> Option<Self> {
        match option.chars().next()?.to_ascii_uppercase() {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }

    fn from_index(index: usize) -> Self {
        match index {
            0 => Self::X,
            1 => Self::Y,
            _ => Self::Z,
        }
    }
}

// ============================================================================
// MOMENTS
// ============================================================================

/// Moment vector returned by `getStats`.
///
/// | index | sum      | index | sum      |
/// |-------|----------|-------|----------|
/// | 0     | Σw       | 6     | Σw·x·y   |
/// | 1     | Σw·err²  | 7     | Σw·z     |
/// | 2     | Σw·x     | 8     | Σw·z²    |
/// | 3     | Σw·x²    | 9     | Σw·x·z   |
/// | 4     | Σw·y     | 10    | Σw·y·z   |
/// | 5     | Σw·y²    |       |          |
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments(pub [f64; Moments::LEN]);

impl Moments {
    pub const LEN: usize = 11;

    /// Index of the first moment of axis 1, 2, 3; the second moment follows it.
    const AXIS_OFFSETS: [usize; 3] = [2, 4, 7];

    pub fn sumw(&self) -> f64 {
        self.0[0]
    }

    pub fn sumw2(&self) -> f64 {
        self.0[1]
    }

    fn offset(axis: u32) -> Option<usize> {
        match axis {
            1..=3 | 11..=13 => Some(Self::AXIS_OFFSETS[(axis % 10 - 1) as usize]),
            _ => None,
        }
    }

    /// Mean along `axis` (1..=3, or 11..=13 for the same axes); 0 if undefined.
    pub fn mean(&self, axis: u32) -> f64 {
        match Self::offset(axis) {
            Some(idx) if self.sumw() != 0.0 => self.0[idx] / self.sumw(),
            _ => 0.0,
        }
    }

    /// Standard deviation along `axis`; 0 if undefined.
    pub fn rms(&self, axis: u32) -> f64 {
        match Self::offset(axis) {
            Some(idx) if self.sumw() != 0.0 => {
                let mean = self.0[idx] / self.sumw();
                (self.0[idx + 1] / self.sumw() - mean * mean).abs().sqrt()
            }
            _ => 0.0,
        }
    }

    /// `self += c * other`, with the error term scaled by `c²`.
    fn combine(&mut self, other: &Moments, c: f64) {
        for (i, (mine, theirs)) in self.0.iter_mut().zip(other.0.iter()).enumerate() {
            if i == 1 {
                *mine += c * c * theirs;
            } else {
                *mine += c * theirs;
            }
        }
    }
}

// ============================================================================
// HISTOGRAM
// ============================================================================

/// A binned histogram of dimension 1 to 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Histogram {
    #[serde(rename = "_typename")]
    pub type_name: String,
    #[serde(rename = "fName")]
    pub name: String,
    #[serde(rename = "fTitle")]
    pub title: String,
    #[serde(rename = "fBits")]
    pub bits: u32,
    #[serde(rename = "fDimension")]
    pub dimension: u8,
    #[serde(rename = "fXaxis")]
    pub xaxis: Axis,
    #[serde(rename = "fYaxis")]
    pub yaxis: Axis,
    #[serde(rename = "fZaxis")]
    pub zaxis: Axis,
    #[serde(rename = "fNcells")]
    pub ncells: usize,
    #[serde(rename = "fArray", deserialize_with = "vec_nan_if_null")]
    pub array: Vec<f64>,
    /// Per-cell variance; empty until [`Histogram::sumw2`] is called.
    #[serde(rename = "fSumw2", deserialize_with = "vec_nan_if_null")]
    pub sumw2: Vec<f64>,
    #[serde(rename = "fEntries", deserialize_with = "nan_if_null")]
    pub entries: f64,
    #[serde(rename = "fTsumw", deserialize_with = "nan_if_null")]
    pub tsumw: f64,
    #[serde(rename = "fTsumw2", deserialize_with = "nan_if_null")]
    pub tsumw2: f64,
    #[serde(rename = "fTsumwx", deserialize_with = "nan_if_null")]
    pub tsumwx: f64,
    #[serde(rename = "fTsumwx2", deserialize_with = "nan_if_null")]
    pub tsumwx2: f64,
    #[serde(rename = "fTsumwy", skip_serializing_if = "Option::is_none")]
    pub tsumwy: Option<f64>,
    #[serde(rename = "fTsumwy2", skip_serializing_if = "Option::is_none")]
    pub tsumwy2: Option<f64>,
    #[serde(rename = "fTsumwxy", skip_serializing_if = "Option::is_none")]
    pub tsumwxy: Option<f64>,
    #[serde(rename = "fTsumwz", skip_serializing_if = "Option::is_none")]
    pub tsumwz: Option<f64>,
    #[serde(rename = "fTsumwz2", skip_serializing_if = "Option::is_none")]
    pub tsumwz2: Option<f64>,
    #[serde(rename = "fTsumwxz", skip_serializing_if = "Option::is_none")]
    pub tsumwxz: Option<f64>,
    #[serde(rename = "fTsumwyz", skip_serializing_if = "Option::is_none")]
    pub tsumwyz: Option<f64>,
    #[serde(rename = "fMaximum", deserialize_with = "nan_if_null")]
    pub maximum: f64,
    #[serde(rename = "fMinimum", deserialize_with = "nan_if_null")]
    pub minimum: f64,
    #[serde(rename = "fNormFactor", deserialize_with = "nan_if_null")]
    pub norm_factor: f64,
    #[serde(rename = "fBinStatErrOpt", with = "error_option_code")]
    pub bin_error_option: BinErrorOption,
    /// Include one under/overflow cell per axis in recomputed statistics.
    #[serde(rename = "fgStatOverflows")]
    pub stat_overflows: bool,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            type_name: "TH1D".to_string(),
            name: String::new(),
            title: String::new(),
            bits: bits::DEFAULT_OBJECT_BITS,
            dimension: 1,
            xaxis: Axis::uniform("xaxis", 0, 0.0, 0.0),
            yaxis: Axis::uniform("yaxis", 0, 0.0, 0.0),
            zaxis: Axis::uniform("zaxis", 0, 0.0, 0.0),
            ncells: 0,
            array: Vec::new(),
            sumw2: Vec::new(),
            entries: 0.0,
            tsumw: 0.0,
            tsumw2: 0.0,
            tsumwx: 0.0,
            tsumwx2: 0.0,
            tsumwy: None,
            tsumwy2: None,
            tsumwxy: None,
            tsumwz: None,
            tsumwz2: None,
            tsumwxz: None,
            tsumwyz: None,
            maximum: UNSET_LIMIT,
            minimum: UNSET_LIMIT,
            norm_factor: 0.0,
            bin_error_option: BinErrorOption::Normal,
            stat_overflows: false,
        }
    }
}

impl TypedView for Histogram {
    const NAME: &'static str = "Histogram";
    const REQUIRED: Capabilities = Capabilities::HISTOGRAM;
}

mod error_option_code {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::BinErrorOption;

    pub fn serialize<S: Serializer>(option: &BinErrorOption, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(option.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BinErrorOption, D::Error> {
        let code = Option::<u8>::deserialize(deserializer)?.unwrap_or(0);
        Ok(BinErrorOption::from_code(code))
    }
}

impl Histogram {
    /// Histogram with the given axes (one to three); all cells zero.
    pub fn from_axes(type_name: &str, name: &str, axes: Vec<Axis>) -> Self {
        let mut histogram = Self {
            type_name: type_name.to_string(),
            name: name.to_string(),
            dimension: axes.len().clamp(1, 3) as u8,
            ..Self::default()
        };
        for (i, axis) in axes.into_iter().take(3).enumerate() {
            *histogram.axis_mut(AxisKind::from_index(i)) = axis;
        }
        histogram.ncells = histogram.expected_cells();
        histogram.array = vec![0.0; histogram.ncells];
        histogram
    }

    /// `TH1D` with uniform bins.
    pub fn new_1d(name: &str, nbins: usize, xmin: f64, xmax: f64) -> Self {
        Self::from_axes("TH1D", name, vec![Axis::uniform("xaxis", nbins, xmin, xmax)])
    }

    /// `TH2D` with uniform bins; each axis is `(nbins, min, max)`.
    pub fn new_2d(name: &str, x: (usize, f64, f64), y: (usize, f64, f64)) -> Self {
        Self::from_axes(
            "TH2D",
            name,
            vec![
                Axis::uniform("xaxis", x.0, x.1, x.2),
                Axis::uniform("yaxis", y.0, y.1, y.2),
            ],
        )
    }

    /// `TH3D` with uniform bins.
    pub fn new_3d(name: &str, x: (usize, f64, f64), y: (usize, f64, f64), z: (usize, f64, f64)) -> Self {
        Self::from_axes(
            "TH3D",
            name,
            vec![
                Axis::uniform("xaxis", x.0, x.1, x.2),
                Axis::uniform("yaxis", y.0, y.1, y.2),
                Axis::uniform("zaxis", z.0, z.1, z.2),
            ],
        )
    }

    pub fn dimension(&self) -> usize {
        usize::from(self.dimension.clamp(1, 3))
    }

    pub fn axis(&self, kind: AxisKind) -> &Axis {
        match kind {
            AxisKind::X => &self.xaxis,
            AxisKind::Y => &self.yaxis,
            AxisKind::Z => &self.zaxis,
        }
    }

    pub fn axis_mut(&mut self, kind: AxisKind) -> &mut Axis {
        match kind {
            AxisKind::X => &mut self.xaxis,
            AxisKind::Y => &mut self.yaxis,
            AxisKind::Z => &mut self.zaxis,
        }
    }

    /// Axes in use, X first.
    fn used_axes(&self) -> impl Iterator<Item = &Axis> {
        [&self.xaxis, &self.yaxis, &self.zaxis]
            .into_iter()
            .take(self.dimension())
    }

    /// Cell count implied by the axes.
    pub fn expected_cells(&self) -> usize {
        self.used_axes().map(|axis| axis.nbins + 2).product()
    }

    pub fn test_bit(&self, mask: u32) -> bool {
        self.bits & mask != 0
    }

    pub fn invert_bit(&mut self, mask: u32) {
        self.bits = bits::invert(self.bits, mask);
    }

    pub fn is_average(&self) -> bool {
        self.test_bit(hist_bits::IS_AVERAGE)
    }

    // ------------------------------------------------------------------------
    // Addressing
    // ------------------------------------------------------------------------

    /// Global cell index of per-axis coordinates, each clamped into `0..=N+1`.
    /// Coordinates of unused axes are ignored.
    pub fn bin(&self, x: i64, y: i64, z: i64) -> usize {
        let nx = self.xaxis.nbins + 2;
        let bx = clamp_coord(x, nx);
        if self.dimension() < 2 {
            return bx;
        }
        let ny = self.yaxis.nbins + 2;
        let by = clamp_coord(y, ny);
        if self.dimension() < 3 {
            return bx + nx * by;
        }
        let nz = self.zaxis.nbins + 2;
        let bz = clamp_coord(z, nz);
        bx + nx * (by + ny * bz)
    }

    /// Per-axis coordinates of a global cell index; unused axes read 0.
    pub fn bin_xyz(&self, bin: usize) -> (usize, usize, usize) {
        let nx = self.xaxis.nbins + 2;
        let ny = self.yaxis.nbins + 2;
        let x = bin % nx;
        match self.dimension() {
            1 => (x, 0, 0),
            2 => (x, (bin / nx) % ny, 0),
            _ => (x, (bin / nx) % ny, bin / nx / ny),
        }
    }

    /// Clamp a global index into the cell array; `None` when there are no cells.
    fn cell(&self, bin: i64) -> Option<usize> {
        let last = self.array.len().checked_sub(1)?;
        Some(bin.clamp(0, last as i64) as usize)
    }

    // ------------------------------------------------------------------------
    // Contents and errors
    // ------------------------------------------------------------------------

    /// Content of a cell; the index is clamped into the cell array.
    pub fn bin_content(&self, bin: i64) -> f64 {
        self.cell(bin).map_or(0.0, |i| self.array[i])
    }

    /// Set the content of a cell.
    ///
    /// Counts one entry and marks the moments stale. Negative indices are
    /// ignored. An index at or beyond the overflow doubles the X axis until it
    /// fits when the axis shows time or the histogram may rebin; otherwise only
    /// the last cell itself may be written.
    pub fn set_bin_content(&mut self, bin: i64, content: f64) {
        self.entries += 1.0;
        self.tsumw = 0.0;
        if bin < 0 || self.array.is_empty() {
            return;
        }
        let bin = bin as usize;
        let last = self.array.len() - 1;
        if bin >= last {
            if self.xaxis.time_display || self.test_bit(hist_bits::CAN_REBIN) {
                while bin >= self.array.len() - 1 {
                    if self.xaxis.nbins == 0 {
                        return;
                    }
                    self.labels_inflate(AxisKind::X);
                }
            } else {
                if bin == last {
                    self.array[bin] = content;
                }
                return;
            }
        }
        self.array[bin] = content;
    }

    pub fn has_sumw2(&self) -> bool {
        !self.sumw2.is_empty()
    }

    /// Zero every cell after the axes changed, keeping the variance array if present.
    pub(crate) fn rebuild_cells(&mut self) {
        let cells = self.expected_cells();
        self.ncells = cells;
        self.array = vec![0.0; cells];
        if self.has_sumw2() {
            self.sumw2 = vec![0.0; cells];
        }
    }

    /// Create the variance array, seeded with |content| once entries exist.
    pub fn sumw2(&mut self) {
        if self.sumw2.len() == self.array.len() {
            return;
        }
        self.sumw2 = if self.entries > 0.0 {
            self.array.iter().map(|c| c.abs()).collect()
        } else {
            vec![0.0; self.array.len()]
        };
    }

    /// Normal-model error: sqrt of the variance, else sqrt(|content|).
    pub fn bin_error(&self, bin: i64) -> f64 {
        let Some(i) = self.cell(bin) else {
            return 0.0;
        };
        match self.sumw2.get(i) {
            Some(err2) if self.has_sumw2() => err2.sqrt(),
            _ => self.array[i].abs().sqrt(),
        }
    }

    /// Rounded count for the Poisson models, or `None` when the Normal model applies.
    ///
    /// Negative content switches the histogram to the Normal model for good.
    fn poisson_count(&mut self, bin: i64) -> Option<(f64, f64)> {
        if self.bin_error_option == BinErrorOption::Normal {
            return None;
        }
        let i = self.cell(bin)?;
        let content = self.array[i];
        let n = (content + 0.5).floor();
        if n < 0.0 {
            warn!(
                bin = i,
                content, "Negative bin content, switching to normal errors"
            );
            self.bin_error_option = BinErrorOption::Normal;
            return None;
        }
        Some((n, content))
    }

    /// Distance from the content to the lower end of its error interval.
    pub fn bin_error_low(&mut self, bin: i64) -> f64 {
        let Some((n, content)) = self.poisson_count(bin) else {
            return self.bin_error(bin);
        };
        if n == 0.0 {
            return 0.0;
        }
        let alpha = self.bin_error_option.alpha();
        content - math::gamma_quantile(alpha / 2.0, n, 1.0)
    }

    /// Distance from the content to the upper end of its error interval.
    pub fn bin_error_up(&mut self, bin: i64) -> f64 {
        let Some((n, content)) = self.poisson_count(bin) else {
            return self.bin_error(bin);
        };
        let alpha = self.bin_error_option.alpha();
        math::gamma_quantile_c(alpha / 2.0, n + 1.0, 1.0) - content
    }

    /// `(low, up)` errors of a cell.
    pub fn bin_errors(&mut self, bin: i64) -> (f64, f64) {
        (self.bin_error_low(bin), self.bin_error_up(bin))
    }

    pub fn bin_low_edge(&self, bin: i64) -> f64 {
        self.xaxis.bin_low_edge(bin)
    }

    pub fn bin_up_edge(&self, bin: i64) -> f64 {
        self.xaxis.bin_up_edge(bin)
    }

    pub fn bin_width(&self, bin: i64) -> f64 {
        self.xaxis.bin_width(bin)
    }

    /// Sum of contents over in-range cells (no under/overflow).
    pub fn sum_of_weights(&self) -> f64 {
        let range = |d: usize| {
            let axis = [&self.xaxis, &self.yaxis, &self.zaxis][d];
            if d < self.dimension() {
                1..=axis.nbins as i64
            } else {
                0..=0
            }
        };
        let mut sum = 0.0;
        for z in range(2) {
            for y in range(1) {
                for x in range(0) {
                    sum += self.bin_content(self.bin(x, y, z) as i64);
                }
            }
        }
        sum
    }

    // ------------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------------

    /// Cached moments as stored on the object.
    fn cached_moments(&self) -> Moments {
        Moments([
            self.tsumw,
            self.tsumw2,
            self.tsumwx,
            self.tsumwx2,
            self.tsumwy.unwrap_or(0.0),
            self.tsumwy2.unwrap_or(0.0),
            self.tsumwxy.unwrap_or(0.0),
            self.tsumwz.unwrap_or(0.0),
            self.tsumwz2.unwrap_or(0.0),
            self.tsumwxz.unwrap_or(0.0),
            self.tsumwyz.unwrap_or(0.0),
        ])
    }

    /// Write moments back; only the terms of the used axes are kept.
    fn store_moments(&mut self, m: &Moments) {
        let s = &m.0;
        self.tsumw = s[0];
        self.tsumw2 = s[1];
        self.tsumwx = s[2];
        self.tsumwx2 = s[3];
        if self.dimension() >= 2 {
            self.tsumwy = Some(s[4]);
            self.tsumwy2 = Some(s[5]);
            self.tsumwxy = Some(s[6]);
        }
        if self.dimension() == 3 {
            self.tsumwz = Some(s[7]);
            self.tsumwz2 = Some(s[8]);
            self.tsumwxz = Some(s[9]);
            self.tsumwyz = Some(s[10]);
        }
    }

    /// Moment vector, cached or recomputed.
    ///
    /// With labels on X and rebinning allowed only Σw and Σw·err² are
    /// meaningful. Moments are recomputed over the visible bins when they are
    /// stale, when any axis has an active sub-range, or in running-average mode.
    pub fn stats(&self) -> Moments {
        if self.xaxis.has_labels() && self.test_bit(hist_bits::CAN_REBIN) {
            let mut moments = Moments::default();
            moments.0[0] = self.tsumw;
            moments.0[1] = self.tsumw2;
            return moments;
        }
        let stale = self.tsumw == 0.0 && self.entries > 0.0;
        if stale || self.is_average() || self.used_axes().any(Axis::has_range) {
            return self.recompute_moments();
        }
        self.cached_moments()
    }

    /// Bin range of an axis entering recomputed statistics.
    fn stat_range(&self, axis: &Axis) -> (i64, i64) {
        let mut first = axis.first_visible_bin() as i64;
        let mut last = axis.last_visible_bin() as i64;
        if self.stat_overflows && !axis.has_range() {
            if first == 1 {
                first = 0;
            }
            if last == axis.nbins as i64 {
                last += 1;
            }
        }
        (first, last)
    }

    fn recompute_moments(&self) -> Moments {
        let dim = self.dimension();
        let (fx, lx) = self.stat_range(&self.xaxis);
        let (fy, ly) = if dim >= 2 { self.stat_range(&self.yaxis) } else { (0, 0) };
        let (fz, lz) = if dim >= 3 { self.stat_range(&self.zaxis) } else { (0, 0) };

        let mut s = [0.0; Moments::LEN];
        for binz in fz..=lz {
            let z = self.zaxis.bin_center(binz);
            for biny in fy..=ly {
                let y = self.yaxis.bin_center(biny);
                for binx in fx..=lx {
                    let x = self.xaxis.bin_center(binx);
                    let bin = self.bin(binx, biny, binz) as i64;
                    let w = self.bin_content(bin);
                    let err = self.bin_error(bin).abs();
                    s[0] += w;
                    s[1] += err * err;
                    s[2] += w * x;
                    s[3] += w * x * x;
                    if dim >= 2 {
                        s[4] += w * y;
                        s[5] += w * y * y;
                        s[6] += w * x * y;
                    }
                    if dim >= 3 {
                        s[7] += w * z;
                        s[8] += w * z * z;
                        s[9] += w * x * z;
                        s[10] += w * y * z;
                    }
                }
            }
        }
        Moments(s)
    }

    /// Recompute the moments from the cells and reset the entry count.
    ///
    /// Entries become |Σw|, or the effective count Σw² / Σw·err² when a
    /// variance array exists.
    pub fn reset_stats(&mut self) {
        self.tsumw = 0.0;
        self.entries = 1.0;
        let moments = self.stats();
        self.store_moments(&moments);
        self.entries = moments.sumw().abs();
        if self.has_sumw2() && moments.sumw() > 0.0 && moments.sumw2() > 0.0 {
            self.entries = moments.sumw() * moments.sumw() / moments.sumw2();
        }
    }

    /// Zero every cell, the variance array and all statistics.
    pub fn reset(&mut self) {
        self.array.iter_mut().for_each(|c| *c = 0.0);
        self.sumw2.iter_mut().for_each(|e| *e = 0.0);
        self.entries = 0.0;
        self.store_moments(&Moments::default());
        self.minimum = UNSET_LIMIT;
        self.maximum = UNSET_LIMIT;
    }

    pub fn mean(&self, axis: u32) -> f64 {
        self.stats().mean(axis)
    }

    pub fn rms(&self, axis: u32) -> f64 {
        self.stats().rms(axis)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// `self += c1 * other`, cell by cell including under/overflow.
    ///
    /// When both operands are in running-average mode the cells are combined
    /// by inverse-variance weighting instead. A negative coefficient resets
    /// the statistics; otherwise the moments are combined linearly.
    pub fn add(&mut self, other: &Histogram, c1: f64) -> Result<(), HistogramError> {
        if other.array.len() != self.array.len() || other.dimension() != self.dimension() {
            return Err(HistogramError::IncompatibleOperand {
                this_cells: self.array.len(),
                other_cells: other.array.len(),
            });
        }

        if !self.has_sumw2() && other.has_sumw2() {
            self.sumw2();
        }
        if self.entries.is_nan() {
            self.entries = 0.0;
        }
        let entries = (self.entries + c1 * other.entries).abs();
        let reset = c1 < 0.0;
        let average = self.is_average() && other.is_average();

        let s1 = self.stats();
        let s2 = other.stats();
        self.minimum = UNSET_LIMIT;
        self.maximum = UNSET_LIMIT;

        let factor = if other.norm_factor.abs() > f64::MIN_POSITIVE {
            other.norm_factor / other.sum_of_weights()
        } else {
            1.0
        };

        for bin in 0..self.array.len() {
            let cell = bin as i64;
            if average {
                let y1 = other.array[bin];
                let y2 = self.array[bin];
                let w1 = merge_weight(other.bin_error(cell), y1, other.has_sumw2(), &s2);
                let w2 = merge_weight(self.bin_error(cell), y2, self.has_sumw2(), &s1);
                self.array[bin] = (w1 * y1 + w2 * y2) / (w1 + w2);
                if self.has_sumw2() {
                    let err2 = 1.0 / (w1 + w2);
                    self.sumw2[bin] = if err2 < 1e-200 { 0.0 } else { err2 };
                }
            } else {
                self.array[bin] += c1 * factor * other.array[bin];
                if self.has_sumw2() {
                    let e1 = factor * other.bin_error(cell);
                    self.sumw2[bin] += c1 * c1 * e1 * e1;
                }
            }
        }

        if reset {
            self.reset_stats();
        } else {
            let mut combined = s1;
            combined.combine(&s2, c1);
            self.store_moments(&combined);
            self.entries = entries;
        }
        Ok(())
    }

    /// Double the bin count of one axis and refill from the old geometry.
    ///
    /// Cells whose coordinates lie beyond the old bin counts, and the old
    /// global cell 0, contribute nothing. The entry count is unchanged.
    pub fn labels_inflate(&mut self, kind: AxisKind) {
        if kind.index() >= self.dimension() {
            return;
        }
        let hold = self.clone();
        let old = [self.xaxis.nbins, self.yaxis.nbins, self.zaxis.nbins];

        self.axis_mut(kind).inflate();
        let ncells = self.expected_cells();
        let errors = self.has_sumw2();
        self.ncells = ncells;
        self.array = vec![0.0; ncells];
        self.sumw2 = if errors { vec![0.0; ncells] } else { Vec::new() };
        self.minimum = UNSET_LIMIT;
        self.maximum = UNSET_LIMIT;

        for ibin in 0..ncells {
            let (bx, by, bz) = self.bin_xyz(ibin);
            if bx > old[0] || by > old[1] || bz > old[2] {
                continue;
            }
            let bin = hold.bin(bx as i64, by as i64, bz as i64);
            if bin == 0 {
                continue;
            }
            self.array[ibin] += hold.array.get(bin).copied().unwrap_or(0.0);
            if errors {
                self.sumw2[ibin] += hold.sumw2.get(bin).copied().unwrap_or(0.0);
            }
        }
    }
}

fn clamp_coord(coord: i64, n: usize) -> usize {
    coord.clamp(0, n as i64 - 1) as usize
}

/// Inverse-variance weight of one operand cell in a running-average merge.
fn merge_weight(error: f64, content: f64, has_variance: bool, stats: &Moments) -> f64 {
    if error > 0.0 {
        return 1.0 / (error * error);
    }
    if !has_variance {
        return 1.0;
    }
    if content == 0.0 {
        // estimated error from the global scale
        let sf = if stats.sumw() != 0.0 {
            stats.sumw2() / stats.sumw()
        } else {
            1.0
        };
        return 1.0 / (sf * sf);
    }
    HUGE_WEIGHT
}

impl ObjectGraph {
    /// `add` on two histogram objects of this graph.
    ///
    /// `other == None` is the missing-operand failure; nothing is changed.
    /// Subtracting a histogram from itself resets it, variance included.
    pub fn add_histogram(&mut self, id: ObjId, other: Option<ObjId>, c1: f64) -> Result<(), GraphError> {
        let other = other.ok_or(HistogramError::MissingOperand)?;
        if other == id && c1 < 0.0 {
            return self.update(id, Histogram::reset);
        }
        let other: Histogram = self.view(other)?;
        let mut this: Histogram = self.view(id)?;
        this.add(&other, c1)?;
        self.store(id, &this)
    }
}
