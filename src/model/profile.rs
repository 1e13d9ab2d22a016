//! Profile histograms: the mean of y in each x bin.
//!
//! `fArray` holds Σw·y per cell, `fSumw2` Σw·y², `fBinEntries` Σw and
//! `fBinSumw2` Σw².

use serde::{Deserialize, Serialize};

use super::axis::Axis;
use super::bits;
use super::float::{nan_if_null, vec_nan_if_null};
use super::histogram::Moments;
use crate::graph::TypedView;
use crate::registry::Capabilities;

const EMPTY: f64 = 1e-300;

/// What `bin_error` reports for a profile cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Standard error on the mean of y.
    #[default]
    Mean,
    /// Standard deviation of y.
    Spread,
    /// Spread over sqrt of the effective entries, with 1/sqrt(12) for integer data.
    SpreadI,
    /// 1/sqrt(Σw), for y gaussian with w = 1/σ².
    SpreadG,
}

impl ErrorMode {
    pub fn code(self) -> u8 {
        match self {
            Self::Mean => 0,
            Self::Spread => 1,
            Self::SpreadI => 2,
            Self::SpreadG => 3,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Spread,
            2 => Self::SpreadI,
            3 => Self::SpreadG,
            _ => Self::Mean,
        }
    }
}

mod error_mode_code {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::ErrorMode;

    pub fn serialize<S: Serializer>(mode: &ErrorMode, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(mode.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ErrorMode, D::Error> {
        Ok(ErrorMode::from_code(Option::<u8>::deserialize(deserializer)?.unwrap_or(0)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(rename = "_typename")]
    pub type_name: String,
    #[serde(rename = "fName")]
    pub name: String,
    #[serde(rename = "fTitle")]
    pub title: String,
    #[serde(rename = "fBits")]
    pub bits: u32,
    #[serde(rename = "fXaxis")]
    pub xaxis: Axis,
    #[serde(rename = "fNcells")]
    pub ncells: usize,
    #[serde(rename = "fArray", deserialize_with = "vec_nan_if_null")]
    pub array: Vec<f64>,
    #[serde(rename = "fSumw2", deserialize_with = "vec_nan_if_null")]
    pub sumw2: Vec<f64>,
    #[serde(rename = "fBinEntries", deserialize_with = "vec_nan_if_null")]
    pub bin_entries: Vec<f64>,
    #[serde(rename = "fBinSumw2", deserialize_with = "vec_nan_if_null")]
    pub bin_sumw2: Vec<f64>,
    #[serde(rename = "fErrorMode", with = "error_mode_code")]
    pub error_mode: ErrorMode,
    /// Use global statistics for cells with (near) zero spread.
    #[serde(rename = "fgApproximate")]
    pub approximate: bool,
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
    #[serde(rename = "fTsumwy", deserialize_with = "nan_if_null")]
    pub tsumwy: f64,
    #[serde(rename = "fTsumwy2", deserialize_with = "nan_if_null")]
    pub tsumwy2: f64,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            type_name: "TProfile".to_string(),
            name: String::new(),
            title: String::new(),
            bits: bits::DEFAULT_OBJECT_BITS,
            xaxis: Axis::uniform("xaxis", 0, 0.0, 0.0),
            ncells: 0,
            array: Vec::new(),
            sumw2: Vec::new(),
            bin_entries: Vec::new(),
            bin_sumw2: Vec::new(),
            error_mode: ErrorMode::Mean,
            approximate: false,
            entries: 0.0,
            tsumw: 0.0,
            tsumw2: 0.0,
            tsumwx: 0.0,
            tsumwx2: 0.0,
            tsumwy: 0.0,
            tsumwy2: 0.0,
        }
    }
}

impl TypedView for Profile {
    const NAME: &'static str = "Profile";
    const REQUIRED: Capabilities = Capabilities::PROFILE;
}

impl Profile {
    /// Empty profile with uniform bins.
    pub fn new(name: &str, nbins: usize, xmin: f64, xmax: f64) -> Self {
        let ncells = nbins + 2;
        Self {
            name: name.to_string(),
            xaxis: Axis::uniform("xaxis", nbins, xmin, xmax),
            ncells,
            array: vec![0.0; ncells],
            sumw2: vec![0.0; ncells],
            bin_entries: vec![0.0; ncells],
            bin_sumw2: vec![0.0; ncells],
            ..Self::default()
        }
    }

    /// Accumulate one (x, y) measurement with weight `w`.
    pub fn fill(&mut self, x: f64, y: f64, w: f64) {
        let bin = self.find_bin(x);
        let Some(cell) = self.checked(bin as i64) else {
            return;
        };
        for (values, v) in [
            (&mut self.array, w * y),
            (&mut self.sumw2, w * y * y),
            (&mut self.bin_entries, w),
            (&mut self.bin_sumw2, w * w),
        ] {
            if let Some(slot) = values.get_mut(cell) {
                *slot += v;
            }
        }
        self.entries += 1.0;
        if (1..=self.xaxis.nbins).contains(&bin) {
            self.tsumw += w;
            self.tsumw2 += w * w;
            self.tsumwx += w * x;
            self.tsumwx2 += w * x * x;
            self.tsumwy += w * y;
            self.tsumwy2 += w * y * y;
        }
    }

    /// Cell of `x` on a uniform axis, with under/overflow. NaN is underflow.
    fn find_bin(&self, x: f64) -> usize {
        let axis = &self.xaxis;
        if x.is_nan() || x < axis.xmin {
            0
        } else if x >= axis.xmax {
            axis.nbins + 1
        } else {
            let pos = (x - axis.xmin) / (axis.xmax - axis.xmin) * axis.nbins as f64;
            (pos as usize + 1).min(axis.nbins)
        }
    }

    fn checked(&self, bin: i64) -> Option<usize> {
        (bin >= 0 && (bin as usize) < self.ncells).then_some(bin as usize)
    }

    fn entries_at(&self, cell: usize) -> f64 {
        self.bin_entries.get(cell).copied().unwrap_or(0.0)
    }

    /// Mean y of a cell; 0 for empty or out-of-range cells.
    pub fn bin_content(&self, bin: i64) -> f64 {
        let Some(cell) = self.checked(bin) else {
            return 0.0;
        };
        let sum = self.entries_at(cell);
        if sum < EMPTY {
            return 0.0;
        }
        self.array.get(cell).map_or(0.0, |wy| wy / sum)
    }

    /// (Σw)² / Σw² of a cell, or Σw when per-cell Σw² is not stored.
    pub fn bin_effective_entries(&self, bin: i64) -> f64 {
        let Some(cell) = self.checked(bin) else {
            return 0.0;
        };
        let sum = self.entries_at(cell);
        if self.bin_sumw2.len() != self.ncells {
            return sum;
        }
        let sum2 = self.bin_sumw2[cell];
        if sum2 > 0.0 {
            sum * sum / sum2
        } else {
            0.0
        }
    }

    /// {Σw, Σw², Σwx, Σwx², Σwy, Σwy²} in the first six slots.
    pub fn stats(&self) -> Moments {
        let mut s = [0.0; Moments::LEN];
        let (first, last) = (self.xaxis.first_visible_bin(), self.xaxis.last_visible_bin());
        let at = |values: &[f64], bin: usize| values.get(bin).copied().unwrap_or(0.0);

        if self.tsumw < EMPTY || self.xaxis.has_range() {
            for bin in first..=last {
                let w = at(&self.bin_entries, bin);
                let w2 = if self.bin_sumw2.is_empty() { w } else { at(&self.bin_sumw2, bin) };
                let x = self.xaxis.bin_center(bin as i64);
                s[0] += w;
                s[1] += w2;
                s[2] += w * x;
                s[3] += w * x * x;
                s[4] += at(&self.array, bin);
                s[5] += at(&self.sumw2, bin);
            }
            return Moments(s);
        }

        s[0] = self.tsumw;
        s[1] = self.tsumw2;
        s[2] = self.tsumwx;
        s[3] = self.tsumwx2;
        s[4] = self.tsumwy;
        s[5] = self.tsumwy2;
        if self.tsumwy < EMPTY && self.tsumwy2 < EMPTY {
            // older payloads do not store the y sums
            s[4] = (first..=last).map(|bin| at(&self.array, bin)).sum();
            s[5] = (first..=last).map(|bin| at(&self.sumw2, bin)).sum();
        }
        Moments(s)
    }

    pub fn mean(&self, axis: u32) -> f64 {
        self.stats().mean(axis)
    }

    pub fn rms(&self, axis: u32) -> f64 {
        self.stats().rms(axis)
    }

    /// Error of a cell according to [`ErrorMode`].
    pub fn bin_error(&self, bin: i64) -> f64 {
        let Some(cell) = self.checked(bin) else {
            return 0.0;
        };
        let cont = self.array.get(cell).copied().unwrap_or(0.0);
        let sum = self.entries_at(cell);
        let err2 = self.sumw2.get(cell).copied().unwrap_or(0.0);
        let neff = self.bin_effective_entries(bin);
        if sum < EMPTY {
            return 0.0;
        }
        if self.error_mode == ErrorMode::SpreadG {
            return 1.0 / sum.sqrt();
        }

        let contsum = cont / sum;
        let eprim2 = (err2 / sum - contsum * contsum).abs();
        let mut eprim = eprim2.sqrt();

        if self.error_mode == ErrorMode::SpreadI {
            if eprim != 0.0 {
                return eprim / neff.sqrt();
            }
            // integer y: each value carries +/- 1/sqrt(12)
            return 1.0 / (12.0 * neff).sqrt();
        }

        let testing = if err2 != 0.0 && neff < 5.0 { eprim2 * sum / err2 } else { 1.0 };
        if self.approximate && (testing < 1e-4 || eprim2 < 1e-6) {
            let stats = self.stats();
            let ssum = stats.0[0];
            let scontsum = stats.0[4] / ssum;
            let seprim2 = (stats.0[5] / ssum - scontsum * scontsum).abs();
            eprim = 2.0 * seprim2.sqrt();
        }

        match self.error_mode {
            ErrorMode::Spread => eprim,
            _ => eprim / neff.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        let mut p = Profile::new("p", 2, 0.0, 2.0);
        p.fill(0.5, 1.0, 1.0);
        p.fill(0.5, 3.0, 1.0);
        p.fill(1.5, 5.0, 2.0);
        p
    }

    #[test]
    fn test_bin_content_is_mean_y() {
        let p = profile();
        assert_eq!(p.bin_content(1), 2.0);
        assert_eq!(p.bin_content(2), 5.0);
        assert_eq!(p.bin_content(0), 0.0);
        assert_eq!(p.bin_content(42), 0.0);
    }

    #[test]
    fn test_nan_fills_underflow() {
        let mut p = Profile::new("p", 2, 0.0, 2.0);
        p.fill(f64::NAN, 1.0, 1.0);
        assert_eq!(p.bin_entries[0], 1.0);
        assert_eq!(p.bin_entries[1], 0.0);
        assert_eq!(p.bin_entries[2], 0.0);
        assert_eq!(p.tsumw, 0.0);
    }

    #[test]
    fn test_effective_entries() {
        let p = profile();
        assert_eq!(p.bin_effective_entries(1), 2.0);
        assert_eq!(p.bin_effective_entries(2), 1.0);

        let mut old = p.clone();
        old.bin_sumw2.clear();
        assert_eq!(old.bin_effective_entries(2), 2.0);
    }

    #[test]
    fn test_error_modes() {
        let mut p = profile();
        // bin 1: y = 1, 3 -> spread 1, neff 2
        assert_eq!(p.bin_error(1), 1.0 / 2f64.sqrt());
        p.error_mode = ErrorMode::Spread;
        assert_eq!(p.bin_error(1), 1.0);
        p.error_mode = ErrorMode::SpreadG;
        assert_eq!(p.bin_error(2), 1.0 / 2f64.sqrt());
        p.error_mode = ErrorMode::SpreadI;
        // bin 2 has zero spread
        assert_eq!(p.bin_error(2), 1.0 / 12f64.sqrt());
    }

    #[test]
    fn test_stats_cached_and_recomputed() {
        let p = profile();
        let cached = p.stats();
        assert_eq!(cached.0[0], 4.0);
        assert_eq!(cached.0[4], 14.0);
        assert_eq!(p.mean(2), 14.0 / 4.0);

        let mut ranged = p.clone();
        ranged.xaxis.set_range(2, 2);
        let stats = ranged.stats();
        assert_eq!(stats.0[0], 2.0);
        assert_eq!(stats.0[1], 4.0);
        assert_eq!(stats.0[4], 10.0);
    }

    #[test]
    fn test_stats_fill_in_missing_y_sums() {
        let mut p = profile();
        p.tsumwy = 0.0;
        p.tsumwy2 = 0.0;
        assert_eq!(p.stats().0[4], 14.0);
    }
}
