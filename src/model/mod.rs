//! Typed models: axis, histogram, profile and point series.
//!
//! Each model is a [`TypedView`](crate::graph::TypedView): it is read out of
//! a graph object, operated on, and written back in place.

mod axis;
pub mod bits;
mod float;
mod histogram;
mod profile;
mod series;

use serde::{Deserialize, Serialize};

pub use axis::Axis;
pub use histogram::{AxisKind, Histogram, Moments};
pub use profile::{ErrorMode, Profile};
pub use series::{PointSeries, Range};

/// Per-bin error model of a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinErrorOption {
    /// sqrt of the variance, or of |content| without a variance array.
    #[default]
    Normal,
    /// Poisson interval at 68.3% CL.
    Poisson,
    /// Poisson interval at 95% CL.
    Poisson2,
}

impl BinErrorOption {
    /// Numeric code stored in `fBinStatErrOpt`.
    pub fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Poisson => 1,
            Self::Poisson2 => 2,
        }
    }

    /// Unknown codes read as `Normal`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Poisson,
            2 => Self::Poisson2,
            _ => Self::Normal,
        }
    }

    /// Two-sided tail probability of the interval.
    pub(crate) fn alpha(self) -> f64 {
        match self {
            Self::Poisson2 => 0.05,
            _ => 1.0 - 0.682_689_492,
        }
    }
}
