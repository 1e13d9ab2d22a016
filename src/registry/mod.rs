//! Type registry - capability tags and zero-value construction.
//!
//! Capabilities are decided once, from the type name, when an object is
//! decoded or constructed, and stored on the object. Matching is by prefix
//! or exact name, not by a class hierarchy: `TH2F` is a histogram, a 2D
//! histogram and a moments provider all at once.
//!
//! | Type name               | Tags                                    |
//! |-------------------------|-----------------------------------------|
//! | `TAxis*`                | `AXIS`                                  |
//! | `TList`, `THashList`    | `LIST`                                  |
//! | `TPaveText`, `TPaveStats` | `PAVE_TEXT`                           |
//! | `TF1`, `*TFormula*`     | `FUNCTION`                              |
//! | `TGraph*`, `TCutG`      | `GRAPH`                                 |
//! | `TH1*` / `TH2*` / `TH3*`| `HISTOGRAM`, `HIST_1D/2D/3D`, `MOMENTS` |
//! | `TProfile*`             | `PROFILE`, `MOMENTS`                    |
//! | any object with `fBits` | `BITS`                                  |

mod factory;
mod ops;

use bitflags::bitflags;

use crate::graph::Object;

pub use factory::{Factory, TypeName, DUMMY_TITLE};

bitflags! {
    /// Operation sets an object supports.
    ///
    /// # Example
    ///
    /// ```
    /// use rootgraph::Capabilities;
    ///
    /// let caps = Capabilities::for_type_name("TH2F");
    /// assert!(caps.contains(Capabilities::HISTOGRAM | Capabilities::HIST_2D));
    /// assert_eq!(caps.dimension(), Some(2));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u16 {
        /// `testBit` / `invertBit` on `fBits`.
        const BITS = 1 << 0;
        /// Visible range and bin geometry.
        const AXIS = 1 << 1;
        /// Ordered (object, option) container.
        const LIST = 1 << 2;
        /// Text lines on a pave.
        const PAVE_TEXT = 1 << 3;
        /// Parameter names and values of a function.
        const FUNCTION = 1 << 4;
        /// Point series: range, point-in-polygon, framing.
        const GRAPH = 1 << 5;

        // =====================================================================
        // HISTOGRAMS
        // =====================================================================

        /// Cell storage, errors, statistics, merge.
        const HISTOGRAM = 1 << 6;
        const HIST_1D = 1 << 7;
        const HIST_2D = 1 << 8;
        const HIST_3D = 1 << 9;
        /// `getMean` / `getRMS`.
        const MOMENTS = 1 << 10;
        /// Profile cells (mean of y per x bin).
        const PROFILE = 1 << 11;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::empty()
    }
}

impl Capabilities {
    /// Tags implied by a type name alone.
    pub fn for_type_name(name: &str) -> Self {
        let mut caps = Self::empty();

        if name.starts_with("TAxis") {
            caps |= Self::AXIS;
        }
        if name == "TList" || name == "THashList" {
            caps |= Self::LIST;
        }
        if name == "TPaveText" || name == "TPaveStats" {
            caps |= Self::PAVE_TEXT;
        }
        if name == "TF1" || name.contains("TFormula") {
            caps |= Self::FUNCTION;
        }
        if name.starts_with("TGraph") || name == "TCutG" {
            caps |= Self::GRAPH;
        }
        if name.starts_with("TH1") {
            caps |= Self::HISTOGRAM | Self::HIST_1D | Self::MOMENTS;
        }
        if name.starts_with("TH2") {
            caps |= Self::HISTOGRAM | Self::HIST_2D | Self::MOMENTS;
        }
        if name.starts_with("TH3") {
            caps |= Self::HISTOGRAM | Self::HIST_3D | Self::MOMENTS;
        }
        if name.starts_with("TProfile") {
            caps |= Self::PROFILE | Self::MOMENTS;
        }

        caps
    }

    /// Histogram dimension; the highest matching bucket wins.
    pub fn dimension(self) -> Option<u8> {
        if self.contains(Self::HIST_3D) {
            Some(3)
        } else if self.contains(Self::HIST_2D) {
            Some(2)
        } else if self.intersects(Self::HIST_1D | Self::PROFILE) {
            Some(1)
        } else {
            None
        }
    }
}

/// Compute and store the capability set of an object.
///
/// Histograms additionally get their `fDimension` field set. Unknown type
/// names still get `BITS` when the object carries `fBits`.
pub fn attach_operations(object: &mut Object) {
    let mut caps = object
        .type_name()
        .map(Capabilities::for_type_name)
        .unwrap_or_default();

    if object.contains("fBits") {
        caps |= Capabilities::BITS;
    }
    if let Some(dimension) = caps.dimension() {
        object.set("fDimension", i64::from(dimension));
    }

    object.set_capabilities(caps);
}
