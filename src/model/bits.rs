//! Status bit constants stored in `fBits`.

/// Single-bit mask.
pub const fn bit(n: u32) -> u32 {
    1 << n
}

/// `fBits` of a freshly constructed object.
pub const DEFAULT_OBJECT_BITS: u32 = 0x0300_0008;

/// Histogram status bits.
pub mod hist {
    use super::bit;

    /// Don't draw the stats box.
    pub const NO_STATS: u32 = bit(9);
    /// User specified contour levels.
    pub const USER_CONTOUR: u32 = bit(10);
    /// Axis may be extended when filling beyond its range.
    pub const CAN_REBIN: u32 = bit(11);
    pub const LOG_X: u32 = bit(15);
    /// Zoomed on the Y axis.
    pub const IS_ZOOMED: u32 = bit(16);
    pub const NO_TITLE: u32 = bit(17);
    /// Cell contents are averages; merges use inverse-variance weighting.
    pub const IS_AVERAGE: u32 = bit(18);
}

/// Axis status bits.
pub mod axis {
    use super::bit;

    pub const TICK_PLUS: u32 = bit(9);
    pub const TICK_MINUS: u32 = bit(10);
    /// A visible sub-range (`fFirst`..`fLast`) is active.
    pub const AXIS_RANGE: u32 = bit(11);
    pub const CENTER_TITLE: u32 = bit(12);
    pub const CENTER_LABELS: u32 = bit(14);
    pub const ROTATE_TITLE: u32 = bit(15);
    pub const PALETTE: u32 = bit(16);
    pub const NO_EXPONENT: u32 = bit(17);
    pub const LABELS_HORI: u32 = bit(18);
    pub const LABELS_VERT: u32 = bit(19);
    pub const LABELS_DOWN: u32 = bit(20);
    pub const LABELS_UP: u32 = bit(21);
    pub const IS_INTEGER: u32 = bit(22);
    pub const MORE_LOG_LABELS: u32 = bit(23);
    /// Shares its bit with `AXIS_RANGE`.
    pub const DECIMALS: u32 = bit(11);
}

/// Only the low 24 bits are user-toggleable.
pub(crate) fn invert(bits: u32, mask: u32) -> u32 {
    bits ^ (mask & 0x00ff_ffff)
}
