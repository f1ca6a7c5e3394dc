// extrema.rs — scan modes and the decoded scan result.
//
// A scan reports, per scan line, the drawn row closest to the scan-start
// edge (`top`) and the one closest to the opposite edge (`bottom`).
// "Not found" is `None`, never a number: row 0 is a legitimate answer.

use std::fmt;

/// Which target shape the kernel renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    /// `1×H` target: one cell per image row, reduced to a single
    /// `(top, bottom)` pair for the whole bitmap.
    Global,
    /// `W×1` target: one cell per image column, one pair per column.
    PerColumn,
}

impl ScanMode {
    /// Target dimensions `(width, height)` for a `src_w × src_h` bitmap.
    pub fn target_size(self, src_w: u32, src_h: u32) -> (u32, u32) {
        match self {
            ScanMode::Global => (1, src_h),
            ScanMode::PerColumn => (src_w, 1),
        }
    }

    /// Kernel axis selector, must match `params.axis` in scan.wgsl.
    pub(crate) fn axis(self) -> u32 {
        match self {
            ScanMode::PerColumn => 0,
            ScanMode::Global => 1,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Global => write!(f, "global"),
            ScanMode::PerColumn => write!(f, "per-column"),
        }
    }
}

/// Which edge rows are counted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Row 0 is the top edge of the bitmap.
    #[default]
    TopDown,
    /// Row 0 is the bottom edge (GL framebuffer convention). The scan then
    /// starts at the bottom, so `top` is the drawn row nearest the bottom.
    BottomUp,
}

impl Orientation {
    /// Map a `(first, last)` pair of top-down rows into this orientation's
    /// `(top, bottom)`.
    pub fn apply(self, first: u32, last: u32, height: u32) -> (u32, u32) {
        match self {
            Orientation::TopDown => (first, last),
            Orientation::BottomUp => (height - 1 - last, height - 1 - first),
        }
    }
}

/// Largest decode error, in rows, after 8-bit channel quantization:
/// `ceil(height / 255)`.
pub fn quantization_step(height: u32) -> u32 {
    height.div_ceil(255)
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Extent of the drawn region along one scan line.
///
/// Either both fields are `Some` or both are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineExtent {
    pub top: Option<u32>,
    pub bottom: Option<u32>,
}

impl LineExtent {
    pub const NOT_FOUND: LineExtent = LineExtent { top: None, bottom: None };

    pub fn found(top: u32, bottom: u32) -> Self {
        LineExtent { top: Some(top), bottom: Some(bottom) }
    }

    /// Both rows when the line holds any drawn pixel.
    pub fn rows(&self) -> Option<(u32, u32)> {
        self.top.zip(self.bottom)
    }

    pub fn is_found(&self) -> bool {
        self.rows().is_some()
    }
}

/// Per-column extrema: `top[x]` and `bottom[x]` for every column `x`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnExtrema {
    pub top: Vec<Option<u32>>,
    pub bottom: Vec<Option<u32>>,
}

impl ColumnExtrema {
    pub fn with_width(width: usize) -> Self {
        ColumnExtrema { top: vec![None; width], bottom: vec![None; width] }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.top.len()
    }

    pub fn column(&self, x: usize) -> LineExtent {
        LineExtent { top: self.top[x], bottom: self.bottom[x] }
    }

    /// Iterate `(x, extent)` over every column.
    pub fn columns(&self) -> impl Iterator<Item = (usize, LineExtent)> + '_ {
        (0..self.width()).map(move |x| (x, self.column(x)))
    }

    /// Columns that hold at least one drawn pixel.
    pub fn found_columns(&self) -> impl Iterator<Item = (usize, u32, u32)> + '_ {
        self.columns().filter_map(|(x, e)| e.rows().map(|(t, b)| (x, t, b)))
    }
}

/// Decoded result of one scan call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extrema {
    Global(LineExtent),
    PerColumn(ColumnExtrema),
}

impl Extrema {
    pub fn mode(&self) -> ScanMode {
        match self {
            Extrema::Global(_) => ScanMode::Global,
            Extrema::PerColumn(_) => ScanMode::PerColumn,
        }
    }

    pub fn as_global(&self) -> Option<LineExtent> {
        match self {
            Extrema::Global(e) => Some(*e),
            Extrema::PerColumn(_) => None,
        }
    }

    pub fn as_columns(&self) -> Option<&ColumnExtrema> {
        match self {
            Extrema::PerColumn(c) => Some(c),
            Extrema::Global(_) => None,
        }
    }

    /// Re-express rows decoded with `orientation` as top-down rows of a
    /// bitmap `height` pixels tall. `TopDown` input is returned unchanged.
    pub fn to_top_down(&self, orientation: Orientation, height: u32) -> Extrema {
        if orientation == Orientation::TopDown {
            return self.clone();
        }
        let flip = |row: u32| height.saturating_sub(1).saturating_sub(row);
        match self {
            // Bottom-up `top` is the row nearest the bottom edge, so the
            // pair swaps as well as flips.
            Extrema::Global(e) => Extrema::Global(LineExtent {
                top: e.bottom.map(flip),
                bottom: e.top.map(flip),
            }),
            Extrema::PerColumn(c) => Extrema::PerColumn(ColumnExtrema {
                top: c.bottom.iter().map(|r| r.map(flip)).collect(),
                bottom: c.top.iter().map(|r| r.map(flip)).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_size() {
        assert_eq!(ScanMode::Global.target_size(640, 480), (1, 480));
        assert_eq!(ScanMode::PerColumn.target_size(640, 480), (640, 1));
    }

    #[test]
    fn test_quantization_step() {
        assert_eq!(quantization_step(1), 1);
        assert_eq!(quantization_step(100), 1);
        assert_eq!(quantization_step(255), 1);
        assert_eq!(quantization_step(256), 2);
        assert_eq!(quantization_step(1080), 5);
    }

    #[test]
    fn test_bottom_up_swaps_and_flips() {
        // Drawn rows 2..=5 of a 10-row bitmap, counted from the bottom: 4..=7.
        assert_eq!(Orientation::BottomUp.apply(2, 5, 10), (4, 7));
        assert_eq!(Orientation::TopDown.apply(2, 5, 10), (2, 5));
        assert_eq!(Orientation::BottomUp.apply(0, 9, 10), (0, 9));
    }

    #[test]
    fn test_line_extent_rows() {
        assert_eq!(LineExtent::found(0, 0).rows(), Some((0, 0)));
        assert!(!LineExtent::NOT_FOUND.is_found());
        assert_eq!(LineExtent::default(), LineExtent::NOT_FOUND);
    }

    #[test]
    fn test_found_columns() {
        let mut cols = ColumnExtrema::with_width(4);
        cols.top[1] = Some(3);
        cols.bottom[1] = Some(7);
        let found: Vec<_> = cols.found_columns().collect();
        assert_eq!(found, vec![(1, 3, 7)]);
        assert_eq!(cols.column(0), LineExtent::NOT_FOUND);
    }

    #[test]
    fn test_to_top_down_inverts_bottom_up() {
        let (top, bottom) = Orientation::BottomUp.apply(2, 5, 10);
        let global = Extrema::Global(LineExtent::found(top, bottom));
        assert_eq!(
            global.to_top_down(Orientation::BottomUp, 10),
            Extrema::Global(LineExtent::found(2, 5))
        );
        assert_eq!(global.to_top_down(Orientation::TopDown, 10), global);

        let mut cols = ColumnExtrema::with_width(2);
        cols.top[0] = Some(0);
        cols.bottom[0] = Some(9);
        let flipped = Extrema::PerColumn(cols).to_top_down(Orientation::BottomUp, 10);
        let flipped = flipped.as_columns().expect("per-column");
        assert_eq!(flipped.column(0).rows(), Some((0, 9)));
        assert_eq!(flipped.column(1), LineExtent::NOT_FOUND);

        let none = Extrema::Global(LineExtent::NOT_FOUND);
        assert_eq!(none.to_top_down(Orientation::BottomUp, 10), none);
    }
}
