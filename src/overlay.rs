// overlay.rs — composite boundary markers over the source bitmap.
//
// Global mode draws two full-width horizontal lines (top in red, bottom in
// blue). Per-column mode draws a short vertical tick at each column's top and
// bottom row. Bottom markers go on after top markers, so where they overlap
// (a one-pixel-tall stroke) the bottom colour wins.
//
// Markers are painted in bitmap rows (top-down). Extrema decoded with
// `Orientation::BottomUp` are flipped back first, so the caller passes the
// orientation the scanner was configured with.

use crate::bitmap::{Bitmap, Rgba};
use crate::extrema::{Extrema, Orientation};

/// Marker colours and thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub top_color: Rgba,
    pub bottom_color: Rgba,
    /// Marker thickness in pixels, centred on the marked row.
    pub line_width: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        OverlayStyle {
            top_color: [0xff, 0x00, 0x00, 0xff],
            bottom_color: [0x00, 0x00, 0xff, 0xff],
            line_width: 5,
        }
    }
}

impl OverlayStyle {
    /// Rows covered by a marker centred on `row`, before clipping.
    fn rows(&self, row: u32) -> std::ops::Range<i64> {
        let w = self.line_width.max(1) as i64;
        let start = row as i64 - (w - 1) / 2;
        start..start + w
    }
}

/// Copy `source` and paint the markers for `extrema` onto the copy.
pub fn compose(
    source: &Bitmap,
    extrema: &Extrema,
    orientation: Orientation,
    style: &OverlayStyle,
) -> Bitmap {
    let mut out = source.clone();
    paint(&mut out, extrema, orientation, style);
    out
}

/// Paint markers in place.
pub fn paint(target: &mut Bitmap, extrema: &Extrema, orientation: Orientation, style: &OverlayStyle) {
    let width = target.width() as i64;
    let extrema = extrema.to_top_down(orientation, target.height() as u32);
    match &extrema {
        Extrema::Global(extent) => {
            for (row, color) in [(extent.top, style.top_color), (extent.bottom, style.bottom_color)] {
                let Some(row) = row else { continue };
                for y in style.rows(row) {
                    for x in 0..width {
                        target.set_clipped(x, y, color);
                    }
                }
            }
        }
        Extrema::PerColumn(cols) => {
            for (rows, color) in [(&cols.top, style.top_color), (&cols.bottom, style.bottom_color)] {
                for (x, row) in rows.iter().enumerate() {
                    let Some(row) = *row else { continue };
                    for y in style.rows(row) {
                        target.set_clipped(x as i64, y, color);
                    }
                }
            }
        }
    }
}
