// reference.rs — CPU reference implementation of the scan kernel.
//
// `render_target` computes, cell for cell, the same bytes the GPU kernel
// writes into its render target, so the decoder and every property of the
// engine can be exercised without a GPU. The GPU scanner tests compare
// against this module.
//
// The kernel itself is trivial: one independent linear scan per target
// cell. What matters is that it matches shaders/scan.wgsl exactly:
//   - per-column: cell x scans rows 0..H of column x
//   - global:     cell y scans columns 0..W of row y
//   - first/last index with alpha > 0, encoded with `codec::encode_cell`

use crate::bitmap::Bitmap;
use crate::codec::{self, DecodeError, TargetLayout, CELL_BYTES};
use crate::extrema::{ColumnExtrema, Extrema, LineExtent, Orientation, ScanMode};

/// First and last drawn index of column `x`, scanning rows top-down.
pub fn column_span(bitmap: &Bitmap, x: usize) -> Option<(u32, u32)> {
    let first = (0..bitmap.height()).find(|&y| bitmap.is_drawn(x, y))?;
    // Scanning from the opposite edge always finds something once the
    // forward scan did.
    let last = (0..bitmap.height()).rev().find(|&y| bitmap.is_drawn(x, y))?;
    Some((first as u32, last as u32))
}

/// First and last drawn index of row `y`, scanning columns left to right.
pub fn row_span(bitmap: &Bitmap, y: usize) -> Option<(u32, u32)> {
    let row = bitmap.row(y);
    let first = row.iter().position(|px| px[3] > 0)?;
    let last = row.iter().rposition(|px| px[3] > 0)?;
    Some((first as u32, last as u32))
}

/// Render the scan target on the CPU. Returns tightly packed RGBA bytes in
/// the layout `codec::decode` expects.
pub fn render_target(bitmap: &Bitmap, mode: ScanMode) -> Vec<u8> {
    let (w, h) = (bitmap.width(), bitmap.height());
    match mode {
        ScanMode::PerColumn => {
            let mut out = Vec::with_capacity(w * CELL_BYTES);
            for x in 0..w {
                out.extend_from_slice(&codec::encode_cell(column_span(bitmap, x), h as u32));
            }
            out
        }
        ScanMode::Global => {
            let mut out = Vec::with_capacity(h * CELL_BYTES);
            for y in 0..h {
                out.extend_from_slice(&codec::encode_cell(row_span(bitmap, y), w as u32));
            }
            out
        }
    }
}

/// Full CPU scan: render the target, then decode it exactly as the GPU
/// path does. Results carry the same quantization as the GPU scanner.
///
/// An empty bitmap yields `DecodeError::EmptySource`.
pub fn scan(
    bitmap: &Bitmap,
    mode: ScanMode,
    orientation: Orientation,
) -> Result<Extrema, DecodeError> {
    let layout = TargetLayout::new(
        mode,
        bitmap.width() as u32,
        bitmap.height() as u32,
        orientation,
    );
    codec::decode(&render_target(bitmap, mode), &layout)
}

/// Unquantized extrema, straight from the bitmap. Top-down rows.
pub fn exact_extrema(bitmap: &Bitmap, mode: ScanMode) -> Extrema {
    match mode {
        ScanMode::PerColumn => {
            let mut out = ColumnExtrema::with_width(bitmap.width());
            for x in 0..bitmap.width() {
                if let Some((first, last)) = column_span(bitmap, x) {
                    out.top[x] = Some(first);
                    out.bottom[x] = Some(last);
                }
            }
            Extrema::PerColumn(out)
        }
        ScanMode::Global => {
            let mut drawn = (0..bitmap.height()).filter(|&y| row_span(bitmap, y).is_some());
            let extent = match drawn.next() {
                None => LineExtent::NOT_FOUND,
                Some(first) => {
                    let last = drawn.last().unwrap_or(first);
                    LineExtent::found(first as u32, last as u32)
                }
            };
            Extrema::Global(extent)
        }
    }
}
