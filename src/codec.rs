// codec.rs — 8-bit channel encoding of scan results, and the CPU decoder.
//
// CELL LAYOUT (Rgba8Unorm, one cell per target pixel)
// ────────────────────────────────────────────────────
//   R  first alpha-present index along the scan axis, round(i / len * 255)
//   G  last alpha-present index along the scan axis,  round(i / len * 255)
//   B  reserved, always 0
//   A  found flag: 255 = found, 0 = nothing drawn on this line
//
// The flag lives in its own channel so that "found at index 0" (R = 0,
// A = 255) and "not found" (A = 0) never share an encoding. The kernel in
// shaders/scan.wgsl writes exactly this layout; `encode_cell` is its CPU
// twin and the reference kernel uses it.
//
// QUANTIZATION
// ─────────────
// Encoding divides by the line length and keeps 8 bits, so decoding
// `round(byte / 255 * len)` is off by at most `ceil(len / 255)` rows. For
// len <= 255 every row survives the round trip exactly.

use crate::extrema::{ColumnExtrema, Extrema, LineExtent, Orientation, ScanMode};

/// Bytes per target cell.
pub const CELL_BYTES: usize = 4;

/// Flag channel value for a line with at least one drawn texel.
pub const FLAG_FOUND: u8 = 255;

/// Flag channel value for a line with nothing drawn (the sentinel).
pub const FLAG_NOT_FOUND: u8 = 0;

/// Errors from decoding a read-back target buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The layout describes a zero-sized source bitmap.
    #[error("cannot decode a target for an empty {width}×{height} source")]
    EmptySource { width: u32, height: u32 },
    /// Buffer length does not match `cells * 4`.
    #[error("target buffer is {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    /// A flag byte other than 0 or 255. Indicates a corrupted transfer or a
    /// target format the kernel did not write.
    #[error("cell {cell} has flag byte {value}, expected {FLAG_NOT_FOUND} or {FLAG_FOUND}")]
    InvalidFlag { cell: usize, value: u8 },
}

/// Everything the decoder needs to interpret a target buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLayout {
    pub mode: ScanMode,
    /// Source bitmap width in pixels.
    pub src_width: u32,
    /// Source bitmap height in pixels.
    pub src_height: u32,
    pub orientation: Orientation,
}

impl TargetLayout {
    pub fn new(mode: ScanMode, src_width: u32, src_height: u32, orientation: Orientation) -> Self {
        TargetLayout { mode, src_width, src_height, orientation }
    }

    /// Number of target cells (pixels).
    pub fn cells(&self) -> usize {
        let (w, h) = self.mode.target_size(self.src_width, self.src_height);
        w as usize * h as usize
    }

    /// Expected tightly packed buffer length in bytes.
    pub fn byte_len(&self) -> usize {
        self.cells() * CELL_BYTES
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Quantize an index along a line of `len` texels to one channel byte.
#[inline]
pub fn encode_position(pos: u32, len: u32) -> u8 {
    debug_assert!(len > 0 && pos < len);
    ((pos as f32 / len as f32) * 255.0).round() as u8
}

/// Inverse of `encode_position`, clamped into `[0, len)`.
#[inline]
pub fn decode_position(byte: u8, len: u32) -> u32 {
    debug_assert!(len > 0);
    let pos = ((byte as f32 / 255.0) * len as f32).round() as u32;
    pos.min(len - 1)
}

/// Encode one cell. `span` is `(first, last)` along a line of `len` texels.
pub fn encode_cell(span: Option<(u32, u32)>, len: u32) -> [u8; CELL_BYTES] {
    match span {
        Some((first, last)) => [
            encode_position(first, len),
            encode_position(last, len),
            0,
            FLAG_FOUND,
        ],
        None => [0, 0, 0, FLAG_NOT_FOUND],
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a tightly packed target buffer into `Extrema`.
///
/// `raw` must hold exactly `layout.byte_len()` bytes, rows without padding
/// (see `gpu::readback`, which strips the copy alignment).
pub fn decode(raw: &[u8], layout: &TargetLayout) -> Result<Extrema, DecodeError> {
    let (w, h) = (layout.src_width, layout.src_height);
    if w == 0 || h == 0 {
        return Err(DecodeError::EmptySource { width: w, height: h });
    }
    let expected = layout.byte_len();
    if raw.len() != expected {
        return Err(DecodeError::LengthMismatch { expected, actual: raw.len() });
    }

    // Validate every flag before interpreting anything.
    for (cell, px) in raw.chunks_exact(CELL_BYTES).enumerate() {
        let flag = px[3];
        if flag != FLAG_FOUND && flag != FLAG_NOT_FOUND {
            return Err(DecodeError::InvalidFlag { cell, value: flag });
        }
    }
    let cells = raw.chunks_exact(CELL_BYTES);

    match layout.mode {
        ScanMode::PerColumn => {
            let mut out = ColumnExtrema::with_width(w as usize);
            for (x, px) in cells.enumerate() {
                if px[3] == FLAG_NOT_FOUND {
                    continue;
                }
                let first = decode_position(px[0], h);
                let last = decode_position(px[1], h).max(first);
                let (top, bottom) = layout.orientation.apply(first, last, h);
                out.top[x] = Some(top);
                out.bottom[x] = Some(bottom);
            }
            Ok(Extrema::PerColumn(out))
        }
        ScanMode::Global => {
            // One cell per row; the cell index *is* the row, so the global
            // pair carries no quantization error.
            let mut rows = cells
                .enumerate()
                .filter(|(_, px)| px[3] == FLAG_FOUND)
                .map(|(y, _)| y as u32);
            let extent = match rows.next() {
                None => LineExtent::NOT_FOUND,
                Some(first) => {
                    let last = rows.last().unwrap_or(first);
                    let (top, bottom) = layout.orientation.apply(first, last, h);
                    LineExtent::found(top, bottom)
                }
            };
            Ok(Extrema::Global(extent))
        }
    }
}
