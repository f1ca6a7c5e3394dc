// skyline-scan: GPU-accelerated boundary extraction for freehand drawings
//
// A stroke is drawn into a `Bitmap`, the bitmap is uploaded to a texture, and
// a fragment kernel reports the first and last drawn row, either for the
// whole image or for every column. `reference` holds the CPU version of the
// same kernel.

pub mod bitmap;
pub mod codec;
pub mod extrema;
pub mod overlay;
pub mod reference;
pub mod stroke;

pub mod gpu;

pub use bitmap::{Bitmap, Rgba};
pub use extrema::{ColumnExtrema, Extrema, LineExtent, Orientation, ScanMode};
