// gpu/mod.rs — GPU layer of the boundary scanner.
//
// The scan runs as a single render pass: a full-target quad is drawn into a
// tiny render target (W×1 per column, 1×H global) and the fragment kernel in
// shaders/scan.wgsl computes one boundary cell per fragment. The CPU kernel
// in `crate::reference` produces the same target layout (up to rounding
// ties in the 8-bit encoding) and is the oracle every GPU test compares
// against.
//
//   device     adapter selection, limits, validation-error capture
//   texture    the W×H source texture and its upload
//   readback   blocking target → CPU copy
//   scanner    pipeline, targets, the `scan` entry point

pub mod device;
pub mod readback;
pub mod scanner;
pub mod texture;

pub use device::{DeviceProfile, GpuDevice, GpuError};
pub use scanner::{GpuBoundaryScanner, ScanConfig, ScanError};
