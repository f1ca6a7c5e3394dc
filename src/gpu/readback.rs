// gpu/readback.rs — blocking texture → CPU transfer.
//
// This is the engine's only suspension point: after the scan draw is
// submitted we copy the render target into a MAP_READ buffer and block on
// `device.poll(Wait)` until the map callback fires. There is no async
// variant and no timeout.
//
// ROW ALIGNMENT
// ──────────────
// `copy_texture_to_buffer` needs `bytes_per_row` to be a multiple of 256.
// A W×1 target with W = 100 has 400 real bytes per row, padded to 512; a
// 1×H target has 4 real bytes in each of its H 256-byte rows. The padding is
// stripped here so the decoder always sees tightly packed cells.

use crate::gpu::device::GpuDevice;
use crate::gpu::texture::{align_to, COPY_ALIGNMENT};

/// Bytes per RGBA8 texel.
const TEXEL_BYTES: u32 = 4;

/// Copy an RGBA8 texture to the CPU. Returns `width * height * 4` bytes,
/// row-major, no padding.
pub fn read_texture(
    gpu: &GpuDevice,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, wgpu::BufferAsyncError> {
    let row_bytes = width * TEXEL_BYTES;
    let aligned_bytes_per_row = align_to(row_bytes, COPY_ALIGNMENT);
    let readback_size = (aligned_bytes_per_row * height) as u64;

    let readback_buf = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback"),
        size: readback_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback"),
        });

    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &readback_buf,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(aligned_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    gpu.queue.submit(std::iter::once(encoder.finish()));

    let buf_slice = readback_buf.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    buf_slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver outlives the poll below; a failed send only means
        // we already gave up.
        let _ = sender.send(result);
    });

    gpu.device.poll(wgpu::Maintain::Wait);
    receiver.recv().unwrap_or(Err(wgpu::BufferAsyncError))?;

    let mapped = buf_slice.get_mapped_range();
    let out = strip_row_padding(&mapped, row_bytes as usize, aligned_bytes_per_row as usize, height as usize);
    drop(mapped);
    readback_buf.unmap();

    Ok(out)
}

/// Keep the first `row_bytes` of every `padded_row` bytes.
pub(crate) fn strip_row_padding(data: &[u8], row_bytes: usize, padded_row: usize, rows: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(row_bytes * rows);
    for y in 0..rows {
        let start = y * padded_row;
        out.extend_from_slice(&data[start..start + row_bytes]);
    }
    out
}
