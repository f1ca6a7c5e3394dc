// gpu/texture.rs — the source bitmap as a sampled GPU texture.
//
// RESPONSIBILITIES
// ─────────────────
// 1. `SourceTexture` — one RGBA8 texture + view + sampler, sized to the
//    scanner's bitmap dimensions and created exactly once.
//
// 2. `SourceTexture::upload()` — overwrite the texture contents with a
//    snapshot of a `Bitmap`, compacting stride padding.
//
// 3. Readback — copy the texture back to CPU. Used only in tests.
//
//
// SAMPLING POLICY (fixed at creation, never changed per call)
// ────────────────────────────────────────────────────────────
//   filter = Nearest        no interpolation: a half-covered edge texel must
//                           not bleed alpha into its transparent neighbour,
//                           or fade a drawn texel below the alpha > 0 test.
//   wrap   = ClampToEdge    texel-centre coordinates on row 0 / row H-1 must
//                           never wrap around to the opposite border.
//
//
// THE STRIDE-COMPACTION PROBLEM
// ──────────────────────────────
// `Bitmap` may have stride > width. `Queue::write_texture` takes
// `bytes_per_row`, which must cover exactly the rows we hand it, so padded
// bitmaps are compacted into a tight staging vector first. Tight bitmaps are
// written straight from their backing slice.

use tracing::debug;

use crate::bitmap::Bitmap;
use crate::gpu::device::{GpuDevice, GpuError};

/// Texture format for the source bitmap. Non-sRGB: alpha is compared raw.
pub const SOURCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// wgpu requires that `bytes_per_row` in a texture→buffer copy is a
/// multiple of this value.
pub(crate) const COPY_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// The scanner's single source texture.
pub struct SourceTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl SourceTexture {
    /// Allocate the texture, its view and its sampler.
    ///
    /// # Errors
    /// `TextureTooLarge` if the size exceeds the device limit, and
    /// `ResourceCreation` if wgpu rejects the texture.
    pub fn new(gpu: &GpuDevice, width: u32, height: u32) -> Result<Self, GpuError> {
        gpu.check_texture_size(width, height)?;

        // TextureUsages we need:
        //   TEXTURE_BINDING — sampled by the scan kernel.
        //   COPY_DST        — overwritten by write_texture on every scan.
        //   COPY_SRC        — readback in tests.
        let (texture, err) = gpu.capture_validation(|device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("SourceTexture"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SOURCE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        });
        if let Some(log) = err {
            return Err(GpuError::ResourceCreation { what: "source texture", log });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&sampler_descriptor());

        Ok(SourceTexture { texture, view, sampler, width, height })
    }

    /// Overwrite the texture with `bitmap`'s pixels.
    ///
    /// The write is queued; it is ordered before any command buffer
    /// submitted afterwards on the same queue, so the scan draw that follows
    /// always sees this snapshot.
    ///
    /// # Panics
    /// Panics if the bitmap size differs from the texture size. The
    /// scanner checks this before calling.
    pub fn upload(&self, gpu: &GpuDevice, bitmap: &Bitmap) {
        assert_eq!(
            (bitmap.width() as u32, bitmap.height() as u32),
            (self.width, self.height),
            "bitmap size must match the source texture"
        );

        let compacted;
        let bytes: &[u8] = if bitmap.stride() == bitmap.width() {
            bytemuck::cast_slice(bitmap.as_slice())
        } else {
            compacted = bitmap.to_rgba_bytes();
            &compacted
        };

        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        debug!(width = self.width, height = self.height, "source texture uploaded");
    }

    /// Read the texture back as tightly packed RGBA bytes.
    ///
    /// Expensive and synchronous. Tests and debugging only.
    pub fn readback(&self, gpu: &GpuDevice) -> Result<Vec<u8>, wgpu::BufferAsyncError> {
        crate::gpu::readback::read_texture(gpu, &self.texture, self.width, self.height)
    }
}

/// Nearest filtering and clamp-to-edge on every axis.
fn sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("SourceTexture sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

/// Round `value` up to the next multiple of `alignment`.
///
/// Examples:
///   align_to(100, 256) = 256
///   align_to(256, 256) = 256
///   align_to(257, 256) = 512
#[inline]
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(4, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        // 100-wide RGBA row: 400 bytes → 512.
        assert_eq!(align_to(100 * 4, COPY_ALIGNMENT), 512);
    }

    #[test]
    fn test_sampler_policy() {
        let desc = sampler_descriptor();
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::ClampToEdge);
        assert!(desc.compare.is_none());
    }

    // ---- GPU round-trip tests (subprocess-isolated, see gpu::device) ------

    fn run_gpu_test_in_subprocess(test_name: &str) -> String {
        let output = std::process::Command::new("cargo")
            .args(["test", "--lib", "--", test_name, "--exact", "--ignored", "--nocapture"])
            .output()
            .unwrap_or_else(|e| panic!("failed to spawn subprocess for {test_name}: {e}"));
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        print!("{stdout}");
        eprint!("{stderr}");
        stdout + &stderr
    }

    #[test]
    #[ignore = "GPU integration: run via outer subprocess wrapper"]
    fn inner_upload_round_trip_with_stride() {
        let mut bmp = Bitmap::new_with_stride(3, 2, 5);
        bmp.set(0, 0, [1, 2, 3, 4]);
        bmp.set(2, 1, [5, 6, 7, 8]);

        let gpu = GpuDevice::new().expect("need a GPU");
        let tex = SourceTexture::new(&gpu, 3, 2).expect("texture");
        tex.upload(&gpu, &bmp);
        let back = tex.readback(&gpu).expect("readback");
        assert_eq!(back, bmp.to_rgba_bytes(), "padding must be stripped on upload");

        println!("GPU_TEST_OK");
    }

    #[test]
    #[ignore = "GPU integration: run via outer subprocess wrapper"]
    fn inner_upload_overwrites_in_place() {
        let gpu = GpuDevice::new().expect("need a GPU");
        let tex = SourceTexture::new(&gpu, 4, 4).expect("texture");

        let mut bmp = Bitmap::new(4, 4);
        bmp.set(1, 1, [0, 0, 0, 255]);
        tex.upload(&gpu, &bmp);
        bmp.clear();
        bmp.set(3, 3, [0, 0, 0, 255]);
        tex.upload(&gpu, &bmp);

        assert_eq!(tex.readback(&gpu).expect("readback"), bmp.to_rgba_bytes());
        println!("GPU_TEST_OK");
    }

    #[test]
    #[ignore = "requires a real GPU adapter"]
    fn test_upload_round_trip_with_stride() {
        let out = run_gpu_test_in_subprocess("gpu::texture::tests::inner_upload_round_trip_with_stride");
        assert!(out.contains("GPU_TEST_OK"), "inner test failed:\n{out}");
    }

    #[test]
    #[ignore = "requires a real GPU adapter"]
    fn test_upload_overwrites_in_place() {
        let out = run_gpu_test_in_subprocess("gpu::texture::tests::inner_upload_overwrites_in_place");
        assert!(out.contains("GPU_TEST_OK"), "inner test failed:\n{out}");
    }
}
