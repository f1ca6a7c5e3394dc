// gpu/scanner.rs — the scan orchestrator.
//
// `GpuBoundaryScanner` owns every GPU object the scan needs and exposes one
// entry point, `scan(gpu, bitmap, mode)`.
//
// RESOURCE OWNERSHIP
// ───────────────────
//   built in new()            created lazily, once per mode
//   ─────────────────────     ─────────────────────────────────────
//   scan pipeline             ScanTarget (W×1 or 1×H Rgba8Unorm)
//     quad.wgsl + scan.wgsl     + its ScanParams uniform
//   bind group layout           + its bind group
//   quad vertex buffer
//   SourceTexture (W×H)
//
// Nothing is global and nothing is shared: every handle is a field of the
// scanner, released when the scanner is dropped.
//
// ONE SCAN CALL
// ──────────────
//   1. upload      bitmap → SourceTexture (write_texture, in place)
//   2. draw        clear target to transparent, draw 6 quad vertices;
//                  the rasterizer runs scan.wgsl once per target cell
//   3. readback    target → MAP_READ buffer, blocking poll
//   4. decode      codec::decode → Extrema
//
// Every call recomputes from scratch; nothing from a previous call is
// reused except the resources themselves.
//
// REENTRANCY
// ───────────
// `scan` takes `&mut self`, so a second scan cannot start while one is in
// flight, not even from a callback running inside the first. The borrow
// checker enforces what a host event loop would otherwise need a flag for.

use std::time::Instant;

use tracing::{debug, error, info};
use wgpu::util::DeviceExt;

use crate::bitmap::Bitmap;
use crate::codec::{self, DecodeError, TargetLayout};
use crate::extrema::{Extrema, Orientation, ScanMode};
use crate::gpu::device::{GpuDevice, GpuError};
use crate::gpu::readback;
use crate::gpu::texture::SourceTexture;

/// Render target format. Each channel is one 8-bit encoded value.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ---------------------------------------------------------------------------
// GPU-side structs (must match WGSL layout exactly — repr(C))
// ---------------------------------------------------------------------------

/// Uniform parameters. Must match `ScanParams` in scan.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct ScanParams {
    src_width:  u32,
    src_height: u32,
    axis:       u32,
    _pad:       u32,
}

impl ScanParams {
    fn new(mode: ScanMode, src_width: u32, src_height: u32) -> Self {
        ScanParams { src_width, src_height, axis: mode.axis(), _pad: 0 }
    }
}

/// One quad vertex, clip-space position. `@location(0)` in quad.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadVertex {
    position: [f32; 2],
}

/// Two triangles covering clip space.
const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [-1.0, 1.0] },
];

const QUAD_SHADER: &str = include_str!("../shaders/quad.wgsl");
const SCAN_SHADER: &str = include_str!("../shaders/scan.wgsl");

// ---------------------------------------------------------------------------
// Configuration and errors
// ---------------------------------------------------------------------------

/// Scanner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanConfig {
    /// Which edge decoded rows are counted from.
    pub orientation: Orientation,
}

/// Errors from a single `scan` call.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("cannot scan an empty bitmap")]
    EmptyBitmap,
    /// The bitmap size differs from the size the scanner was built for.
    #[error("bitmap is {actual_width}×{actual_height}, scanner was built for {width}×{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual_width: usize,
        actual_height: usize,
    },
    /// Creating the target for this mode failed on first use.
    #[error("failed to create the scan target: {0}")]
    Target(#[from] GpuError),
    /// Mapping the readback buffer failed.
    #[error("target readback failed: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// ScanTarget
// ---------------------------------------------------------------------------

/// A render target for one scan mode, with the bind group that feeds it.
pub(crate) struct ScanTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    bind_group: wgpu::BindGroup,
    _params: wgpu::Buffer,
}

impl ScanTarget {
    fn new(
        gpu: &GpuDevice,
        bgl: &wgpu::BindGroupLayout,
        source: &SourceTexture,
        mode: ScanMode,
    ) -> Result<Self, GpuError> {
        let (width, height) = mode.target_size(source.width, source.height);
        gpu.check_texture_size(width, height)?;

        let (texture, err) = gpu.capture_validation(|device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("ScanTarget"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        });
        if let Some(log) = err {
            error!(%mode, %log, "scan target creation failed");
            return Err(GpuError::ResourceCreation { what: "scan target", log });
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let params = ScanParams::new(mode, source.width, source.height);
        let params_buf = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label:    Some("ScanParams"),
            contents: bytemuck::bytes_of(&params),
            usage:    wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label:  Some("scan BG"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&source.view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&source.sampler) },
                wgpu::BindGroupEntry { binding: 2, resource: params_buf.as_entire_binding() },
            ],
        });

        debug!(%mode, width, height, "scan target created");
        Ok(ScanTarget { texture, view, width, height, bind_group, _params: params_buf })
    }
}

// ---------------------------------------------------------------------------
// GpuBoundaryScanner
// ---------------------------------------------------------------------------

/// Per-column / global boundary scanner on the GPU.
///
/// Create once per bitmap size; call [`GpuBoundaryScanner::scan`] after every
/// completed stroke.
///
/// # Example
/// ```ignore
/// let gpu = GpuDevice::new()?;
/// let mut scanner = GpuBoundaryScanner::new(&gpu, 640, 480, ScanConfig::default())?;
/// let extrema = scanner.scan(&gpu, &bitmap, ScanMode::PerColumn)?;
/// ```
pub struct GpuBoundaryScanner {
    config:   ScanConfig,
    pipeline: wgpu::RenderPipeline,
    bgl:      wgpu::BindGroupLayout,
    quad:     wgpu::Buffer,
    source:   SourceTexture,
    global_target:     Option<ScanTarget>,
    per_column_target: Option<ScanTarget>,
}

impl GpuBoundaryScanner {
    /// Compile both kernel programs, link the scan pipeline, upload the quad
    /// and allocate the source texture.
    ///
    /// # Errors
    /// Any failure here is fatal for the scanner: `ShaderCompile` and
    /// `PipelineLink` carry the compiler/linker log, `TextureTooLarge` and
    /// `ResourceCreation` report allocation problems.
    pub fn new(gpu: &GpuDevice, width: u32, height: u32, config: ScanConfig) -> Result<Self, GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::EmptySize { width, height });
        }

        let quad_module = compile(gpu, "quad.wgsl", QUAD_SHADER)?;
        let scan_module = compile(gpu, "scan.wgsl", SCAN_SHADER)?;

        // Bind group layout: mirrors the @group(0) bindings in scan.wgsl.
        let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scan BGL"),
            entries: &[
                // 0 — source texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
                // 1 — nearest / clamp-to-edge sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                // 2 — params uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scan pipeline layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let (pipeline, err) = gpu.capture_validation(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("scan"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &quad_module,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &scan_module,
                    entry_point: "fs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(log) = err {
            error!(%log, "scan pipeline link failed");
            return Err(GpuError::PipelineLink { log });
        }

        let quad = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label:    Some("quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage:    wgpu::BufferUsages::VERTEX,
        });

        let source = SourceTexture::new(gpu, width, height).inspect_err(|e| {
            error!(error = %e, "source texture creation failed");
        })?;

        info!(width, height, orientation = ?config.orientation, "boundary scanner ready");

        Ok(GpuBoundaryScanner {
            config,
            pipeline,
            bgl,
            quad,
            source,
            global_target: None,
            per_column_target: None,
        })
    }

    /// Bitmap width the scanner was built for.
    pub fn width(&self) -> u32 {
        self.source.width
    }

    /// Bitmap height the scanner was built for.
    pub fn height(&self) -> u32 {
        self.source.height
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan `bitmap` and decode the result.
    pub fn scan(&mut self, gpu: &GpuDevice, bitmap: &Bitmap, mode: ScanMode) -> Result<Extrema, ScanError> {
        let started = Instant::now();
        let raw = self.render_target(gpu, bitmap, mode)?;
        let layout = TargetLayout::new(mode, self.width(), self.height(), self.config.orientation);
        let extrema = codec::decode(&raw, &layout)?;
        debug!(%mode, elapsed_us = started.elapsed().as_micros() as u64, "scan complete");
        Ok(extrema)
    }

    /// Upload, draw and read back, returning the raw target bytes (tightly
    /// packed RGBA, one cell per target pixel) without decoding them.
    pub fn render_target(
        &mut self,
        gpu: &GpuDevice,
        bitmap: &Bitmap,
        mode: ScanMode,
    ) -> Result<Vec<u8>, ScanError> {
        if bitmap.is_empty() {
            return Err(ScanError::EmptyBitmap);
        }
        if (bitmap.width(), bitmap.height()) != (self.source.width as usize, self.source.height as usize) {
            return Err(ScanError::SizeMismatch {
                width: self.source.width,
                height: self.source.height,
                actual_width: bitmap.width(),
                actual_height: bitmap.height(),
            });
        }

        self.source.upload(gpu, bitmap);

        let slot = match mode {
            ScanMode::Global => &mut self.global_target,
            ScanMode::PerColumn => &mut self.per_column_target,
        };
        let target = match slot {
            Some(target) => target,
            None => slot.insert(ScanTarget::new(gpu, &self.bgl, &self.source, mode)?),
        };

        let mut encoder = gpu.device.create_command_encoder(
            &wgpu::CommandEncoderDescriptor { label: Some("scan") },
        );
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scan"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &target.bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad.slice(..));
            pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let raw = readback::read_texture(gpu, &target.texture, target.width, target.height)?;
        Ok(raw)
    }
}

/// Compile one WGSL program, turning validation errors into `ShaderCompile`.
fn compile(gpu: &GpuDevice, label: &'static str, source: &str) -> Result<wgpu::ShaderModule, GpuError> {
    let (module, err) = gpu.capture_validation(|device| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label:  Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    });
    match err {
        None => Ok(module),
        Some(log) => {
            error!(shader = label, %log, "shader compilation failed");
            Err(GpuError::ShaderCompile { label, log })
        }
    }
}
