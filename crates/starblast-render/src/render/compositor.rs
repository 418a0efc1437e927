use bytemuck::{Pod, Zeroable};

use crate::coords::Viewport;
use crate::error::RenderError;
use crate::resources::{scope, BufferId, ResourceCache};

/// Fixed-resolution offscreen target plus the full-screen blit that scales
/// it to the window surface.
///
/// Every component draws into the offscreen texture at the logical
/// resolution; `composite` stretches it over the surface with linear
/// filtering, so gameplay rendering is resolution-independent.
pub struct OffscreenCompositor {
    viewport: Viewport,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
    quad: BufferId,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct BlitVertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

impl BlitVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BlitVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// Triangle strip covering NDC. Texel v runs top-down, NDC y runs
// bottom-up, so the v coordinates are flipped.
const BLIT_QUAD: [BlitVertex; 4] = [
    BlitVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] },
    BlitVertex { pos: [-1.0, 1.0], uv: [0.0, 0.0] },
    BlitVertex { pos: [1.0, -1.0], uv: [1.0, 1.0] },
    BlitVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] },
];

impl OffscreenCompositor {
    /// Format of the offscreen target all components render into.
    pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(
        device: &wgpu::Device,
        cache: &mut ResourceCache,
        surface_format: wgpu::TextureFormat,
        viewport: Viewport,
    ) -> Result<Self, RenderError> {
        let view = create_target(device, viewport)?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("compositor sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let program = cache.load_shader_program(
            device,
            include_str!("shaders/blit.vert.wgsl"),
            include_str!("shaders/blit.frag.wgsl"),
            "compositor blit",
        )?;

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("compositor bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compositor pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let shader = cache.program(program);
        let pipeline = scope::scoped(device, wgpu::ErrorFilter::Validation, || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("compositor pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader.vertex,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[BlitVertex::layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader.fragment,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })
        .map_err(RenderError::Shader)?;

        let quad = cache.load_vertex_buffer(
            device,
            bytemuck::cast_slice(&BLIT_QUAD),
            "compositor quad",
        )?;

        let bind_group = create_bind_group(device, &bind_group_layout, &view, &sampler);

        Ok(Self {
            viewport,
            view,
            sampler,
            bind_group_layout,
            bind_group,
            pipeline,
            quad,
        })
    }

    /// Logical viewport the offscreen target covers.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// View components render into.
    pub fn target_view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Clears the offscreen target at the top of a frame.
    pub fn begin_scene(&self, encoder: &mut wgpu::CommandEncoder, clear: wgpu::Color) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    /// Stretches the offscreen target over the full window surface.
    pub fn composite(
        &self,
        cache: &ResourceCache,
        encoder: &mut wgpu::CommandEncoder,
        screen_view: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: screen_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, cache.buffer(self.quad).slice(..));
        rpass.draw(0..4, 0..1);
    }

    /// Rebuilds the offscreen target for a new logical size after a window
    /// resize changed the aspect ratio. Degenerate viewports are skipped the
    /// same way a 0x0 surface resize is deferred.
    pub fn recreate_target(
        &mut self,
        device: &wgpu::Device,
        viewport: Viewport,
    ) -> Result<(), RenderError> {
        if !viewport.is_valid() || viewport == self.viewport {
            return Ok(());
        }
        self.view = create_target(device, viewport)?;
        self.bind_group =
            create_bind_group(device, &self.bind_group_layout, &self.view, &self.sampler);
        self.viewport = viewport;
        Ok(())
    }
}

fn create_target(device: &wgpu::Device, viewport: Viewport) -> Result<wgpu::TextureView, RenderError> {
    let texture = scope::scoped_alloc(device, || {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width: viewport.width as u32,
                height: viewport.height as u32,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OffscreenCompositor::TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    })
    .map_err(|reason| RenderError::Texture {
        name: "offscreen target".into(),
        reason,
    })?;

    Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("compositor bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
