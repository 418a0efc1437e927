//! Scrolling star background.
//!
//! Stars are placed once at load and never touched again on the CPU; the
//! vertex shader scrolls and wraps them from the frame time alone, so the
//! whole field costs one instanced draw and one uniform write per frame.

use bytemuck::{Pod, Zeroable};
use rand::Rng;
use wgpu::util::DeviceExt;

use crate::coords::Viewport;
use crate::error::RenderError;
use crate::resources::{scope, BufferId, SharedSource};

use super::{GraphicsComponent, LoadCtx, RenderCtx, RenderTarget};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct StarInstance {
    pos: [f32; 2],
    /// 0..1; scales both scroll speed and size for a parallax effect.
    depth: f32,
    _pad: f32,
}

impl StarInstance {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct StarUniform {
    viewport: [f32; 2],
    time: f32,
    _pad: f32,
}

struct StarFieldGpu {
    pipeline: wgpu::RenderPipeline,
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// Static star positions, owned by the session cache.
    instances: BufferId,
}

/// Star background component.
pub struct StarField {
    source: SharedSource,
    star_count: u32,
    gpu: Option<StarFieldGpu>,
}

impl StarField {
    pub fn new(source: SharedSource, star_count: u32) -> Self {
        Self {
            source,
            star_count,
            gpu: None,
        }
    }

    pub fn star_count(&self) -> u32 {
        self.star_count
    }
}

fn scatter(rng: &mut impl Rng, count: u32, viewport: Viewport) -> Vec<StarInstance> {
    (0..count)
        .map(|_| StarInstance {
            pos: [
                rng.gen_range(0.0..viewport.width),
                rng.gen_range(0.0..viewport.height),
            ],
            depth: rng.gen_range(0.0..1.0),
            _pad: 0.0,
        })
        .collect()
}

impl GraphicsComponent for StarField {
    fn load(&mut self, ctx: &mut LoadCtx<'_>) -> Result<(), RenderError> {
        let texture = ctx
            .cache
            .load_texture(ctx.device, ctx.queue, &self.source)?;

        let program = ctx.cache.load_shader_program(
            ctx.device,
            include_str!("shaders/starfield.vert.wgsl"),
            include_str!("shaders/starfield.frag.wgsl"),
            "starfield",
        )?;

        let stars = scatter(&mut rand::thread_rng(), self.star_count, ctx.viewport);
        let instances = ctx.cache.load_vertex_buffer(
            ctx.device,
            bytemuck::cast_slice(&stars),
            "starfield instances",
        )?;

        let ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("starfield ubo"),
            contents: bytemuck::bytes_of(&StarUniform {
                viewport: [ctx.viewport.width, ctx.viewport.height],
                time: 0.0,
                _pad: 0.0,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("starfield bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(
                                std::num::NonZeroU64::new(
                                    std::mem::size_of::<StarUniform>() as u64
                                )
                                .unwrap(),
                            ),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("starfield pipeline layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });

        let shader = ctx.cache.program(program);
        let pipeline = scope::scoped(ctx.device, wgpu::ErrorFilter::Validation, || {
            ctx.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("starfield pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader.vertex,
                        entry_point: Some("vs_main"),
                        compilation_options: Default::default(),
                        buffers: &[StarInstance::layout()],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader.fragment,
                        entry_point: Some("fs_main"),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: ctx.target_format,
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
        .map_err(|d| RenderError::Shader(format!("starfield pipeline: {d}")))?;

        let sampler = ctx.cache.nearest_sampler(ctx.device);
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("starfield bind group"),
            layout: &bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        &ctx.cache.texture(texture).view,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        self.gpu = Some(StarFieldGpu {
            pipeline,
            ubo,
            bind_group,
            instances,
        });
        Ok(())
    }

    fn unload(&mut self) {
        self.gpu = None;
    }

    fn draw(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        if self.star_count == 0 {
            return;
        }

        ctx.queue.write_buffer(
            &gpu.ubo,
            0,
            bytemuck::bytes_of(&StarUniform {
                viewport: [ctx.viewport.width, ctx.viewport.height],
                time: ctx.time.total,
                _pad: 0.0,
            }),
        );

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("starfield pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&gpu.pipeline);
        rpass.set_bind_group(0, &gpu.bind_group, &[]);
        rpass.set_vertex_buffer(0, ctx.cache.buffer(gpu.instances).slice(..));
        rpass.draw(0..4, 0..self.star_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn unload_discards_gpu_state() {
        use crate::resources::{shared, MemorySource};

        let source = shared(MemorySource::new("stars", vec![]));
        let mut field = StarField::new(source, 32);
        assert!(field.gpu.is_none());
        field.unload();
        field.unload();
        assert!(field.gpu.is_none());
        assert_eq!(field.star_count(), 32);
    }

    #[test]
    fn scatter_stays_inside_the_viewport() {
        let viewport = Viewport::new(600.0, 337.0);
        let mut rng = StdRng::seed_from_u64(7);
        let stars = scatter(&mut rng, 256, viewport);
        assert_eq!(stars.len(), 256);
        for star in &stars {
            assert!(star.pos[0] >= 0.0 && star.pos[0] < viewport.width);
            assert!(star.pos[1] >= 0.0 && star.pos[1] < viewport.height);
            assert!(star.depth >= 0.0 && star.depth < 1.0);
        }
    }
}
