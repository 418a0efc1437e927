//! Batched sprite rendering.
//!
//! All sprites live in one vertex buffer, rebuilt each frame from shared
//! animation and position state. Draw submission walks the registration
//! order and merges consecutive sprites that share a texture into a single
//! indexed draw; order between sprites is never changed, so later sprites
//! always paint over earlier ones.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::SharedLocation;
use crate::error::RenderError;
use crate::resources::{scope, SharedSource, TextureId};

use super::{GraphicsComponent, LoadCtx, RenderCtx, RenderTarget};

mod sprite;

pub use sprite::{Animation, Sprite};

use sprite::{frame_vertices, SpriteState, SpriteVertex, SPRITE_INDICES};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

struct BatchGpu {
    pipeline: wgpu::RenderPipeline,
    viewport_ubo: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_binds: HashMap<TextureId, wgpu::BindGroup>,
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    /// Sprite slots the buffers were sized for.
    slot_capacity: usize,
}

struct Inner {
    sprites: Vec<Rc<RefCell<SpriteState>>>,
    /// 4 vertices per sprite slot, rebuilt every frame.
    vertices: Vec<SpriteVertex>,
    /// 6 indices per sprite slot, fixed at registration.
    indices: Vec<u16>,
    gpu: Option<BatchGpu>,
    warned_unresolved: bool,
}

/// Sprite batch component.
///
/// Clones share the same batch, so callers can keep a handle for
/// registration after moving a clone into the renderer.
#[derive(Clone)]
pub struct SpriteBatch {
    inner: Rc<RefCell<Inner>>,
}

impl Default for SpriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                sprites: Vec::new(),
                vertices: Vec::new(),
                indices: Vec::new(),
                gpu: None,
                warned_unresolved: false,
            })),
        }
    }

    /// Adds a sprite drawing frames of `frame_width` x `frame_height` from
    /// `source`. The returned handle controls animation and position.
    ///
    /// Sprites registered before the session starts are resolved during
    /// `start()`; later registrations stay invisible until the next session.
    pub fn register_sprite(
        &self,
        source: SharedSource,
        frame_width: u32,
        frame_height: u32,
    ) -> Sprite {
        let mut inner = self.inner.borrow_mut();

        let base = (inner.sprites.len() * 4) as u16;
        inner
            .indices
            .extend(SPRITE_INDICES.iter().map(|i| base + i));
        inner
            .vertices
            .extend([SpriteVertex::zeroed(); 4]);

        let state = Rc::new(RefCell::new(SpriteState {
            source,
            frame_width,
            frame_height,
            animation: Animation::still(0),
            location: SharedLocation::default(),
            texture: None,
            frames_x: 1,
            frames_y: 1,
            texture_width: 0,
            texture_height: 0,
        }));
        inner.sprites.push(state.clone());

        Sprite { state }
    }

    pub fn sprite_count(&self) -> usize {
        self.inner.borrow().sprites.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.borrow().vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.inner.borrow().indices.len()
    }
}

impl GraphicsComponent for SpriteBatch {
    fn load(&mut self, ctx: &mut LoadCtx<'_>) -> Result<(), RenderError> {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;

        // Resolve every sprite's texture and grid up front.
        for state in &inner.sprites {
            let mut state = state.borrow_mut();
            let source = state.source.clone();
            let id = ctx.cache.load_texture(ctx.device, ctx.queue, &source)?;
            let texture = ctx.cache.texture(id);
            state.texture = Some(id);
            state.texture_width = texture.width;
            state.texture_height = texture.height;
            state.frames_x = (texture.width / state.frame_width).max(1);
            state.frames_y = (texture.height / state.frame_height).max(1);
        }

        let program = ctx.cache.load_shader_program(
            ctx.device,
            include_str!("../shaders/sprite.vert.wgsl"),
            include_str!("../shaders/sprite.frag.wgsl"),
            "sprite batch",
        )?;

        let uniform_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("sprite uniform bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(
                            std::num::NonZeroU64::new(
                                std::mem::size_of::<ViewportUniform>() as u64
                            )
                            .unwrap(),
                        ),
                    },
                    count: None,
                }],
            });

        let texture_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("sprite texture bgl"),
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

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("sprite pipeline layout"),
                bind_group_layouts: &[&uniform_bgl, &texture_bgl],
                immediate_size: 0,
            });

        let shader = ctx.cache.program(program);
        let pipeline = scope::scoped(ctx.device, wgpu::ErrorFilter::Validation, || {
            ctx.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("sprite pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader.vertex,
                        entry_point: Some("vs_main"),
                        compilation_options: Default::default(),
                        buffers: &[SpriteVertex::layout()],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader.fragment,
                        entry_point: Some("fs_main"),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: ctx.target_format,
                            blend: Some(straight_alpha_blend()),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
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
        .map_err(|d| RenderError::Shader(format!("sprite pipeline: {d}")))?;

        let viewport_ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sprite viewport ubo"),
            contents: bytemuck::bytes_of(&ViewportUniform {
                viewport: [ctx.viewport.width, ctx.viewport.height],
                _pad: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite uniform bind group"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_ubo.as_entire_binding(),
            }],
        });

        let sampler = ctx.cache.nearest_sampler(ctx.device);
        let mut texture_binds = HashMap::new();
        for state in &inner.sprites {
            let state = state.borrow();
            let Some(id) = state.texture else { continue };
            if texture_binds.contains_key(&id) {
                continue;
            }
            let bind = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sprite texture bind group"),
                layout: &texture_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&ctx.cache.texture(id).view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });
            texture_binds.insert(id, bind);
        }

        let (vbo, ibo) = scope::scoped_alloc(ctx.device, || {
            create_slot_buffers(ctx.device, &inner.vertices, &inner.indices)
        })
        .map_err(|d| RenderError::Buffer(format!("sprite batch: {d}")))?;

        inner.gpu = Some(BatchGpu {
            pipeline,
            viewport_ubo,
            uniform_bind_group,
            texture_binds,
            vbo,
            ibo,
            slot_capacity: inner.sprites.len(),
        });
        inner.warned_unresolved = false;
        Ok(())
    }

    fn unload(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.gpu = None;
        inner.warned_unresolved = false;
        // Resolved texture state belongs to the dead session; sprites go
        // back to unresolved until the next load.
        for state in &inner.sprites {
            let mut state = state.borrow_mut();
            state.texture = None;
            state.frames_x = 1;
            state.frames_y = 1;
            state.texture_width = 0;
            state.texture_height = 0;
        }
    }

    fn draw(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        let mut inner = self.inner.borrow_mut();
        let inner = &mut *inner;

        if inner.sprites.is_empty() {
            return;
        }
        let Some(gpu) = inner.gpu.as_mut() else {
            return;
        };

        // Advance animations and rebuild every slot's vertices.
        let mut keys = Vec::with_capacity(inner.sprites.len());
        for (slot, state) in inner.sprites.iter().enumerate() {
            let mut state = state.borrow_mut();
            state.animation.advance(ctx.time.elapsed);
            keys.push(state.texture);
            if state.texture.is_none() {
                continue;
            }

            let verts = frame_vertices(
                state.location.get(),
                state.frame_width,
                state.frame_height,
                state.animation.current_frame(),
                state.frames_x,
                state.frames_y,
                state.texture_width,
                state.texture_height,
            );
            inner.vertices[slot * 4..slot * 4 + 4].copy_from_slice(&verts);
        }

        if keys.iter().any(Option::is_none) && !inner.warned_unresolved {
            log::warn!("sprites registered after start are skipped until the next session");
            inner.warned_unresolved = true;
        }

        // Registrations since load grow the buffers; contents are rewritten
        // below anyway.
        if inner.sprites.len() > gpu.slot_capacity {
            let (vbo, ibo) = create_slot_buffers(ctx.device, &inner.vertices, &inner.indices);
            gpu.vbo = vbo;
            gpu.ibo = ibo;
            gpu.slot_capacity = inner.sprites.len();
        }

        ctx.queue
            .write_buffer(&gpu.vbo, 0, bytemuck::cast_slice(&inner.vertices));
        ctx.queue.write_buffer(
            &gpu.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                viewport: [ctx.viewport.width, ctx.viewport.height],
                _pad: [0.0; 2],
            }),
        );

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sprite pass"),
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
        rpass.set_bind_group(0, &gpu.uniform_bind_group, &[]);
        rpass.set_vertex_buffer(0, gpu.vbo.slice(..));
        rpass.set_index_buffer(gpu.ibo.slice(..), wgpu::IndexFormat::Uint16);

        for run in contiguous_runs(&keys) {
            let Some(id) = run.key else { continue };
            let Some(bind) = gpu.texture_binds.get(&id) else { continue };
            rpass.set_bind_group(1, bind, &[]);
            let first = (run.first * 6) as u32;
            let count = (run.len * 6) as u32;
            rpass.draw_indexed(first..first + count, 0, 0..1);
        }
    }
}

fn create_slot_buffers(
    device: &wgpu::Device,
    vertices: &[SpriteVertex],
    indices: &[u16],
) -> (wgpu::Buffer, wgpu::Buffer) {
    let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("sprite vbo"),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });
    let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("sprite ibo"),
        contents: bytemuck::cast_slice(indices),
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
    });
    (vbo, ibo)
}

fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

struct Run<K> {
    first: usize,
    len: usize,
    key: K,
}

/// Splits `keys` into maximal runs of equal adjacent values, preserving
/// order. Equal keys separated by a different key stay in separate runs.
fn contiguous_runs<K: Copy + PartialEq>(keys: &[K]) -> Vec<Run<K>> {
    let mut runs: Vec<Run<K>> = Vec::new();
    for (i, &key) in keys.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.key == key => run.len += 1,
            _ => runs.push(Run { first: i, len: 1, key }),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{shared, MemorySource};

    fn dummy_source(name: &str) -> SharedSource {
        shared(MemorySource::new(name, vec![]))
    }

    #[test]
    fn registration_keeps_slot_arithmetic() {
        let batch = SpriteBatch::new();
        for i in 0..3 {
            batch.register_sprite(dummy_source(&format!("s{i}")), 8, 8);
        }
        assert_eq!(batch.sprite_count(), 3);
        assert_eq!(batch.vertex_count(), 12);
        assert_eq!(batch.index_count(), 18);

        let inner = batch.inner.borrow();
        assert_eq!(&inner.indices[6..12], &[4, 5, 6, 6, 5, 7]);
    }

    #[test]
    fn clones_share_the_registry() {
        let batch = SpriteBatch::new();
        let handle = batch.clone();
        handle.register_sprite(dummy_source("s"), 16, 16);
        assert_eq!(batch.sprite_count(), 1);
    }

    #[test]
    fn sprite_handle_controls_animation() {
        let batch = SpriteBatch::new();
        let sprite = batch.register_sprite(dummy_source("s"), 8, 8);
        sprite.set_animation(0, 4, 8.0, false);
        assert!(!sprite.animation_ended());

        let other = sprite.clone();
        other.set_animation(2, 2, 0.0, true);
        assert!(!sprite.animation_ended());
    }

    #[test]
    fn unload_resets_every_sprite_to_unresolved() {
        let batch = SpriteBatch::new();
        let sprite = batch.register_sprite(dummy_source("s"), 8, 8);
        {
            let mut state = sprite.state.borrow_mut();
            state.texture = Some(TextureId::stub(0));
            state.texture_width = 64;
            state.texture_height = 32;
            state.frames_x = 8;
            state.frames_y = 4;
        }

        let mut component = batch.clone();
        component.unload();

        let state = sprite.state.borrow();
        assert!(state.texture.is_none());
        assert_eq!((state.frames_x, state.frames_y), (1, 1));
        assert_eq!((state.texture_width, state.texture_height), (0, 0));
        assert!(batch.inner.borrow().gpu.is_none());
        // Registration survives teardown; only session state is gone.
        assert_eq!(batch.sprite_count(), 1);
    }

    #[test]
    fn interleaved_textures_never_merge() {
        let a = Some(1u32);
        let b = Some(2u32);
        let runs = contiguous_runs(&[a, a, b, a]);
        assert_eq!(runs.len(), 3);
        assert_eq!((runs[0].first, runs[0].len), (0, 2));
        assert_eq!((runs[1].first, runs[1].len), (2, 1));
        assert_eq!((runs[2].first, runs[2].len), (3, 1));
    }

    #[test]
    fn unresolved_slots_form_their_own_runs() {
        let runs = contiguous_runs(&[Some(1u32), None, None, Some(1)]);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].key, None);
        assert_eq!((runs[1].first, runs[1].len), (1, 2));
    }
}
