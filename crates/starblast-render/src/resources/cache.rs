use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::codec;
use crate::error::RenderError;

use super::scope;
use super::{SharedSource, SourceId};

/// Index of a cached texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(usize);

#[cfg(test)]
impl TextureId {
    pub(crate) fn stub(index: usize) -> Self {
        Self(index)
    }
}

/// Index of a cached shader program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProgramId(usize);

/// Index of a cached vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferId(usize);

/// A texture uploaded from one image source.
pub struct CachedTexture {
    pub key: SourceId,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

/// A compiled vertex/fragment module pair.
pub struct ShaderProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

/// Owns every GPU object uploaded during one device session.
///
/// Textures are deduplicated by source identity: loading the same source
/// object twice returns the first entry's id. Programs and buffers are not
/// deduplicated; callers keep the ids they were handed.
#[derive(Default)]
pub struct ResourceCache {
    textures: Vec<CachedTexture>,
    by_source: HashMap<SourceId, usize>,
    programs: Vec<ShaderProgram>,
    buffers: Vec<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `source` and uploads it as an RGBA texture, or returns the
    /// existing entry if this source object was loaded before.
    ///
    /// Formats without an alpha channel are expanded to RGBA at upload;
    /// the decoded representation never reaches the GPU un-expanded.
    pub fn load_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &SharedSource,
    ) -> Result<TextureId, RenderError> {
        let key = source.borrow().id();
        if let Some(&index) = self.by_source.get(&key) {
            return Ok(TextureId(index));
        }

        let mut source = source.borrow_mut();
        let name = source.name().to_owned();
        let image = codec::decode(&mut *source)?;
        drop(source);

        let pixels = image.to_rgba8();

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = scope::scoped_alloc(device, || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&name),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })
        .map_err(|reason| RenderError::Texture {
            name: name.clone(),
            reason,
        })?;

        let upload = scope::scoped(device, wgpu::ErrorFilter::Validation, || {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * image.width),
                    rows_per_image: Some(image.height),
                },
                size,
            );
        });
        if let Err(reason) = upload {
            texture.destroy();
            return Err(RenderError::Texture { name, reason });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("loaded texture {} ({}x{})", name, image.width, image.height);

        let index = self.textures.len();
        self.textures.push(CachedTexture {
            key,
            texture,
            view,
            width: image.width,
            height: image.height,
        });
        self.by_source.insert(key, index);
        Ok(TextureId(index))
    }

    /// Compiles a vertex/fragment WGSL pair into a program entry.
    ///
    /// Each stage compiles in its own error scope so a diagnostic names the
    /// stage that produced it.
    pub fn load_shader_program(
        &mut self,
        device: &wgpu::Device,
        vertex_src: &str,
        fragment_src: &str,
        label: &str,
    ) -> Result<ProgramId, RenderError> {
        let vertex = scope::scoped(device, wgpu::ErrorFilter::Validation, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(vertex_src.into()),
            })
        })
        .map_err(|d| RenderError::Shader(format!("vertex stage `{label}`: {d}")))?;

        let fragment = scope::scoped(device, wgpu::ErrorFilter::Validation, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(fragment_src.into()),
            })
        })
        .map_err(|d| RenderError::Shader(format!("fragment stage `{label}`: {d}")))?;

        let id = ProgramId(self.programs.len());
        self.programs.push(ShaderProgram { vertex, fragment });
        Ok(id)
    }

    /// Uploads an immutable vertex buffer.
    pub fn load_vertex_buffer(
        &mut self,
        device: &wgpu::Device,
        contents: &[u8],
        label: &str,
    ) -> Result<BufferId, RenderError> {
        let buffer = scope::scoped_alloc(device, || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
        })
        .map_err(|d| RenderError::Buffer(format!("`{label}`: {d}")))?;

        let id = BufferId(self.buffers.len());
        self.buffers.push(buffer);
        Ok(id)
    }

    pub fn texture(&self, id: TextureId) -> &CachedTexture {
        &self.textures[id.0]
    }

    pub fn program(&self, id: ProgramId) -> &ShaderProgram {
        &self.programs[id.0]
    }

    pub fn buffer(&self, id: BufferId) -> &wgpu::Buffer {
        &self.buffers[id.0]
    }

    /// Shared pixel-art sampler: nearest filtering, edges clamped.
    pub fn nearest_sampler(&mut self, device: &wgpu::Device) -> wgpu::Sampler {
        self.sampler
            .get_or_insert_with(|| {
                device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some("nearest sampler"),
                    address_mode_u: wgpu::AddressMode::ClampToEdge,
                    address_mode_v: wgpu::AddressMode::ClampToEdge,
                    address_mode_w: wgpu::AddressMode::ClampToEdge,
                    mag_filter: wgpu::FilterMode::Nearest,
                    min_filter: wgpu::FilterMode::Nearest,
                    mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                    ..Default::default()
                })
            })
            .clone()
    }

    /// Destroys every cached GPU object. Ids handed out before this call are
    /// stale; components re-request their resources on the next session start.
    ///
    /// Textures and buffers are destroyed eagerly rather than left to handle
    /// drop, so their memory is reclaimed even while a component still holds
    /// a bind group that references them.
    pub fn release_all(&mut self) {
        let count = self.textures.len() + self.programs.len() + self.buffers.len();
        for entry in self.textures.drain(..) {
            entry.texture.destroy();
        }
        self.by_source.clear();
        self.programs.clear();
        for buffer in self.buffers.drain(..) {
            buffer.destroy();
        }
        self.sampler = None;
        if count > 0 {
            log::info!("released {count} cached GPU resources");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.programs.is_empty() && self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_all_is_idempotent() {
        let mut cache = ResourceCache::new();
        assert!(cache.is_empty());
        cache.release_all();
        cache.release_all();
        assert!(cache.is_empty());
    }
}
