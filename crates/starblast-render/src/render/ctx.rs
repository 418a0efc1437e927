use crate::coords::Viewport;
use crate::resources::ResourceCache;
use crate::time::FrameTime;

/// Per-frame state shared with every component draw call.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Session cache; components resolve their ids against it while drawing.
    pub cache: &'a ResourceCache,
    /// Format the offscreen target was created with.
    pub target_format: wgpu::TextureFormat,
    /// Logical viewport the offscreen target covers.
    pub viewport: Viewport,
    pub time: FrameTime,
}

/// The encoder and color view a component records into.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self {
            encoder,
            color_view,
        }
    }
}
