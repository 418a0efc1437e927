use crate::coords::Viewport;
use crate::error::RenderError;
use crate::resources::ResourceCache;

use super::{RenderCtx, RenderTarget};

/// Everything a component needs to build its GPU state during `start()`.
pub struct LoadCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub cache: &'a mut ResourceCache,
    /// Format of the offscreen target the component will render into.
    pub target_format: wgpu::TextureFormat,
    pub viewport: Viewport,
}

/// A drawable registered with the renderer.
///
/// `load` runs once per session, in registration order, and may fail; a
/// failure aborts the session start. `draw` runs every frame in the same
/// order and must not fail: a component whose resources never resolved
/// draws nothing.
///
/// `unload` runs on session teardown and must drop every GPU object the
/// component built during `load` — pipelines, bind groups, cache ids — so
/// no handle outlives the session it came from. It must be idempotent.
pub trait GraphicsComponent {
    fn load(&mut self, ctx: &mut LoadCtx<'_>) -> Result<(), RenderError>;

    fn unload(&mut self) {}

    fn draw(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>);
}
