use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::{logical_size, Viewport};
use crate::device::{DeviceInit, Gpu};
use crate::error::RenderError;
use crate::render::{GraphicsComponent, LoadCtx, OffscreenCompositor, RenderCtx, RenderTarget};
use crate::resources::ResourceCache;
use crate::time::FrameTime;

/// Everything that exists only while a window and device are available.
struct Session {
    gpu: Gpu,
    cache: ResourceCache,
    compositor: OffscreenCompositor,
}

/// Top-level rendering orchestrator.
///
/// Components register once; the renderer loads them on every `start()` and
/// draws them in registration order each frame. `start()`/`stop()` bracket a
/// device session and may run many times over the renderer's life, following
/// the window's availability.
pub struct Renderer {
    init: DeviceInit,
    components: Vec<Box<dyn GraphicsComponent>>,
    session: Option<Session>,
}

impl Renderer {
    pub fn new(init: DeviceInit) -> Self {
        Self {
            init,
            components: Vec::new(),
            session: None,
        }
    }

    /// Adds a component to the draw order. Later registrations draw on top.
    pub fn register_component(&mut self, component: impl GraphicsComponent + 'static) {
        self.components.push(Box::new(component));
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Brings up the device, the offscreen target and every component.
    ///
    /// On any failure the half-built session is torn down before returning,
    /// so a failed start leaves the renderer exactly as stopped.
    pub fn start(&mut self, window: Arc<Window>) -> Result<(), RenderError> {
        log::info!("starting render session");
        match self.try_start(window) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("render session start failed: {e}");
                self.stop();
                Err(e)
            }
        }
    }

    fn try_start(&mut self, window: Arc<Window>) -> Result<(), RenderError> {
        let gpu = pollster::block_on(Gpu::new(window, &self.init))
            .map_err(|e| RenderError::Device(format!("{e:#}")))?;

        let size = gpu.size();
        let (lw, lh) = logical_size(size.width, size.height, self.init.logical_width);
        let viewport = Viewport::new(lw as f32, lh as f32);

        let mut cache = ResourceCache::new();
        let compositor =
            OffscreenCompositor::new(gpu.device(), &mut cache, gpu.surface_format(), viewport)?;

        // Stored before component loading so a failed load unwinds through
        // the regular stop() path.
        let Session {
            gpu,
            cache,
            compositor,
        } = self.session.insert(Session {
            gpu,
            cache,
            compositor,
        });

        let mut ctx = LoadCtx {
            device: gpu.device(),
            queue: gpu.queue(),
            cache,
            target_format: OffscreenCompositor::TARGET_FORMAT,
            viewport: compositor.viewport(),
        };
        for component in &mut self.components {
            component.load(&mut ctx)?;
        }

        log::info!(
            "render session started: {} components, logical {}x{}",
            self.components.len(),
            lw,
            lh,
        );
        Ok(())
    }

    /// Tears down the active session: every component drops its GPU state,
    /// then the cache destroys what it owns. A no-op when already stopped,
    /// so it is safe to call from every shutdown path.
    pub fn stop(&mut self) {
        for component in &mut self.components {
            component.unload();
        }
        if let Some(mut session) = self.session.take() {
            session.cache.release_all();
            log::info!("render session stopped");
        }
    }

    /// Renders one frame: clear, draw components in order, composite the
    /// offscreen target to the screen, present.
    ///
    /// Any surface failure is returned as a device error; the caller decides
    /// whether to restart the session or shut down. No frame is retried.
    pub fn present_frame(&mut self, time: FrameTime) -> Result<(), RenderError> {
        let Some(Session {
            gpu,
            cache,
            compositor,
        }) = self.session.as_mut()
        else {
            return Err(RenderError::Device(
                "present_frame called without an active session".into(),
            ));
        };

        let mut frame = gpu
            .begin_frame()
            .map_err(|e| RenderError::Device(format!("surface error: {e}")))?;

        compositor.begin_scene(&mut frame.encoder, self.init.clear_color);

        let ctx = RenderCtx {
            device: gpu.device(),
            queue: gpu.queue(),
            cache,
            target_format: OffscreenCompositor::TARGET_FORMAT,
            viewport: compositor.viewport(),
            time,
        };
        {
            let mut target = RenderTarget::new(&mut frame.encoder, compositor.target_view());
            for component in &mut self.components {
                component.draw(&ctx, &mut target);
            }
        }

        compositor.composite(cache, &mut frame.encoder, &frame.view, self.init.clear_color);
        gpu.submit(frame);
        Ok(())
    }

    /// Adapts the surface and the offscreen target to a new window size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) -> Result<(), RenderError> {
        let Some(Session {
            gpu, compositor, ..
        }) = self.session.as_mut()
        else {
            return Ok(());
        };

        gpu.resize(new_size);
        if new_size.width > 0 && new_size.height > 0 {
            let (lw, lh) = logical_size(new_size.width, new_size.height, self.init.logical_width);
            compositor.recreate_target(gpu.device(), Viewport::new(lw as f32, lh as f32))?;
        }
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Noop;

    impl GraphicsComponent for Noop {
        fn load(&mut self, _ctx: &mut LoadCtx<'_>) -> Result<(), RenderError> {
            Ok(())
        }

        fn draw(&mut self, _ctx: &RenderCtx<'_>, _target: &mut RenderTarget<'_>) {}
    }

    struct Tracker {
        unloads: Rc<Cell<u32>>,
    }

    impl GraphicsComponent for Tracker {
        fn load(&mut self, _ctx: &mut LoadCtx<'_>) -> Result<(), RenderError> {
            Ok(())
        }

        fn unload(&mut self) {
            self.unloads.set(self.unloads.get() + 1);
        }

        fn draw(&mut self, _ctx: &RenderCtx<'_>, _target: &mut RenderTarget<'_>) {}
    }

    #[test]
    fn stop_without_start_is_a_quiet_no_op() {
        let mut renderer = Renderer::new(DeviceInit::default());
        renderer.stop();
        renderer.stop();
        assert!(!renderer.is_started());
    }

    #[test]
    fn present_without_session_is_a_device_error() {
        let mut renderer = Renderer::new(DeviceInit::default());
        let err = renderer
            .present_frame(FrameTime::new(0.016, 1.0))
            .unwrap_err();
        assert!(matches!(err, RenderError::Device(_)));
    }

    #[test]
    fn resize_without_session_is_ignored() {
        let mut renderer = Renderer::new(DeviceInit::default());
        renderer
            .resize(PhysicalSize::new(800, 600))
            .expect("resize before start must be a no-op");
    }

    #[test]
    fn stop_unloads_every_component() {
        let unloads = Rc::new(Cell::new(0));
        let mut renderer = Renderer::new(DeviceInit::default());
        renderer.register_component(Tracker {
            unloads: unloads.clone(),
        });
        renderer.register_component(Tracker {
            unloads: unloads.clone(),
        });

        renderer.stop();
        assert_eq!(unloads.get(), 2);
    }

    #[test]
    fn components_survive_across_sessions() {
        let mut renderer = Renderer::new(DeviceInit::default());
        renderer.register_component(Noop);
        renderer.register_component(Noop);
        renderer.stop();
        assert_eq!(renderer.components.len(), 2);
    }
}
