//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue for one session
//! - creating & configuring the Surface (swapchain) with a ≥16-bit format
//! - acquiring frames and providing encoders/views for rendering
//!
//! Everything here is session-scoped: a [`Gpu`] is built by
//! `Renderer::start()` and dropped by `Renderer::stop()`, together with all
//! GPU objects derived from it.

mod frame;
mod gpu;
mod init;
mod surface;

pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::DeviceInit;
