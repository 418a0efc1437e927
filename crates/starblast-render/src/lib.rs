//! Starblast rendering core.
//!
//! This crate owns the GPU side of the game: device/session lifecycle,
//! GPU resource caching, PNG asset decoding, the fixed-resolution offscreen
//! compositor, and the sprite batch. Physics, input, audio and the platform
//! event loop live outside this crate and talk to it through
//! [`Renderer`], [`render::SpriteBatch`] handles and [`resources::ImageSource`].

pub mod codec;
pub mod coords;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;
pub mod resources;
pub mod time;

mod renderer;

pub use device::DeviceInit;
pub use error::{FormatError, RenderError};
pub use renderer::Renderer;
