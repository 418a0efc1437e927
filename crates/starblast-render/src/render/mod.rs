//! Drawing layer: render contexts, the offscreen compositor, and the
//! built-in graphics components (sprite batch, star field).
//!
//! All drawing targets the low-resolution offscreen texture; the compositor
//! scales it to the window surface at the end of the frame.

pub mod batch;
pub mod starfield;

mod component;
mod compositor;
mod ctx;

pub use batch::{Sprite, SpriteBatch};
pub use component::{GraphicsComponent, LoadCtx};
pub use compositor::OffscreenCompositor;
pub use ctx::{RenderCtx, RenderTarget};
pub use starfield::StarField;
