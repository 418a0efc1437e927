//! Coordinate types shared across the rendering core.
//!
//! Canonical CPU space is the *logical* resolution of the offscreen target:
//! - fixed width (configuration), height derived from the screen aspect ratio
//! - origin bottom-left, +X right, +Y up
//!
//! Renderers convert to NDC in shaders using a viewport uniform. Decoded
//! textures are stored bottom-to-top so UV space shares the same origin.

mod location;
mod vec2;
mod viewport;

pub use location::SharedLocation;
pub use vec2::Vec2;
pub use viewport::{logical_size, Viewport};
