//! Image decoding.
//!
//! The only supported container is PNG. Decoded pixel rows are stored
//! bottom-to-top so texel coordinates line up with the world's
//! bottom-left origin.

mod png;

pub use png::{decode, DecodedImage, PixelFormat, PNG_SIGNATURE};
