use thiserror::Error;

/// Failure taxonomy of the rendering core.
///
/// `Device` failures are fatal to the whole session and recoverable only by a
/// full `stop()`/`start()` cycle. The remaining variants are local to one
/// resource load, but since every component loads eagerly during `start()`,
/// they abort the start and unwind the half-built session.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Surface/adapter/context failure, or an operation attempted without an
    /// active session.
    #[error("device error: {0}")]
    Device(String),

    /// Decode-or-upload failure for a single texture.
    #[error("texture `{name}` failed to load: {reason}")]
    Texture { name: String, reason: String },

    /// Shader stage compilation or pipeline link failure, with the
    /// compiler's diagnostic text.
    #[error("shader error: {0}")]
    Shader(String),

    /// Vertex buffer upload failure.
    #[error("vertex buffer error: {0}")]
    Buffer(String),

    /// Malformed image stream.
    #[error("image format error: {0}")]
    Format(#[from] FormatError),
}

/// Structural failure while decoding an image stream.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("source could not be opened: {0}")]
    Open(String),

    #[error("not a PNG stream (signature mismatch)")]
    BadSignature,

    #[error("stream ended before the image was complete")]
    Truncated,

    #[error("read failed: {0}")]
    Read(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("image has a zero-sized dimension")]
    EmptyImage,

    #[error("unsupported pixel layout: {0}")]
    Unsupported(String),
}
