//! GPU resource ownership.
//!
//! A single [`ResourceCache`] owns every uploaded GPU object — textures,
//! shader programs, vertex buffers — for the lifetime of one device session.
//! Components reference entries through typed ids, never by raw handle they
//! own, so a session teardown can invalidate everything at once.

mod cache;
mod source;

pub(crate) mod scope;

pub use cache::{BufferId, CachedTexture, ProgramId, ResourceCache, ShaderProgram, TextureId};
pub use source::{shared, FileSource, ImageSource, MemorySource, SharedSource, SourceId};
pub(crate) use source::SourceReader;
