use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::coords::{SharedLocation, Vec2};
use crate::resources::{SharedSource, TextureId};

/// Frame sequence playing over a sprite's grid.
///
/// The cursor advances in fractional frames; the displayed frame is derived
/// from it on every draw, so animation speed is independent of frame rate.
#[derive(Debug, Clone)]
pub struct Animation {
    first_frame: u32,
    frame_count: u32,
    fps: f32,
    looped: bool,
    cursor: f32,
}

impl Animation {
    /// Holds a single frame forever.
    pub fn still(frame: u32) -> Self {
        Self::new(frame, 1, 0.0, false)
    }

    pub fn new(first_frame: u32, frame_count: u32, fps: f32, looped: bool) -> Self {
        Self {
            first_frame,
            frame_count: frame_count.max(1),
            fps,
            looped,
            cursor: 0.0,
        }
    }

    pub fn advance(&mut self, elapsed: f32) {
        self.cursor += elapsed * self.fps;
    }

    /// True once a non-looping animation has passed its last frame. Looping
    /// animations never end.
    pub fn ended(&self) -> bool {
        !self.looped && self.cursor > (self.frame_count - 1) as f32
    }

    pub fn current_frame(&self) -> u32 {
        if self.looped {
            self.first_frame + (self.cursor as u32) % self.frame_count
        } else if self.ended() {
            self.first_frame + self.frame_count - 1
        } else {
            self.first_frame + self.cursor as u32
        }
    }
}

/// Batch-internal sprite state, shared with the [`Sprite`] handle.
pub(super) struct SpriteState {
    pub source: SharedSource,
    pub frame_width: u32,
    pub frame_height: u32,
    pub animation: Animation,
    pub location: SharedLocation,

    // Resolved during load; `None` until then.
    pub texture: Option<TextureId>,
    pub frames_x: u32,
    pub frames_y: u32,
    pub texture_width: u32,
    pub texture_height: u32,
}

/// Handle to one sprite in a batch.
///
/// Cloning shares the sprite; animation changes made through any clone are
/// visible on the next frame.
#[derive(Clone)]
pub struct Sprite {
    pub(super) state: Rc<RefCell<SpriteState>>,
}

impl Sprite {
    /// Replaces the playing animation, restarting from its first frame.
    pub fn set_animation(&self, first_frame: u32, frame_count: u32, fps: f32, looped: bool) {
        self.state.borrow_mut().animation = Animation::new(first_frame, frame_count, fps, looped);
    }

    pub fn animation_ended(&self) -> bool {
        self.state.borrow().animation.ended()
    }

    /// Shared center position, in logical coordinates.
    pub fn location(&self) -> SharedLocation {
        self.state.borrow().location.clone()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct SpriteVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Two triangles over the 4 corners of one sprite slot.
pub(super) const SPRITE_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Computes the 4 corner vertices for one sprite frame centered on `center`.
///
/// Frames are numbered row-major from the top-left of the sheet as authored.
/// Decoded rows are stored bottom-up, so the frame row index is mirrored
/// before mapping to texel space.
pub(super) fn frame_vertices(
    center: Vec2,
    frame_width: u32,
    frame_height: u32,
    frame: u32,
    frames_x: u32,
    frames_y: u32,
    texture_width: u32,
    texture_height: u32,
) -> [SpriteVertex; 4] {
    let fw = frame_width as f32;
    let fh = frame_height as f32;

    let frame_x = frame % frames_x;
    let frame_y = frames_y - 1 - ((frame / frames_x) % frames_y);

    let u1 = (frame_x as f32 * fw) / texture_width as f32;
    let u2 = ((frame_x + 1) as f32 * fw) / texture_width as f32;
    // Rows are stored bottom-up, so v grows upward exactly like world y;
    // the quad's bottom edge takes the frame's lower v.
    let v1 = (frame_y as f32 * fh) / texture_height as f32;
    let v2 = ((frame_y + 1) as f32 * fh) / texture_height as f32;

    let min = center - Vec2::new(fw, fh) / 2.0;
    let max = center + Vec2::new(fw, fh) / 2.0;

    [
        SpriteVertex { pos: [min.x, min.y], uv: [u1, v1] },
        SpriteVertex { pos: [min.x, max.y], uv: [u1, v2] },
        SpriteVertex { pos: [max.x, min.y], uv: [u2, v1] },
        SpriteVertex { pos: [max.x, max.y], uv: [u2, v2] },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looping_animation_wraps_to_first_frame() {
        let mut anim = Animation::new(0, 8, 8.0, true);
        anim.advance(1.0);
        assert_eq!(anim.current_frame(), 0);
        assert!(!anim.ended());
    }

    #[test]
    fn looping_animation_mid_sequence() {
        let mut anim = Animation::new(4, 4, 8.0, true);
        anim.advance(0.3); // cursor 2.4
        assert_eq!(anim.current_frame(), 6);
    }

    #[test]
    fn one_shot_animation_clamps_to_last_frame() {
        let mut anim = Animation::new(0, 8, 8.0, false);
        anim.advance(2.0); // cursor 16, past frame 7
        assert!(anim.ended());
        assert_eq!(anim.current_frame(), 7);
    }

    #[test]
    fn one_shot_not_ended_on_last_frame_boundary() {
        let mut anim = Animation::new(0, 4, 1.0, false);
        anim.advance(3.0); // cursor exactly frame_count - 1
        assert!(!anim.ended());
        assert_eq!(anim.current_frame(), 3);
    }

    #[test]
    fn still_animation_never_ends_moving() {
        let mut anim = Animation::still(5);
        anim.advance(100.0);
        assert_eq!(anim.current_frame(), 5);
    }

    #[test]
    fn quad_centered_on_location() {
        // Single-frame 8x8 sheet, whole texture.
        let verts = frame_vertices(Vec2::new(100.0, 50.0), 8, 8, 0, 1, 1, 8, 8);
        assert_eq!(verts[0].pos, [96.0, 46.0]);
        assert_eq!(verts[3].pos, [104.0, 54.0]);
        assert_eq!(verts[0].uv, [0.0, 0.0]);
        assert_eq!(verts[3].uv, [1.0, 1.0]);
    }

    #[test]
    fn top_left_frame_maps_to_upper_half_of_flipped_texture() {
        // 2x2 grid of 16x16 frames in a 32x32 sheet. Frame 0 is the
        // top-left frame as authored; with rows stored bottom-up its texels
        // occupy v in [0.5, 1.0].
        let verts = frame_vertices(Vec2::new(0.0, 0.0), 16, 16, 0, 2, 2, 32, 32);
        assert_eq!(verts[0].uv, [0.0, 0.5]);
        assert_eq!(verts[3].uv, [0.5, 1.0]);
    }

    #[test]
    fn second_row_frame_maps_below_first() {
        let verts = frame_vertices(Vec2::new(0.0, 0.0), 16, 16, 2, 2, 2, 32, 32);
        assert_eq!(verts[0].uv, [0.0, 0.0]);
        assert_eq!(verts[3].uv, [0.5, 0.5]);
    }
}
