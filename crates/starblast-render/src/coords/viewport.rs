/// Viewport size in logical pixels.
///
/// Renderers treat this as the coordinate basis for converting logical
/// positions to NDC in shaders.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Derives the logical target size from the physical screen size.
///
/// Width is fixed by configuration; height follows the screen aspect ratio,
/// so gameplay math sees the same horizontal resolution on every device and
/// the offscreen target never distorts when scaled to the screen.
pub fn logical_size(physical_width: u32, physical_height: u32, logical_width: u32) -> (u32, u32) {
    let ratio = physical_height as f32 / physical_width as f32;
    let height = (logical_width as f32 * ratio) as u32;
    (logical_width, height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_aspect_ratio_same_logical_size() {
        // 1920x1080 and 480x270 share a 16:9 aspect; gameplay coordinates
        // must be identical on both, so a sprite at (x, y) covers the same
        // relative screen fraction regardless of device resolution.
        assert_eq!(logical_size(1920, 1080, 600), logical_size(480, 270, 600));
        assert_eq!(logical_size(1920, 1080, 600), (600, 337));
    }

    #[test]
    fn portrait_screen_grows_logical_height() {
        let (w, h) = logical_size(1080, 1920, 600);
        assert_eq!(w, 600);
        assert!(h > w);
    }

    #[test]
    fn degenerate_screen_never_yields_zero_height() {
        let (_, h) = logical_size(4096, 1, 600);
        assert_eq!(h, 1);
    }

    #[test]
    fn validity_rejects_empty_and_non_finite_sizes() {
        assert!(Viewport::new(600.0, 337.0).is_valid());
        assert!(!Viewport::new(0.0, 337.0).is_valid());
        assert!(!Viewport::new(600.0, -1.0).is_valid());
        assert!(!Viewport::new(f32::NAN, 337.0).is_valid());
        assert!(!Viewport::new(600.0, f32::INFINITY).is_valid());
    }
}
