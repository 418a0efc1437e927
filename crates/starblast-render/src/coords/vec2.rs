use core::ops::{Add, Div, Sub};

/// Point or offset in logical pixels, origin bottom-left, +Y up.
///
/// Carries just the arithmetic sprite geometry needs: offsetting a center
/// by a half-extent. Heavier vector math belongs to the physics side.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_plus_minus_half_extent_brackets_the_center() {
        let center = Vec2::new(100.0, 50.0);
        let half = Vec2::new(8.0, 6.0) / 2.0;
        assert_eq!(center - half, Vec2::new(96.0, 47.0));
        assert_eq!(center + half, Vec2::new(104.0, 53.0));
    }
}
