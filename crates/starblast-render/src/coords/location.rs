use std::cell::Cell;
use std::rc::Rc;

use super::Vec2;

/// Position handle shared between a sprite and the game entity that owns it.
///
/// Physics code moves the entity by writing through its clone of the handle;
/// the sprite batch only reads it when rebuilding vertices. Single-threaded
/// by design — the rendering core never touches it off the render thread.
#[derive(Debug, Clone, Default)]
pub struct SharedLocation(Rc<Cell<Vec2>>);

impl SharedLocation {
    pub fn new(position: Vec2) -> Self {
        Self(Rc::new(Cell::new(position)))
    }

    #[inline]
    pub fn get(&self) -> Vec2 {
        self.0.get()
    }

    #[inline]
    pub fn set(&self, position: Vec2) {
        self.0.set(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_cell() {
        let a = SharedLocation::new(Vec2::zero());
        let b = a.clone();
        b.set(Vec2::new(3.0, 4.0));
        assert_eq!(a.get(), Vec2::new(3.0, 4.0));
    }
}
