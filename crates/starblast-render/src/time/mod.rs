//! Frame timing.
//!
//! One [`GameClock`] drives the whole game loop: `reset()` on session
//! activation, `update()` once per logic tick. The produced [`FrameTime`]
//! is plain data so animation and shader-uniform code can be tested with
//! fabricated values.

mod clock;

pub use clock::{FrameTime, GameClock};
