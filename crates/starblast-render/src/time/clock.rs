use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds elapsed since the previous tick.
    pub elapsed: f32,

    /// Seconds elapsed since the last clock reset.
    pub total: f32,
}

impl FrameTime {
    #[inline]
    pub const fn new(elapsed: f32, total: f32) -> Self {
        Self { elapsed, total }
    }
}

/// Monotonic game clock.
///
/// `elapsed` feeds sprite animation; `total` feeds time-driven shader
/// uniforms (star scrolling). The per-tick delta is clamped so a debugger
/// pause or a long suspension does not fast-forward every animation at once.
#[derive(Debug, Clone)]
pub struct GameClock {
    first: Instant,
    last: Instant,
    elapsed_max: Duration,
}

impl GameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            first: now,
            last: now,
            elapsed_max: Duration::from_millis(250),
        }
    }

    /// Re-baselines the clock.
    ///
    /// Called on session activation so the first frame after a restart does
    /// not observe the whole downtime as elapsed time.
    pub fn reset(&mut self) {
        log::info!("resetting game clock");
        let now = Instant::now();
        self.first = now;
        self.last = now;
    }

    /// Advances the clock and returns a new [`FrameTime`].
    pub fn update(&mut self) -> FrameTime {
        let now = Instant::now();
        let mut elapsed = now.saturating_duration_since(self.last);
        if elapsed > self.elapsed_max {
            elapsed = self.elapsed_max;
        }
        self.last = now;

        FrameTime {
            elapsed: elapsed.as_secs_f32(),
            total: now.saturating_duration_since(self.first).as_secs_f32(),
        }
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_yields_nonnegative_times() {
        let mut clock = GameClock::new();
        let t = clock.update();
        assert!(t.elapsed >= 0.0);
        assert!(t.total >= 0.0);
    }

    #[test]
    fn elapsed_is_clamped() {
        let mut clock = GameClock::new();
        // Simulate a long stall by pushing `last` far into the past.
        clock.last = Instant::now() - Duration::from_secs(10);
        let t = clock.update();
        assert!(t.elapsed <= 0.25 + f32::EPSILON);
    }

    #[test]
    fn reset_rebaselines_total() {
        let mut clock = GameClock::new();
        clock.first = Instant::now() - Duration::from_secs(10);
        clock.reset();
        let t = clock.update();
        assert!(t.total < 1.0);
    }
}
