//! Frame timing for the viewer.
//!
//! Counts repaints and keeps a periodically refreshed frames-per-second
//! figure, shown in the window title.

use std::time::{Duration, Instant};

/// Frame counter with a smoothed FPS reading.
#[derive(Debug)]
pub struct FrameClock {
    /// Total frames since start.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(500))
    }

    pub fn with_interval(fps_update_interval: Duration) -> Self {
        Self {
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: Instant::now(),
            fps_update_interval,
        }
    }

    /// Count a frame. Returns true when the FPS figure was refreshed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
            true
        } else {
            false
        }
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.fps(), 0.0);
    }

    #[test]
    fn test_fps_refresh() {
        let mut clock = FrameClock::with_interval(Duration::from_millis(500));
        let start = clock.fps_update_time;

        for i in 1..10 {
            assert!(!clock.tick_at(start + Duration::from_millis(i * 10)));
        }
        assert!(clock.tick_at(start + Duration::from_secs(1)));

        assert_eq!(clock.frame(), 10);
        assert!((clock.fps() - 10.0).abs() < 1e-3);
    }
}
