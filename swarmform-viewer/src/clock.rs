//! Frame clock with a periodically sampled FPS.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Clock {
    start: Instant,
    elapsed_secs: f32,
    frame_count: u64,
    fps: f32,
    /// Frame count at the last FPS sample.
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
}

impl Clock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            elapsed_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
        }
    }

    /// Advance one frame. Returns the elapsed time in seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        self.elapsed_secs = now.duration_since(self.start).as_secs_f32();
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }
        self.elapsed_secs
    }

    /// Frames per second, resampled every half second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_clock() {
        let clock = Clock::new();
        assert_eq!(clock.elapsed_secs, 0.0);
        assert_eq!(clock.frame_count, 0);
        assert_eq!(clock.fps(), 0.0);
    }

    #[test]
    fn test_fps_sampling() {
        let mut clock = Clock::new();
        let start = clock.start;
        for k in 1..=30 {
            clock.tick_at(start + Duration::from_millis(k * 20));
        }
        // 30 frames over 600ms, sampled once at 500ms (25 frames).
        assert_eq!(clock.frame_count, 30);
        assert!((clock.fps() - 50.0).abs() < 0.5);
        assert!((clock.elapsed_secs - 0.6).abs() < 1e-4);
    }
}
