//! Frame timing and event throttling.
//!
//! [`Time`] is the clock the background reads once per frame: the idle
//! stimulus orbits with [`Time::elapsed`], and the frame rate is measured
//! once per second and logged at `debug` level.
//!
//! [`Throttle`] is a leading-edge rate limiter used for scroll events.
//!
//! # Example
//!
//! ```ignore
//! use moire::time::Time;
//!
//! let mut time = Time::new();
//!
//! // In the frame callback:
//! time.update();
//! let angle = time.elapsed();
//! ```

use std::time::{Duration, Instant};

/// Time tracking for the frame loop.
#[derive(Debug)]
pub struct Time {
    /// When the timer was created.
    start: Instant,
    /// When the last frame occurred.
    last_frame: Instant,
    /// Total elapsed time in seconds.
    elapsed_secs: f32,
    /// Time since last frame in seconds.
    delta_secs: f32,
    /// Total frames since start.
    frame_count: u64,
    /// Measured frames per second.
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS measurement.
    fps_update_time: Instant,
    /// How often the frame rate is measured.
    fps_update_interval: Duration,
}

impl Time {
    /// Create a new time tracker starting from now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a time tracker whose clock starts at `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last_frame: start,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: start,
            fps_update_interval: Duration::from_secs(1),
        }
    }

    /// Update timing values. Call once per frame.
    ///
    /// Returns `(elapsed_time, delta_time)` for convenience.
    pub fn update(&mut self) -> (f32, f32) {
        self.update_at(Instant::now())
    }

    /// Same as [`update`](Self::update) with an explicit timestamp.
    pub fn update_at(&mut self, now: Instant) -> (f32, f32) {
        self.delta_secs = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.elapsed_secs = now.saturating_duration_since(self.start).as_secs_f32();
        self.frame_count += 1;

        let fps_elapsed = now.saturating_duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
            log::debug!("{:.1} fps", self.fps);
        }

        (self.elapsed_secs, self.delta_secs)
    }

    /// Total elapsed time in seconds since start.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Time since last frame in seconds.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Last measured frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Reset the timer to its initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading-edge throttle: the first call passes, later calls within
/// `interval` of the last accepted one are dropped.
#[derive(Clone, Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether an event arriving at `now` should be handled.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Forget the last accepted event.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert_eq!(time.elapsed(), 0.0);
    }

    #[test]
    fn test_time_update() {
        let mut time = Time::new();
        thread::sleep(Duration::from_millis(10));
        let (elapsed, delta) = time.update();

        assert!(elapsed > 0.0);
        assert!(delta > 0.0);
        assert_eq!(time.frame(), 1);
    }

    #[test]
    fn test_explicit_timestamps() {
        let start = Instant::now();
        let mut time = Time::starting_at(start);
        time.update_at(start + Duration::from_millis(500));
        let (elapsed, delta) = time.update_at(start + Duration::from_millis(750));
        assert!((elapsed - 0.75).abs() < 1e-4);
        assert!((delta - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_fps_measured_each_second() {
        let start = Instant::now();
        let mut time = Time::starting_at(start);
        for i in 1..=60 {
            time.update_at(start + Duration::from_micros(i * 16_667));
        }
        assert!((time.fps() - 60.0).abs() < 0.5);
    }

    #[test]
    fn test_throttle_leading_edge() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(16));
        assert!(throttle.ready(start));
        assert!(!throttle.ready(start + Duration::from_millis(5)));
        assert!(!throttle.ready(start + Duration::from_millis(15)));
        assert!(throttle.ready(start + Duration::from_millis(16)));
        assert!(!throttle.ready(start + Duration::from_millis(20)));
    }

    #[test]
    fn test_throttle_reset() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(16));
        assert!(throttle.ready(start));
        throttle.reset();
        assert!(throttle.ready(start + Duration::from_millis(1)));
    }
}
