//! Fixed-rate frame clock

use std::time::Duration;

/// Timing of one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTick {
    pub frame: u64,
    /// Seconds since the clock started, at the start of this frame
    pub real_time: f64,
    /// When this frame is expected to reach the display
    pub predicted_display_time: f64,
    pub delta_seconds: f32,
}

#[derive(Debug, Clone)]
pub struct FrameClock {
    hz: u32,
    dt: Duration,
    frame: u64,
    real_time: f64,
    prediction_frames: f64,
}

impl FrameClock {
    /// `prediction_frames` is the display pipeline depth used for
    /// predicted display times
    pub fn new_fixed_hz(hz: u32, prediction_frames: f64) -> Self {
        assert!(hz > 0);
        Self {
            hz,
            dt: Duration::from_secs_f64(1.0 / hz as f64),
            frame: 0,
            real_time: 0.0,
            prediction_frames,
        }
    }

    pub fn hz(&self) -> u32 {
        self.hz
    }

    pub fn dt(&self) -> Duration {
        self.dt
    }

    /// Current frame without advancing
    pub fn current(&self) -> FrameTick {
        FrameTick {
            frame: self.frame,
            real_time: self.real_time,
            predicted_display_time: self.real_time + self.prediction_frames * self.dt.as_secs_f64(),
            delta_seconds: if self.frame == 0 { 0.0 } else { self.dt.as_secs_f32() },
        }
    }

    /// Step one frame and return its timing
    pub fn advance(&mut self) -> FrameTick {
        self.frame = self.frame.wrapping_add(1);
        self.real_time += self.dt.as_secs_f64();
        self.current()
    }
}
