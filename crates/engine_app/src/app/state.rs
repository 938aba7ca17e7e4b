//! Scripted headset input for the headless driver

use engine_core::{Buttons, KeyCode, KeyEvent, RawInput};
use glam::{Mat4, Quat, Vec2, Vec3};

/// Where the gaze rests, in menu-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GazeTarget {
    Carousel,
    SeekBar(f32),
    PlayButton,
    Away,
}

impl GazeTarget {
    fn local_point(self) -> Vec3 {
        match self {
            GazeTarget::Carousel => Vec3::new(0.0, 0.3, 0.0),
            GazeTarget::SeekBar(progress) => Vec3::new(-0.5 + progress.clamp(0.0, 1.0), -0.35, 0.02),
            GazeTarget::PlayButton => Vec3::new(0.65, -0.35, 0.02),
            GazeTarget::Away => Vec3::new(0.0, 3.0, 0.0),
        }
    }
}

/// Trace matrix at the origin whose -Z axis points at `target`
pub fn gaze_at(target: Vec3) -> Mat4 {
    Mat4::from_quat(Quat::from_rotation_arc(Vec3::NEG_Z, target.normalize_or_zero()))
}

/// A fixed tour of the demo menu: browse the carousel, swipe once, seek,
/// press play, look away until the controls hide, then back out
#[derive(Debug, Clone)]
pub struct InputScript {
    menu_distance: f32,
}

impl InputScript {
    pub const SWIPE_START: u64 = 60;
    pub const SWIPE_END: u64 = 70;
    pub const SEEK_TAP: u64 = 160;
    pub const PLAY_TAP: u64 = 240;
    pub const BACK_KEY: u64 = 460;

    pub fn new(menu_distance: f32) -> Self {
        Self { menu_distance }
    }

    pub fn gaze_target(&self, frame: u64) -> GazeTarget {
        match frame {
            0..=120 => GazeTarget::Carousel,
            121..=220 => GazeTarget::SeekBar(0.25 + (frame - 121) as f32 * 0.005),
            221..=280 => GazeTarget::PlayButton,
            _ => GazeTarget::Away,
        }
    }

    fn touch(&self, frame: u64) -> Option<Vec2> {
        match frame {
            Self::SWIPE_START..=Self::SWIPE_END => {
                let t = (frame - Self::SWIPE_START) as f32 / (Self::SWIPE_END - Self::SWIPE_START) as f32;
                Some(Vec2::new(0.6 * t, 0.0))
            }
            Self::SEEK_TAP | Self::PLAY_TAP => Some(Vec2::new(0.5, 0.5)),
            _ => None,
        }
    }

    fn keys(&self, frame: u64) -> Vec<KeyEvent> {
        match frame {
            f if f == Self::BACK_KEY - 1 => vec![KeyEvent::down(KeyCode::Back)],
            Self::BACK_KEY => vec![KeyEvent::up(KeyCode::Back)],
            _ => Vec::new(),
        }
    }

    pub fn raw_input(&self, frame: u64) -> RawInput {
        let local = self.gaze_target(frame).local_point();
        let world = local + Vec3::new(0.0, 0.0, -self.menu_distance);
        RawInput {
            buttons: Buttons::empty(),
            touch: self.touch(frame),
            keys: self.keys(frame),
            trace_matrix: gaze_at(world),
        }
    }
}
