//! Per-frame input snapshot
//!
//! [`InputSampler`] turns raw device state (held buttons, touchpad position,
//! key events, head/controller pose) into a [`FrameInput`] with press and
//! release edges and touchpad swipe gestures.

use crate::clock::FrameTick;
use glam::{Mat4, Vec2};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u32 {
        const A = 1 << 0;
        const B = 1 << 1;
        const X = 1 << 2;
        const Y = 1 << 3;
        const START = 1 << 4;
        const BACK = 1 << 5;
        const SELECT = 1 << 6;
        const MENU = 1 << 7;
        const RIGHT_TRIGGER = 1 << 8;
        const LEFT_TRIGGER = 1 << 9;
        const DPAD_UP = 1 << 10;
        const DPAD_DOWN = 1 << 11;
        const DPAD_LEFT = 1 << 12;
        const DPAD_RIGHT = 1 << 13;
        const SWIPE_UP = 1 << 16;
        const SWIPE_DOWN = 1 << 17;
        const SWIPE_FORWARD = 1 << 18;
        const SWIPE_BACK = 1 << 19;
        /// Touchpad is being touched
        const TOUCH = 1 << 20;
        /// The current (or just released) touch travelled far enough to be a swipe
        const TOUCH_WAS_SWIPE = 1 << 21;
    }
}

impl Buttons {
    pub const SWIPES: Buttons = Buttons::SWIPE_UP
        .union(Buttons::SWIPE_DOWN)
        .union(Buttons::SWIPE_FORWARD)
        .union(Buttons::SWIPE_BACK);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub state: Buttons,
    pub pressed: Buttons,
    pub released: Buttons,
}

impl ButtonState {
    pub fn from_transition(prev: Buttons, state: Buttons) -> Self {
        Self {
            state,
            pressed: state & !prev,
            released: prev & !state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Return,
    Escape,
    Back,
    Space,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub action: KeyAction,
    pub repeat_count: u32,
}

impl KeyEvent {
    pub fn down(code: KeyCode) -> Self {
        Self {
            code,
            action: KeyAction::Down,
            repeat_count: 0,
        }
    }

    pub fn up(code: KeyCode) -> Self {
        Self {
            code,
            action: KeyAction::Up,
            repeat_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    pub frame_number: u64,
    pub real_time: f64,
    pub predicted_display_time: f64,
    pub delta_seconds: f32,
    pub buttons: ButtonState,
    /// Touchpad position, held at the last value after release
    pub touch: Vec2,
    /// Offset of the touch from where it started
    pub touch_relative: Vec2,
    pub key_events: Vec<KeyEvent>,
    /// World transform of the gaze/pointer; ray along its -Z axis
    pub trace_matrix: Mat4,
}

impl Default for FrameInput {
    fn default() -> Self {
        Self {
            frame_number: 0,
            real_time: 0.0,
            predicted_display_time: 0.0,
            delta_seconds: 0.0,
            buttons: ButtonState::default(),
            touch: Vec2::ZERO,
            touch_relative: Vec2::ZERO,
            key_events: Vec::new(),
            trace_matrix: Mat4::IDENTITY,
        }
    }
}

impl FrameInput {
    pub fn with_tick(tick: &FrameTick) -> Self {
        Self {
            frame_number: tick.frame,
            real_time: tick.real_time,
            predicted_display_time: tick.predicted_display_time,
            delta_seconds: tick.delta_seconds,
            ..Self::default()
        }
    }

    pub fn key_action(&self, code: KeyCode, action: KeyAction) -> bool {
        self.key_events.iter().any(|k| k.code == code && k.action == action)
    }
}

/// Raw device state for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawInput {
    /// Physical buttons held down
    pub buttons: Buttons,
    pub touch: Option<Vec2>,
    pub keys: Vec<KeyEvent>,
    pub trace_matrix: Mat4,
}

impl Default for RawInput {
    fn default() -> Self {
        Self {
            buttons: Buttons::empty(),
            touch: None,
            keys: Vec::new(),
            trace_matrix: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputSampler {
    prev: Buttons,
    touch_start: Option<Vec2>,
    last_touch: Vec2,
    swipe_distance: f32,
}

impl InputSampler {
    /// `swipe_distance` is the touchpad travel that turns a touch into a swipe
    pub fn new(swipe_distance: f32) -> Self {
        Self {
            prev: Buttons::empty(),
            touch_start: None,
            last_touch: Vec2::ZERO,
            swipe_distance,
        }
    }

    fn swipe_direction(delta: Vec2) -> Buttons {
        if delta.x.abs() >= delta.y.abs() {
            if delta.x > 0.0 {
                Buttons::SWIPE_FORWARD
            } else {
                Buttons::SWIPE_BACK
            }
        } else if delta.y > 0.0 {
            Buttons::SWIPE_DOWN
        } else {
            Buttons::SWIPE_UP
        }
    }

    pub fn sample(&mut self, raw: &RawInput, tick: &FrameTick) -> FrameInput {
        let mut state = raw.buttons - (Buttons::SWIPES | Buttons::TOUCH | Buttons::TOUCH_WAS_SWIPE);
        let mut touch_relative = Vec2::ZERO;

        match (raw.touch, self.touch_start) {
            (Some(pos), None) => {
                self.touch_start = Some(pos);
                self.last_touch = pos;
                state |= Buttons::TOUCH;
            }
            (Some(pos), Some(start)) => {
                self.last_touch = pos;
                touch_relative = pos - start;
                state |= Buttons::TOUCH;
                if touch_relative.length() >= self.swipe_distance {
                    state |= Buttons::TOUCH_WAS_SWIPE;
                }
            }
            (None, Some(start)) => {
                self.touch_start = None;
                touch_relative = self.last_touch - start;
                if touch_relative.length() >= self.swipe_distance {
                    state |= Buttons::TOUCH_WAS_SWIPE | Self::swipe_direction(touch_relative);
                    tracing::debug!(?touch_relative, "swipe");
                }
            }
            (None, None) => {}
        }

        let buttons = ButtonState::from_transition(self.prev, state);
        self.prev = state;

        FrameInput {
            buttons,
            touch: self.last_touch,
            touch_relative,
            key_events: raw.keys.clone(),
            trace_matrix: raw.trace_matrix,
            ..FrameInput::with_tick(tick)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(pos: Option<Vec2>) -> RawInput {
        RawInput {
            touch: pos,
            ..RawInput::default()
        }
    }

    #[test]
    fn test_button_edges() {
        let mut sampler = InputSampler::new(100.0);
        let tick = FrameTick::default();
        let down = RawInput {
            buttons: Buttons::A,
            ..RawInput::default()
        };

        let f = sampler.sample(&down, &tick);
        assert_eq!(f.buttons.pressed, Buttons::A);
        let f = sampler.sample(&down, &tick);
        assert!(f.buttons.pressed.is_empty());
        assert_eq!(f.buttons.state, Buttons::A);
        let f = sampler.sample(&RawInput::default(), &tick);
        assert_eq!(f.buttons.released, Buttons::A);
    }

    #[test]
    fn test_tap_is_not_a_swipe() {
        let mut sampler = InputSampler::new(100.0);
        let tick = FrameTick::default();
        let f = sampler.sample(&touch(Some(Vec2::new(10.0, 10.0))), &tick);
        assert!(f.buttons.pressed.contains(Buttons::TOUCH));
        let f = sampler.sample(&touch(Some(Vec2::new(13.0, 14.0))), &tick);
        assert_eq!(f.touch_relative, Vec2::new(3.0, 4.0));
        let f = sampler.sample(&touch(None), &tick);
        assert!(f.buttons.released.contains(Buttons::TOUCH));
        assert!(!f.buttons.state.contains(Buttons::TOUCH_WAS_SWIPE));
        assert_eq!(f.touch_relative, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_horizontal_swipe() {
        let mut sampler = InputSampler::new(100.0);
        let tick = FrameTick::default();
        sampler.sample(&touch(Some(Vec2::new(400.0, 300.0))), &tick);
        sampler.sample(&touch(Some(Vec2::new(250.0, 310.0))), &tick);
        let f = sampler.sample(&touch(None), &tick);
        assert!(f.buttons.pressed.contains(Buttons::SWIPE_BACK));
        assert!(f.buttons.state.contains(Buttons::TOUCH_WAS_SWIPE));

        // swipe flags last one frame
        let f = sampler.sample(&touch(None), &tick);
        assert!(f.buttons.released.contains(Buttons::SWIPE_BACK));
        assert!(f.buttons.state.is_empty());
    }

    #[test]
    fn test_tick_fields_are_copied() {
        let mut sampler = InputSampler::new(100.0);
        let tick = FrameTick {
            frame: 7,
            real_time: 1.5,
            predicted_display_time: 1.55,
            delta_seconds: 0.016,
        };
        let raw = RawInput {
            keys: vec![KeyEvent::down(KeyCode::Return)],
            ..RawInput::default()
        };
        let f = sampler.sample(&raw, &tick);
        assert_eq!(f.frame_number, 7);
        assert_eq!(f.predicted_display_time, 1.55);
        assert!(f.key_action(KeyCode::Return, KeyAction::Down));
    }
}
