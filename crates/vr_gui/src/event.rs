//! Menu events and how they travel through the object tree

use crate::manager::MenuHandle;
use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    FrameUpdate,
    FocusGained,
    FocusLost,
    TouchDown,
    TouchUp,
    TouchRelative,
    TouchAbsolute,
    SwipeForward,
    SwipeBack,
    SwipeUp,
    SwipeDown,
    SwipeComplete,
    Init,
    Opening,
    Opened,
    Closing,
    Closed,
}

bitflags::bitflags! {
    /// Set of event types a component wants to receive
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventFlags: u32 {
        const FRAME_UPDATE = 1 << 0;
        const FOCUS_GAINED = 1 << 1;
        const FOCUS_LOST = 1 << 2;
        const TOUCH_DOWN = 1 << 3;
        const TOUCH_UP = 1 << 4;
        const TOUCH_RELATIVE = 1 << 5;
        const TOUCH_ABSOLUTE = 1 << 6;
        const SWIPE_FORWARD = 1 << 7;
        const SWIPE_BACK = 1 << 8;
        const SWIPE_UP = 1 << 9;
        const SWIPE_DOWN = 1 << 10;
        const SWIPE_COMPLETE = 1 << 11;
        const INIT = 1 << 12;
        const OPENING = 1 << 13;
        const OPENED = 1 << 14;
        const CLOSING = 1 << 15;
        const CLOSED = 1 << 16;
    }
}

impl EventType {
    pub fn flag(self) -> EventFlags {
        match self {
            EventType::FrameUpdate => EventFlags::FRAME_UPDATE,
            EventType::FocusGained => EventFlags::FOCUS_GAINED,
            EventType::FocusLost => EventFlags::FOCUS_LOST,
            EventType::TouchDown => EventFlags::TOUCH_DOWN,
            EventType::TouchUp => EventFlags::TOUCH_UP,
            EventType::TouchRelative => EventFlags::TOUCH_RELATIVE,
            EventType::TouchAbsolute => EventFlags::TOUCH_ABSOLUTE,
            EventType::SwipeForward => EventFlags::SWIPE_FORWARD,
            EventType::SwipeBack => EventFlags::SWIPE_BACK,
            EventType::SwipeUp => EventFlags::SWIPE_UP,
            EventType::SwipeDown => EventFlags::SWIPE_DOWN,
            EventType::SwipeComplete => EventFlags::SWIPE_COMPLETE,
            EventType::Init => EventFlags::INIT,
            EventType::Opening => EventFlags::OPENING,
            EventType::Opened => EventFlags::OPENED,
            EventType::Closing => EventFlags::CLOSING,
            EventType::Closed => EventFlags::CLOSED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchType {
    /// Every object in the tree, parents before children
    Broadcast,
    /// Root to the focused object
    Focus,
    /// Root to the event's target
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgStatus {
    Alive,
    Consumed,
}

/// Where the gaze ray landed this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestResult {
    pub hit: Option<MenuHandle>,
    pub t: f32,
    pub uv: Vec2,
    pub ray_start: Vec3,
    pub ray_dir: Vec3,
}

impl Default for HitTestResult {
    fn default() -> Self {
        Self {
            hit: None,
            t: f32::MAX,
            uv: Vec2::ZERO,
            ray_start: Vec3::ZERO,
            ray_dir: Vec3::NEG_Z,
        }
    }
}

impl HitTestResult {
    pub fn hit_point(&self) -> Vec3 {
        self.ray_start + self.ray_dir * self.t
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuEvent {
    pub kind: EventType,
    pub dispatch: DispatchType,
    pub target: Option<MenuHandle>,
    /// Previously focused object for focus changes
    pub old_focus: Option<MenuHandle>,
    pub float_value: Vec2,
    pub hit: HitTestResult,
}

impl MenuEvent {
    pub fn broadcast(kind: EventType, hit: HitTestResult) -> Self {
        Self {
            kind,
            dispatch: DispatchType::Broadcast,
            target: None,
            old_focus: None,
            float_value: Vec2::ZERO,
            hit,
        }
    }

    pub fn focus(kind: EventType, hit: HitTestResult) -> Self {
        Self {
            dispatch: DispatchType::Focus,
            ..Self::broadcast(kind, hit)
        }
    }

    pub fn target(kind: EventType, target: MenuHandle, hit: HitTestResult) -> Self {
        Self {
            dispatch: DispatchType::Target,
            target: Some(target),
            ..Self::broadcast(kind, hit)
        }
    }

    pub fn with_value(mut self, value: Vec2) -> Self {
        self.float_value = value;
        self
    }
}
