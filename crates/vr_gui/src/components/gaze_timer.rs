use crate::component::{Component, EventContext};
use crate::event::{EventFlags, EventType, MenuEvent, MsgStatus};
use crate::manager::MenuHandle;

/// Remembers when its object was last looked at
///
/// Used to hide playback controls once the user has looked away for a while.
#[derive(Debug, Default)]
pub struct GazeTimer {
    last_gaze_time: f64,
    has_focus: bool,
}

impl GazeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_gaze_time(&mut self, now: f64) {
        self.last_gaze_time = now;
    }

    pub fn last_gaze_time(&self) -> f64 {
        self.last_gaze_time
    }

    pub fn is_focused(&self) -> bool {
        self.has_focus
    }
}

impl Component for GazeTimer {
    fn event_flags(&self) -> EventFlags {
        EventFlags::FRAME_UPDATE | EventFlags::FOCUS_GAINED | EventFlags::FOCUS_LOST
    }

    fn on_event(&mut self, ctx: &mut EventContext<'_>, _this: MenuHandle, event: &MenuEvent) -> MsgStatus {
        match event.kind {
            EventType::FrameUpdate => {
                if self.has_focus {
                    self.last_gaze_time = ctx.input.real_time;
                }
            }
            EventType::FocusGained => {
                self.has_focus = true;
                self.last_gaze_time = ctx.input.real_time;
            }
            EventType::FocusLost => self.has_focus = false,
            _ => {}
        }
        MsgStatus::Alive
    }

    crate::component_any!("GazeTimer");
}
