//! Pulsing arrow that hints a carousel can be swiped
//!
//! Several hints with staggered `time_offset`s make a chevron that ripples
//! in the swipe direction.

use crate::component::{Component, EventContext};
use crate::components::carousel::CarouselBrowser;
use crate::event::{EventFlags, EventType, MenuEvent, MsgStatus};
use crate::lerp::Lerp;
use crate::manager::MenuHandle;
use glam::Vec4;
use std::f64::consts::TAU;

const FADE_TIME: f64 = 0.5;

#[derive(Debug)]
pub struct CarouselSwipeHint {
    carousel: MenuHandle,
    is_right_swipe: bool,
    total_time: f32,
    time_offset: f32,
    delay: f32,
    start_time: f64,
    should_show: bool,
    ignore_delay: bool,
    show_hints: bool,
    total_alpha: Lerp,
}

impl CarouselSwipeHint {
    /// `carousel` is the object carrying the [`CarouselBrowser`] to watch
    pub fn new(carousel: MenuHandle, is_right_swipe: bool, total_time: f32, time_offset: f32, delay: f32) -> Self {
        Self {
            carousel,
            is_right_swipe,
            total_time,
            time_offset,
            delay,
            start_time: 0.0,
            should_show: false,
            ignore_delay: false,
            show_hints: true,
            total_alpha: Lerp::default(),
        }
    }

    pub fn set_show_hints(&mut self, show: bool) {
        self.show_hints = show;
    }

    pub fn show_hints(&self) -> bool {
        self.show_hints
    }

    pub fn is_showing(&self) -> bool {
        self.should_show
    }

    /// Hide at once; the next show skips the delay
    pub fn reset(&mut self, obj_color: &mut Vec4, now: f64) {
        self.ignore_delay = true;
        self.should_show = false;
        self.total_alpha.set(now, 0.0, now, 0.0);
        obj_color.w = 0.0;
    }

    fn can_swipe(&self, carousel: &CarouselBrowser) -> bool {
        if self.is_right_swipe {
            carousel.can_swipe_forward()
        } else {
            carousel.can_swipe_back()
        }
    }

    fn show(&mut self, now: f64) {
        if self.should_show {
            return;
        }
        self.should_show = true;
        let delay = if self.ignore_delay { 0.0 } else { self.delay };
        self.start_time = now + f64::from(self.time_offset + delay);
        self.ignore_delay = false;
        self.total_alpha.set(now, self.total_alpha.value(now), now + FADE_TIME, 1.0);
    }

    fn hide(&mut self, now: f64) {
        if !self.should_show {
            return;
        }
        self.should_show = false;
        self.total_alpha.set(now, self.total_alpha.value(now), now + FADE_TIME, 0.0);
    }

    /// Hint opacity at `now`
    pub fn alpha(&self, now: f64) -> f32 {
        let mut alpha = self.total_alpha.value(now);
        if alpha > 0.0 {
            if now < self.start_time {
                alpha = 0.0;
            } else {
                let phase = (now - self.start_time) / f64::from(self.total_time);
                alpha *= (phase * TAU).sin().max(0.0);
            }
        }
        alpha as f32
    }
}

impl Component for CarouselSwipeHint {
    fn event_flags(&self) -> EventFlags {
        EventFlags::FRAME_UPDATE | EventFlags::OPENING
    }

    fn on_event(&mut self, ctx: &mut EventContext<'_>, this: MenuHandle, event: &MenuEvent) -> MsgStatus {
        let now = ctx.input.real_time;
        match event.kind {
            EventType::Opening => {
                if let Some(obj) = ctx.manager.get_mut(this) {
                    let mut color = obj.color;
                    self.reset(&mut color, now);
                    obj.color = color;
                }
            }
            EventType::FrameUpdate => {
                let wanted = self.show_hints
                    && ctx
                        .manager
                        .component::<CarouselBrowser>(self.carousel)
                        .is_some_and(|c| c.has_selection() && self.can_swipe(c));
                if wanted {
                    self.show(now);
                } else {
                    self.hide(now);
                }
                let alpha = self.alpha(now);
                if let Some(obj) = ctx.manager.get_mut(this) {
                    obj.color = Vec4::new(1.0, 1.0, 1.0, alpha);
                }
            }
            _ => {}
        }
        MsgStatus::Alive
    }

    crate::component_any!("CarouselSwipeHint");
}
