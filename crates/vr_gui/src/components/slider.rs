//! Horizontal scrub slider
//!
//! The slider drives four sibling widgets: a background bar whose width
//! maps gaze position to progress, a scrub bar that grows from the left
//! edge, a label riding the scrub bar's end with the current value, and a
//! seek label that follows the gaze while the slider has focus.

use crate::component::{Component, EventContext};
use crate::event::{EventFlags, EventType, HitTestResult, MenuEvent, MsgStatus};
use crate::manager::{MenuHandle, MenuManager};
use crate::object::pixel_scale;
use glam::{Vec2, Vec3};

const SCRUB_BAR_HEIGHT: f32 = 40.0;

/// Objects the slider moves and relabels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderWidgets {
    pub background: MenuHandle,
    pub scrub_bar: MenuHandle,
    pub current_label: MenuHandle,
    pub seek_label: MenuHandle,
    /// Full bar width in pixels
    pub scrub_bar_width: f32,
}

pub type SliderCallback = Box<dyn FnMut(f32)>;

pub struct Slider {
    has_focus: bool,
    progress: f32,
    max: f32,
    min: f32,
    sig_figs: i32,
    widgets: Option<SliderWidgets>,
    on_click: Option<SliderCallback>,
}

impl std::fmt::Debug for Slider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slider")
            .field("progress", &self.progress)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("has_focus", &self.has_focus)
            .finish()
    }
}

impl Default for Slider {
    fn default() -> Self {
        Self {
            has_focus: false,
            progress: 0.0,
            max: 1.0,
            min: 0.0,
            sig_figs: 0,
            widgets: None,
            on_click: None,
        }
    }
}

impl Slider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Receives the scaled value under the gaze when the slider is touched
    pub fn set_on_click(&mut self, callback: SliderCallback) {
        self.on_click = Some(callback);
    }

    pub fn set_widgets(&mut self, mgr: &mut MenuManager, widgets: SliderWidgets) {
        if let Some(seek) = mgr.get_mut(widgets.seek_label) {
            seek.set_visible(false);
        }
        self.widgets = Some(widgets);
    }

    /// Value range and label format, then relayout at the current progress
    ///
    /// `sig_figs` is the number of decimals; -1 shows "Default" at the
    /// minimum; above 1000 the value is printed in exponent form with
    /// `sig_figs - 1000` digits.
    pub fn set_extents(&mut self, mgr: &mut MenuManager, max: f32, min: f32, sig_figs: i32) {
        self.max = max;
        self.min = min;
        self.sig_figs = sig_figs;
        self.set_progress(mgr, self.progress);
    }

    pub fn scale_value(&self, progress: f32) -> f32 {
        self.min + (self.max - self.min) * progress
    }

    /// Set by value; clamped into the extents
    pub fn set_value(&mut self, mgr: &mut MenuManager, value: f32) {
        let range = self.max - self.min;
        let progress = if range != 0.0 { (value - self.min) / range } else { 0.0 };
        self.set_progress(mgr, progress.clamp(0.0, 1.0));
    }

    pub fn set_progress(&mut self, mgr: &mut MenuManager, progress: f32) {
        self.progress = progress;
        let Some(w) = self.widgets else { return };
        let seek_width = w.scrub_bar_width * progress;

        if let Some(bar) = mgr.get_mut(w.scrub_bar) {
            bar.local_pose.translation.x = pixel_scale((w.scrub_bar_width - seek_width) * -0.5);
            bar.set_surface_dims(0, Vec2::new(seek_width, SCRUB_BAR_HEIGHT));
        }
        let text = self.format_value(self.scale_value(progress));
        if let Some(label) = mgr.get_mut(w.current_label) {
            label.local_pose.translation.x = pixel_scale(w.scrub_bar_width * -0.5 + seek_width);
            label.text = text;
        }
    }

    pub fn format_value(&self, value: f32) -> String {
        match self.sig_figs {
            -1 if value <= self.min => "Default".to_string(),
            n if n > 1000 => format!("{:.*e}", (n - 1000 - 1).max(0) as usize, value),
            n if n > 0 => format!("{value:.*}", n as usize),
            _ => format!("{value}"),
        }
    }

    /// Progress along the background bar under the hit point, if on the bar
    pub fn hit_progress(&self, mgr: &MenuManager, hit: &HitTestResult) -> Option<f32> {
        let w = self.widgets?;
        let background = mgr.get(w.background)?;
        let pose = mgr.world_pose(w.background)?;
        let parent_scale = background
            .parent()
            .and_then(|p| mgr.world_scale(p))
            .unwrap_or(Vec3::ONE);

        let local = pose.rotation.inverse() * (hit.hit_point() - pose.translation);
        let bounds = background.local_bounds() * parent_scale;
        let width = bounds.size().x;
        if bounds.is_cleared() || width <= 0.0 {
            return None;
        }
        let progress = (local.x - bounds.mins.x) / width;
        (0.0..=1.0).contains(&progress).then_some(progress)
    }

    fn click(&mut self, mgr: &MenuManager, hit: &HitTestResult) {
        if self.on_click.is_none() {
            return;
        }
        if let Some(progress) = self.hit_progress(mgr, hit) {
            let value = self.scale_value(progress);
            if let Some(callback) = self.on_click.as_mut() {
                callback(value);
            }
        }
    }

    fn frame(&mut self, mgr: &mut MenuManager, hit: &HitTestResult) {
        let Some(w) = self.widgets else { return };

        if let Some(seek) = mgr.get_mut(w.seek_label) {
            seek.set_visible(self.has_focus);
        }
        if !self.has_focus {
            return;
        }
        if let Some(progress) = self.hit_progress(mgr, hit) {
            let text = self.format_value(self.scale_value(progress));
            if let Some(seek) = mgr.get_mut(w.seek_label) {
                seek.local_pose.translation.x = pixel_scale(w.scrub_bar_width * -0.5 + w.scrub_bar_width * progress);
                seek.text = text;
            }
        }
    }
}

impl Component for Slider {
    fn event_flags(&self) -> EventFlags {
        EventFlags::TOUCH_DOWN | EventFlags::FRAME_UPDATE | EventFlags::FOCUS_GAINED | EventFlags::FOCUS_LOST
    }

    fn on_event(&mut self, ctx: &mut EventContext<'_>, _this: MenuHandle, event: &MenuEvent) -> MsgStatus {
        match event.kind {
            EventType::FocusGained => self.has_focus = true,
            EventType::FocusLost => self.has_focus = false,
            EventType::TouchDown => self.click(ctx.manager, &event.hit),
            EventType::FrameUpdate => self.frame(ctx.manager, &event.hit),
            _ => {}
        }
        MsgStatus::Alive
    }

    crate::component_any!("Slider");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{Menu, MenuFlags};
    use crate::object::{MenuObjectParms, MenuSurface};
    use engine_core::{ButtonState, Buttons, FrameInput};
    use glam::Mat4;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Menu with a 400px bar two meters ahead; the slider sits on the bar
    fn setup() -> (MenuManager, Menu, SliderWidgets) {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "seek", MenuFlags::empty());
        let bar = menu.add_items(
            &mut mgr,
            None,
            vec![MenuObjectParms::new("background")
                .with_position(Vec3::new(0.0, 0.0, -2.0))
                .with_surface(MenuSurface::new("bg", None, Vec2::new(400.0, 40.0)))
                .with_component(Slider::new())],
        )[0];
        let parts = menu.add_items(
            &mut mgr,
            Some(bar),
            vec![
                MenuObjectParms::new("scrub").with_surface(MenuSurface::new("fill", None, Vec2::new(0.0, 40.0))),
                MenuObjectParms::new("current"),
                MenuObjectParms::new("seek"),
            ],
        );
        let widgets = SliderWidgets {
            background: bar,
            scrub_bar: parts[0],
            current_label: parts[1],
            seek_label: parts[2],
            scrub_bar_width: 400.0,
        };
        with_slider(&mut mgr, bar, |s, mgr| s.set_widgets(mgr, widgets));
        menu.open();
        (mgr, menu, widgets)
    }

    fn with_slider<R>(mgr: &mut MenuManager, bar: MenuHandle, f: impl FnOnce(&mut Slider, &mut MenuManager) -> R) -> R {
        mgr.with_component::<Slider, R>(bar, f).expect("slider")
    }

    fn gaze_x(x: f32) -> FrameInput {
        FrameInput {
            trace_matrix: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
            ..FrameInput::default()
        }
    }

    #[test]
    fn test_set_value_clamps_and_lays_out() {
        let (mut mgr, _menu, w) = setup();
        with_slider(&mut mgr, w.background, |s, mgr| {
            s.set_extents(mgr, 10.0, 0.0, 1);
            s.set_value(mgr, 25.0);
            assert_eq!(s.progress(), 1.0);
            s.set_value(mgr, -3.0);
            assert_eq!(s.progress(), 0.0);
            s.set_value(mgr, 2.5);
            assert_eq!(s.progress(), 0.25);
        });

        let bar = mgr.get(w.scrub_bar).expect("bar");
        assert_eq!(bar.surfaces[0].dims, Vec2::new(100.0, 40.0));
        assert!((bar.local_pose.translation.x - pixel_scale(-150.0)).abs() < 1e-6);
        let label = mgr.get(w.current_label).expect("label");
        assert_eq!(label.text, "2.5");
        assert!((label.local_pose.translation.x - pixel_scale(-100.0)).abs() < 1e-6);
    }

    #[test]
    fn test_value_formats() {
        let mut mgr = MenuManager::new();
        let mut s = Slider::new();
        s.set_extents(&mut mgr, 2.0, 0.0, -1);
        assert_eq!(s.format_value(0.0), "Default");
        assert_eq!(s.format_value(1.5), "1.5");
        s.set_extents(&mut mgr, 2.0, 0.0, 2);
        assert_eq!(s.format_value(1.5), "1.50");
        s.set_extents(&mut mgr, 2.0, 0.0, 1003);
        assert_eq!(s.format_value(1500.0), "1.50e3");
        assert_eq!(s.scale_value(0.5), 1.0);
    }

    #[test]
    fn test_touch_reports_value_under_gaze() {
        let (mut mgr, mut menu, w) = setup();
        let clicked = Rc::new(Cell::new(f32::NAN));
        let sink = clicked.clone();
        with_slider(&mut mgr, w.background, |s, mgr| {
            s.set_extents(mgr, 100.0, 0.0, 0);
            s.set_on_click(Box::new(move |v| sink.set(v)));
        });

        // 400px bar spans x in [-0.5, 0.5]; gaze a quarter of the way in
        let mut input = gaze_x(-0.25);
        input.buttons = ButtonState::from_transition(Buttons::empty(), Buttons::A);
        menu.frame(&mut mgr, &input);
        assert!((clicked.get() - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_seek_label_follows_focus() {
        let (mut mgr, mut menu, w) = setup();
        let visible = |mgr: &MenuManager| mgr.get(w.seek_label).map(|o| o.is_visible());
        assert_eq!(visible(&mgr), Some(false));

        menu.frame(&mut mgr, &gaze_x(0.25));
        assert_eq!(visible(&mgr), Some(true));
        let seek = mgr.get(w.seek_label).expect("seek");
        assert!((seek.local_pose.translation.x - 0.25).abs() < 1e-5);
        assert_eq!(seek.text, "0.75");

        menu.frame(&mut mgr, &gaze_x(3.0));
        assert_eq!(visible(&mgr), Some(false));
    }
}
