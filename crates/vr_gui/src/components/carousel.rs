//! Carousel browser: a row of panels that slides between items on swipes
//!
//! `position` is a fractional item index. Panel `i` is drawn at pose
//! `position_at(i + offset)`, interpolated between neighbouring entries of
//! the pose table, so a swipe just animates `position` from one integer to
//! the next.

use crate::component::{Component, EventContext};
use crate::event::{EventFlags, EventType, MenuEvent, MsgStatus};
use crate::manager::{MenuHandle, MenuManager};
use crate::object::MenuObject;
use engine_core::FrameInput;
use glam::{Quat, Vec3, Vec4};
use math_util::Pose;
use render_gl::device::TextureId;

const SWIPE_TIME: f64 = 0.25;
/// Squared touchpad travel below which a touch counts as a tap
const TAP_DISTANCE_SQ: f32 = 20.0;
/// Taps held longer than this don't select
const TAP_TIME: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarouselItem {
    pub name: String,
    pub texture: Option<TextureId>,
    pub texture_width: u32,
    pub texture_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelPose {
    pub orientation: Quat,
    pub position: Vec3,
    pub color: Vec4,
}

impl Default for PanelPose {
    fn default() -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position: Vec3::ZERO,
            color: Vec4::ZERO,
        }
    }
}

impl PanelPose {
    pub fn new(orientation: Quat, position: Vec3, color: Vec4) -> Self {
        Self {
            orientation,
            position,
            color,
        }
    }
}

/// Shows `item` (or nothing) on one panel object at `pose`
pub type PanelUpdater = fn(&mut MenuObject, Option<&CarouselItem>, &PanelPose);

/// Default panel look: the item's texture on surface 0, its name as text
pub fn poster_panel(obj: &mut MenuObject, item: Option<&CarouselItem>, pose: &PanelPose) {
    obj.local_pose = Pose::new(pose.orientation, pose.position);
    obj.color = pose.color;
    match item {
        Some(item) => {
            obj.set_visible(true);
            obj.set_surface_texture(0, item.texture);
            obj.text.clone_from(&item.name);
        }
        None => obj.set_visible(false),
    }
}

pub struct CarouselBrowser {
    items: Vec<CarouselItem>,
    panel_poses: Vec<PanelPose>,
    panels: Vec<MenuHandle>,
    update_panel: PanelUpdater,
    position_scale: Vec3,
    position: f32,
    touch_down_time: f64,
    start_time: f64,
    end_time: f64,
    prev_position: f32,
    next_position: f32,
    swiping: bool,
    panels_need_update: bool,
    select_pressed: bool,
}

impl std::fmt::Debug for CarouselBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarouselBrowser")
            .field("items", &self.items.len())
            .field("panels", &self.panels.len())
            .field("position", &self.position)
            .field("swiping", &self.swiping)
            .finish()
    }
}

impl CarouselBrowser {
    pub fn new(items: Vec<CarouselItem>, panel_poses: Vec<PanelPose>) -> Self {
        let mut carousel = Self {
            items: Vec::new(),
            panel_poses,
            panels: Vec::new(),
            update_panel: poster_panel,
            position_scale: Vec3::ONE,
            position: 0.0,
            touch_down_time: -1.0,
            start_time: 0.0,
            end_time: 0.0,
            prev_position: 0.0,
            next_position: 0.0,
            swiping: false,
            panels_need_update: false,
            select_pressed: false,
        };
        carousel.set_items(items);
        carousel
    }

    /// Panel objects, left to right, and how each one shows its item
    pub fn set_panels(&mut self, panels: Vec<MenuHandle>, update_panel: PanelUpdater) {
        self.panels = panels;
        self.update_panel = update_panel;
        self.panels_need_update = true;
    }

    pub fn set_panel_poses(&mut self, mgr: &mut MenuManager, poses: Vec<PanelPose>) {
        self.panel_poses = poses;
        self.update_panels(mgr);
    }

    pub fn set_position_scale(&mut self, scale: Vec3) {
        self.position_scale = scale;
        self.panels_need_update = true;
    }

    /// Replace the items and rewind to the first one
    pub fn set_items(&mut self, items: Vec<CarouselItem>) {
        self.items = items;
        self.select_pressed = false;
        self.position = 0.0;
        self.touch_down_time = -1.0;
        self.start_time = 0.0;
        self.end_time = 0.0;
        self.prev_position = 0.0;
        self.next_position = 0.0;
        self.panels_need_update = true;
    }

    pub fn items(&self) -> &[CarouselItem] {
        &self.items
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Jump to `index`; out of range indices go to the first item
    pub fn set_selection_index(&mut self, index: usize) {
        self.position = if index < self.items.len() { index as f32 } else { 0.0 };
        self.next_position = self.position;
        self.swiping = false;
        self.panels_need_update = true;
    }

    /// Item nearest the center
    pub fn selection(&self) -> Option<usize> {
        let index = (self.position + 0.5).floor();
        if index >= 0.0 && (index as usize) < self.items.len() {
            Some(index as usize)
        } else {
            None
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.items.is_empty() && !self.swiping
    }

    pub fn is_swiping(&self) -> bool {
        self.swiping
    }

    pub fn can_swipe_back(&self) -> bool {
        self.position.floor() - 1.0 >= 0.0
    }

    pub fn can_swipe_forward(&self) -> bool {
        self.position.floor() + 1.0 < self.items.len() as f32
    }

    /// True after a short tap on the carousel until cleared
    pub fn select_pressed(&self) -> bool {
        self.select_pressed
    }

    pub fn clear_select_pressed(&mut self) {
        self.select_pressed = false;
    }

    /// Pose at fractional slot `t` of the pose table
    ///
    /// Before the first slot is the first pose; past the last slot is an
    /// invisible pose at the origin.
    pub fn position_at(&self, t: f32) -> PanelPose {
        let count = self.panel_poses.len();
        if count == 0 {
            return PanelPose::default();
        }
        let index = t.floor();
        let frac = t - index;
        let last = (count - 1) as f32;

        let mut pose = if index < 0.0 {
            self.panel_poses[0]
        } else if index == last && frac.abs() <= 0.00001 {
            self.panel_poses[count - 1]
        } else if index >= last {
            PanelPose::default()
        } else {
            let a = &self.panel_poses[index as usize];
            let b = &self.panel_poses[index as usize + 1];
            PanelPose {
                orientation: a.orientation.lerp(b.orientation, frac),
                position: a.position.lerp(b.position, frac),
                color: a.color * (1.0 - frac) + b.color * frac,
            }
        };
        pose.position *= self.position_scale;
        pose
    }

    /// Push the current items and poses onto the panel objects
    pub fn update_panels(&mut self, mgr: &mut MenuManager) {
        let center = self.position.floor();
        let offset = center - self.position;
        let left = center as i64 - (self.panel_poses.len() / 2) as i64;

        for (i, handle) in self.panels.iter().enumerate() {
            let pose = self.position_at(i as f32 + offset);
            let item_index = left + i as i64;
            let item = if item_index < 0 || (offset < 0.0 && i == 0) {
                None
            } else {
                self.items.get(item_index as usize)
            };
            if let Some(obj) = mgr.get_mut(*handle) {
                (self.update_panel)(obj, item, &pose);
            }
        }
        self.panels_need_update = false;
    }

    fn frame(&mut self, mgr: &mut MenuManager, input: &FrameInput) {
        if self.swiping {
            let mut frac = ((input.predicted_display_time - self.start_time) / (self.end_time - self.start_time)) as f32;
            if frac >= 1.0 {
                frac = 1.0;
                self.swiping = false;
            }
            let ease_out_quad = -frac * (frac - 2.0);
            self.position = self.prev_position * (1.0 - ease_out_quad) + self.next_position * ease_out_quad;
            self.panels_need_update = true;
        }
        if self.panels_need_update {
            self.update_panels(mgr);
        }
    }

    fn start_swipe(&mut self, next: f32, input: &FrameInput) {
        self.prev_position = self.position;
        self.start_time = input.predicted_display_time;
        self.end_time = self.start_time + SWIPE_TIME;
        self.next_position = next;
        self.swiping = true;
        tracing::debug!(from = self.prev_position, to = next, "carousel swipe");
    }

    fn swipe_forward(&mut self, input: &FrameInput) -> MsgStatus {
        if !self.swiping && self.can_swipe_forward() {
            self.start_swipe(self.position.floor() + 1.0, input);
        }
        MsgStatus::Consumed
    }

    fn swipe_back(&mut self, input: &FrameInput) -> MsgStatus {
        if !self.swiping && self.can_swipe_back() {
            self.start_swipe(self.position.floor() - 1.0, input);
        }
        MsgStatus::Consumed
    }

    fn touch_down(&mut self, input: &FrameInput) -> MsgStatus {
        self.touch_down_time = input.real_time;
        if self.swiping {
            MsgStatus::Consumed
        } else {
            MsgStatus::Alive
        }
    }

    fn touch_up(&mut self, input: &FrameInput, event: &MenuEvent) -> MsgStatus {
        let held = (input.real_time - self.touch_down_time) as f32;
        self.touch_down_time = -1.0;

        if !self.swiping && event.float_value.length_squared() < TAP_DISTANCE_SQ && held < TAP_TIME {
            tracing::debug!(selection = ?self.selection(), "carousel select");
            self.select_pressed = true;
            MsgStatus::Alive
        } else if self.swiping {
            MsgStatus::Consumed
        } else {
            MsgStatus::Alive
        }
    }
}

impl Component for CarouselBrowser {
    fn event_flags(&self) -> EventFlags {
        EventFlags::FRAME_UPDATE
            | EventFlags::TOUCH_DOWN
            | EventFlags::SWIPE_FORWARD
            | EventFlags::SWIPE_BACK
            | EventFlags::TOUCH_UP
            | EventFlags::OPENED
            | EventFlags::CLOSED
    }

    fn on_event(&mut self, ctx: &mut EventContext<'_>, _this: MenuHandle, event: &MenuEvent) -> MsgStatus {
        match event.kind {
            EventType::FrameUpdate => {
                self.frame(ctx.manager, ctx.input);
                MsgStatus::Alive
            }
            EventType::TouchDown => self.touch_down(ctx.input),
            EventType::TouchUp => self.touch_up(ctx.input, event),
            EventType::SwipeForward => self.swipe_forward(ctx.input),
            EventType::SwipeBack => self.swipe_back(ctx.input),
            EventType::Opened => {
                self.swiping = false;
                self.position = self.position.floor();
                self.select_pressed = false;
                MsgStatus::Alive
            }
            EventType::Closed => {
                self.select_pressed = false;
                MsgStatus::Alive
            }
            _ => MsgStatus::Alive,
        }
    }

    crate::component_any!("CarouselBrowser");
}
