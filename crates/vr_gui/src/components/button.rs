use crate::component::{Component, EventContext};
use crate::event::{EventFlags, EventType, MenuEvent, MsgStatus};
use crate::manager::{MenuHandle, MenuManager};
use glam::Vec4;

/// Whether a click fires when the touch starts or ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickMode {
    #[default]
    OnUp,
    OnDown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonColors {
    pub normal: Vec4,
    pub hover: Vec4,
    pub pressed: Vec4,
    /// Toggle buttons only: pressed and focused
    pub pressed_hover: Vec4,
}

impl Default for ButtonColors {
    fn default() -> Self {
        Self {
            normal: Vec4::new(0.5, 0.5, 0.5, 1.0),
            hover: Vec4::ONE,
            pressed: Vec4::new(0.25, 0.25, 0.25, 1.0),
            pressed_hover: Vec4::new(0.75, 0.75, 0.75, 1.0),
        }
    }
}

pub type ButtonCallback = Box<dyn FnMut(MenuHandle)>;

/// Click target that tints its object by hover and press state
#[derive(Default)]
pub struct Button {
    colors: ButtonColors,
    mode: ClickMode,
    toggle: bool,
    touch_down: bool,
    toggled: bool,
    focused: bool,
    on_click: Option<ButtonCallback>,
    on_focus_gained: Option<ButtonCallback>,
    on_focus_lost: Option<ButtonCallback>,
}

impl std::fmt::Debug for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Button")
            .field("mode", &self.mode)
            .field("toggle", &self.toggle)
            .field("pressed", &self.is_pressed())
            .field("focused", &self.focused)
            .finish()
    }
}

impl Button {
    pub fn new(colors: ButtonColors, mode: ClickMode) -> Self {
        Self {
            colors,
            mode,
            ..Self::default()
        }
    }

    /// A button that flips between pressed and released on each touch up
    pub fn toggle(colors: ButtonColors) -> Self {
        Self {
            colors,
            toggle: true,
            ..Self::default()
        }
    }

    pub fn with_on_click(mut self, callback: ButtonCallback) -> Self {
        self.on_click = Some(callback);
        self
    }

    pub fn with_on_focus_gained(mut self, callback: ButtonCallback) -> Self {
        self.on_focus_gained = Some(callback);
        self
    }

    pub fn with_on_focus_lost(mut self, callback: ButtonCallback) -> Self {
        self.on_focus_lost = Some(callback);
        self
    }

    pub fn colors(&self) -> &ButtonColors {
        &self.colors
    }

    pub fn set_colors(&mut self, mgr: &mut MenuManager, this: MenuHandle, colors: ButtonColors) {
        self.colors = colors;
        self.update_state(mgr, this);
    }

    pub fn is_pressed(&self) -> bool {
        if self.toggle {
            self.toggled
        } else {
            self.touch_down
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Force a toggle button's state without firing a click
    pub fn set_toggled(&mut self, mgr: &mut MenuManager, this: MenuHandle, toggled: bool) {
        self.toggled = toggled;
        self.update_state(mgr, this);
    }

    fn current_color(&self) -> Vec4 {
        let c = &self.colors;
        match (self.is_pressed(), self.focused) {
            (true, true) if self.toggle => c.pressed_hover,
            (true, _) => c.pressed,
            (false, true) => c.hover,
            (false, false) => c.normal,
        }
    }

    fn update_state(&self, mgr: &mut MenuManager, this: MenuHandle) {
        if let Some(obj) = mgr.get_mut(this) {
            obj.color = self.current_color();
            obj.highlighted = self.focused;
        }
    }

    fn fire(callback: &mut Option<ButtonCallback>, this: MenuHandle) {
        if let Some(cb) = callback.as_mut() {
            cb(this);
        }
    }
}

impl Component for Button {
    fn event_flags(&self) -> EventFlags {
        EventFlags::TOUCH_DOWN | EventFlags::TOUCH_UP | EventFlags::FOCUS_GAINED | EventFlags::FOCUS_LOST
    }

    fn on_event(&mut self, ctx: &mut EventContext<'_>, this: MenuHandle, event: &MenuEvent) -> MsgStatus {
        match event.kind {
            EventType::TouchDown => {
                if !self.toggle {
                    self.touch_down = true;
                }
                if self.mode == ClickMode::OnDown {
                    Self::fire(&mut self.on_click, this);
                }
            }
            EventType::TouchUp => {
                if self.toggle {
                    self.toggled = !self.toggled;
                } else {
                    self.touch_down = false;
                }
                if self.mode == ClickMode::OnUp {
                    Self::fire(&mut self.on_click, this);
                }
            }
            EventType::FocusGained => {
                self.focused = true;
                Self::fire(&mut self.on_focus_gained, this);
            }
            EventType::FocusLost => {
                self.focused = false;
                if !self.toggle {
                    self.touch_down = false;
                }
                Self::fire(&mut self.on_focus_lost, this);
            }
            _ => return MsgStatus::Alive,
        }
        self.update_state(ctx.manager, this);
        MsgStatus::Consumed
    }

    crate::component_any!("Button");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HitTestResult;
    use crate::object::{MenuId, MenuObject};
    use engine_core::FrameInput;
    use std::cell::Cell;
    use std::rc::Rc;

    fn send(button: &mut Button, mgr: &mut MenuManager, this: MenuHandle, kind: EventType) -> MsgStatus {
        let input = FrameInput::default();
        let mut ctx = EventContext { manager: &mut *mgr, input: &input };
        button.on_event(&mut ctx, this, &MenuEvent::focus(kind, HitTestResult::default()))
    }

    fn counter() -> (Rc<Cell<u32>>, ButtonCallback) {
        let clicks = Rc::new(Cell::new(0));
        let c = Rc::clone(&clicks);
        (clicks, Box::new(move |_| c.set(c.get() + 1)))
    }

    #[test]
    fn test_click_on_up_with_hover_colors() {
        let mut mgr = MenuManager::new();
        let this = mgr.create_object(MenuObject::new(MenuId(0), "ok"), None);
        let colors = ButtonColors::default();
        let (clicks, cb) = counter();
        let mut button = Button::new(colors, ClickMode::OnUp).with_on_click(cb);

        assert_eq!(send(&mut button, &mut mgr, this, EventType::FocusGained), MsgStatus::Consumed);
        assert_eq!(mgr.get(this).map(|o| o.color), Some(colors.hover));
        assert!(mgr.get(this).is_some_and(|o| o.highlighted));

        send(&mut button, &mut mgr, this, EventType::TouchDown);
        assert!(button.is_pressed());
        assert_eq!(clicks.get(), 0);
        assert_eq!(mgr.get(this).map(|o| o.color), Some(colors.pressed));

        send(&mut button, &mut mgr, this, EventType::TouchUp);
        assert_eq!(clicks.get(), 1);
        assert!(!button.is_pressed());
        assert_eq!(mgr.get(this).map(|o| o.color), Some(colors.hover));
    }

    #[test]
    fn test_click_on_down_and_focus_loss_releases() {
        let mut mgr = MenuManager::new();
        let this = mgr.create_object(MenuObject::new(MenuId(0), "go"), None);
        let (clicks, cb) = counter();
        let mut button = Button::new(ButtonColors::default(), ClickMode::OnDown).with_on_click(cb);

        send(&mut button, &mut mgr, this, EventType::FocusGained);
        send(&mut button, &mut mgr, this, EventType::TouchDown);
        assert_eq!(clicks.get(), 1);

        send(&mut button, &mut mgr, this, EventType::FocusLost);
        assert!(!button.is_pressed());
        assert!(!button.is_focused());
        assert_eq!(mgr.get(this).map(|o| o.color), Some(ButtonColors::default().normal));
        assert!(mgr.get(this).is_some_and(|o| !o.highlighted));
    }

    #[test]
    fn test_toggle_flips_on_touch_up() {
        let mut mgr = MenuManager::new();
        let this = mgr.create_object(MenuObject::new(MenuId(0), "mute"), None);
        let colors = ButtonColors::default();
        let mut button = Button::toggle(colors);

        send(&mut button, &mut mgr, this, EventType::FocusGained);
        send(&mut button, &mut mgr, this, EventType::TouchDown);
        assert!(!button.is_pressed());
        send(&mut button, &mut mgr, this, EventType::TouchUp);
        assert!(button.is_pressed());
        assert_eq!(mgr.get(this).map(|o| o.color), Some(colors.pressed_hover));

        // focus loss keeps a toggle latched
        send(&mut button, &mut mgr, this, EventType::FocusLost);
        assert!(button.is_pressed());
        assert_eq!(mgr.get(this).map(|o| o.color), Some(colors.pressed));

        button.set_toggled(&mut mgr, this, false);
        assert_eq!(mgr.get(this).map(|o| o.color), Some(colors.normal));
    }

    #[test]
    fn test_unhandled_events_stay_alive() {
        let mut mgr = MenuManager::new();
        let this = mgr.create_object(MenuObject::new(MenuId(0), "b"), None);
        let mut button = Button::default();
        assert_eq!(send(&mut button, &mut mgr, this, EventType::FrameUpdate), MsgStatus::Alive);
    }
}
