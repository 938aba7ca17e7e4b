//! A menu: one object subtree with an open/close state machine
//!
//! ```text
//! Closed -> Opening -> Open -> Closing -> Closed
//! ```
//!
//! `open()` and `close()` only start a transition; the fade runs in
//! [`Menu::frame`] and the matching Opened/Closed events go out when it
//! finishes. Reversing a transition midway keeps the current fade value.

use crate::event::{EventType, HitTestResult, MenuEvent};
use crate::event_handler::{broadcast, EventHandler};
use crate::gui_sys::{GuiSys, MenuKey};
use crate::manager::{MenuHandle, MenuManager};
use crate::object::{MenuId, MenuObject, MenuObjectParms};
use engine_core::{FrameInput, KeyAction, KeyCode, KeyEvent};
use math_util::Pose;

/// Id of every menu's root object
pub const ROOT_ID: MenuId = MenuId(-1);

const DEFAULT_FADE_TIME: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Closed,
    Opening,
    Open,
    Closing,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MenuFlags: u32 {
        /// A back key press never closes this menu
        const BACK_KEY_DOESNT_EXIT = 1 << 0;
        /// Back key presses are left for the application
        const SHORT_PRESS_HANDLED_BY_APP = 1 << 1;
    }
}

pub type FrameCallback = Box<dyn FnMut(&mut MenuManager, &FrameInput)>;
/// Returns true when the key was consumed
pub type KeyCallback = Box<dyn FnMut(&mut MenuManager, &KeyEvent) -> bool>;

pub struct Menu {
    name: String,
    flags: MenuFlags,
    root: MenuHandle,
    state: MenuState,
    fade: f32,
    open_time: f32,
    close_time: f32,
    next_id: i32,
    handler: EventHandler,
    pending: Vec<EventType>,
    pending_init: Vec<MenuHandle>,
    last_hit: HitTestResult,
    on_frame: Option<FrameCallback>,
    on_key: Option<KeyCallback>,
}

impl std::fmt::Debug for Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Menu")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("fade", &self.fade)
            .field("root", &self.root)
            .finish()
    }
}

impl Menu {
    /// Build a closed menu with an empty root object in `mgr`
    pub fn new(mgr: &mut MenuManager, name: impl Into<String>, flags: MenuFlags) -> Self {
        let name = name.into();
        let root = mgr.create_object(MenuObject::new(ROOT_ID, format!("{name}_root")), None);
        tracing::info!(menu = %name, "menu created");
        Self {
            name,
            flags,
            root,
            state: MenuState::Closed,
            fade: 0.0,
            open_time: DEFAULT_FADE_TIME,
            close_time: DEFAULT_FADE_TIME,
            next_id: 0,
            handler: EventHandler::new(),
            pending: Vec::new(),
            pending_init: Vec::new(),
            last_hit: HitTestResult::default(),
            on_frame: None,
            on_key: None,
        }
    }

    /// Create a menu and register it with `gui`
    pub fn create(gui: &mut GuiSys, name: impl Into<String>, flags: MenuFlags) -> MenuKey {
        let menu = Menu::new(gui.manager_mut(), name, flags);
        gui.add_menu(menu)
    }

    /// Free the root subtree; handles into it go stale
    pub fn destroy(self, mgr: &mut MenuManager) {
        let freed = mgr.free_object(self.root);
        tracing::info!(menu = %self.name, freed, "menu destroyed");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> MenuFlags {
        self.flags
    }

    pub fn root(&self) -> MenuHandle {
        self.root
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    /// 0 when fully closed, 1 when fully open
    pub fn fade(&self) -> f32 {
        self.fade
    }

    pub fn focused(&self) -> Option<MenuHandle> {
        self.handler.focused()
    }

    pub fn last_hit(&self) -> &HitTestResult {
        &self.last_hit
    }

    pub fn set_fade_times(&mut self, open_time: f32, close_time: f32) {
        self.open_time = open_time;
        self.close_time = close_time;
    }

    pub fn set_on_frame(&mut self, callback: FrameCallback) {
        self.on_frame = Some(callback);
    }

    pub fn set_on_key(&mut self, callback: KeyCallback) {
        self.on_key = Some(callback);
    }

    pub fn menu_pose(&self, mgr: &MenuManager) -> Pose {
        mgr.get(self.root).map_or(Pose::IDENTITY, |r| r.local_pose)
    }

    pub fn set_menu_pose(&mut self, mgr: &mut MenuManager, pose: Pose) {
        if let Some(root) = mgr.get_mut(self.root) {
            root.local_pose = pose;
        }
    }

    pub fn is_open_or_opening(&self) -> bool {
        matches!(self.state, MenuState::Open | MenuState::Opening)
    }

    pub fn is_closed_or_closing(&self) -> bool {
        matches!(self.state, MenuState::Closed | MenuState::Closing)
    }

    pub fn open(&mut self) {
        if self.is_open_or_opening() {
            return;
        }
        tracing::debug!(menu = %self.name, fade = self.fade, "opening");
        self.state = MenuState::Opening;
        self.pending.push(EventType::Opening);
    }

    pub fn close(&mut self) {
        if self.is_closed_or_closing() {
            return;
        }
        tracing::debug!(menu = %self.name, fade = self.fade, "closing");
        self.state = MenuState::Closing;
        self.pending.push(EventType::Closing);
    }

    pub fn alloc_id(&mut self) -> MenuId {
        assert!(self.next_id < i32::MAX, "menu '{}' ran out of object ids", self.name);
        let id = MenuId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn handle_for_id(&self, mgr: &MenuManager, id: MenuId) -> Option<MenuHandle> {
        mgr.find_by_id(self.root, id)
    }

    /// Instantiate `parms` under `parent`, or the root when `parent` is `None`
    ///
    /// A parm naming a `parent_id` goes under that object instead, which may
    /// have been created earlier in the same call. Panics if `parent` does
    /// not resolve, or if an explicit id is already used in this menu.
    pub fn add_items(
        &mut self,
        mgr: &mut MenuManager,
        parent: Option<MenuHandle>,
        parms: Vec<MenuObjectParms>,
    ) -> Vec<MenuHandle> {
        let parent = parent.unwrap_or(self.root);
        assert!(mgr.contains(parent), "add_items: invalid parent handle {parent:?}");

        let mut handles = Vec::with_capacity(parms.len());
        for p in parms {
            let id = match p.id {
                Some(id) => {
                    assert!(
                        self.handle_for_id(mgr, id).is_none(),
                        "add_items: id {} is already used in menu '{}'",
                        id.0,
                        self.name
                    );
                    let Some(next) = id.0.checked_add(1) else {
                        panic!("add_items: id {} leaves no room for further ids", id.0);
                    };
                    self.next_id = self.next_id.max(next);
                    id
                }
                None => self.alloc_id(),
            };
            let under = match p.parent_id {
                Some(pid) => self.handle_for_id(mgr, pid).unwrap_or_else(|| {
                    tracing::warn!(menu = %self.name, parent_id = pid.0, item = %p.name, "parent id not found");
                    parent
                }),
                None => parent,
            };

            let mut obj = MenuObject::new(id, p.name);
            obj.local_pose = p.local_pose;
            obj.local_scale = p.local_scale;
            obj.color = p.color;
            obj.text = p.text;
            obj.text_parms = p.text_parms;
            obj.flags = p.flags;
            obj.surfaces = p.surfaces;
            obj.collision = p.collision;
            obj.components = p.components.into_iter().map(Some).collect();

            let handle = mgr.create_object(obj, Some(under));
            self.pending_init.push(handle);
            handles.push(handle);
        }
        tracing::debug!(menu = %self.name, count = handles.len(), "items added");
        handles
    }

    fn advance_fade(&mut self, dt: f32) {
        let step = |time: f32| if time > 0.0 { dt / time } else { 1.0 };
        match self.state {
            MenuState::Opening => {
                self.fade = (self.fade + step(self.open_time)).min(1.0);
                if self.fade >= 1.0 {
                    self.state = MenuState::Open;
                    self.pending.push(EventType::Opened);
                }
            }
            MenuState::Closing => {
                self.fade = (self.fade - step(self.close_time)).max(0.0);
                if self.fade <= 0.0 {
                    self.state = MenuState::Closed;
                    self.pending.push(EventType::Closed);
                }
            }
            MenuState::Open | MenuState::Closed => {}
        }
    }

    /// One frame: Init for new items, transition events, then input events
    pub fn frame(&mut self, mgr: &mut MenuManager, input: &FrameInput) {
        for handle in std::mem::take(&mut self.pending_init) {
            broadcast(mgr, input, handle, &MenuEvent::broadcast(EventType::Init, HitTestResult::default()));
        }

        self.advance_fade(input.delta_seconds);

        let mut events = Vec::new();
        for kind in std::mem::take(&mut self.pending) {
            match kind {
                EventType::Opening => self.handler.opening(&mut events),
                EventType::Opened => self.handler.opened(&mut events),
                EventType::Closing => self.handler.closing(&mut events),
                EventType::Closed => self.handler.closed(&mut events),
                _ => {}
            }
        }

        if self.state != MenuState::Closed {
            self.last_hit = self.handler.frame(mgr, input, self.root, &mut events);
        }
        self.handler.handle_events(mgr, input, self.root, &events);

        if let Some(on_frame) = self.on_frame.as_mut() {
            on_frame(mgr, input);
        }
    }

    /// Offer a key to this menu; true when it was consumed
    pub fn on_key_event(&mut self, mgr: &mut MenuManager, key: &KeyEvent) -> bool {
        if !self.is_open_or_opening() {
            return false;
        }
        if let Some(on_key) = self.on_key.as_mut() {
            if on_key(mgr, key) {
                return true;
            }
        }
        if key.code == KeyCode::Back && key.action == KeyAction::Up {
            if self.flags.contains(MenuFlags::SHORT_PRESS_HANDLED_BY_APP) {
                return false;
            }
            if !self.flags.contains(MenuFlags::BACK_KEY_DOESNT_EXIT) {
                self.close();
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventFlags;
    use crate::event_handler::tests::{Log, Recorder};

    fn frame(dt: f32) -> FrameInput {
        FrameInput {
            delta_seconds: dt,
            ..FrameInput::default()
        }
    }

    fn recorder(name: &str, log: &Log) -> Recorder {
        Recorder {
            name: name.to_string(),
            log: log.clone(),
            consume: EventFlags::empty(),
        }
    }

    #[test]
    fn test_close_reopen_keeps_predicates_complementary() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        let check = |m: &Menu| assert_ne!(m.is_open_or_opening(), m.is_closed_or_closing());

        check(&menu);
        menu.open();
        check(&menu);
        menu.frame(&mut mgr, &frame(0.1));
        menu.close();
        check(&menu);
        menu.open();
        check(&menu);
        assert_eq!(menu.state(), MenuState::Opening);
        for _ in 0..10 {
            menu.frame(&mut mgr, &frame(0.05));
            check(&menu);
        }
        assert_eq!(menu.state(), MenuState::Open);
    }

    #[test]
    fn test_reversal_keeps_fade() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        menu.set_fade_times(1.0, 1.0);
        menu.open();
        menu.frame(&mut mgr, &frame(0.5));
        assert!((menu.fade() - 0.5).abs() < 1e-6);
        menu.close();
        menu.frame(&mut mgr, &frame(0.25));
        assert!((menu.fade() - 0.25).abs() < 1e-6);
        assert_eq!(menu.state(), MenuState::Closing);
        menu.frame(&mut mgr, &frame(0.5));
        assert_eq!(menu.state(), MenuState::Closed);
        assert_eq!(menu.fade(), 0.0);
    }

    #[test]
    fn test_transition_events_and_init_order() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        menu.set_fade_times(0.0, 0.0);
        menu.add_items(
            &mut mgr,
            None,
            vec![MenuObjectParms::new("item").with_component(recorder("item", &log))],
        );
        assert!(log.borrow().is_empty());

        menu.open();
        menu.frame(&mut mgr, &frame(0.016));
        menu.close();
        menu.frame(&mut mgr, &frame(0.016));
        menu.frame(&mut mgr, &frame(0.016));

        let kinds: Vec<EventType> = log.borrow().iter().map(|(_, k)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                EventType::Init,
                EventType::Opening,
                EventType::Opened,
                EventType::FrameUpdate,
                EventType::Closing,
                EventType::Closed,
            ]
        );
    }

    #[test]
    fn test_add_items_resolves_parent_ids() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        let panel_id = menu.alloc_id();
        let handles = menu.add_items(
            &mut mgr,
            None,
            vec![
                MenuObjectParms::new("panel").with_id(panel_id),
                MenuObjectParms::new("label").with_parent_id(panel_id),
                MenuObjectParms::new("lost").with_parent_id(MenuId(99)),
            ],
        );
        assert_eq!(handles.len(), 3);
        assert_eq!(mgr.get(handles[1]).and_then(|o| o.parent()), Some(handles[0]));
        assert_eq!(mgr.get(handles[2]).and_then(|o| o.parent()), Some(menu.root()));
        assert_eq!(menu.handle_for_id(&mgr, panel_id), Some(handles[0]));

        let label_id = mgr.get(handles[1]).map(|o| o.id());
        assert!(label_id.is_some_and(|id| id.0 > panel_id.0));
    }

    #[test]
    #[should_panic(expected = "invalid parent handle")]
    fn test_add_items_with_stale_parent_panics() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        let handles = menu.add_items(&mut mgr, None, vec![MenuObjectParms::new("gone")]);
        mgr.free_object(handles[0]);
        menu.add_items(&mut mgr, Some(handles[0]), vec![MenuObjectParms::new("orphan")]);
    }

    #[test]
    #[should_panic(expected = "already used")]
    fn test_add_items_with_taken_id_panics() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        menu.add_items(&mut mgr, None, vec![MenuObjectParms::new("a")]);
        menu.add_items(&mut mgr, None, vec![MenuObjectParms::new("b").with_id(MenuId(0))]);
    }

    #[test]
    #[should_panic(expected = "already used")]
    fn test_add_items_with_duplicate_id_in_one_call_panics() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        menu.add_items(
            &mut mgr,
            None,
            vec![
                MenuObjectParms::new("a").with_id(MenuId(5)),
                MenuObjectParms::new("b").with_id(MenuId(5)),
            ],
        );
    }

    #[test]
    #[should_panic(expected = "no room")]
    fn test_add_items_with_max_id_panics() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        menu.add_items(&mut mgr, None, vec![MenuObjectParms::new("last").with_id(MenuId(i32::MAX))]);
    }

    #[test]
    fn test_destroy_leaves_stale_handles() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        let handles = menu.add_items(&mut mgr, None, vec![MenuObjectParms::new("a"), MenuObjectParms::new("b")]);
        let root = menu.root();
        menu.destroy(&mut mgr);
        assert!(mgr.is_empty());
        assert!(mgr.get(root).is_none());
        assert!(handles.iter().all(|h| mgr.get(*h).is_none()));
    }

    #[test]
    fn test_back_key_closes_unless_flagged() {
        let mut mgr = MenuManager::new();
        let mut menu = Menu::new(&mut mgr, "main", MenuFlags::empty());
        let back = KeyEvent::up(KeyCode::Back);
        assert!(!menu.on_key_event(&mut mgr, &back));
        menu.open();
        assert!(menu.on_key_event(&mut mgr, &back));
        assert!(menu.is_closed_or_closing());

        let mut sticky = Menu::new(&mut mgr, "sticky", MenuFlags::BACK_KEY_DOESNT_EXIT);
        sticky.open();
        assert!(!sticky.on_key_event(&mut mgr, &back));
        sticky.set_on_key(Box::new(|_, key| key.code == KeyCode::Back));
        assert!(sticky.on_key_event(&mut mgr, &back));
        assert!(sticky.is_open_or_opening());
    }
}
