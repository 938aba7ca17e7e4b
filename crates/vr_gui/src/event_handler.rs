//! Per-frame gaze hit-testing and event dispatch for one menu
//!
//! [`EventHandler::frame`] turns this frame's input into a list of
//! [`MenuEvent`]s; [`EventHandler::handle_events`] then routes each one to
//! the components that asked for its type.

use crate::collision::{ray_hits_bounds, ContentFlags};
use crate::component::EventContext;
use crate::event::{DispatchType, EventType, HitTestResult, MenuEvent, MsgStatus};
use crate::manager::{compose, MenuHandle, MenuManager};
use crate::object::ObjectFlags;
use engine_core::{Buttons, FrameInput, KeyAction, KeyCode};
use glam::{Vec2, Vec3};
use math_util::{Pose, Ray};

/// Closest object under `ray` in the tree below `root`
///
/// Parents are tested before their children and a later object only wins
/// with a strictly smaller distance, so ties go to traversal order.
pub fn hit_test(mgr: &MenuManager, root: MenuHandle, ray: Ray, content: ContentFlags) -> HitTestResult {
    let mut result = HitTestResult {
        ray_start: ray.origin,
        ray_dir: ray.dir,
        ..HitTestResult::default()
    };
    hit_test_r(mgr, root, &Pose::IDENTITY, Vec3::ONE, &ray, content, &mut result);
    result
}

fn hit_test_r(
    mgr: &MenuManager,
    handle: MenuHandle,
    parent_pose: &Pose,
    parent_scale: Vec3,
    ray: &Ray,
    content: ContentFlags,
    best: &mut HitTestResult,
) {
    let Some(obj) = mgr.get(handle) else { return };
    if obj.flags.intersects(ObjectFlags::NO_HIT | ObjectFlags::HIDDEN) {
        return;
    }
    let (pose, scale) = compose(parent_pose, parent_scale, &obj.local_pose, obj.local_scale);

    if !obj.flags.contains(ObjectFlags::DONT_HIT_SELF) {
        let bounds = obj.local_bounds();
        if !bounds.is_cleared() {
            let local = ray.to_local(&pose);
            if let Some(t) = ray_hits_bounds(local.origin, local.dir, &(bounds * scale)) {
                let hit = match &obj.collision {
                    Some(shape) => shape
                        .intersect(local.origin, local.dir, scale, content)
                        .map(|r| (r.t, r.uv)),
                    None => Some((t, Vec2::ZERO)),
                };
                if let Some((t, uv)) = hit {
                    if t < best.t {
                        best.hit = Some(handle);
                        best.t = t;
                        best.uv = uv;
                    }
                }
            }
        }
    }

    for child in &obj.children {
        hit_test_r(mgr, *child, &pose, scale, ray, content, best);
    }
}

/// Run every interested component of `handle` until one consumes the event
pub fn dispatch_to_components(
    mgr: &mut MenuManager,
    input: &FrameInput,
    handle: MenuHandle,
    event: &MenuEvent,
) -> MsgStatus {
    let count = match mgr.get(handle) {
        Some(obj) => obj.components.len(),
        None => return MsgStatus::Alive,
    };
    for index in 0..count {
        let Some(mut component) = mgr.take_component(handle, index) else {
            continue;
        };
        let status = if component.handles(event) {
            let mut ctx = EventContext { manager: &mut *mgr, input };
            component.on_event(&mut ctx, handle, event)
        } else {
            MsgStatus::Alive
        };
        mgr.restore_component(handle, index, component);
        if status == MsgStatus::Consumed {
            tracing::trace!(kind = ?event.kind, ?handle, "event consumed");
            return MsgStatus::Consumed;
        }
    }
    MsgStatus::Alive
}

pub fn dispatch_to_path(mgr: &mut MenuManager, input: &FrameInput, path: &[MenuHandle], event: &MenuEvent) -> MsgStatus {
    for handle in path {
        if dispatch_to_components(mgr, input, *handle, event) == MsgStatus::Consumed {
            return MsgStatus::Consumed;
        }
    }
    MsgStatus::Alive
}

/// Depth-first from `handle`, an object's components before its children
pub fn broadcast(mgr: &mut MenuManager, input: &FrameInput, handle: MenuHandle, event: &MenuEvent) -> MsgStatus {
    if dispatch_to_components(mgr, input, handle, event) == MsgStatus::Consumed {
        return MsgStatus::Consumed;
    }
    let children = match mgr.get(handle) {
        Some(obj) => obj.children.clone(),
        None => return MsgStatus::Alive,
    };
    for child in children {
        if broadcast(mgr, input, child, event) == MsgStatus::Consumed {
            return MsgStatus::Consumed;
        }
    }
    MsgStatus::Alive
}

#[derive(Debug, Default)]
pub struct EventHandler {
    focused: Option<MenuHandle>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<MenuHandle> {
        self.focused
    }

    /// Hit-test and translate input into events for this frame
    pub fn frame(
        &mut self,
        mgr: &MenuManager,
        input: &FrameInput,
        root: MenuHandle,
        events: &mut Vec<MenuEvent>,
    ) -> HitTestResult {
        let ray = Ray::from_trace_matrix(&input.trace_matrix);
        let result = hit_test(mgr, root, ray, ContentFlags::ALL);

        let old = self.focused.filter(|h| mgr.contains(*h));
        if result.hit != old {
            if let Some(old) = old {
                events.push(MenuEvent {
                    old_focus: Some(old),
                    ..MenuEvent::target(EventType::FocusLost, old, result)
                });
            }
            if let Some(new) = result.hit {
                let quiet = mgr
                    .get(new)
                    .is_some_and(|o| o.flags.contains(ObjectFlags::NO_FOCUS_GAINED));
                if !quiet {
                    events.push(MenuEvent {
                        target: Some(new),
                        old_focus: old,
                        ..MenuEvent::focus(EventType::FocusGained, result)
                    });
                }
            }
            tracing::debug!(?old, new = ?result.hit, "focus changed");
        }
        self.focused = result.hit;

        let pressed = input.buttons.pressed;
        for (button, kind) in [
            (Buttons::SWIPE_UP, EventType::SwipeUp),
            (Buttons::SWIPE_DOWN, EventType::SwipeDown),
            (Buttons::SWIPE_FORWARD, EventType::SwipeForward),
            (Buttons::SWIPE_BACK, EventType::SwipeBack),
        ] {
            if pressed.contains(button) {
                events.push(MenuEvent::focus(kind, result));
            }
        }

        let touch_keys = Buttons::TOUCH | Buttons::A;
        let mut touch_pressed = pressed.intersects(touch_keys);
        let mut touch_released = !touch_pressed && input.buttons.released.intersects(touch_keys);
        if input.key_action(KeyCode::Return, KeyAction::Down) {
            touch_pressed = true;
        }
        if input.key_action(KeyCode::Return, KeyAction::Up) {
            touch_released = true;
        }

        if touch_pressed {
            events.push(MenuEvent::focus(EventType::TouchDown, result));
        }
        if touch_released {
            let kind = if input.buttons.state.contains(Buttons::TOUCH_WAS_SWIPE) {
                EventType::SwipeComplete
            } else {
                EventType::TouchUp
            };
            events.push(MenuEvent::focus(kind, result).with_value(input.touch_relative));
        }
        if input.buttons.state.contains(Buttons::TOUCH) {
            if input.touch_relative.length_squared() > f32::EPSILON {
                events.push(MenuEvent::focus(EventType::TouchRelative, result).with_value(input.touch_relative));
            }
            events.push(MenuEvent::focus(EventType::TouchAbsolute, result).with_value(input.touch));
        }

        events.push(MenuEvent::broadcast(EventType::FrameUpdate, result));
        result
    }

    pub fn init(&self, events: &mut Vec<MenuEvent>) {
        events.push(MenuEvent::broadcast(EventType::Init, HitTestResult::default()));
    }

    pub fn opening(&self, events: &mut Vec<MenuEvent>) {
        events.push(MenuEvent::broadcast(EventType::Opening, HitTestResult::default()));
    }

    pub fn opened(&self, events: &mut Vec<MenuEvent>) {
        events.push(MenuEvent::broadcast(EventType::Opened, HitTestResult::default()));
    }

    pub fn closing(&self, events: &mut Vec<MenuEvent>) {
        events.push(MenuEvent::broadcast(EventType::Closing, HitTestResult::default()));
    }

    /// Closed broadcast, then the focused object loses focus
    pub fn closed(&mut self, events: &mut Vec<MenuEvent>) {
        events.push(MenuEvent::broadcast(EventType::Closed, HitTestResult::default()));
        if let Some(focused) = self.focused.take() {
            events.push(MenuEvent {
                old_focus: Some(focused),
                ..MenuEvent::target(EventType::FocusLost, focused, HitTestResult::default())
            });
        }
    }

    /// Route `events` to components
    ///
    /// The root-to-focus path is computed once for the whole batch; it is
    /// just `root` when nothing has focus.
    pub fn handle_events(&self, mgr: &mut MenuManager, input: &FrameInput, root: MenuHandle, events: &[MenuEvent]) {
        let focus_path = match self.focused.filter(|h| mgr.contains(*h)) {
            Some(focused) => mgr.path_from_root(focused),
            None => vec![root],
        };
        let mut target_path: Option<(MenuHandle, Vec<MenuHandle>)> = None;

        for event in events {
            match event.dispatch {
                DispatchType::Broadcast => {
                    broadcast(mgr, input, root, event);
                }
                DispatchType::Focus => {
                    dispatch_to_path(mgr, input, &focus_path, event);
                }
                DispatchType::Target => {
                    let Some(target) = event.target else { continue };
                    if target_path.as_ref().map_or(true, |(t, _)| *t != target) {
                        target_path = Some((target, mgr.path_from_root(target)));
                    }
                    if let Some((_, path)) = &target_path {
                        dispatch_to_path(mgr, input, path, event);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::component::Component;
    use crate::event::EventFlags;
    use crate::object::{MenuId, MenuObject, MenuSurface};
    use engine_core::{ButtonState, KeyEvent};
    use glam::Mat4;
    use std::cell::RefCell;
    use std::rc::Rc;

    pub(crate) type Log = Rc<RefCell<Vec<(String, EventType)>>>;

    /// Records every event it sees; consumes the types in `consume`
    pub(crate) struct Recorder {
        pub name: String,
        pub log: Log,
        pub consume: EventFlags,
    }

    impl Component for Recorder {
        fn event_flags(&self) -> EventFlags {
            EventFlags::all()
        }

        fn on_event(&mut self, _ctx: &mut EventContext<'_>, _this: MenuHandle, event: &MenuEvent) -> MsgStatus {
            self.log.borrow_mut().push((self.name.clone(), event.kind));
            if self.consume.contains(event.kind.flag()) {
                MsgStatus::Consumed
            } else {
                MsgStatus::Alive
            }
        }

        crate::component_any!("Recorder");
    }

    fn panel(mgr: &mut MenuManager, parent: Option<MenuHandle>, name: &str, z: f32, log: &Log) -> MenuHandle {
        let mut obj = MenuObject::new(MenuId(0), name);
        obj.local_pose.translation = Vec3::new(0.0, 0.0, z);
        obj.surfaces.push(MenuSurface::new("bg", None, glam::Vec2::splat(200.0)));
        obj.components.push(Some(Box::new(Recorder {
            name: name.to_string(),
            log: log.clone(),
            consume: EventFlags::empty(),
        })));
        mgr.create_object(obj, parent)
    }

    fn empty_root(mgr: &mut MenuManager) -> MenuHandle {
        mgr.create_object(MenuObject::new(MenuId(0), "root"), None)
    }

    fn gaze_at(x: f32) -> FrameInput {
        FrameInput {
            trace_matrix: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
            ..FrameInput::default()
        }
    }

    fn kinds(log: &Log, name: &str) -> Vec<EventType> {
        log.borrow().iter().filter(|(n, _)| n == name).map(|(_, k)| *k).collect()
    }

    #[test]
    fn test_equal_distance_tie_goes_to_first_in_traversal() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let first = panel(&mut mgr, Some(root), "first", -2.0, &log);
        let _second = panel(&mut mgr, Some(root), "second", -2.0, &log);

        for _ in 0..3 {
            let r = hit_test(&mgr, root, Ray::new(Vec3::ZERO, Vec3::NEG_Z), ContentFlags::ALL);
            assert_eq!(r.hit, Some(first));
            assert!((r.t - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_closer_object_wins_and_flags_prune() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let far = panel(&mut mgr, Some(root), "far", -3.0, &log);
        let group = mgr.create_object(MenuObject::new(MenuId(0), "group"), Some(root));
        let near = panel(&mut mgr, Some(group), "near", -1.0, &log);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);

        assert_eq!(hit_test(&mgr, root, ray, ContentFlags::ALL).hit, Some(near));

        if let Some(g) = mgr.get_mut(group) {
            g.flags |= ObjectFlags::NO_HIT;
        }
        assert_eq!(hit_test(&mgr, root, ray, ContentFlags::ALL).hit, Some(far));

        if let Some(g) = mgr.get_mut(group) {
            g.flags = ObjectFlags::empty();
        }
        if let Some(n) = mgr.get_mut(near) {
            n.flags |= ObjectFlags::DONT_HIT_SELF;
        }
        assert_eq!(hit_test(&mgr, root, ray, ContentFlags::ALL).hit, Some(far));

        if let Some(f) = mgr.get_mut(far) {
            f.set_visible(false);
        }
        assert_eq!(hit_test(&mgr, root, ray, ContentFlags::ALL).hit, None);
    }

    #[test]
    fn test_focus_lost_precedes_focus_gained() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let left = panel(&mut mgr, Some(root), "left", -2.0, &log);
        let right = panel(&mut mgr, Some(root), "right", -2.0, &log);
        if let Some(obj) = mgr.get_mut(left) {
            obj.local_pose.translation.x = -1.0;
        }
        if let Some(obj) = mgr.get_mut(right) {
            obj.local_pose.translation.x = 1.0;
        }

        let mut handler = EventHandler::new();
        for x in [-1.0, -1.0, 1.0, 5.0] {
            let input = gaze_at(x);
            let mut events = Vec::new();
            handler.frame(&mgr, &input, root, &mut events);
            handler.handle_events(&mut mgr, &input, root, &events);
        }

        let focus: Vec<(String, EventType)> = log
            .borrow()
            .iter()
            .filter(|(_, k)| matches!(k, EventType::FocusGained | EventType::FocusLost))
            .cloned()
            .collect();
        assert_eq!(
            focus,
            vec![
                ("left".to_string(), EventType::FocusGained),
                ("left".to_string(), EventType::FocusLost),
                ("right".to_string(), EventType::FocusGained),
                ("right".to_string(), EventType::FocusLost),
            ]
        );
        assert_eq!(handler.focused(), None);
        assert_eq!(kinds(&log, "left").iter().filter(|k| **k == EventType::FrameUpdate).count(), 4);
    }

    #[test]
    fn test_no_focus_gained_flag_still_takes_focus() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let quiet = panel(&mut mgr, Some(root), "quiet", -2.0, &log);
        if let Some(obj) = mgr.get_mut(quiet) {
            obj.flags |= ObjectFlags::NO_FOCUS_GAINED;
        }

        let mut handler = EventHandler::new();
        let input = gaze_at(0.0);
        let mut events = Vec::new();
        handler.frame(&mgr, &input, root, &mut events);
        assert_eq!(handler.focused(), Some(quiet));
        assert!(events.iter().all(|e| e.kind != EventType::FocusGained));
    }

    #[test]
    fn test_touch_goes_to_focus_path_and_stops_when_consumed() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let root = panel(&mut mgr, None, "root", -4.0, &log);
        let child = panel(&mut mgr, Some(root), "child", 2.0, &log);
        if let Some(rec) = mgr.component_mut::<Recorder>(root) {
            rec.consume = EventFlags::TOUCH_DOWN;
        }

        let mut handler = EventHandler::new();
        let mut input = gaze_at(0.0);
        input.buttons = ButtonState::from_transition(Buttons::empty(), Buttons::A);
        let mut events = Vec::new();
        let hit = handler.frame(&mgr, &input, root, &mut events);
        assert_eq!(hit.hit, Some(child));
        handler.handle_events(&mut mgr, &input, root, &events);

        assert!(kinds(&log, "root").contains(&EventType::TouchDown));
        assert!(!kinds(&log, "child").contains(&EventType::TouchDown));
        assert!(kinds(&log, "child").contains(&EventType::FocusGained));
    }

    #[test]
    fn test_release_after_swipe_is_swipe_complete() {
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let mut handler = EventHandler::new();

        let mut input = gaze_at(0.0);
        input.buttons = ButtonState::from_transition(
            Buttons::TOUCH,
            Buttons::TOUCH_WAS_SWIPE | Buttons::SWIPE_FORWARD,
        );
        input.touch_relative = Vec2::new(150.0, 0.0);
        let mut events = Vec::new();
        handler.frame(&mgr, &input, root, &mut events);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventType::SwipeForward, EventType::SwipeComplete, EventType::FrameUpdate]
        );
        assert_eq!(events[1].float_value, Vec2::new(150.0, 0.0));
    }

    #[test]
    fn test_return_key_acts_as_touch() {
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let mut handler = EventHandler::new();
        let mut input = gaze_at(0.0);
        input.key_events = vec![KeyEvent::down(KeyCode::Return)];
        let mut events = Vec::new();
        handler.frame(&mgr, &input, root, &mut events);
        assert_eq!(events[0].kind, EventType::TouchDown);
        assert_eq!(events[0].dispatch, DispatchType::Focus);
    }

    #[test]
    fn test_held_touch_reports_relative_and_absolute() {
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let mut handler = EventHandler::new();
        let mut input = gaze_at(0.0);
        input.buttons = ButtonState::from_transition(Buttons::TOUCH, Buttons::TOUCH);
        input.touch = Vec2::new(40.0, 50.0);
        input.touch_relative = Vec2::new(4.0, 0.0);
        let mut events = Vec::new();
        handler.frame(&mgr, &input, root, &mut events);
        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventType::TouchRelative, EventType::TouchAbsolute, EventType::FrameUpdate]
        );
        assert_eq!(events[1].float_value, Vec2::new(40.0, 50.0));
    }

    #[test]
    fn test_broadcast_visits_parents_first_and_stops_on_consume() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let root = panel(&mut mgr, None, "root", 0.0, &log);
        let a = panel(&mut mgr, Some(root), "a", 0.0, &log);
        let _a1 = panel(&mut mgr, Some(a), "a1", 0.0, &log);
        let _b = panel(&mut mgr, Some(root), "b", 0.0, &log);

        let input = FrameInput::default();
        broadcast(&mut mgr, &input, root, &MenuEvent::broadcast(EventType::Init, HitTestResult::default()));
        let order: Vec<String> = log.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(order, vec!["root", "a", "a1", "b"]);

        log.borrow_mut().clear();
        if let Some(rec) = mgr.component_mut::<Recorder>(a) {
            rec.consume = EventFlags::OPENED;
        }
        broadcast(&mut mgr, &input, root, &MenuEvent::broadcast(EventType::Opened, HitTestResult::default()));
        let order: Vec<String> = log.borrow().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(order, vec!["root", "a"]);
    }

    #[test]
    fn test_closed_releases_focus() {
        let log = Log::default();
        let mut mgr = MenuManager::new();
        let root = empty_root(&mut mgr);
        let item = panel(&mut mgr, Some(root), "item", -2.0, &log);
        let mut handler = EventHandler::new();
        let input = gaze_at(0.0);
        let mut events = Vec::new();
        handler.frame(&mgr, &input, root, &mut events);
        assert_eq!(handler.focused(), Some(item));

        events.clear();
        handler.closed(&mut events);
        handler.handle_events(&mut mgr, &input, root, &events);
        assert_eq!(handler.focused(), None);
        assert_eq!(kinds(&log, "item"), vec![EventType::Closed, EventType::FocusLost]);
    }
}
