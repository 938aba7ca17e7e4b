//! Storage for every menu object
//!
//! Objects live in a slot map keyed by [`MenuHandle`]. A handle carries a
//! generation, so once its object is freed it resolves to `None` even if
//! the slot is reused.

use crate::component::Component;
use crate::object::{MenuId, MenuObject};
use glam::Vec3;
use math_util::Pose;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generation-checked reference to a menu object
    pub struct MenuHandle;
}

#[derive(Debug, Default)]
pub struct MenuManager {
    objects: SlotMap<MenuHandle, MenuObject>,
}

impl MenuManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, handle: MenuHandle) -> bool {
        self.objects.contains_key(handle)
    }

    pub fn get(&self, handle: MenuHandle) -> Option<&MenuObject> {
        self.objects.get(handle)
    }

    pub fn get_mut(&mut self, handle: MenuHandle) -> Option<&mut MenuObject> {
        self.objects.get_mut(handle)
    }

    /// Insert a detached object, then link it under `parent` if given
    ///
    /// Panics when `parent` does not resolve.
    pub fn create_object(&mut self, object: MenuObject, parent: Option<MenuHandle>) -> MenuHandle {
        if let Some(p) = parent {
            assert!(self.objects.contains_key(p), "parent handle {p:?} is stale or invalid");
        }
        let handle = self.objects.insert(object);
        if let Some(p) = parent {
            self.objects[handle].parent = Some(p);
            self.objects[p].children.push(handle);
        }
        handle
    }

    /// Free `handle` and its whole subtree, unlinking it from its parent
    pub fn free_object(&mut self, handle: MenuHandle) -> usize {
        let Some(parent) = self.objects.get(handle).map(|o| o.parent) else {
            return 0;
        };
        if let Some(p) = parent.and_then(|p| self.objects.get_mut(p)) {
            p.children.retain(|c| *c != handle);
        }

        let mut freed = 0;
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if let Some(obj) = self.objects.remove(h) {
                stack.extend(obj.children);
                freed += 1;
            }
        }
        tracing::debug!(freed, "freed menu subtree");
        freed
    }

    pub fn add_component(&mut self, handle: MenuHandle, component: Box<dyn Component>) -> bool {
        match self.objects.get_mut(handle) {
            Some(obj) => {
                obj.components.push(Some(component));
                true
            }
            None => false,
        }
    }

    /// Detach a component so it can run with mutable access to the manager
    pub(crate) fn take_component(&mut self, handle: MenuHandle, index: usize) -> Option<Box<dyn Component>> {
        self.objects.get_mut(handle)?.components.get_mut(index)?.take()
    }

    /// Put back a component taken with `take_component`; dropped if its object went away
    pub(crate) fn restore_component(&mut self, handle: MenuHandle, index: usize, component: Box<dyn Component>) {
        if let Some(slot) = self
            .objects
            .get_mut(handle)
            .and_then(|o| o.components.get_mut(index))
        {
            *slot = Some(component);
        }
    }

    /// First component of type `T` on `handle`
    pub fn component<T: Component>(&self, handle: MenuHandle) -> Option<&T> {
        self.objects
            .get(handle)?
            .components
            .iter()
            .flatten()
            .find_map(|c| c.as_any().downcast_ref::<T>())
    }

    pub fn component_mut<T: Component>(&mut self, handle: MenuHandle) -> Option<&mut T> {
        self.objects
            .get_mut(handle)?
            .components
            .iter_mut()
            .flatten()
            .find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Run `f` on the first component of type `T` on `handle`, detached so
    /// `f` can also mutate the manager
    pub fn with_component<T: Component, R>(
        &mut self,
        handle: MenuHandle,
        f: impl FnOnce(&mut T, &mut MenuManager) -> R,
    ) -> Option<R> {
        let index = self.objects.get(handle)?.components.iter().position(|c| {
            c.as_ref()
                .is_some_and(|c| c.as_any().downcast_ref::<T>().is_some())
        })?;
        let mut component = self.take_component(handle, index)?;
        let out = component.as_any_mut().downcast_mut::<T>().map(|c| f(c, &mut *self));
        self.restore_component(handle, index, component);
        out
    }

    /// Chain of handles from the tree root down to `handle`
    pub fn path_from_root(&self, handle: MenuHandle) -> Vec<MenuHandle> {
        let mut path = Vec::new();
        let mut cur = Some(handle);
        while let Some(h) = cur {
            let Some(obj) = self.objects.get(h) else { break };
            path.push(h);
            cur = obj.parent;
        }
        path.reverse();
        path
    }

    pub fn world_pose(&self, handle: MenuHandle) -> Option<Pose> {
        self.world_transform(handle).map(|(pose, _)| pose)
    }

    pub fn world_scale(&self, handle: MenuHandle) -> Option<Vec3> {
        self.world_transform(handle).map(|(_, scale)| scale)
    }

    /// World pose and scale; a parent's scale stretches child offsets but not child rotations
    pub fn world_transform(&self, handle: MenuHandle) -> Option<(Pose, Vec3)> {
        let obj = self.objects.get(handle)?;
        let (parent_pose, parent_scale) = match obj.parent {
            Some(p) => self.world_transform(p)?,
            None => (Pose::IDENTITY, Vec3::ONE),
        };
        Some(compose(&parent_pose, parent_scale, &obj.local_pose, obj.local_scale))
    }

    /// Depth-first search below `root` for the object with `id`
    pub fn find_by_id(&self, root: MenuHandle, id: MenuId) -> Option<MenuHandle> {
        let obj = self.objects.get(root)?;
        if obj.id == id {
            return Some(root);
        }
        obj.children.iter().find_map(|c| self.find_by_id(*c, id))
    }

    pub fn find_by_name(&self, root: MenuHandle, name: &str) -> Option<MenuHandle> {
        let obj = self.objects.get(root)?;
        if obj.name == name {
            return Some(root);
        }
        obj.children.iter().find_map(|c| self.find_by_name(*c, name))
    }
}

pub(crate) fn compose(parent_pose: &Pose, parent_scale: Vec3, local: &Pose, local_scale: Vec3) -> (Pose, Vec3) {
    let pose = Pose::new(
        parent_pose.rotation * local.rotation,
        parent_pose.translation + parent_pose.rotation * (local.translation * parent_scale),
    );
    (pose, parent_scale * local_scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn tree() -> (MenuManager, MenuHandle, MenuHandle, MenuHandle) {
        let mut mgr = MenuManager::new();
        let root = mgr.create_object(MenuObject::new(MenuId(0), "root"), None);
        let a = mgr.create_object(MenuObject::new(MenuId(1), "a"), Some(root));
        let b = mgr.create_object(MenuObject::new(MenuId(2), "b"), Some(a));
        (mgr, root, a, b)
    }

    #[test]
    fn test_stale_handle_after_free() {
        let (mut mgr, root, a, b) = tree();
        assert_eq!(mgr.free_object(a), 2);
        assert!(mgr.get(a).is_none());
        assert!(mgr.get(b).is_none());
        assert!(mgr.get(root).is_some_and(|r| r.children().is_empty()));

        // reuse the freed slot; the old handle must stay dead
        let c = mgr.create_object(MenuObject::new(MenuId(3), "c"), Some(root));
        assert_ne!(c, a);
        assert!(mgr.get(a).is_none());
        assert_eq!(mgr.free_object(a), 0);
    }

    #[test]
    #[should_panic(expected = "stale or invalid")]
    fn test_stale_parent_panics() {
        let (mut mgr, _root, a, _b) = tree();
        mgr.free_object(a);
        mgr.create_object(MenuObject::new(MenuId(9), "orphan"), Some(a));
    }

    #[test]
    fn test_world_transform_applies_parent_scale() {
        let (mut mgr, root, a, b) = tree();
        if let Some(r) = mgr.get_mut(root) {
            r.local_pose = Pose::new(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), Vec3::new(0.0, 0.0, -1.0));
            r.local_scale = Vec3::splat(2.0);
        }
        if let Some(obj) = mgr.get_mut(a) {
            obj.local_pose.translation = Vec3::new(1.0, 0.0, 0.0);
        }
        if let Some(obj) = mgr.get_mut(b) {
            obj.local_scale = Vec3::splat(0.5);
        }

        let (pose, scale) = mgr.world_transform(b).expect("live");
        assert!((pose.translation - Vec3::new(0.0, 0.0, -3.0)).length() < 1e-5);
        assert_eq!(scale, Vec3::ONE);
    }

    #[test]
    fn test_find_and_path() {
        let (mgr, root, a, b) = tree();
        assert_eq!(mgr.find_by_id(root, MenuId(2)), Some(b));
        assert_eq!(mgr.find_by_id(root, MenuId(7)), None);
        assert_eq!(mgr.find_by_name(root, "a"), Some(a));
        assert_eq!(mgr.path_from_root(b), vec![root, a, b]);
    }

    #[test]
    fn test_with_component_detaches_and_restores() {
        use crate::components::GazeTimer;
        let (mut mgr, root, a, _b) = tree();
        mgr.add_component(a, Box::new(GazeTimer::new()));

        let seen = mgr.with_component::<GazeTimer, _>(a, |timer, mgr| {
            timer.set_gaze_time(4.0);
            // the running component is out of its slot
            assert!(mgr.component::<GazeTimer>(a).is_none());
            mgr.get(a).map(|o| o.component_count())
        });
        assert_eq!(seen, Some(Some(1)));
        assert_eq!(mgr.component::<GazeTimer>(a).map(|t| t.last_gaze_time()), Some(4.0));
        assert!(mgr.with_component::<GazeTimer, _>(root, |_, _| ()).is_none());
    }
}
