//! Owner of every menu and the shared object manager

use crate::manager::{MenuHandle, MenuManager};
use crate::menu::{Menu, MenuState};
use crate::object::{pixel_scale, MenuObjectParms};
use engine_core::{FrameInput, KeyEvent};
use glam::{Mat4, Vec2, Vec3, Vec4};
use math_util::Pose;
use render_gl::device::TextureId;
use slotmap::SlotMap;

slotmap::new_key_type! {
    pub struct MenuKey;
}

/// One textured quad ready for the scene pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawSurface {
    pub object: MenuHandle,
    pub texture: Option<TextureId>,
    /// Maps the unit quad (-0.5..0.5) to world space
    pub transform: Mat4,
    pub color: Vec4,
}

#[derive(Debug, Default)]
pub struct GuiSys {
    manager: MenuManager,
    menus: SlotMap<MenuKey, Menu>,
    /// Frame and draw order; later menus draw on top and see keys first
    order: Vec<MenuKey>,
}

impl GuiSys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manager(&self) -> &MenuManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut MenuManager {
        &mut self.manager
    }

    pub fn add_menu(&mut self, menu: Menu) -> MenuKey {
        let key = self.menus.insert(menu);
        self.order.push(key);
        key
    }

    pub fn menu(&self, key: MenuKey) -> Option<&Menu> {
        self.menus.get(key)
    }

    pub fn menu_mut(&mut self, key: MenuKey) -> Option<&mut Menu> {
        self.menus.get_mut(key)
    }

    /// A menu together with the manager holding its objects
    pub fn menu_parts(&mut self, key: MenuKey) -> Option<(&mut Menu, &mut MenuManager)> {
        let menu = self.menus.get_mut(key)?;
        Some((menu, &mut self.manager))
    }

    pub fn menu_by_name(&self, name: &str) -> Option<MenuKey> {
        self.order
            .iter()
            .copied()
            .find(|k| self.menus.get(*k).is_some_and(|m| m.name() == name))
    }

    pub fn menu_count(&self) -> usize {
        self.menus.len()
    }

    pub fn open_menu(&mut self, name: &str) -> bool {
        match self.menu_by_name(name).and_then(|k| self.menus.get_mut(k)) {
            Some(menu) => {
                menu.open();
                true
            }
            None => {
                tracing::warn!(menu = name, "open: no such menu");
                false
            }
        }
    }

    pub fn close_menu(&mut self, name: &str) -> bool {
        match self.menu_by_name(name).and_then(|k| self.menus.get_mut(k)) {
            Some(menu) => {
                menu.close();
                true
            }
            None => false,
        }
    }

    pub fn destroy_menu(&mut self, key: MenuKey) -> bool {
        let Some(menu) = self.menus.remove(key) else {
            return false;
        };
        self.order.retain(|k| *k != key);
        menu.destroy(&mut self.manager);
        true
    }

    /// `Menu::add_items` on the menu behind `key`; empty when the key is stale
    pub fn add_items(
        &mut self,
        key: MenuKey,
        parent: Option<MenuHandle>,
        parms: Vec<MenuObjectParms>,
    ) -> Vec<MenuHandle> {
        match self.menu_parts(key) {
            Some((menu, mgr)) => menu.add_items(mgr, parent, parms),
            None => {
                tracing::warn!(?key, "add_items on a destroyed menu");
                Vec::new()
            }
        }
    }

    pub fn frame(&mut self, input: &FrameInput) {
        for key in &self.order {
            if let Some(menu) = self.menus.get_mut(*key) {
                menu.frame(&mut self.manager, input);
            }
        }
    }

    /// Offer a key to menus from the top down; true when one consumed it
    pub fn on_key_event(&mut self, key: &KeyEvent) -> bool {
        for menu_key in self.order.iter().rev() {
            if let Some(menu) = self.menus.get_mut(*menu_key) {
                if menu.on_key_event(&mut self.manager, key) {
                    return true;
                }
            }
        }
        false
    }

    /// Visible surfaces of every menu that is not fully closed, with fade applied
    pub fn draw_list(&self) -> Vec<DrawSurface> {
        let mut out = Vec::new();
        for key in &self.order {
            let Some(menu) = self.menus.get(*key) else { continue };
            if menu.state() == MenuState::Closed {
                continue;
            }
            self.collect_r(menu.root(), &Pose::IDENTITY, Vec3::ONE, menu.fade(), &mut out);
        }
        out
    }

    fn collect_r(&self, handle: MenuHandle, parent_pose: &Pose, parent_scale: Vec3, fade: f32, out: &mut Vec<DrawSurface>) {
        let Some(obj) = self.manager.get(handle) else { return };
        if !obj.is_visible() {
            return;
        }
        let (pose, scale) = crate::manager::compose(parent_pose, parent_scale, &obj.local_pose, obj.local_scale);

        let mut color = obj.color;
        color.w *= fade;
        for surface in obj.surfaces.iter().filter(|s| s.visible) {
            let size = Vec3::new(pixel_scale(surface.dims.x), pixel_scale(surface.dims.y), 1.0);
            let offset = Vec3::new(pixel_scale(surface.offset.x), pixel_scale(surface.offset.y), 0.0);
            let transform = Mat4::from_scale_rotation_translation(scale, pose.rotation, pose.translation)
                * Mat4::from_translation(offset)
                * Mat4::from_scale(size);
            out.push(DrawSurface {
                object: handle,
                texture: surface.texture,
                transform,
                color,
            });
        }
        for child in &obj.children {
            self.collect_r(*child, &pose, scale, fade, out);
        }
    }
}

/// Quad corners of a draw surface in world space, for debugging and tests
pub fn surface_corners(surface: &DrawSurface) -> [Vec3; 4] {
    [
        Vec2::new(-0.5, -0.5),
        Vec2::new(0.5, -0.5),
        Vec2::new(0.5, 0.5),
        Vec2::new(-0.5, 0.5),
    ]
    .map(|c| surface.transform.transform_point3(c.extend(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuFlags;
    use crate::object::MenuSurface;

    fn gui_with_panel() -> (GuiSys, MenuKey, MenuHandle) {
        let mut gui = GuiSys::new();
        let key = Menu::create(&mut gui, "browser", MenuFlags::empty());
        let handles = gui.add_items(
            key,
            None,
            vec![MenuObjectParms::new("panel")
                .with_position(Vec3::new(0.0, 0.0, -2.0))
                .with_surface(MenuSurface::new("bg", None, Vec2::new(400.0, 200.0)))],
        );
        (gui, key, handles[0])
    }

    #[test]
    fn test_closed_menu_draws_nothing() {
        let (mut gui, _key, _panel) = gui_with_panel();
        assert!(gui.draw_list().is_empty());
        assert!(gui.open_menu("browser"));
        gui.frame(&FrameInput {
            delta_seconds: 0.125,
            ..FrameInput::default()
        });
        let list = gui.draw_list();
        assert_eq!(list.len(), 1);
        assert!((list[0].color.w - 0.5).abs() < 1e-6);

        let corners = surface_corners(&list[0]);
        assert!((corners[2] - Vec3::new(0.5, 0.25, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_gaze_focuses_panel_through_gui() {
        let (mut gui, key, panel) = gui_with_panel();
        gui.open_menu("browser");
        gui.frame(&FrameInput::default());
        assert_eq!(gui.menu(key).and_then(|m| m.focused()), Some(panel));
        assert!(gui.open_menu("browser"));
        assert!(!gui.open_menu("missing"));
    }

    #[test]
    fn test_destroy_menu_frees_objects() {
        let (mut gui, key, panel) = gui_with_panel();
        assert_eq!(gui.manager().len(), 2);
        assert!(gui.destroy_menu(key));
        assert!(!gui.destroy_menu(key));
        assert!(gui.manager().get(panel).is_none());
        assert_eq!(gui.menu_count(), 0);
        assert!(gui.add_items(key, None, vec![MenuObjectParms::new("late")]).is_empty());
    }

    #[test]
    fn test_keys_go_to_topmost_menu_first() {
        let mut gui = GuiSys::new();
        let bottom = Menu::create(&mut gui, "bottom", MenuFlags::empty());
        let top = Menu::create(&mut gui, "top", MenuFlags::empty());
        gui.open_menu("bottom");
        gui.open_menu("top");

        assert!(gui.on_key_event(&KeyEvent::up(engine_core::KeyCode::Back)));
        assert!(gui.menu(top).is_some_and(|m| m.is_closed_or_closing()));
        assert!(gui.menu(bottom).is_some_and(|m| m.is_open_or_opening()));
    }
}
