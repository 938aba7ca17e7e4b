//! Menu objects: the nodes of a menu tree

use crate::collision::TriCollision;
use crate::component::Component;
use crate::manager::MenuHandle;
use glam::{Vec2, Vec3, Vec4};
use math_util::{Bounds3, Pose};
use render_gl::device::TextureId;

/// World units per surface pixel
pub const DEFAULT_TEXEL_SCALE: f32 = 0.0025;

/// Height of one line of text at scale 1
const TEXT_LINE_HEIGHT: f32 = 0.1;
/// Horizontal advance of one glyph at scale 1
const TEXT_GLYPH_ADVANCE: f32 = 0.05;

/// Converts a length in surface pixels to world units
pub fn pixel_scale(pixels: f32) -> f32 {
    pixels * DEFAULT_TEXEL_SCALE
}

/// Id of an object, unique within its menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(pub i32);

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectFlags: u32 {
        /// Neither this object nor its children can be hit
        const NO_HIT = 1 << 0;
        /// Not drawn, not hit, children included
        const HIDDEN = 1 << 1;
        /// Children can be hit but this object can't
        const DONT_HIT_SELF = 1 << 2;
        /// Gaining focus sends no FocusGained event
        const NO_FOCUS_GAINED = 1 << 3;
        const DONT_RENDER_TEXT = 1 << 4;
        const NO_DEPTH = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextParms {
    pub scale: f32,
    pub align: TextAlign,
    pub color: Vec4,
}

impl Default for TextParms {
    fn default() -> Self {
        Self {
            scale: 1.0,
            align: TextAlign::Center,
            color: Vec4::ONE,
        }
    }
}

/// A textured quad drawn for an object
#[derive(Debug, Clone, PartialEq)]
pub struct MenuSurface {
    pub name: String,
    pub texture: Option<TextureId>,
    /// Size in pixels
    pub dims: Vec2,
    pub offset: Vec2,
    pub visible: bool,
}

impl MenuSurface {
    pub fn new(name: impl Into<String>, texture: Option<TextureId>, dims: Vec2) -> Self {
        Self {
            name: name.into(),
            texture,
            dims,
            offset: Vec2::ZERO,
            visible: true,
        }
    }

    pub fn local_bounds(&self) -> Bounds3 {
        let half = Vec3::new(pixel_scale(self.dims.x), pixel_scale(self.dims.y), 0.0) * 0.5;
        let center = Vec3::new(pixel_scale(self.offset.x), pixel_scale(self.offset.y), 0.0);
        Bounds3::new(center - half, center + half)
    }
}

pub struct MenuObject {
    pub(crate) id: MenuId,
    pub(crate) name: String,
    pub(crate) parent: Option<MenuHandle>,
    pub(crate) children: Vec<MenuHandle>,
    pub(crate) components: Vec<Option<Box<dyn Component>>>,
    pub local_pose: Pose,
    pub local_scale: Vec3,
    pub color: Vec4,
    pub text: String,
    pub text_parms: TextParms,
    pub flags: ObjectFlags,
    pub surfaces: Vec<MenuSurface>,
    pub collision: Option<TriCollision>,
    pub highlighted: bool,
}

impl std::fmt::Debug for MenuObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .field("components", &self.components.len())
            .field("flags", &self.flags)
            .finish()
    }
}

impl MenuObject {
    pub fn new(id: MenuId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            local_pose: Pose::IDENTITY,
            local_scale: Vec3::ONE,
            color: Vec4::ONE,
            text: String::new(),
            text_parms: TextParms::default(),
            flags: ObjectFlags::empty(),
            surfaces: Vec::new(),
            collision: None,
            highlighted: false,
        }
    }

    pub fn id(&self) -> MenuId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<MenuHandle> {
        self.parent
    }

    pub fn children(&self) -> &[MenuHandle] {
        &self.children
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn is_visible(&self) -> bool {
        !self.flags.contains(ObjectFlags::HIDDEN)
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(ObjectFlags::HIDDEN, !visible);
    }

    pub fn set_local_position(&mut self, position: Vec3) {
        self.local_pose.translation = position;
    }

    pub fn set_surface_dims(&mut self, index: usize, dims: Vec2) {
        if let Some(surface) = self.surfaces.get_mut(index) {
            surface.dims = dims;
        }
    }

    pub fn set_surface_texture(&mut self, index: usize, texture: Option<TextureId>) {
        if let Some(surface) = self.surfaces.get_mut(index) {
            surface.texture = texture;
        }
    }

    fn text_bounds(&self) -> Option<Bounds3> {
        if self.text.is_empty() || self.flags.contains(ObjectFlags::DONT_RENDER_TEXT) {
            return None;
        }
        let lines = self.text.lines().count().max(1) as f32;
        let widest = self.text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as f32;
        let width = widest * TEXT_GLYPH_ADVANCE * self.text_parms.scale;
        let height = lines * TEXT_LINE_HEIGHT * self.text_parms.scale;
        let left = match self.text_parms.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => -width * 0.5,
            TextAlign::Right => -width,
        };
        Some(Bounds3::new(
            Vec3::new(left, -height * 0.5, 0.0),
            Vec3::new(left + width, height * 0.5, 0.0),
        ))
    }

    /// Union of visible surface quads, text and the collision shape, unscaled
    pub fn local_bounds(&self) -> Bounds3 {
        let mut bounds = Bounds3::cleared();
        for surface in self.surfaces.iter().filter(|s| s.visible) {
            bounds.expand(&surface.local_bounds());
        }
        if let Some(text) = self.text_bounds() {
            bounds.expand(&text);
        }
        if let Some(collision) = &self.collision {
            bounds.expand(collision.bounds());
        }
        bounds
    }
}

/// Everything needed to instantiate one object through `Menu::add_items`
pub struct MenuObjectParms {
    pub name: String,
    pub id: Option<MenuId>,
    pub parent_id: Option<MenuId>,
    pub local_pose: Pose,
    pub local_scale: Vec3,
    pub color: Vec4,
    pub text: String,
    pub text_parms: TextParms,
    pub flags: ObjectFlags,
    pub surfaces: Vec<MenuSurface>,
    pub collision: Option<TriCollision>,
    pub components: Vec<Box<dyn Component>>,
}

impl MenuObjectParms {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            parent_id: None,
            local_pose: Pose::IDENTITY,
            local_scale: Vec3::ONE,
            color: Vec4::ONE,
            text: String::new(),
            text_parms: TextParms::default(),
            flags: ObjectFlags::empty(),
            surfaces: Vec::new(),
            collision: None,
            components: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: MenuId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_parent_id(mut self, parent_id: MenuId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.local_pose = pose;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.local_pose.translation = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.local_scale = scale;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>, parms: TextParms) -> Self {
        self.text = text.into();
        self.text_parms = parms;
        self
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_surface(mut self, surface: MenuSurface) -> Self {
        self.surfaces.push(surface);
        self
    }

    pub fn with_collision(mut self, collision: TriCollision) -> Self {
        self.collision = Some(collision);
        self
    }

    pub fn with_component(mut self, component: impl Component) -> Self {
        self.components.push(Box::new(component));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_bounds_in_world_units() {
        let mut obj = MenuObject::new(MenuId(1), "panel");
        obj.surfaces.push(MenuSurface::new("bg", None, Vec2::new(400.0, 200.0)));
        let b = obj.local_bounds();
        assert!((b.size() - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(b.center(), Vec3::ZERO);
    }

    #[test]
    fn test_text_bounds_follow_alignment() {
        let mut obj = MenuObject::new(MenuId(1), "label");
        obj.text = "abcd".into();
        obj.text_parms.align = TextAlign::Left;
        let b = obj.local_bounds();
        assert_eq!(b.mins.x, 0.0);
        assert!((b.maxs.x - 0.2).abs() < 1e-6);

        obj.flags |= ObjectFlags::DONT_RENDER_TEXT;
        assert!(obj.local_bounds().is_cleared());
    }

    #[test]
    fn test_hidden_surface_is_not_bounded() {
        let mut obj = MenuObject::new(MenuId(1), "panel");
        let mut surface = MenuSurface::new("bg", None, Vec2::splat(100.0));
        surface.visible = false;
        obj.surfaces.push(surface);
        assert!(obj.local_bounds().is_cleared());
        obj.set_visible(false);
        assert!(obj.flags.contains(ObjectFlags::HIDDEN));
    }
}
