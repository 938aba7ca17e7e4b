//! The demo "browser" menu: a poster carousel above playback controls

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::{Quat, Vec2, Vec3, Vec4};
use math_util::Pose;
use render_gl::device::TextureId;
use vr_gui::components::{
    poster_panel, Button, ButtonColors, CarouselBrowser, CarouselItem, CarouselSwipeHint, GazeTimer, PanelPose,
    Slider, SliderWidgets,
};
use vr_gui::{GuiSys, Menu, MenuFlags, MenuHandle, MenuKey, MenuObjectParms, MenuSurface, ObjectFlags, TriCollision};

pub const MENU_NAME: &str = "browser";
pub const PANEL_COUNT: usize = 5;
pub const SEEK_BAR_WIDTH: f32 = 400.0;
/// Seconds without a glance before the playback controls hide
pub const CONTROLS_TIMEOUT: f64 = 2.0;
pub const MOVIE_LENGTH: f32 = 120.0;

/// Console commands queued by widget callbacks, run after the GUI frame
pub type CommandQueue = Rc<RefCell<VecDeque<String>>>;

/// Handles into the browser menu the driver needs after construction
#[derive(Debug, Clone)]
pub struct BrowserMenu {
    pub key: MenuKey,
    pub carousel: MenuHandle,
    pub panels: Vec<MenuHandle>,
    pub hints: Vec<MenuHandle>,
    pub controls: MenuHandle,
    pub seek_bar: MenuHandle,
    pub play_button: MenuHandle,
}

fn panel_poses() -> Vec<PanelPose> {
    (0..PANEL_COUNT)
        .map(|i| {
            let slot = i as f32 - (PANEL_COUNT / 2) as f32;
            let alpha = if slot.abs() > 1.0 { 0.0 } else { 1.0 };
            PanelPose::new(
                Quat::from_rotation_y(-slot * 0.3),
                Vec3::new(slot * 0.8, 0.0, -slot.abs() * 0.2),
                Vec4::new(1.0, 1.0, 1.0, alpha),
            )
        })
        .collect()
}

fn hint_parms(carousel: MenuHandle, right: bool, index: usize) -> MenuObjectParms {
    let side = if right { 1.0 } else { -1.0 };
    let hint = CarouselSwipeHint::new(carousel, right, 1.3333, 0.4 + index as f32 * 0.13333, 5.0);
    MenuObjectParms::new(format!("hint_{}_{index}", if right { "right" } else { "left" }))
        .with_position(Vec3::new(side * (0.5 + index as f32 * 0.05), -0.3, 0.05))
        .with_color(Vec4::new(1.0, 1.0, 1.0, 0.0))
        .with_flags(ObjectFlags::NO_HIT)
        .with_surface(MenuSurface::new("arrow", None, Vec2::splat(32.0)))
        .with_component(hint)
}

/// Build the browser menu into `gui` with one carousel item per texture
pub fn build(
    gui: &mut GuiSys,
    posters: &[(String, TextureId)],
    fade_time: f32,
    menu_distance: f32,
    commands: &CommandQueue,
) -> BrowserMenu {
    let key = Menu::create(gui, MENU_NAME, MenuFlags::empty());
    if let Some((menu, mgr)) = gui.menu_parts(key) {
        menu.set_fade_times(fade_time, fade_time);
        menu.set_menu_pose(mgr, Pose::from_translation(Vec3::new(0.0, 0.0, -menu_distance)));
    }

    let top = gui.add_items(
        key,
        None,
        vec![
            MenuObjectParms::new("carousel").with_position(Vec3::new(0.0, 0.3, 0.0)),
            MenuObjectParms::new("controls")
                .with_position(Vec3::new(0.0, -0.35, 0.0))
                .with_collision(TriCollision::quad(1.4, 0.3))
                .with_component(GazeTimer::new()),
        ],
    );
    let (carousel, controls) = (top[0], top[1]);

    let panels = gui.add_items(
        key,
        Some(carousel),
        (0..PANEL_COUNT)
            .map(|i| {
                MenuObjectParms::new(format!("panel{i}"))
                    .with_surface(MenuSurface::new("poster", None, Vec2::new(300.0, 200.0)))
                    .with_flags(ObjectFlags::DONT_RENDER_TEXT)
            })
            .collect(),
    );

    let hints = gui.add_items(
        key,
        Some(carousel),
        (0..3)
            .flat_map(|i| [hint_parms(carousel, true, i), hint_parms(carousel, false, i)])
            .collect(),
    );

    let dims = Vec2::new(SEEK_BAR_WIDTH, 40.0);
    let playback = gui.add_items(
        key,
        Some(controls),
        vec![
            MenuObjectParms::new("seek_bar")
                .with_position(Vec3::new(0.0, 0.0, 0.02))
                .with_color(Vec4::new(0.3, 0.3, 0.3, 1.0))
                .with_surface(MenuSurface::new("background", None, dims)),
            MenuObjectParms::new("play")
                .with_position(Vec3::new(0.65, 0.0, 0.02))
                .with_surface(MenuSurface::new("icon", None, Vec2::splat(64.0))),
        ],
    );
    let (seek_bar, play_button) = (playback[0], playback[1]);

    let labels = gui.add_items(
        key,
        Some(seek_bar),
        vec![
            MenuObjectParms::new("scrub")
                .with_position(Vec3::new(0.0, 0.0, 0.005))
                .with_flags(ObjectFlags::NO_HIT)
                .with_surface(MenuSurface::new("fill", None, Vec2::new(0.0, 40.0))),
            MenuObjectParms::new("current").with_flags(ObjectFlags::NO_HIT),
            MenuObjectParms::new("seek").with_flags(ObjectFlags::NO_HIT),
        ],
    );

    let mgr = gui.manager_mut();

    let items = posters
        .iter()
        .map(|(name, texture)| CarouselItem {
            name: name.clone(),
            texture: Some(*texture),
            texture_width: 300,
            texture_height: 200,
        })
        .collect();
    let mut browser = CarouselBrowser::new(items, panel_poses());
    browser.set_panels(panels.clone(), poster_panel);
    browser.update_panels(mgr);
    mgr.add_component(carousel, Box::new(browser));

    let mut slider = Slider::new();
    slider.set_widgets(
        mgr,
        SliderWidgets {
            background: seek_bar,
            scrub_bar: labels[0],
            current_label: labels[1],
            seek_label: labels[2],
            scrub_bar_width: SEEK_BAR_WIDTH,
        },
    );
    slider.set_extents(mgr, MOVIE_LENGTH, 0.0, 1);
    let queue = Rc::clone(commands);
    slider.set_on_click(Box::new(move |value| queue.borrow_mut().push_back(format!("seek {value}"))));
    mgr.add_component(seek_bar, Box::new(slider));

    let queue = Rc::clone(commands);
    let button = Button::toggle(ButtonColors::default())
        .with_on_click(Box::new(move |_| queue.borrow_mut().push_back("togglePlay".to_string())));
    mgr.add_component(play_button, Box::new(button));

    tracing::info!(items = posters.len(), objects = mgr.len(), "browser menu built");
    BrowserMenu {
        key,
        carousel,
        panels,
        hints,
        controls,
        seek_bar,
        play_button,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::FrameInput;
    use std::num::NonZeroU32;
    use vr_gui::MenuState;

    fn texture(i: u32) -> TextureId {
        TextureId(NonZeroU32::new(i).unwrap())
    }

    fn posters(n: u32) -> Vec<(String, TextureId)> {
        (1..=n).map(|i| (format!("poster{i}"), texture(i))).collect()
    }

    #[test]
    fn test_build_lays_out_panels() {
        let mut gui = GuiSys::new();
        let commands = CommandQueue::default();
        let menu = build(&mut gui, &posters(4), 0.25, 1.8, &commands);

        assert_eq!(gui.menu_by_name(MENU_NAME), Some(menu.key));
        assert_eq!(menu.panels.len(), PANEL_COUNT);
        assert_eq!(menu.hints.len(), 6);

        let mgr = gui.manager();
        // slots left of the first item are empty, the center shows item 0
        assert!(!mgr.get(menu.panels[0]).unwrap().is_visible());
        let center = mgr.get(menu.panels[2]).unwrap();
        assert_eq!(center.text, "poster1");
        assert_eq!(center.surfaces[0].texture, Some(texture(1)));
        assert!(mgr.component::<CarouselBrowser>(menu.carousel).is_some());
        assert!(mgr.component::<Slider>(menu.seek_bar).is_some());
        assert!(mgr.component::<GazeTimer>(menu.controls).is_some());
    }

    #[test]
    fn test_menu_opens_with_fade() {
        let mut gui = GuiSys::new();
        let menu = build(&mut gui, &posters(2), 0.25, 1.8, &CommandQueue::default());
        assert!(gui.draw_list().is_empty());

        assert!(gui.open_menu(MENU_NAME));
        let input = FrameInput {
            delta_seconds: 0.125,
            ..FrameInput::default()
        };
        gui.frame(&input);
        gui.frame(&input);
        gui.frame(&input);
        assert_eq!(gui.menu(menu.key).map(|m| m.state()), Some(MenuState::Open));
        assert!(!gui.draw_list().is_empty());
    }
}
