//! Gaze-driven menu system
//!
//! Menus own a tree of [`MenuObject`]s held in a shared [`MenuManager`].
//! Each frame a menu hit-tests the gaze ray against its tree, turns input
//! into [`MenuEvent`]s and delivers them to the [`Component`]s attached to
//! the objects. [`GuiSys`] owns every menu and builds the draw list.

pub mod collision;
pub mod component;
pub mod components;
pub mod event;
pub mod event_handler;
pub mod gui_sys;
pub mod lerp;
pub mod manager;
pub mod menu;
pub mod object;

pub use collision::{ContentFlags, TriCollision};
pub use component::{Component, EventContext};
pub use event::{DispatchType, EventFlags, EventType, HitTestResult, MenuEvent, MsgStatus};
pub use event_handler::EventHandler;
pub use gui_sys::{DrawSurface, GuiSys, MenuKey};
pub use lerp::Lerp;
pub use manager::{MenuHandle, MenuManager};
pub use menu::{Menu, MenuFlags, MenuState, ROOT_ID};
pub use object::{MenuId, MenuObject, MenuObjectParms, MenuSurface, ObjectFlags, TextAlign, TextParms};
