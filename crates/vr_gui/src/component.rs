//! Behaviors attached to menu objects

use crate::event::{EventFlags, MenuEvent, MsgStatus};
use crate::manager::{MenuHandle, MenuManager};
use engine_core::FrameInput;
use std::any::Any;

/// What a component can reach while handling an event
pub struct EventContext<'a> {
    pub manager: &'a mut MenuManager,
    pub input: &'a FrameInput,
}

/// A behavior that reacts to the event types named by `event_flags`
///
/// While a component runs it is detached from its object, so it can
/// freely mutate the object (through `this`) or any other object and
/// component in the manager.
pub trait Component: Any {
    fn event_flags(&self) -> EventFlags;

    fn on_event(&mut self, ctx: &mut EventContext<'_>, this: MenuHandle, event: &MenuEvent) -> MsgStatus;

    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn handles(&self, event: &MenuEvent) -> bool {
        self.event_flags().contains(event.kind.flag())
    }
}

/// Fills in the `Any` plumbing and `type_name` for a component type
#[macro_export]
macro_rules! component_any {
    ($name:literal) => {
        fn type_name(&self) -> &'static str {
            $name
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}
