//! Stock components

pub mod button;
pub mod carousel;
pub mod gaze_timer;
pub mod slider;
pub mod swipe_hint;

pub use button::{Button, ButtonCallback, ButtonColors, ClickMode};
pub use carousel::{poster_panel, CarouselBrowser, CarouselItem, PanelPose, PanelUpdater};
pub use gaze_timer::GazeTimer;
pub use slider::{Slider, SliderCallback, SliderWidgets};
pub use swipe_hint::CarouselSwipeHint;
