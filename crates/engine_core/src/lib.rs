#![allow(clippy::needless_return)]

pub mod clock;
pub mod console;
pub mod input;

pub use clock::{FrameClock, FrameTick};
pub use console::{Console, ConsoleError};
pub use input::{ButtonState, Buttons, FrameInput, InputSampler, KeyAction, KeyCode, KeyEvent, RawInput};

use std::thread;
use std::time::{Duration, Instant};

/// Per-frame phases, run in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    InputSample,
    EventDispatch,
    ComponentUpdate,
    SceneRecord,
    Present,
}

pub type System<S> = fn(&mut S, &FrameTick);

pub struct Schedule<S> {
    systems: Vec<(Phase, System<S>)>,
}

impl<S> Schedule<S> {
    pub fn new() -> Self {
        Self { systems: Vec::new() }
    }

    /// Systems of one phase keep their registration order
    pub fn add(&mut self, phase: Phase, system: System<S>) -> &mut Self {
        let at = self
            .systems
            .iter()
            .position(|(p, _)| *p > phase)
            .unwrap_or(self.systems.len());
        self.systems.insert(at, (phase, system));
        self
    }

    pub fn run(&self, s: &mut S, tick: &FrameTick) {
        for (_, sys) in &self.systems {
            sys(s, tick);
        }
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl<S> Default for Schedule<S> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Engine<S> {
    clock: FrameClock,
    state: S,
    schedule: Schedule<S>,
}

impl<S> Engine<S> {
    pub fn new(clock: FrameClock, state: S, schedule: Schedule<S>) -> Self {
        Self { clock, state, schedule }
    }

    pub fn tick_once(&mut self) -> FrameTick {
        // deterministic order
        let tick = self.clock.advance();
        self.schedule.run(&mut self.state, &tick);
        tick
    }

    /// Run `frames` frames back to back
    pub fn run_frames(&mut self, frames: u64) {
        for _ in 0..frames {
            self.tick_once();
        }
    }

    /// Run `frames` frames paced to the clock rate
    pub fn run_paced(&mut self, frames: u64) {
        let dt = self.clock.dt();
        let mut next_tick = Instant::now();
        let mut last_report = Instant::now();
        let mut ticks_in_window: u32 = 0;
        let mut done = 0;

        while done < frames {
            let now = Instant::now();
            if now >= next_tick {
                self.tick_once();
                done += 1;
                ticks_in_window += 1;
                next_tick += dt;

                // catch up if late instead of bursting
                if now > next_tick + dt {
                    next_tick = now + dt;
                }
            } else {
                thread::sleep(next_tick - now);
            }

            if last_report.elapsed() >= Duration::from_secs(1) {
                tracing::info!(
                    frame = self.clock.current().frame,
                    hz = self.clock.hz(),
                    last_sec_frames = ticks_in_window,
                    "engine"
                );
                ticks_in_window = 0;
                last_report = Instant::now();
            }
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        order: Vec<&'static str>,
        frames: Vec<u64>,
    }

    fn input(s: &mut Trace, t: &FrameTick) {
        s.order.push("input");
        s.frames.push(t.frame);
    }
    fn events(s: &mut Trace, _: &FrameTick) {
        s.order.push("events");
    }
    fn present(s: &mut Trace, _: &FrameTick) {
        s.order.push("present");
    }
    fn present_late(s: &mut Trace, _: &FrameTick) {
        s.order.push("present_late");
    }

    #[test]
    fn test_phases_run_in_order() {
        let mut schedule: Schedule<Trace> = Schedule::new();
        schedule
            .add(Phase::Present, present)
            .add(Phase::InputSample, input)
            .add(Phase::Present, present_late)
            .add(Phase::EventDispatch, events);
        assert_eq!(schedule.len(), 4);

        let mut engine = Engine::new(FrameClock::new_fixed_hz(60, 1.0), Trace::default(), schedule);
        engine.tick_once();
        assert_eq!(engine.state().order, vec!["input", "events", "present", "present_late"]);
    }

    #[test]
    fn test_run_frames_advances_clock() {
        let mut schedule: Schedule<Trace> = Schedule::new();
        schedule.add(Phase::InputSample, input);
        let mut engine = Engine::new(FrameClock::new_fixed_hz(72, 1.0), Trace::default(), schedule);
        engine.run_frames(3);
        assert_eq!(engine.clock().current().frame, 3);
        assert_eq!(engine.into_state().frames, vec![1, 2, 3]);
    }
}
