//! Coordinate iteration controller
//!
//! The controller walks the image in row-major order, issuing one
//! [`PixelCoordinate`] per step into the ray pipeline, then waits for the
//! pipeline to drain before signalling the end of the frame.
//!
//! For a 5×2 image, the step-by-step outputs are:
//!
//! | Step    | State  | Issued             | `frame_done` |
//! |---------|--------|--------------------|--------------|
//! | 0       | Ready  | (0, 0)             |              |
//! | 1..=9   | Active | (1, 0) ..= (4, 1)  |              |
//! | 10..=12 | Drain  |                    |              |
//! | 13      | Done   |                    | ✓            |
//! | 14      | Idle   |                    |              |
use crate::raygen::{Issue, PixelCoordinate, RAYGEN_LATENCY};
use log::trace;

/// Number of steps spent in [`State::Drain`] after the last coordinate
pub const DRAIN_CYCLES: usize = RAYGEN_LATENCY - 1;

/// Controller state
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
)]
pub enum State {
    /// Waiting for a frame to start
    #[default]
    Idle,
    /// First coordinate issued
    Ready,
    /// Issuing coordinates
    Active,
    /// Last coordinate issued; waiting for the pipeline to empty
    Drain,
    /// Frame complete
    Done,
}

/// Inputs sampled by the controller on each step
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerInput {
    /// Starts a new frame (only observed in [`State::Idle`])
    pub start: bool,
    /// Freezes the controller in any state other than [`State::Idle`]
    pub stall: bool,
    /// Returns to [`State::Idle`] from any state
    pub reset: bool,
    /// Image width, latched on `start`
    pub image_width: u32,
    /// Image height, latched on `start`
    pub image_height: u32,
}

/// Outputs produced by the controller on each step
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerOutput {
    /// Coordinate issued on this step, if any
    pub issue: Option<Issue>,
    /// Set on the single step spent in [`State::Done`]
    pub frame_done: bool,
}

/// Row-major coordinate iterator with drain and stall semantics
///
/// Zero-sized images are out of contract; a zero width or height is treated
/// as one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Controller {
    state: State,
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    /// Remaining drain steps after the current one
    drain: usize,
}

impl Controller {
    /// Builds a new controller in [`State::Idle`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the most recently issued coordinate
    pub fn coord(&self) -> PixelCoordinate {
        PixelCoordinate::new(self.x, self.y)
    }

    fn is_last(&self) -> bool {
        self.x + 1 == self.width && self.y + 1 == self.height
    }

    fn issue(&self) -> ControllerOutput {
        ControllerOutput {
            issue: Some(Issue {
                coord: self.coord(),
                is_last: self.is_last(),
            }),
            frame_done: false,
        }
    }

    /// Computes the next state and this step's outputs
    pub fn next(self, input: &ControllerInput) -> (Self, ControllerOutput) {
        if input.reset {
            return (Self::default(), ControllerOutput::default());
        }
        let idle = ControllerOutput::default();
        match self.state {
            State::Idle if input.start => {
                let next = Self {
                    state: State::Ready,
                    width: input.image_width.max(1),
                    height: input.image_height.max(1),
                    x: 0,
                    y: 0,
                    drain: 0,
                };
                (next, next.issue())
            }
            State::Idle => (self, idle),
            _ if input.stall => (self, idle),
            State::Ready | State::Active if self.is_last() => {
                let next = Self {
                    state: State::Drain,
                    drain: DRAIN_CYCLES - 1,
                    ..self
                };
                (next, idle)
            }
            State::Ready | State::Active => {
                let (x, y) = if self.x + 1 == self.width {
                    (0, self.y + 1)
                } else {
                    (self.x + 1, self.y)
                };
                let next = Self {
                    state: State::Active,
                    x,
                    y,
                    ..self
                };
                (next, next.issue())
            }
            State::Drain if self.drain == 0 => {
                let next = Self {
                    state: State::Done,
                    ..self
                };
                let out = ControllerOutput {
                    issue: None,
                    frame_done: true,
                };
                (next, out)
            }
            State::Drain => {
                let next = Self {
                    drain: self.drain - 1,
                    ..self
                };
                (next, idle)
            }
            State::Done => {
                let next = Self {
                    state: State::Idle,
                    ..self
                };
                (next, idle)
            }
        }
    }

    /// Advances the controller in place
    pub fn step(&mut self, input: &ControllerInput) -> ControllerOutput {
        let (next, out) = self.next(input);
        if next.state != self.state {
            trace!("controller: {} -> {}", self.state, next.state);
        }
        *self = next;
        out
    }
}
