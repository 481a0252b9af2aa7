//! Ray core: iteration controller driving the ray pipeline
use crate::{
    camera::CameraConfig,
    controller::{Controller, ControllerInput, State},
    raygen::{RayPipeline, RaySample},
};
use log::debug;

/// Outputs of a single [`RayCore::step`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreOutput {
    /// Sample which transferred to the consumer on this step
    pub sample: Option<RaySample>,
    /// Set on the step where the controller finishes the frame
    pub frame_done: bool,
}

/// Controller and ray pipeline, sharing a clock enable
///
/// The consumer's `ready` signal is the clock enable for the whole core: on a
/// step where it is low, nothing moves and the sample at the pipeline tail
/// stays presented.  On a step where it is high, the tail sample transfers,
/// the pipeline shifts, and the controller issues its next coordinate.
///
/// With a consumer that is always ready, the first sample of a frame transfers
/// on the fifth step after [`start`](Self::start) and the last sample
/// transfers on the step that reports `frame_done`.
#[derive(Clone, Debug, Default)]
pub struct RayCore {
    controller: Controller,
    pipeline: RayPipeline,
    config: CameraConfig,
    pending: bool,
}

impl RayCore {
    /// Builds an idle core
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a new frame
    ///
    /// The configuration is latched immediately and the frame begins on the
    /// next ready step.  Calling this while a frame is in progress is out of
    /// contract: the new configuration replaces the old one for in-flight
    /// samples.
    pub fn start(&mut self, config: CameraConfig) {
        debug!(
            "starting {}×{} frame",
            config.width(),
            config.height()
        );
        self.config = config;
        self.pending = true;
    }

    /// Returns the sample presented to the consumer (the `valid` output)
    pub fn valid(&self) -> Option<RaySample> {
        self.pipeline.tail(&self.config)
    }

    /// Returns the active configuration
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Returns the controller state
    pub fn state(&self) -> State {
        self.controller.state()
    }

    /// Checks whether a frame is requested or in progress
    pub fn is_busy(&self) -> bool {
        self.pending || self.controller.state() != State::Idle
    }

    /// Advances the core by one step
    pub fn step(&mut self, ready: bool) -> CoreOutput {
        let input = ControllerInput {
            start: self.pending && ready,
            stall: !ready,
            reset: false,
            image_width: self.config.width(),
            image_height: self.config.height(),
        };
        let out = self.controller.step(&input);
        if !ready {
            return CoreOutput::default();
        }
        if self.controller.state() != State::Idle {
            self.pending = false;
        }
        let sample = self.pipeline.step(&self.config, out.issue);
        if out.frame_done {
            debug!("frame done");
        }
        CoreOutput {
            sample,
            frame_done: out.frame_done,
        }
    }

    /// Returns to idle, discarding any requested frame and in-flight samples
    pub fn reset(&mut self) {
        self.controller.step(&ControllerInput {
            reset: true,
            ..Default::default()
        });
        self.pipeline.reset();
        self.pending = false;
    }
}
