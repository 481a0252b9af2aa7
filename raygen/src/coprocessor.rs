//! Streaming top level: configuration in, ray words out
//!
//! The coprocessor alternates between two phases.  While receiving, it
//! accepts configuration words on its input channel until a full
//! [`CameraConfig`] has arrived; it then starts a frame and streams one word
//! per pixel on its output channel, returning to the receive phase once the
//! frame is done.
//!
//! ```
//! use raygen::{
//!     CameraSettings, Coprocessor,
//!     stream::{Consumer, Producer},
//! };
//!
//! let settings = CameraSettings {
//!     image_width: 8,
//!     ..Default::default()
//! };
//! let config = settings.build()?;
//! let mut cop = Coprocessor::default();
//! let mut producer = Producer::new(config.to_words(cop.config().layout));
//! let mut consumer = Consumer::new();
//!
//! while consumer.transfers() == 0 {
//!     let ready = cop.s_ready();
//!     let out = cop.step(producer.valid(), true);
//!     producer.step(ready, true);
//!     consumer.accept_all(out.emitted);
//! }
//! assert_eq!(consumer.words().len(), config.pixel_count());
//! # Ok::<(), raygen::Error>(())
//! ```
use crate::{
    camera::{CameraConfig, CameraLayout},
    core::RayCore,
    fixed::vec3::Component,
    stream::{Beat, transfer},
};
use log::{debug, warn};

/// Static coprocessor configuration
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct CoprocessorConfig {
    /// Layout of incoming camera configurations
    pub layout: CameraLayout,
    /// Direction component carried by each output word
    pub component: Component,
}

/// Coprocessor phase
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumIter,
)]
pub enum Phase {
    /// Accepting configuration words
    #[default]
    Receive,
    /// Streaming ray words
    Running,
}

/// Outputs of a single [`Coprocessor::step`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CoprocessorOutput {
    /// Word accepted on the input channel
    pub accepted: Option<Beat>,
    /// Word transferred on the output channel
    pub emitted: Option<Beat>,
    /// Set on the step where a frame finishes
    pub frame_done: bool,
}

/// Streaming ray generation coprocessor
///
/// Protocol violations on the input channel are out of contract, but have
/// deterministic behavior:
///
/// - An end marker before the final configuration word discards the words
///   received so far.
/// - A missing end marker on the final word is tolerated.
///
/// Both are logged as warnings.
#[derive(Clone, Debug, Default)]
pub struct Coprocessor {
    config: CoprocessorConfig,
    core: RayCore,
    phase: Phase,
    words: Vec<u32>,
    frames: usize,
}

impl Coprocessor {
    /// Builds a new coprocessor
    pub fn new(config: CoprocessorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Returns the static configuration
    pub fn config(&self) -> &CoprocessorConfig {
        &self.config
    }

    /// Returns the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of frames completed since construction or reset
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Ready signal for the input channel
    pub fn s_ready(&self) -> bool {
        self.phase == Phase::Receive
    }

    /// Beat presented on the output channel, if any
    pub fn m_valid(&self) -> Option<Beat> {
        self.core.valid().map(|s| {
            let word = s.direction.get(self.config.component).to_word();
            Beat::new(word, s.is_last)
        })
    }

    /// Advances by one step
    ///
    /// `s_valid` is the beat presented on the input channel, and `m_ready` is
    /// the output channel's ready signal.
    pub fn step(
        &mut self,
        s_valid: Option<Beat>,
        m_ready: bool,
    ) -> CoprocessorOutput {
        let accepted = transfer(s_valid, self.s_ready());
        let emitted = transfer(self.m_valid(), m_ready);

        // The core also steps while receiving, so that it returns to idle
        let out = self.core.step(m_ready);
        debug_assert_eq!(
            out.sample.map(|s| s.is_last),
            emitted.map(|b| b.last)
        );
        if out.frame_done {
            self.frames += 1;
            self.phase = Phase::Receive;
        } else if let Some(beat) = accepted {
            self.receive(beat);
        }
        CoprocessorOutput {
            accepted,
            emitted,
            frame_done: out.frame_done,
        }
    }

    fn receive(&mut self, beat: Beat) {
        self.words.push(beat.data);
        let expected = self.config.layout.word_count();
        if self.words.len() < expected {
            if beat.last {
                warn!(
                    "early end marker after {} of {expected} words; \
                     discarding configuration",
                    self.words.len()
                );
                self.words.clear();
            }
            return;
        }
        if !beat.last {
            warn!("missing end marker on configuration word {expected}");
        }
        let words = std::mem::take(&mut self.words);
        match CameraConfig::from_words(self.config.layout, &words) {
            Ok(camera) => {
                debug!("received {} configuration", self.config.layout);
                self.core.start(camera);
                self.phase = Phase::Running;
            }
            Err(e) => warn!("could not decode configuration: {e}"),
        }
    }

    /// Returns to the receive phase, discarding any partial configuration and
    /// in-flight frame
    pub fn reset(&mut self) {
        self.core.reset();
        self.words.clear();
        self.phase = Phase::Receive;
        self.frames = 0;
    }
}
