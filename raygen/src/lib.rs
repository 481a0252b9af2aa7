//! Raygen is a step-accurate model of a fixed-point ray generation
//! accelerator.
//!
//! Given a serialized camera configuration, the accelerator produces the
//! originating ray for every pixel of an image, in row-major order, streamed
//! through a channel with backpressure.  Inside the engine, all arithmetic is
//! done with saturating Q16.16 fixed-point values; floating point is only used
//! on the host side, to build configurations and check results.
//!
//! # Fixed-point arithmetic
//! The [`fixed`] module provides the [`Fixed`] type and the arithmetic
//! primitives used throughout the engine.  Every operation that can overflow
//! returns its result along with a clip flag:
//!
//! ```
//! use raygen::{fixed, Fixed};
//!
//! let (v, clipped) = fixed::mul(Fixed::from(3), Fixed::HALF);
//! assert_eq!(v.to_f64(), 1.5);
//! assert!(!clipped);
//! ```
//!
//! The [`rsqrt`] module adds an iterative reciprocal square root, built only
//! from multiplies and shifts.
//!
//! # Camera configuration
//! A frame is described by a [`CameraConfig`], usually built from
//! floating-point [`CameraSettings`]:
//!
//! ```
//! use raygen::{CameraLayout, CameraSettings};
//!
//! let settings = CameraSettings {
//!     image_width: 10,
//!     ..Default::default()
//! };
//! let config = settings.build()?;
//! assert_eq!(config.height(), 5);
//! assert_eq!(config.to_words(CameraLayout::Full).len(), 27);
//! # Ok::<(), raygen::Error>(())
//! ```
//!
//! # Ray generation
//! The hardware is modelled one step (clock cycle) at a time:
//!
//! - The [`controller`] walks the image, issuing one pixel coordinate per step
//! - The ray pipeline in [`raygen`](mod@raygen) turns each coordinate into a
//!   [`RaySample`]
//! - The [`RayCore`] ties the two together, with the output channel's `ready`
//!   signal acting as a clock enable
//! - The [`Coprocessor`] adds an input channel for configurations, and selects
//!   one direction component per output word
//!
//! Stepping the coprocessor until a frame is done produces the same words as
//! the untimed model in [`render`]:
//!
//! ```
//! use raygen::{
//!     CameraLayout, CameraSettings, Component, Coprocessor, render,
//!     stream::Producer,
//! };
//!
//! let config = CameraSettings {
//!     image_width: 16,
//!     ..Default::default()
//! }
//! .build()?;
//!
//! let mut cop = Coprocessor::default();
//! let mut producer = Producer::new(config.to_words(CameraLayout::Full));
//! let mut words = vec![];
//! while cop.frames() == 0 {
//!     let ready = cop.s_ready();
//!     let out = cop.step(producer.valid(), true);
//!     producer.step(ready, true);
//!     words.extend(out.emitted.map(|b| b.data));
//! }
//! assert_eq!(words, render::render_words(&config, Component::Y));
//! # Ok::<(), raygen::Error>(())
//! ```
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

pub mod camera;
pub mod controller;
pub mod coprocessor;
pub mod core;
pub mod fixed;
pub mod raygen;
pub mod render;
pub mod rsqrt;
pub mod stream;

mod error;
pub use error::Error;

pub use camera::{CameraConfig, CameraLayout, CameraSettings};
pub use coprocessor::{Coprocessor, CoprocessorConfig};
pub use crate::core::RayCore;
pub use fixed::{Fixed, Vec3, vec3::Component};
pub use raygen::{PixelCoordinate, RaySample};
