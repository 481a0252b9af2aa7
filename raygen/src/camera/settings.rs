//! Floating-point camera description and its conversion to Q16.16
//!
//! ```
//! use raygen::CameraSettings;
//!
//! let settings = CameraSettings {
//!     image_width: 160,
//!     ..Default::default()
//! };
//! let config = settings.build()?;
//! assert_eq!((config.width(), config.height()), (160, 90));
//! # Ok::<(), raygen::Error>(())
//! ```

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::CameraConfig;
use crate::{
    Error,
    fixed::{Fixed, Vec3},
};

/// Host-side camera description, in floating point
///
/// This is the human-friendly way to build a [`CameraConfig`]: derived
/// quantities are computed in `f64`, then each one is converted to Q16.16 by
/// truncation toward zero.
///
/// Missing fields take their default values when deserializing.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Image width, in pixels
    pub image_width: u32,
    /// Image aspect ratio (width / height)
    pub aspect_ratio: f64,
    /// Distance from the camera center to the viewport
    pub focal_length: f64,
    /// Viewport height, in world units
    pub viewport_height: f64,
    /// Ray origin
    pub camera_center: Vector3<f64>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            image_width: 400,
            aspect_ratio: 16.0 / 9.0,
            focal_length: 1.0,
            viewport_height: 2.0,
            camera_center: Vector3::zeros(),
        }
    }
}

/// Derived camera quantities, in floating point
struct Geometry {
    image_height: f64,
    viewport_width: f64,
    viewport_u: Vector3<f64>,
    viewport_v: Vector3<f64>,
    viewport_upper_left: Vector3<f64>,
    pixel_delta_u: Vector3<f64>,
    pixel_delta_v: Vector3<f64>,
    pixel_00_loc: Vector3<f64>,
}

impl CameraSettings {
    /// Image height, in pixels
    ///
    /// This is `image_width / aspect_ratio` rounded down, and at least one.
    pub fn image_height(&self) -> u32 {
        let h = (f64::from(self.image_width) / self.aspect_ratio).trunc();
        if h >= 1.0 { h as u32 } else { 1 }
    }

    fn geometry(&self) -> Geometry {
        let w = f64::from(self.image_width);
        let h = f64::from(self.image_height());
        let viewport_width = self.viewport_height * (w / h);

        let viewport_u = Vector3::new(viewport_width, 0.0, 0.0);
        let viewport_v = Vector3::new(0.0, -self.viewport_height, 0.0);
        let pixel_delta_u = viewport_u / w;
        let pixel_delta_v = viewport_v / h;

        let viewport_upper_left = self.camera_center
            - Vector3::new(0.0, 0.0, self.focal_length)
            - viewport_u / 2.0
            - viewport_v / 2.0;
        let pixel_00_loc =
            viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v);
        Geometry {
            image_height: h,
            viewport_width,
            viewport_u,
            viewport_v,
            viewport_upper_left,
            pixel_delta_u,
            pixel_delta_v,
            pixel_00_loc,
        }
    }

    fn check(&self) -> Result<(), Error> {
        if self.image_width == 0 {
            Err(Error::ZeroWidth)
        } else if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            Err(Error::BadAspectRatio(self.aspect_ratio))
        } else {
            Ok(())
        }
    }

    /// Builds the fixed-point configuration
    ///
    /// Returns an error if the settings are degenerate, or if any derived
    /// quantity doesn't fit in Q16.16.
    pub fn build(&self) -> Result<CameraConfig, Error> {
        self.check()?;
        let g = self.geometry();
        Ok(CameraConfig {
            aspect_ratio: scalar("aspect_ratio", self.aspect_ratio)?,
            image_width: scalar("image_width", f64::from(self.image_width))?,
            image_height: scalar("image_height", g.image_height)?,
            focal_length: scalar("focal_length", self.focal_length)?,
            viewport_height: scalar("viewport_height", self.viewport_height)?,
            viewport_width: scalar("viewport_width", g.viewport_width)?,
            viewport_u: vector("viewport_u", &g.viewport_u)?,
            viewport_v: vector("viewport_v", &g.viewport_v)?,
            viewport_upper_left: vector(
                "viewport_upper_left",
                &g.viewport_upper_left,
            )?,
            camera_center: vector("camera_center", &self.camera_center)?,
            pixel_delta_u: vector("pixel_delta_u", &g.pixel_delta_u)?,
            pixel_delta_v: vector("pixel_delta_v", &g.pixel_delta_v)?,
            pixel_00_loc: vector("pixel_00_loc", &g.pixel_00_loc)?,
        })
    }

    /// Computes the ray direction for a pixel in floating point
    ///
    /// This is the exact value that the fixed-point pipeline approximates.
    pub fn reference_direction(&self, x: u32, y: u32) -> Vector3<f64> {
        let g = self.geometry();
        g.pixel_00_loc
            + f64::from(x) * g.pixel_delta_u
            + f64::from(y) * g.pixel_delta_v
            - self.camera_center
    }
}

fn scalar(field: &'static str, value: f64) -> Result<Fixed, Error> {
    match Fixed::from_f64(value) {
        (v, false) => Ok(v),
        (_, true) => Err(Error::OutOfRange { field, value }),
    }
}

fn vector(field: &'static str, v: &Vector3<f64>) -> Result<Vec3, Error> {
    Ok(Vec3::new(
        scalar(field, v.x)?,
        scalar(field, v.y)?,
        scalar(field, v.z)?,
    ))
}
