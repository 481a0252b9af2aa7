//! Camera configuration, as streamed into the ray generator
//!
//! A [`CameraConfig`] is a fixed-layout record of Q16.16 words, built once per
//! frame (usually by [`CameraSettings::build`]) and never modified afterwards.
//! It can be serialized in several layouts, selected by [`CameraLayout`].
use crate::{
    Error,
    fixed::{Fixed, Vec3, vec3},
};
use static_assertions::{assert_eq_size, const_assert_eq};

mod settings;
pub use settings::CameraSettings;

/// Number of scalar fields in a configuration
const SCALAR_FIELDS: usize = 6;

/// Number of words in the [`CameraLayout::Full`] layout
pub const FULL_WORDS: usize = 27;

/// Number of words in the [`CameraLayout::Coprocessor`] layout
pub const COPROCESSOR_WORDS: usize = 27;

/// Number of words in the [`CameraLayout::Compact`] layout
pub const COMPACT_WORDS: usize = 18;

const_assert_eq!(FULL_WORDS, SCALAR_FIELDS + 7 * 3);
const_assert_eq!(COPROCESSOR_WORDS, FULL_WORDS);
const_assert_eq!(COMPACT_WORDS, SCALAR_FIELDS + 4 * 3);
assert_eq_size!(CameraConfig, [u32; FULL_WORDS]);

/// Serialized layout of a [`CameraConfig`]
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
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum CameraLayout {
    /// Every field, in declaration order (canonical)
    #[default]
    Full,
    /// Every field, with the camera center moved ahead of the viewport vectors
    ///
    /// This is the order expected by the streaming coprocessor hardware.
    Coprocessor,
    /// Scalars, camera center, pixel deltas, and the first pixel location
    ///
    /// This is a host-side extra which the hardware never emits; the viewport
    /// vectors are re-derived when decoding.
    Compact,
}

impl CameraLayout {
    /// Number of 32-bit words in this layout
    pub const fn word_count(&self) -> usize {
        match self {
            CameraLayout::Full => FULL_WORDS,
            CameraLayout::Coprocessor => COPROCESSOR_WORDS,
            CameraLayout::Compact => COMPACT_WORDS,
        }
    }
}

/// Camera configuration for a single frame
///
/// Fields are listed in serialization order.  `image_width` and
/// `image_height` are pixel counts stored as Q16.16 values; use
/// [`width`](Self::width) and [`height`](Self::height) to get the integers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraConfig {
    /// Image aspect ratio (width / height)
    pub aspect_ratio: Fixed,
    /// Image width, in pixels
    pub image_width: Fixed,
    /// Image height, in pixels
    pub image_height: Fixed,
    /// Distance from the camera center to the viewport
    pub focal_length: Fixed,
    /// Viewport height, in world units
    pub viewport_height: Fixed,
    /// Viewport width, in world units
    pub viewport_width: Fixed,
    /// Vector across the horizontal viewport edge
    pub viewport_u: Vec3,
    /// Vector down the vertical viewport edge
    pub viewport_v: Vec3,
    /// Location of the viewport's upper left corner
    pub viewport_upper_left: Vec3,
    /// Ray origin for every pixel
    pub camera_center: Vec3,
    /// Offset between horizontally adjacent pixels
    pub pixel_delta_u: Vec3,
    /// Offset between vertically adjacent pixels
    pub pixel_delta_v: Vec3,
    /// Center of the upper left pixel
    pub pixel_00_loc: Vec3,
}

impl CameraConfig {
    /// Image width, in pixels
    pub fn width(&self) -> u32 {
        self.image_width.trunc().max(0) as u32
    }

    /// Image height, in pixels
    pub fn height(&self) -> u32 {
        self.image_height.trunc().max(0) as u32
    }

    /// Total number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    fn scalars(&self) -> [Fixed; SCALAR_FIELDS] {
        [
            self.aspect_ratio,
            self.image_width,
            self.image_height,
            self.focal_length,
            self.viewport_height,
            self.viewport_width,
        ]
    }

    /// Serializes to stream words
    pub fn to_words(&self, layout: CameraLayout) -> Vec<u32> {
        let vecs: &[Vec3] = match layout {
            CameraLayout::Full => &[
                self.viewport_u,
                self.viewport_v,
                self.viewport_upper_left,
                self.camera_center,
                self.pixel_delta_u,
                self.pixel_delta_v,
                self.pixel_00_loc,
            ],
            CameraLayout::Coprocessor => &[
                self.camera_center,
                self.viewport_u,
                self.viewport_v,
                self.viewport_upper_left,
                self.pixel_delta_u,
                self.pixel_delta_v,
                self.pixel_00_loc,
            ],
            CameraLayout::Compact => &[
                self.camera_center,
                self.pixel_delta_u,
                self.pixel_delta_v,
                self.pixel_00_loc,
            ],
        };
        let out: Vec<u32> = self
            .scalars()
            .into_iter()
            .chain(vecs.iter().flat_map(|v| v.to_array()))
            .map(Fixed::to_word)
            .collect();
        debug_assert_eq!(out.len(), layout.word_count());
        out
    }

    /// Decodes a configuration from stream words
    ///
    /// `words` must contain exactly `layout.word_count()` words.  For the
    /// compact layout, the viewport vectors are recomputed from the pixel
    /// deltas and first pixel location:
    ///
    /// - `viewport_u = pixel_delta_u · image_width`
    /// - `viewport_v = pixel_delta_v · image_height`
    /// - `viewport_upper_left = pixel_00_loc − (pixel_delta_u +
    ///   pixel_delta_v) / 2`
    ///
    /// Because of truncation, these may differ from the original values by a
    /// few units in the last place.
    pub fn from_words(
        layout: CameraLayout,
        words: &[u32],
    ) -> Result<Self, Error> {
        if words.len() != layout.word_count() {
            return Err(Error::BadWordCount {
                expected: layout.word_count(),
                actual: words.len(),
            });
        }
        let mut iter = words.iter().map(|w| Fixed::from_word(*w));
        let mut scalar = || iter.next().unwrap_or_default();
        let aspect_ratio = scalar();
        let image_width = scalar();
        let image_height = scalar();
        let focal_length = scalar();
        let viewport_height = scalar();
        let viewport_width = scalar();
        let mut vector = || Vec3::new(scalar(), scalar(), scalar());

        let out = match layout {
            CameraLayout::Full => {
                let viewport_u = vector();
                let viewport_v = vector();
                let viewport_upper_left = vector();
                Self {
                    aspect_ratio,
                    image_width,
                    image_height,
                    focal_length,
                    viewport_height,
                    viewport_width,
                    viewport_u,
                    viewport_v,
                    viewport_upper_left,
                    camera_center: vector(),
                    pixel_delta_u: vector(),
                    pixel_delta_v: vector(),
                    pixel_00_loc: vector(),
                }
            }
            CameraLayout::Coprocessor => {
                let camera_center = vector();
                Self {
                    aspect_ratio,
                    image_width,
                    image_height,
                    focal_length,
                    viewport_height,
                    viewport_width,
                    viewport_u: vector(),
                    viewport_v: vector(),
                    viewport_upper_left: vector(),
                    camera_center,
                    pixel_delta_u: vector(),
                    pixel_delta_v: vector(),
                    pixel_00_loc: vector(),
                }
            }
            CameraLayout::Compact => {
                let camera_center = vector();
                let pixel_delta_u = vector();
                let pixel_delta_v = vector();
                let pixel_00_loc = vector();

                // Clipping here would mean the frame itself is out of range,
                // which the ray pipeline reports per sample.
                let (viewport_u, _) = vec3::scale(pixel_delta_u, image_width);
                let (viewport_v, _) = vec3::scale(pixel_delta_v, image_height);
                let (half, _) = vec3::add(pixel_delta_u, pixel_delta_v);
                let (half, _) = vec3::scale(half, Fixed::HALF);
                let (viewport_upper_left, _) = vec3::sub(pixel_00_loc, half);
                Self {
                    aspect_ratio,
                    image_width,
                    image_height,
                    focal_length,
                    viewport_height,
                    viewport_width,
                    viewport_u,
                    viewport_v,
                    viewport_upper_left,
                    camera_center,
                    pixel_delta_u,
                    pixel_delta_v,
                    pixel_00_loc,
                }
            }
        };
        Ok(out)
    }
}
