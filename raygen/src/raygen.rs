//! Per-pixel ray generation
//!
//! [`ray_direction`] is the untimed computation; [`RayPipeline`] splits the
//! same computation across [`RAYGEN_LATENCY`] registered stages, so that one
//! coordinate can enter (and one sample can leave) on every step.
use crate::{
    camera::CameraConfig,
    fixed::{Fixed, Vec3, vec3},
};

/// Number of pipeline stages between a coordinate and its ray sample
pub const RAYGEN_LATENCY: usize = 4;

/// Position of a pixel within the image
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelCoordinate {
    /// Column, starting from the left edge
    pub x: u32,
    /// Row, starting from the top edge
    pub y: u32,
}

impl PixelCoordinate {
    /// Builds a new coordinate
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A coordinate issued into the ray pipeline
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    /// Pixel position
    pub coord: PixelCoordinate,
    /// Set for the final coordinate of the frame
    pub is_last: bool,
}

/// A generated ray
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RaySample {
    /// Ray origin, which is always the camera center
    pub origin: Vec3,
    /// Unnormalized ray direction
    pub direction: Vec3,
    /// Set for the final sample of the frame
    pub is_last: bool,
    /// Set if any arithmetic saturated while computing the direction
    pub clipped: bool,
}

/// Converts a pixel index to a fixed-point value
fn index(i: u32) -> (Fixed, bool) {
    Fixed::from_int(i64::from(i))
}

/// Computes the direction of the ray through a pixel center
///
/// This is `pixel_00_loc + x · pixel_delta_u + y · pixel_delta_v −
/// camera_center`, evaluated with saturating fixed-point arithmetic.  The
/// returned flag is set if any operation clipped.
pub fn ray_direction(config: &CameraConfig, x: u32, y: u32) -> (Vec3, bool) {
    let coord = PixelCoordinate::new(x, y);
    let mut p = Partial::issued(
        config,
        Issue {
            coord,
            is_last: false,
        },
    );
    p.accumulate(config);
    p.offset_row();
    p.recenter(config);
    (p.sum, p.clipped)
}

/// Computes the full ray sample for an issued coordinate
pub fn ray_sample(config: &CameraConfig, issue: Issue) -> RaySample {
    let (direction, clipped) =
        ray_direction(config, issue.coord.x, issue.coord.y);
    RaySample {
        origin: config.camera_center,
        direction,
        is_last: issue.is_last,
        clipped,
    }
}

/// Partial result carried between pipeline stages
#[derive(Copy, Clone, Debug)]
struct Partial {
    issue: Issue,
    sum: Vec3,
    row: Vec3,
    clipped: bool,
}

impl Partial {
    /// First stage: scales both pixel deltas
    fn issued(config: &CameraConfig, issue: Issue) -> Self {
        let (fx, c0) = index(issue.coord.x);
        let (fy, c1) = index(issue.coord.y);
        let (sum, c2) = vec3::scale(config.pixel_delta_u, fx);
        let (row, c3) = vec3::scale(config.pixel_delta_v, fy);
        Self {
            issue,
            sum,
            row,
            clipped: c0 | c1 | c2 | c3,
        }
    }

    /// Second stage: offsets the column from the first pixel
    fn accumulate(&mut self, config: &CameraConfig) {
        let (sum, c) = vec3::add(config.pixel_00_loc, self.sum);
        self.sum = sum;
        self.clipped |= c;
    }

    /// Third stage: adds the row offset
    fn offset_row(&mut self) {
        let (sum, c) = vec3::add(self.sum, self.row);
        self.sum = sum;
        self.clipped |= c;
    }

    /// Fourth stage: makes the position relative to the camera
    fn recenter(&mut self, config: &CameraConfig) {
        let (sum, c) = vec3::sub(self.sum, config.camera_center);
        self.sum = sum;
        self.clipped |= c;
    }

    fn sample(&self, config: &CameraConfig) -> RaySample {
        RaySample {
            origin: config.camera_center,
            direction: self.sum,
            is_last: self.issue.is_last,
            clipped: self.clipped,
        }
    }
}

/// Fixed-latency ray generation pipeline
///
/// Each call to [`step`](Self::step) shifts every stage forward by one; the
/// configuration must not change while samples are in flight.  A coordinate
/// issued on step `n` is presented at the tail after step
/// `n + RAYGEN_LATENCY - 1`, and leaves the pipeline on the following step.
#[derive(Clone, Debug, Default)]
pub struct RayPipeline {
    /// `stages[i]` holds an entry which has completed stage `i`
    stages: [Option<Partial>; RAYGEN_LATENCY],
}

impl RayPipeline {
    /// Builds an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sample presented at the tail, if any
    pub fn tail(&self, config: &CameraConfig) -> Option<RaySample> {
        self.stages[RAYGEN_LATENCY - 1].map(|p| p.sample(config))
    }

    /// Shifts the pipeline by one stage
    ///
    /// Returns the sample which was presented at the tail before the shift.
    pub fn step(
        &mut self,
        config: &CameraConfig,
        issue: Option<Issue>,
    ) -> Option<RaySample> {
        let out = self.tail(config);
        let [s0, s1, s2, s3] = &mut self.stages;
        *s3 = s2.take().map(|mut p| {
            p.recenter(config);
            p
        });
        *s2 = s1.take().map(|mut p| {
            p.offset_row();
            p
        });
        *s1 = s0.take().map(|mut p| {
            p.accumulate(config);
            p
        });
        *s0 = issue.map(|i| Partial::issued(config, i));
        out
    }

    /// Returns the number of samples in flight
    pub fn in_flight(&self) -> usize {
        self.stages.iter().filter(|s| s.is_some()).count()
    }

    /// Checks whether the pipeline is empty
    pub fn is_empty(&self) -> bool {
        self.in_flight() == 0
    }

    /// Discards every in-flight sample
    pub fn reset(&mut self) {
        self.stages = Default::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::camera::CameraSettings;

    fn config() -> CameraConfig {
        CameraSettings {
            image_width: 10,
            ..Default::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn test_first_pixel() {
        let c = config();
        let (d, clipped) = ray_direction(&c, 0, 0);
        assert!(!clipped);
        assert_eq!(d, c.pixel_00_loc);
        assert!((d.y.to_f64() - 0.8).abs() < 0.0005);
    }

    #[test]
    fn test_against_reference() {
        let s = CameraSettings {
            image_width: 10,
            ..Default::default()
        };
        let c = s.build().unwrap();
        for y in 0..c.height() {
            for x in 0..c.width() {
                let (d, clipped) = ray_direction(&c, x, y);
                assert!(!clipped);
                let err = (d.to_vector() - s.reference_direction(x, y)).amax();
                assert!(err < 1e-3, "bad direction at ({x}, {y}): {err}");
            }
        }
    }

    #[test]
    fn test_origin() {
        let s = CameraSettings {
            image_width: 10,
            camera_center: nalgebra::Vector3::new(1.0, -2.0, 0.5),
            ..Default::default()
        };
        let c = s.build().unwrap();
        let issue = Issue {
            coord: PixelCoordinate::new(3, 2),
            is_last: true,
        };
        let sample = ray_sample(&c, issue);
        assert_eq!(sample.origin, c.camera_center);
        assert!(sample.is_last);
        assert!(!sample.clipped);
        let err = (sample.direction.to_vector() - s.reference_direction(3, 2))
            .amax();
        assert!(err < 1e-3);
    }

    #[test]
    fn test_clipped() {
        let mut c = config();
        c.pixel_delta_u = Vec3::new(Fixed::from(100), Fixed::ZERO, Fixed::ZERO);
        let (d, clipped) = ray_direction(&c, 400, 0);
        assert!(clipped);
        assert!(d.x > Fixed::from(32000));
    }

    #[test]
    fn test_pipeline() {
        let c = config();
        let mut pipe = RayPipeline::new();
        let issues: Vec<Issue> = (0..3)
            .map(|x| Issue {
                coord: PixelCoordinate::new(x, 1),
                is_last: x == 2,
            })
            .collect();

        let mut out = vec![];
        for step in 0..(issues.len() + RAYGEN_LATENCY) {
            if let Some(s) = pipe.step(&c, issues.get(step).copied()) {
                out.push((step, s));
            }
        }
        assert!(pipe.is_empty());
        assert_eq!(out.len(), 3);
        for (i, (step, sample)) in out.into_iter().enumerate() {
            assert_eq!(step, i + RAYGEN_LATENCY);
            assert_eq!(sample, ray_sample(&c, issues[i]));
        }
    }

    #[test]
    fn test_pipeline_tail() {
        let c = config();
        let mut pipe = RayPipeline::new();
        let issue = Issue {
            coord: PixelCoordinate::new(0, 0),
            is_last: false,
        };
        pipe.step(&c, Some(issue));
        for _ in 1..RAYGEN_LATENCY {
            assert_eq!(pipe.tail(&c), None);
            assert_eq!(pipe.in_flight(), 1);
            assert_eq!(pipe.step(&c, None), None);
        }
        assert_eq!(pipe.tail(&c), Some(ray_sample(&c, issue)));

        pipe.reset();
        assert!(pipe.is_empty());
        assert_eq!(pipe.tail(&c), None);
    }
}
