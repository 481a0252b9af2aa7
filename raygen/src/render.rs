//! Untimed frame model
//!
//! [`render`] computes every [`RaySample`] of a frame directly, without the
//! controller or pipeline timing.  The cycle-level model must produce exactly
//! the same samples, in the same order.
use crate::{
    camera::CameraConfig,
    fixed::vec3::Component,
    raygen::{Issue, PixelCoordinate, RaySample, ray_sample},
};

/// Thread pool to use for multithreaded rendering
///
/// Most users will use the global Rayon pool, but it's possible to provide your
/// own as well.
#[cfg(feature = "rayon")]
pub enum ThreadPool {
    /// User-provided pool
    Custom(rayon::ThreadPool),
    /// Global Rayon pool
    Global,
}

#[cfg(feature = "rayon")]
impl ThreadPool {
    /// Runs a function across the thread pool
    pub fn run<F: FnOnce() -> V + Send, V: Send>(&self, f: F) -> V {
        match self {
            ThreadPool::Custom(p) => p.install(f),
            ThreadPool::Global => f(),
        }
    }

    /// Returns the number of threads in the pool
    pub fn thread_count(&self) -> usize {
        match self {
            ThreadPool::Custom(p) => p.current_num_threads(),
            ThreadPool::Global => rayon::current_num_threads(),
        }
    }
}

/// Settings for the untimed frame model
pub struct RenderConfig<'a> {
    /// Thread pool; `None` renders on the calling thread
    #[cfg(feature = "rayon")]
    pub threads: Option<&'a ThreadPool>,
    #[cfg(not(feature = "rayon"))]
    #[doc(hidden)]
    pub _marker: std::marker::PhantomData<&'a ()>,
}

impl Default for RenderConfig<'_> {
    fn default() -> Self {
        Self {
            #[cfg(feature = "rayon")]
            threads: Some(&ThreadPool::Global),
            #[cfg(not(feature = "rayon"))]
            _marker: std::marker::PhantomData,
        }
    }
}

impl RenderConfig<'_> {
    /// Computes every sample of a frame, in row-major order
    pub fn run(&self, camera: &CameraConfig) -> Vec<RaySample> {
        let width = camera.width();
        let height = camera.height();
        let row = |y: u32| -> Vec<RaySample> {
            (0..width)
                .map(|x| {
                    let issue = Issue {
                        coord: PixelCoordinate::new(x, y),
                        is_last: x + 1 == width && y + 1 == height,
                    };
                    ray_sample(camera, issue)
                })
                .collect()
        };

        #[cfg(feature = "rayon")]
        if let Some(pool) = self.threads {
            use rayon::prelude::*;
            let rows: Vec<Vec<RaySample>> =
                pool.run(|| (0..height).into_par_iter().map(row).collect());
            return rows.concat();
        }

        (0..height).flat_map(row).collect()
    }
}

/// Computes every sample of a frame with the default settings
pub fn render(camera: &CameraConfig) -> Vec<RaySample> {
    RenderConfig::default().run(camera)
}

/// Computes the output word stream of a frame
///
/// This is the selected direction component of each sample, as sent on the
/// coprocessor's output channel.
pub fn render_words(camera: &CameraConfig, component: Component) -> Vec<u32> {
    render(camera)
        .iter()
        .map(|s| s.direction.get(component).to_word())
        .collect()
}
