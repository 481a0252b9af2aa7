use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Result, ensure};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use strum::IntoEnumIterator;

use raygen::{
    CameraConfig, CameraLayout, CameraSettings, Component, Coprocessor,
    CoprocessorConfig, Fixed,
    render::render_words,
    rsqrt::rsqrt_batch,
    stream::{Consumer, Monitor, Producer},
};

/// Driver for the ray generation coprocessor model
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Streams a frame through the coprocessor and checks the result
    Stream {
        #[clap(flatten)]
        scene: SceneSettings,

        #[clap(flatten)]
        settings: StreamSettings,
    },

    /// Sweeps the reciprocal square root engine and reports its error
    Rsqrt {
        #[clap(flatten)]
        settings: RsqrtSettings,
    },

    /// Prints the serialized configuration words for a scene
    Config {
        #[clap(flatten)]
        scene: SceneSettings,

        /// Word layout (full, coprocessor, compact)
        #[clap(
            short,
            long,
            value_parser = CameraLayout::from_str,
            default_value_t = CameraLayout::Full
        )]
        layout: CameraLayout,
    },
}

#[derive(Parser)]
struct SceneSettings {
    /// JSON file with camera settings (overridden by other flags)
    #[clap(long)]
    scene: Option<PathBuf>,

    /// Image width, in pixels
    #[clap(short, long)]
    width: Option<u32>,

    /// Aspect ratio (width / height)
    #[clap(short, long)]
    aspect: Option<f64>,

    /// Focal length
    #[clap(short, long)]
    focal: Option<f64>,

    /// Viewport height
    #[clap(long)]
    viewport_height: Option<f64>,
}

impl SceneSettings {
    fn build(&self) -> Result<CameraConfig> {
        let mut settings = match &self.scene {
            Some(path) => {
                let file = std::fs::File::open(path)?;
                serde_json::from_reader(std::io::BufReader::new(file))?
            }
            None => CameraSettings::default(),
        };
        if let Some(w) = self.width {
            settings.image_width = w;
        }
        if let Some(a) = self.aspect {
            settings.aspect_ratio = a;
        }
        if let Some(f) = self.focal {
            settings.focal_length = f;
        }
        if let Some(h) = self.viewport_height {
            settings.viewport_height = h;
        }
        info!(
            "Building {}×{} scene",
            settings.image_width,
            settings.image_height()
        );
        Ok(settings.build()?)
    }
}

#[derive(Parser)]
struct StreamSettings {
    /// Probability that either side of a channel stalls on a given step
    #[clap(short, long, default_value_t = 0.0)]
    stall: f64,

    /// Seed for the stall pattern
    #[clap(long, default_value_t = 0)]
    seed: u64,

    /// Configuration word layout (full, coprocessor, compact)
    #[clap(
        short,
        long,
        value_parser = CameraLayout::from_str,
        default_value_t = CameraLayout::Full
    )]
    layout: CameraLayout,

    /// Direction component carried by each output word
    #[clap(
        short,
        long,
        value_parser = Component::from_str,
        default_value_t = Component::Y
    )]
    component: Component,

    /// Number of frames to stream (for benchmarking)
    #[clap(short = 'N', default_value_t = 1)]
    n: usize,

    /// Print every output word
    #[clap(short, long)]
    print: bool,
}

#[derive(Parser)]
struct RsqrtSettings {
    /// Smallest input value
    #[clap(long, default_value_t = 1.0)]
    min: f64,

    /// Largest input value
    #[clap(long, default_value_t = 32767.0)]
    max: f64,

    /// Number of inputs, spaced logarithmically
    #[clap(short, long, default_value_t = 4096)]
    count: usize,

    /// Largest number of refinement passes to test
    #[clap(short, long, default_value_t = 6)]
    iterations: usize,
}

////////////////////////////////////////////////////////////////////////////////

/// Result of streaming frames through the coprocessor
struct StreamStats {
    words: Vec<u32>,
    frames: usize,
    steps: usize,
    violations: usize,
}

fn run_stream(
    config: &CameraConfig,
    settings: &StreamSettings,
) -> Result<StreamStats> {
    ensure!(
        (0.0..1.0).contains(&settings.stall),
        "stall probability must be in [0, 1)"
    );
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut cop = Coprocessor::new(CoprocessorConfig {
        layout: settings.layout,
        component: settings.component,
    });

    let mut words = config.to_words(cop.config().layout);
    for _ in 1..settings.n {
        words.extend(config.to_words(cop.config().layout));
    }
    let mut producer = Producer::with_marker(words, None);
    let mut consumer = Consumer::new();
    let mut input = Monitor::new();
    let mut output = Monitor::new();

    // Each frame is configured separately, so the end marker goes on the
    // final word of every configuration.
    let per_frame = cop.config().layout.word_count();
    let mut steps = 0;
    while cop.frames() < settings.n {
        let offer = !rng.gen_bool(settings.stall);
        let m_ready = !rng.gen_bool(settings.stall);

        let s_valid = producer.valid().map(|mut b| {
            b.last = (producer.sent() + 1) % per_frame == 0;
            b
        });
        let s_ready = cop.s_ready();
        input.observe(s_valid, s_ready);
        output.observe(cop.m_valid(), m_ready);

        let out = cop.step(s_valid, m_ready);
        producer.step(s_ready, offer);
        consumer.accept_all(out.emitted);
        steps += 1;
    }
    ensure!(
        consumer.transfers() == settings.n,
        "expected {} end markers, got {}",
        settings.n,
        consumer.transfers()
    );
    Ok(StreamStats {
        words: consumer.words().to_vec(),
        frames: cop.frames(),
        steps,
        violations: input.violations() + output.violations(),
    })
}

fn run_rsqrt(settings: &RsqrtSettings) -> Result<()> {
    ensure!(
        settings.min > 0.0 && settings.min < settings.max,
        "invalid range [{}, {}]",
        settings.min,
        settings.max
    );
    let ratio = settings.max / settings.min;
    let div = settings.count.saturating_sub(1).max(1) as f64;
    let mut xs = vec![];
    for i in 0..settings.count {
        let (x, clipped) =
            Fixed::from_f64(settings.min * ratio.powf(i as f64 / div));
        if clipped {
            warn!("input {i} clipped to {x}");
        }
        if x.is_positive() {
            xs.push(x);
        }
    }

    for iterations in 1..=settings.iterations {
        let start = Instant::now();
        let out = rsqrt_batch(&xs, iterations)?;
        let elapsed = start.elapsed();

        let mut rsqrt_err: f64 = 0.0;
        let mut sqrt_err: f64 = 0.0;
        let mut clipped = 0;
        for (x, r) in xs.iter().zip(&out) {
            let x = x.to_f64();
            let root = x.sqrt();
            rsqrt_err = rsqrt_err.max((r.rsqrt.to_f64() - root.recip()).abs());
            sqrt_err = sqrt_err.max((r.sqrt.to_f64() - root).abs());
            clipped += r.clipped as usize;
        }
        println!(
            "{iterations} pass(es): 1/√x error {rsqrt_err:.3e}, \
             √x error {sqrt_err:.3e}, {clipped} clipped"
        );
        info!("{} values in {elapsed:?}", xs.len());
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let args = Args::parse();
    match args.cmd {
        Command::Stream { scene, settings } => {
            let config = scene.build()?;
            let start = Instant::now();
            let stats = run_stream(&config, &settings)?;
            info!(
                "Streamed {} frame(s) in {} steps ({:?})",
                stats.frames,
                stats.steps,
                start.elapsed()
            );

            let expected = render_words(&config, settings.component);
            for (i, frame) in stats.words.chunks(expected.len()).enumerate() {
                ensure!(frame == expected, "frame {i} does not match");
            }
            ensure!(stats.violations == 0, "handshake violations seen");
            info!(
                "{} words ({} per frame), all matching the untimed model",
                stats.words.len(),
                expected.len()
            );

            if settings.print {
                for (i, w) in stats.words.iter().enumerate() {
                    println!("{i:>8} {w:#010x} {}", Fixed::from_word(*w));
                }
            }
        }
        Command::Rsqrt { settings } => run_rsqrt(&settings)?,
        Command::Config { scene, layout } => {
            let config = scene.build()?;
            info!("{layout} layout, {} words", layout.word_count());
            for w in config.to_words(layout) {
                println!("{w:#010x} {}", Fixed::from_word(w));
            }
            for c in Component::iter() {
                let d =
                    config.pixel_00_loc.get(c) - config.camera_center.get(c);
                info!("first ray {c}: {d}");
            }
        }
    }
    Ok(())
}
