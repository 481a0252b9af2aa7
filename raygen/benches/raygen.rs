use criterion::{
    BenchmarkId, Criterion, black_box, criterion_group, criterion_main,
};
use raygen::{
    CameraConfig, CameraLayout, CameraSettings, Coprocessor, Fixed, render,
    rsqrt::rsqrt_batch, stream::Producer,
};

fn camera(image_width: u32) -> CameraConfig {
    CameraSettings {
        image_width,
        ..Default::default()
    }
    .build()
    .unwrap()
}

/// Streams one frame through the coprocessor, returning the word count
fn stream_frame(config: &CameraConfig) -> usize {
    let mut cop = Coprocessor::default();
    let mut producer = Producer::new(config.to_words(CameraLayout::Full));
    let mut words = 0;
    while cop.frames() == 0 {
        let ready = cop.s_ready();
        let out = cop.step(producer.valid(), true);
        producer.step(ready, true);
        words += out.emitted.is_some() as usize;
    }
    words
}

pub fn frame_size_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame size");
    for width in [64, 128, 256] {
        let config = &camera(width);
        group.bench_function(BenchmarkId::new("coprocessor", width), |b| {
            b.iter(|| black_box(stream_frame(config)))
        });
        group.bench_function(BenchmarkId::new("render", width), |b| {
            b.iter(|| black_box(render::render(config)))
        });
    }
}

pub fn render_thread_sweep(c: &mut Criterion) {
    let config = &camera(1024);
    let mut group = c.benchmark_group("render vs threads (1024 x 576)");
    for threads in [1, 2, 4, 8] {
        let pool = render::ThreadPool::Custom(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        );
        group.bench_function(BenchmarkId::new("render", threads), |b| {
            let cfg = render::RenderConfig {
                threads: Some(&pool),
            };
            b.iter(|| black_box(cfg.run(config)))
        });
    }
}

pub fn rsqrt_sweep(c: &mut Criterion) {
    let xs: Vec<Fixed> = (1..=4096).map(|i| Fixed::from_bits(i * 509)).collect();
    let mut group = c.benchmark_group("rsqrt batch (4096 values)");
    for iterations in [1, 3, 4] {
        group.bench_function(BenchmarkId::new("passes", iterations), |b| {
            b.iter(|| black_box(rsqrt_batch(&xs, iterations).unwrap()))
        });
    }
}

criterion_group!(benches, frame_size_sweep, render_thread_sweep, rsqrt_sweep);
criterion_main!(benches);
