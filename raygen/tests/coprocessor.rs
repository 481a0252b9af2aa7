//! Integration tests for the streaming coprocessor
use raygen::{
    CameraConfig, CameraLayout, CameraSettings, Component, Coprocessor,
    CoprocessorConfig, Fixed,
    coprocessor::Phase,
    render,
    stream::{Consumer, Monitor, Producer},
};

use rand::{Rng, SeedableRng, rngs::StdRng};

fn camera(image_width: u32, aspect_ratio: f64) -> CameraConfig {
    CameraSettings {
        image_width,
        aspect_ratio,
        ..Default::default()
    }
    .build()
    .unwrap()
}

/// Record of a single frame run
struct Run {
    words: Vec<u32>,
    ends: Vec<usize>,
    /// Step on which the final configuration word was accepted
    configured: usize,
    /// Step on which the first ray word was emitted
    first: usize,
    /// Step on which the frame finished
    done: usize,
}

/// Runs one frame, with each side of both channels stalling at random
///
/// `stall` is the probability that the host holds off on a given step; zero
/// gives a free-running channel.
fn run(
    cop: &mut Coprocessor,
    config: &CameraConfig,
    stall: f64,
    seed: u64,
) -> Run {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut producer = Producer::new(config.to_words(cop.config().layout));
    let mut consumer = Consumer::new();
    let mut input = Monitor::new();
    let mut output = Monitor::new();

    let mut configured = None;
    let mut first = None;
    let mut done = None;
    for i in 0..1_000_000 {
        let offer = !rng.gen_bool(stall);
        let m_ready = !rng.gen_bool(stall);

        let s_valid = producer.valid();
        let s_ready = cop.s_ready();
        input.observe(s_valid, s_ready);
        output.observe(cop.m_valid(), m_ready);

        let out = cop.step(s_valid, m_ready);
        producer.step(s_ready, offer);

        if out.accepted.is_some() && producer.is_done() {
            configured.get_or_insert(i);
        }
        if let Some(b) = out.emitted {
            first.get_or_insert(i);
            consumer.accept(b);
        }
        if out.frame_done {
            done = Some(i);
            break;
        }
    }
    assert_eq!(input.violations(), 0, "input channel violations");
    assert_eq!(output.violations(), 0, "output channel violations");
    Run {
        words: consumer.words().to_vec(),
        ends: consumer.ends().to_vec(),
        configured: configured.unwrap(),
        first: first.unwrap(),
        done: done.unwrap(),
    }
}

#[test]
fn test_completeness() {
    let c = camera(16, 2.0);
    let mut cop = Coprocessor::default();
    let r = run(&mut cop, &c, 0.0, 0);
    assert_eq!(r.words.len(), 16 * 8);
    assert_eq!(r.ends, vec![16 * 8]);
    assert_eq!(r.words, render::render_words(&c, Component::Y));
    assert_eq!(cop.phase(), Phase::Receive);
    assert_eq!(cop.frames(), 1);
}

#[test]
fn test_timing() {
    let c = camera(10, 16.0 / 9.0);
    let n = c.pixel_count();
    let mut cop = Coprocessor::default();
    let r = run(&mut cop, &c, 0.0, 0);

    // One step to enter Ready, then four pipeline stages
    assert_eq!(r.first - r.configured, 5);

    // One word per step, with the last word on the frame_done step
    assert_eq!(r.done - r.first + 1, n);
}

#[test]
fn test_stall_transparency() {
    let c = camera(12, 1.5);
    let expected = render::render_words(&c, Component::Y);
    for (i, stall) in [0.1, 0.5, 0.9].into_iter().enumerate() {
        let mut cop = Coprocessor::default();
        let r = run(&mut cop, &c, stall, i as u64);
        assert_eq!(r.words, expected, "mismatch with stall = {stall}");
        assert_eq!(r.ends, vec![expected.len()]);
        assert!(r.done - r.first + 1 >= expected.len());
    }
}

#[test]
fn test_determinism() {
    let c = camera(9, 1.0);
    let mut a = Coprocessor::default();
    let mut b = Coprocessor::default();
    let ra = run(&mut a, &c, 0.3, 1234);
    let rb = run(&mut b, &c, 0.3, 1234);
    assert_eq!(ra.words, rb.words);
    assert_eq!(ra.configured, rb.configured);
    assert_eq!(ra.first, rb.first);
    assert_eq!(ra.done, rb.done);

    // A second frame on the same coprocessor gives the same words
    let rc = run(&mut a, &c, 0.3, 5678);
    assert_eq!(rc.words, ra.words);
    assert_eq!(a.frames(), 2);
}

#[test]
fn test_scenario() {
    let c = camera(10, 16.0 / 9.0);
    assert_eq!(c.height(), 5);
    let mut cop = Coprocessor::default();
    let r = run(&mut cop, &c, 0.25, 42);
    assert_eq!(r.words.len(), 50);
    let y = Fixed::from_word(r.words[0]).to_f64();
    assert!((y - 0.8).abs() < 0.0005, "bad first direction: {y}");

    // Direction y decreases row by row, and is constant along a row
    for row in r.words.chunks(10) {
        assert!(row.iter().all(|w| *w == row[0]));
    }
    let rows: Vec<f64> = r
        .words
        .chunks(10)
        .map(|row| Fixed::from_word(row[0]).to_f64())
        .collect();
    assert!(rows.windows(2).all(|w| w[1] < w[0]));
}

#[test]
fn test_compact_layout() {
    let c = camera(20, 16.0 / 9.0);
    for component in [Component::X, Component::Y, Component::Z] {
        let mut cop = Coprocessor::new(CoprocessorConfig {
            layout: CameraLayout::Compact,
            component,
        });
        let r = run(&mut cop, &c, 0.2, 7);
        assert_eq!(r.words, render::render_words(&c, component));
    }
}

#[test]
fn test_coprocessor_layout() {
    // Words in the hardware's struct order: scalars, camera center, then the
    // viewport vectors, pixel deltas, and first pixel location
    let c = camera(10, 16.0 / 9.0);
    let full = c.to_words(CameraLayout::Full);
    let words: Vec<u32> =
        [&full[0..6], &full[15..18], &full[6..15], &full[18..]].concat();
    assert_eq!(words, c.to_words(CameraLayout::Coprocessor));

    let mut cop = Coprocessor::new(CoprocessorConfig {
        layout: CameraLayout::Coprocessor,
        ..Default::default()
    });
    let mut producer = Producer::new(words);
    let mut consumer = Consumer::new();
    while cop.frames() == 0 {
        let ready = cop.s_ready();
        let out = cop.step(producer.valid(), true);
        producer.step(ready, true);
        consumer.accept_all(out.emitted);
    }
    assert_eq!(consumer.words(), render::render_words(&c, Component::Y));
    let y = Fixed::from_word(consumer.words()[0]).to_f64();
    assert!((y - 0.8).abs() < 0.0005, "bad first direction: {y}");
}

#[test]
fn test_single_pixel() {
    let c = camera(1, 1.0);
    assert_eq!(c.pixel_count(), 1);
    let mut cop = Coprocessor::default();
    let r = run(&mut cop, &c, 0.0, 0);
    assert_eq!(r.words.len(), 1);
    assert_eq!(r.ends, vec![1]);
    assert_eq!(r.first - r.configured, 5);
    assert_eq!(r.done, r.first);
}

#[test]
fn test_backpressure_holds_valid() {
    let c = camera(4, 2.0);
    let mut cop = Coprocessor::default();
    let mut producer = Producer::new(c.to_words(CameraLayout::Full));
    while cop.phase() == Phase::Receive {
        let ready = cop.s_ready();
        cop.step(producer.valid(), false);
        producer.step(ready, true);
    }

    // Run until the first word is presented
    while cop.m_valid().is_none() {
        assert_eq!(cop.step(None, true).emitted, None);
    }

    // With the output channel blocked, nothing is emitted and the presented
    // word never changes.
    let held = cop.m_valid();
    for _ in 0..32 {
        let out = cop.step(None, false);
        assert_eq!(out.emitted, None);
        assert!(!out.frame_done);
        assert_eq!(cop.m_valid(), held);
    }

    // Releasing the channel lets the frame finish
    let mut consumer = Consumer::new();
    while cop.frames() == 0 {
        consumer.accept_all(cop.step(None, true).emitted);
    }
    assert_eq!(consumer.words(), render::render_words(&c, Component::Y));
}
