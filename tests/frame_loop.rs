use quantum_viz_lib::audio::{
    AudioConfig, AudioHost, NullHost, SpectralFeatureExtractor, StreamHandle, SynthHost,
};
use quantum_viz_lib::engine::{ParticleEngine, SimulationConfig};
use quantum_viz_lib::error::AudioError;
use quantum_viz_lib::host::HeadlessHost;
use quantum_viz_lib::scheduler::{FrameOutcome, FrameScheduler, LoopState, SurfaceGeometry};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::Cell;
use std::rc::Rc;

/// Silent host that counts start/stop calls
struct TrackedHost {
    starts: Rc<Cell<usize>>,
    stops: Rc<Cell<usize>>,
}

impl AudioHost for TrackedHost {
    fn start_signal(&mut self) -> Result<StreamHandle, AudioError> {
        self.starts.set(self.starts.get() + 1);
        Ok(StreamHandle::new(7, 48000))
    }

    fn stop_signal(&mut self, _handle: StreamHandle) {
        self.stops.set(self.stops.get() + 1);
    }

    fn sample_spectrum(&mut self, _handle: StreamHandle, len: usize) -> Option<Vec<f32>> {
        Some(vec![0.0; len])
    }
}

fn extractor(host: impl AudioHost + 'static) -> SpectralFeatureExtractor {
    SpectralFeatureExtractor::new(Box::new(host), AudioConfig::default()).unwrap()
}

fn scheduler(width: f32, height: f32) -> FrameScheduler<HeadlessHost> {
    FrameScheduler::with_rng(HeadlessHost::new(width, height, 1.0), StdRng::seed_from_u64(42))
}

fn engine(config: SimulationConfig) -> ParticleEngine {
    ParticleEngine::new(config).unwrap()
}

#[test]
fn density_fifty_draws_thirty_five_particles() {
    let mut s = scheduler(800.0, 600.0);
    s.start_loop(engine(SimulationConfig::field_2d(50.0)), extractor(NullHost));

    assert_eq!(s.pump(0.0), vec![FrameOutcome::Drawn]);

    let frame = s.host().last_frame().unwrap();
    assert_eq!(frame.particles.len(), 35);
    assert_eq!(frame.amplitude, 0.0);
    assert_eq!(frame.dominant_frequency, 0.0);
}

#[test]
fn teardown_releases_stream_once_and_silences_callbacks() {
    let starts = Rc::new(Cell::new(0));
    let stops = Rc::new(Cell::new(0));
    let host = TrackedHost {
        starts: starts.clone(),
        stops: stops.clone(),
    };
    let mut s = scheduler(400.0, 300.0);
    let first = s.start_loop(engine(SimulationConfig::default()), extractor(host));
    s.pump(0.0);
    let queued = s.host().queued().to_vec();
    assert_eq!(queued.len(), 1);

    s.on_teardown();
    s.on_teardown();

    assert_eq!(starts.get(), 1);
    assert_eq!(stops.get(), 1);
    assert!(!s.has_audio());
    assert_eq!(s.loop_state(), LoopState::Idle);
    assert!(s.host().queued().is_empty());

    let drawn = s.host().submitted();
    assert_eq!(s.on_frame(first, 1.0), FrameOutcome::Ignored);
    assert_eq!(s.on_frame(queued[0], 1.0), FrameOutcome::Ignored);
    assert_eq!(s.host().submitted(), drawn);

    drop(s);
    assert_eq!(stops.get(), 1);
}

#[test]
fn start_then_stop_twice_leaves_nothing_registered() {
    let mut s = scheduler(400.0, 300.0);
    s.start_loop(engine(SimulationConfig::default()), extractor(NullHost));

    s.stop_loop();
    s.stop_loop();

    assert!(s.host().queued().is_empty());
    assert_eq!(s.host().cancelled(), 1);
    assert!(s.pump(0.0).is_empty());
    assert_eq!(s.host().submitted(), 0);
}

#[test]
fn second_start_while_running_keeps_one_registration() {
    let mut s = scheduler(400.0, 300.0);
    let a = s.start_loop(engine(SimulationConfig::default()), extractor(NullHost));
    let b = s.start_loop(engine(SimulationConfig::field_2d(100.0)), extractor(NullHost));

    assert_eq!(a, b);
    assert_eq!(s.host().queued().len(), 1);
    assert_eq!(s.engine_state().unwrap().len(), 35);
}

#[test]
fn resize_keeps_population_and_pulls_particles_into_new_bounds() {
    let mut s = scheduler(800.0, 600.0);
    s.start_loop(engine(SimulationConfig::field_2d(50.0)), extractor(NullHost));
    s.pump(0.0);

    s.host_mut().set_surface(SurfaceGeometry::new(200.0, 150.0, 1.0));
    s.on_resize(200.0, 150.0, 1.0);
    s.pump(0.016);

    let state = s.engine_state().unwrap();
    assert_eq!(state.len(), 35);
    assert_eq!(state.domain().max[0], 200.0);
    for p in state.particles() {
        assert!(state.domain().contains(&p.position), "outside: {:?}", p.position);
    }
}

#[test]
fn device_scale_shrinks_logical_domain() {
    let mut s = scheduler(800.0, 600.0);
    s.host_mut().set_surface(SurfaceGeometry::new(800.0, 600.0, 2.0));
    s.start_loop(engine(SimulationConfig::field_2d(0.0)), extractor(NullHost));
    s.pump(0.0);

    let frame = s.host().last_frame().unwrap();
    assert_eq!(frame.domain.max[0], 400.0);
    assert_eq!(frame.domain.max[1], 300.0);
    assert_eq!(frame.surface.scale, 2.0);
}

#[test]
fn zero_sized_surface_defers_until_ready() {
    let mut s = scheduler(0.0, 0.0);
    s.start_loop(engine(SimulationConfig::field_2d(50.0)), extractor(NullHost));
    assert!(s.engine_state().is_none());

    assert_eq!(s.pump(0.0), vec![FrameOutcome::Skipped]);
    assert_eq!(s.host().submitted(), 0);

    s.host_mut().set_surface(SurfaceGeometry::new(320.0, 240.0, 1.0));
    assert_eq!(s.pump(0.016), vec![FrameOutcome::Drawn]);
    assert_eq!(s.engine_state().unwrap().len(), 35);
}

#[test]
fn refused_submissions_do_not_stop_the_loop() {
    let mut s = scheduler(400.0, 300.0);
    s.start_loop(engine(SimulationConfig::default()), extractor(NullHost));
    s.host_mut().set_reject_submissions(true);

    for i in 0..5 {
        s.pump(i as f64 / 60.0);
    }

    assert_eq!(s.stats().submit_failures, 5);
    assert_eq!(s.stats().drawn, 5);
    assert!(s.is_running());
    assert_eq!(s.host().queued().len(), 1);
}

#[test]
fn synth_audio_reaches_draw_list() {
    let config = AudioConfig::default();
    let audio = SpectralFeatureExtractor::new(Box::new(SynthHost::new(config.clone())), config)
        .unwrap();
    let mut s = scheduler(640.0, 480.0);
    s.start_loop(engine(SimulationConfig::field_2d(50.0)), audio);
    assert!(s.has_audio());

    for i in 0..20 {
        s.pump(i as f64 / 60.0);
    }

    let frame = s.host().last_frame().unwrap();
    assert!(frame.amplitude > 0.0);
    assert!(frame.dominant_frequency > 0.0);
    assert!(frame.bars.iter().any(|b| *b > 0.0));
    assert!(frame.bars.iter().all(|b| (0.0..=1.0).contains(b)));
}

#[test]
fn transient_pool_never_exceeds_capacity() {
    let mut s = scheduler(640.0, 480.0);
    s.start_loop(engine(SimulationConfig::transient(50, 20)), extractor(NullHost));

    for i in 0..30 {
        s.pump(i as f64 / 60.0);
        assert!(s.engine_state().unwrap().len() <= 50);
    }

    assert_eq!(s.engine_state().unwrap().len(), 50);
    assert_eq!(s.emit(10, [0.0; 3]), 0);
}
