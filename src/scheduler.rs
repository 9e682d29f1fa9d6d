//! Cancellable frame loop tying audio, engine and graph to a render host
//!
//! The scheduler owns everything a mounted visualization needs. The host
//! only hands out frame handles and fires them back through
//! [`FrameScheduler::on_frame`]; at most one handle is pending at a time and
//! a fired handle that is no longer pending is ignored.

use crate::audio::{AudioFeatureFrame, SpectralFeatureExtractor, StreamHandle};
use crate::bars::SpectrumBars;
use crate::engine::{Domain, EngineState, ParticleEngine, Rgb, SimulationConfig};
use crate::error::{ConfigError, RenderError};
use crate::graph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// dt used for the first frame after the loop starts
pub const NOMINAL_FRAME_DT: f32 = 1.0 / 60.0;

/// Upper bound on dt so a stalled host does not fling particles
pub const MAX_FRAME_DT: f32 = 0.1;

/// Token for one registered frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Surface size in physical pixels plus the device scale factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceGeometry {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl SurfaceGeometry {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }

    /// Zero-sized surface, used before the host reports anything
    pub fn empty() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn is_ready(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if positive(self.width) && positive(self.height) && positive(self.scale) {
            Ok(())
        } else {
            Err(RenderError::SurfaceUnready {
                width: self.width,
                height: self.height,
                scale: self.scale,
            })
        }
    }

    /// Size in logical (device independent) units
    pub fn logical_size(&self) -> (f32, f32) {
        (self.width / self.scale, self.height / self.scale)
    }
}

/// Where frames go. Implemented by whatever owns the drawing surface.
pub trait RenderHost {
    /// Register a callback for the next frame
    fn request_frame(&mut self) -> FrameHandle;

    /// Drop a registration made by `request_frame`
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Current surface geometry
    fn surface(&self) -> SurfaceGeometry;

    /// Draw one composed frame
    fn submit(&mut self, frame: &DrawList) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleDraw {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: Rgb,
    /// 1.0 for steady particles, remaining life for transient ones
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeDraw {
    pub from: [f32; 3],
    pub to: [f32; 3],
    pub opacity: f32,
}

/// Everything a host needs to draw one frame. Coordinates are in logical
/// units; hosts multiply by `surface.scale`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawList {
    pub frame: u64,
    pub surface: SurfaceGeometry,
    pub domain: Domain,
    pub particles: Vec<ParticleDraw>,
    pub edges: Vec<EdgeDraw>,
    pub edge_color: Rgb,
    pub bars: Vec<f32>,
    pub amplitude: f32,
    pub dominant_frequency: f32,
}

impl DrawList {
    fn compose(
        frame: u64,
        surface: SurfaceGeometry,
        state: &EngineState,
        config: &SimulationConfig,
        bars: &SpectrumBars,
        features: &AudioFeatureFrame,
    ) -> Self {
        let particles = state.particles();
        let threshold = config.connection_distance_threshold;

        let edges = graph::build(particles, threshold)
            .into_iter()
            .map(|c| EdgeDraw {
                from: particles[c.a].position,
                to: particles[c.b].position,
                opacity: c.opacity(threshold, config.edge_base_opacity),
            })
            .collect();

        Self {
            frame,
            surface,
            domain: *state.domain(),
            particles: particles
                .iter()
                .map(|p| ParticleDraw {
                    position: p.position,
                    radius: p.radius,
                    color: p.color,
                    alpha: p.life.map_or(1.0, |l| l.life.clamp(0.0, 1.0)),
                })
                .collect(),
            edges,
            edge_color: config.color_palette.first().copied().unwrap_or(Rgb::QUANTUM_BLUE),
            bars: bars.levels().to_vec(),
            amplitude: features.amplitude,
            dominant_frequency: features.dominant_frequency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// What a fired frame callback did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Stale handle or loop not running
    Ignored,
    /// Surface not ready; state kept and the loop re-armed
    Skipped,
    Drawn,
}

/// Running totals, reset by `start_loop`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub drawn: u64,
    pub skipped: u64,
    pub rejected_steps: u64,
    pub submit_failures: u64,
}

/// One mounted visualization
struct Mount {
    engine: ParticleEngine,
    /// `None` until the surface is first ready, and after a reconfigure
    state: Option<EngineState>,
    extractor: SpectralFeatureExtractor,
    stream: Option<StreamHandle>,
    bars: SpectrumBars,
}

pub struct FrameScheduler<H: RenderHost, R: Rng = StdRng> {
    host: H,
    rng: R,
    loop_state: LoopState,
    pending: Option<FrameHandle>,
    mount: Option<Mount>,
    geometry: SurfaceGeometry,
    last_timestamp: Option<f64>,
    stats: FrameStats,
}

impl<H: RenderHost> FrameScheduler<H, StdRng> {
    /// Scheduler drawing with an entropy-seeded generator
    pub fn new(host: H) -> Self {
        Self::with_rng(host, StdRng::from_os_rng())
    }
}

impl<H: RenderHost, R: Rng> FrameScheduler<H, R> {
    pub fn with_rng(host: H, rng: R) -> Self {
        let geometry = host.surface();
        Self {
            host,
            rng,
            loop_state: LoopState::Idle,
            pending: None,
            mount: None,
            geometry,
            last_timestamp: None,
            stats: FrameStats::default(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    pub fn is_running(&self) -> bool {
        self.loop_state == LoopState::Running
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Current particle population, once the first frame has run
    pub fn engine_state(&self) -> Option<&EngineState> {
        self.mount.as_ref().and_then(|m| m.state.as_ref())
    }

    /// Whether the mounted extractor still holds an audio stream
    pub fn has_audio(&self) -> bool {
        self.mount.as_ref().is_some_and(|m| m.stream.is_some())
    }

    /// Mount `engine` and `extractor` and register the first frame.
    ///
    /// Audio that fails to start is logged and the loop runs on silent
    /// features. Calling this while running keeps the current mount.
    pub fn start_loop(
        &mut self,
        engine: ParticleEngine,
        mut extractor: SpectralFeatureExtractor,
    ) -> FrameHandle {
        if let (LoopState::Running, Some(handle)) = (self.loop_state, self.pending) {
            log::warn!("Frame loop already running, ignoring start");
            return handle;
        }

        // A previous mount that was stopped but not torn down
        self.release_stream();

        let stream = match extractor.start() {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Audio unavailable, running without audio reactivity: {}", e);
                None
            }
        };

        let bars = SpectrumBars::new(engine.config().bar_count);
        self.geometry = self.host.surface();
        let mut mount = Mount {
            engine,
            state: None,
            extractor,
            stream,
            bars,
        };
        if self.geometry.is_ready() {
            mount.state = Some(init_state(&mount.engine, self.geometry, &mut self.rng));
        }

        log::info!(
            "Frame loop started: {:?} on {}x{} surface",
            mount.engine.mode(),
            self.geometry.width,
            self.geometry.height
        );

        self.mount = Some(mount);
        self.loop_state = LoopState::Running;
        self.last_timestamp = None;
        self.stats = FrameStats::default();

        let handle = self.host.request_frame();
        self.pending = Some(handle);
        handle
    }

    /// Cancel the pending frame. Safe to call at any time.
    pub fn stop_loop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.host.cancel_frame(handle);
        }
        if self.loop_state == LoopState::Running {
            log::info!("Frame loop stopped after {} frames", self.stats.drawn);
        }
        self.loop_state = LoopState::Idle;
        self.last_timestamp = None;
    }

    /// Stop the loop and release the audio stream. Repeat calls do nothing.
    pub fn on_teardown(&mut self) {
        self.stop_loop();
        self.release_stream();
    }

    /// Surface changed size. The particle population is kept; only the
    /// domain follows the new geometry.
    pub fn on_resize(&mut self, width: f32, height: f32, scale: f32) {
        self.apply_geometry(SurfaceGeometry::new(width, height, scale));
    }

    /// Replace the simulation configuration. The population is rebuilt on
    /// the next frame; an invalid config leaves everything untouched.
    pub fn reconfigure(&mut self, config: SimulationConfig) -> Result<(), ConfigError> {
        let Some(mount) = self.mount.as_mut() else {
            config.validate()?;
            log::debug!("Reconfigure before start_loop, nothing mounted");
            return Ok(());
        };
        mount.engine.reconfigure(config)?;
        mount.bars.resize(mount.engine.config().bar_count);
        mount.state = None;
        log::info!("Engine reconfigured to {:?}", mount.engine.mode());
        Ok(())
    }

    /// Emit a burst into the transient pool. Returns how many particles
    /// the pool accepted.
    pub fn emit(&mut self, count: usize, origin: [f32; 3]) -> usize {
        let Some(mount) = self.mount.as_mut() else {
            return 0;
        };
        let Some(state) = mount.state.take() else {
            return 0;
        };
        let before = state.len();
        let state = mount.engine.emit(state, count, origin, &mut self.rng);
        let accepted = state.len() - before;
        mount.state = Some(state);
        accepted
    }

    /// Run one frame for a handle the host fired
    pub fn on_frame(&mut self, handle: FrameHandle, timestamp: f64) -> FrameOutcome {
        if self.loop_state != LoopState::Running || self.pending != Some(handle) {
            log::trace!("Ignoring stale frame {:?}", handle);
            return FrameOutcome::Ignored;
        }
        self.pending = None;

        let outcome = self.run_frame(timestamp);

        self.pending = Some(self.host.request_frame());
        outcome
    }

    fn run_frame(&mut self, timestamp: f64) -> FrameOutcome {
        let geometry = self.host.surface();
        if let Err(e) = geometry.validate() {
            log::debug!("Skipping frame: {}", e);
            self.stats.skipped += 1;
            self.last_timestamp = Some(timestamp);
            return FrameOutcome::Skipped;
        }
        if geometry != self.geometry {
            self.apply_geometry(geometry);
        }

        let dt = match self.last_timestamp {
            Some(last) => ((timestamp - last) as f32).clamp(0.0, MAX_FRAME_DT),
            None => NOMINAL_FRAME_DT,
        };
        let dt = if dt.is_finite() { dt } else { NOMINAL_FRAME_DT };
        self.last_timestamp = Some(timestamp);

        let Some(mount) = self.mount.as_mut() else {
            return FrameOutcome::Skipped;
        };

        let features = match mount.stream {
            Some(stream) => mount.extractor.get_frame(stream),
            None => AudioFeatureFrame::silent(mount.extractor.bin_count()),
        };

        let state = match mount.state.take() {
            Some(state) => state,
            None => init_state(&mount.engine, geometry, &mut self.rng),
        };

        let config = mount.engine.config();
        let state = if config.mode.is_transient() && config.emit_per_frame > 0 {
            let origin = state.domain().center();
            mount
                .engine
                .emit(state, config.emit_per_frame, origin, &mut self.rng)
        } else {
            state
        };

        let next = mount
            .engine
            .step(state.clone(), dt, &features, &mut self.rng);
        let state = if next.is_finite() {
            next
        } else {
            log::warn!("Discarding step with non-finite particle values");
            self.stats.rejected_steps += 1;
            state
        };

        mount.bars.update(&features, mount.stream.is_some());
        let draw = DrawList::compose(
            self.stats.drawn,
            geometry,
            &state,
            mount.engine.config(),
            &mount.bars,
            &features,
        );
        mount.state = Some(state);

        if let Err(e) = self.host.submit(&draw) {
            log::warn!("Frame {} not drawn: {}", draw.frame, e);
            self.stats.submit_failures += 1;
        }
        self.stats.drawn += 1;
        FrameOutcome::Drawn
    }

    fn apply_geometry(&mut self, geometry: SurfaceGeometry) {
        self.geometry = geometry;
        if !geometry.is_ready() {
            return;
        }
        let (width, height) = geometry.logical_size();
        if let Some(mount) = self.mount.as_mut() {
            if let Some(state) = mount.state.as_mut() {
                state.set_domain(mount.engine.domain_for(width, height));
            }
        }
        log::debug!(
            "Surface resized to {}x{} @ {}",
            geometry.width,
            geometry.height,
            geometry.scale
        );
    }

    fn release_stream(&mut self) {
        if let Some(mount) = self.mount.as_mut() {
            if let Some(stream) = mount.stream.take() {
                mount.extractor.stop(stream);
                log::debug!("Released audio stream {}", stream.id());
            }
        }
    }
}

impl<H: RenderHost, R: Rng> Drop for FrameScheduler<H, R> {
    fn drop(&mut self) {
        self.on_teardown();
    }
}

fn init_state<R: Rng>(
    engine: &ParticleEngine,
    geometry: SurfaceGeometry,
    rng: &mut R,
) -> EngineState {
    let (width, height) = geometry.logical_size();
    engine.init(engine.domain_for(width, height), rng)
}
