//! Audio-reactive particle engine
//!
//! The engine is stateless apart from its configuration: every operation
//! takes the current [`EngineState`] by value and returns the next one, and
//! all randomness comes from the caller's generator.

mod bounds;
mod config;
mod particle;

pub use bounds::Domain;
pub use config::{
    quantum_palette, BoundaryBehavior, EngineMode, Rgb, SimulationConfig, DENSITY_SPAN,
    MAX_EXTENT, STEADY_BASE_COUNT,
};
pub use particle::{Lifetime, Particle};

use crate::audio::AudioFeatureFrame;
use crate::error::ConfigError;
use rand::Rng;
use serde::Serialize;
use std::f32::consts::TAU;
use std::ops::Range;

/// Scale from dominant frequency (Hz) to forcing phase (radians)
pub const FREQUENCY_PHASE_SCALE: f32 = 0.01;

/// Phase step between consecutive steady-state particles
pub const PHASE_OFFSET_STEP: f32 = 0.1;

/// Per-mode ranges for freshly created particles
struct Spawn {
    /// Each velocity component is drawn from `[-speed, speed)`, units/second
    speed: f32,
    radius: Range<f32>,
    max_life: Range<f32>,
}

impl Spawn {
    fn for_mode(mode: EngineMode) -> Self {
        match mode {
            // One pixel per frame at 60 fps
            EngineMode::Steady2D => Spawn {
                speed: 60.0,
                radius: 1.0..4.0,
                max_life: 0.0..0.0,
            },
            EngineMode::Steady3D => Spawn {
                speed: 0.6,
                radius: 1.0..3.0,
                max_life: 0.0..0.0,
            },
            EngineMode::Transient => Spawn {
                speed: 0.01,
                radius: 0.5..2.5,
                max_life: 2.0..7.0,
            },
        }
    }
}

/// Uniform sample in `[range.start, range.end)`; empty ranges give `start`
fn uniform<R: Rng>(rng: &mut R, range: &Range<f32>) -> f32 {
    range.start + (range.end - range.start) * rng.random::<f32>()
}

/// Particle population owned by one visualization instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineState {
    particles: Vec<Particle>,
    domain: Domain,
    steps: u64,
}

impl EngineState {
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Steps taken since `init`
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Replace the domain (e.g. after a resize). Particles are left where
    /// they are; the next step brings stragglers back in bounds.
    pub fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    pub fn is_finite(&self) -> bool {
        self.particles.iter().all(Particle::is_finite)
    }

    /// Build a state from explicit particles
    pub fn from_particles(particles: Vec<Particle>, domain: Domain) -> Self {
        Self {
            particles,
            domain,
            steps: 0,
        }
    }
}

/// Advances a particle population under kinematics plus audio forcing
#[derive(Debug, Clone)]
pub struct ParticleEngine {
    config: SimulationConfig,
}

impl ParticleEngine {
    /// Validate the configuration. Nothing can be stepped without this.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn mode(&self) -> EngineMode {
        self.config.mode
    }

    /// Swap in a new configuration. Callers re-run [`ParticleEngine::init`];
    /// no particle survives a reconfiguration.
    pub fn reconfigure(&mut self, config: SimulationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Domain for a surface of the given logical size
    pub fn domain_for(&self, width: f32, height: f32) -> Domain {
        match self.config.mode {
            EngineMode::Steady2D => Domain::rect(width, height),
            EngineMode::Steady3D | EngineMode::Transient => {
                Domain::cube(self.config.domain_half_extent)
            }
        }
    }

    /// Transient pool capacity, `None` for steady-state modes
    pub fn capacity(&self) -> Option<usize> {
        self.config
            .mode
            .is_transient()
            .then_some(self.config.max_particles)
    }

    /// Allocate the initial population. Transient pools start empty.
    pub fn init<R: Rng>(&self, domain: Domain, rng: &mut R) -> EngineState {
        let particles = match self.config.mode {
            EngineMode::Transient => Vec::new(),
            EngineMode::Steady2D | EngineMode::Steady3D => {
                let spawn = Spawn::for_mode(self.config.mode);
                (0..self.config.steady_count())
                    .map(|i| {
                        let mut position = [0.0; 3];
                        for axis in 0..domain.dims {
                            position[axis] =
                                uniform(rng, &(domain.min[axis]..domain.max[axis]));
                        }
                        Particle {
                            position,
                            velocity: self.random_velocity(&spawn, domain.dims, rng),
                            radius: uniform(rng, &spawn.radius),
                            color: self.random_color(rng),
                            phase_offset: i as f32 * PHASE_OFFSET_STEP,
                            life: None,
                        }
                    })
                    .collect()
            }
        };

        log::debug!(
            "Initialized {:?} engine with {} particles",
            self.config.mode,
            particles.len()
        );

        EngineState {
            particles,
            domain,
            steps: 0,
        }
    }

    /// Advance every particle by `dt` seconds.
    ///
    /// Non-finite or negative `dt` is treated as zero.
    pub fn step<R: Rng>(
        &self,
        mut state: EngineState,
        dt: f32,
        features: &AudioFeatureFrame,
        rng: &mut R,
    ) -> EngineState {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let features_valid =
            features.amplitude.is_finite() && features.dominant_frequency.is_finite();
        let influence = if features_valid {
            features.amplitude * self.config.audio_influence_scale
        } else {
            0.0
        };
        let base_phase = if influence != 0.0 {
            features.dominant_frequency * FREQUENCY_PHASE_SCALE
        } else {
            0.0
        };

        let domain = state.domain;
        let behavior = self.config.boundary_behavior;
        let jitter_probability = self.config.jitter_probability as f64;
        let jitter_magnitude = self.config.jitter_magnitude;

        for particle in state.particles.iter_mut() {
            for axis in 0..domain.dims {
                particle.position[axis] += particle.velocity[axis] * dt;
            }

            if influence != 0.0 {
                let phase = base_phase + particle.phase_offset;
                particle.position[0] += phase.sin() * influence;
                particle.position[1] += phase.cos() * influence;
            }

            if jitter_probability > 0.0 && rng.random_bool(jitter_probability) {
                particle.position[0] += (rng.random::<f32>() - 0.5) * jitter_magnitude;
                particle.position[1] += (rng.random::<f32>() - 0.5) * jitter_magnitude;
            }

            domain.apply(behavior, particle);

            if let Some(lifetime) = particle.life.as_mut() {
                lifetime.life -= dt / lifetime.max_life;
            }
        }

        state.particles.retain(Particle::is_alive);
        state.steps += 1;
        state
    }

    /// Add up to `count` particles at `origin`, truncated to the pool's
    /// free capacity. Steady-state engines return the state unchanged.
    pub fn emit<R: Rng>(
        &self,
        mut state: EngineState,
        count: usize,
        origin: [f32; 3],
        rng: &mut R,
    ) -> EngineState {
        let Some(capacity) = self.capacity() else {
            log::debug!("Ignoring emit on {:?} engine", self.config.mode);
            return state;
        };

        let room = capacity.saturating_sub(state.particles.len());
        let accepted = count.min(room);
        if accepted < count {
            log::trace!("Emit truncated: {} of {} particles", accepted, count);
        }

        let spawn = Spawn::for_mode(self.config.mode);
        let dims = state.domain.dims;
        state.particles.reserve(accepted);
        for _ in 0..accepted {
            let particle = Particle {
                position: origin,
                velocity: self.random_velocity(&spawn, dims, rng),
                radius: uniform(rng, &spawn.radius),
                color: self.random_color(rng),
                phase_offset: uniform(rng, &(0.0..TAU)),
                life: Some(Lifetime {
                    life: 1.0,
                    max_life: uniform(rng, &spawn.max_life),
                }),
            };
            state.particles.push(particle);
        }
        state
    }

    fn random_velocity<R: Rng>(&self, spawn: &Spawn, dims: usize, rng: &mut R) -> [f32; 3] {
        let mut velocity = [0.0; 3];
        for v in velocity.iter_mut().take(dims) {
            *v = uniform(rng, &(-spawn.speed..spawn.speed));
        }
        velocity
    }

    fn random_color<R: Rng>(&self, rng: &mut R) -> Rgb {
        let palette = &self.config.color_palette;
        palette[rng.random_range(0..palette.len())]
    }
}
