//! Simulation configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Particles added on top of the density-scaled count
pub const STEADY_BASE_COUNT: usize = 10;

/// Particles at full (100) density, before the base count
pub const DENSITY_SPAN: f32 = 50.0;

/// Largest accepted half-extent or jitter magnitude. Keeps the full span
/// `2 * extent` and a jittered coordinate representable as f32.
pub const MAX_EXTENT: f32 = f32::MAX / 4.0;

/// RGB colour, each channel 0-1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    pub const QUANTUM_BLUE: Rgb = Rgb([0.0, 0.8, 1.0]);
    pub const PLASMA_PURPLE: Rgb = Rgb([0.48, 0.41, 0.93]);
    pub const NEON_GREEN: Rgb = Rgb([0.22, 1.0, 0.08]);
    pub const CYBER_PINK: Rgb = Rgb([1.0, 0.18, 0.57]);

    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

/// Default four-colour palette
pub fn quantum_palette() -> Vec<Rgb> {
    vec![
        Rgb::QUANTUM_BLUE,
        Rgb::PLASMA_PURPLE,
        Rgb::NEON_GREEN,
        Rgb::CYBER_PINK,
    ]
}

/// Simulation variant. All variants share one stepping contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EngineMode {
    /// Fixed population on the surface rectangle
    #[default]
    #[serde(rename = "steady2d")]
    Steady2D,

    /// Fixed population in a cube around the origin
    #[serde(rename = "steady3d")]
    Steady3D,

    /// Emitted particles that expire, bounded by `max_particles`
    #[serde(rename = "transient")]
    Transient,
}

impl EngineMode {
    pub fn dims(&self) -> usize {
        match self {
            EngineMode::Steady2D => 2,
            EngineMode::Steady3D | EngineMode::Transient => 3,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, EngineMode::Transient)
    }
}

/// What happens when a particle leaves the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryBehavior {
    /// Reappear at the opposite bound
    Wrap,
    /// Reverse the velocity component and clamp to the bound
    #[default]
    Bounce,
}

/// Options recognized by the particle engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub mode: EngineMode,

    /// Explicit steady-state population; overrides `particle_density`
    pub particle_count: Option<usize>,

    /// Steady-state density, 0-100
    pub particle_density: f32,

    /// Transient pool capacity
    pub max_particles: usize,

    pub boundary_behavior: BoundaryBehavior,

    /// Pairs closer than this are connected (render-space units)
    pub connection_distance_threshold: f32,

    /// Multiplier on the audio-driven displacement
    pub audio_influence_scale: f32,

    pub color_palette: Vec<Rgb>,

    /// Half the side of the cube used by 3D and transient modes
    pub domain_half_extent: f32,

    /// Transient particles emitted at the domain centre every frame
    pub emit_per_frame: usize,

    /// Opacity of a zero-length connection
    pub edge_base_opacity: f32,

    /// Chance per particle per step of a positional jump
    pub jitter_probability: f32,

    /// Full width of the jump on each axis
    pub jitter_magnitude: f32,

    /// Spectrum bars in the draw list
    pub bar_count: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::Steady2D,
            particle_count: None,
            particle_density: 50.0,
            max_particles: 1000,
            boundary_behavior: BoundaryBehavior::Bounce,
            connection_distance_threshold: 100.0,
            audio_influence_scale: 0.1,
            color_palette: quantum_palette(),
            domain_half_extent: 50.0,
            emit_per_frame: 0,
            edge_base_opacity: 0.3,
            jitter_probability: 0.001,
            jitter_magnitude: 10.0,
            bar_count: 64,
        }
    }
}

impl SimulationConfig {
    /// Flat field of particles bouncing inside the surface
    pub fn field_2d(particle_density: f32) -> Self {
        Self {
            particle_density,
            ..Default::default()
        }
    }

    /// Wrapping point cloud around the origin
    pub fn background_3d(particle_count: usize) -> Self {
        Self {
            mode: EngineMode::Steady3D,
            particle_count: Some(particle_count),
            boundary_behavior: BoundaryBehavior::Wrap,
            connection_distance_threshold: 10.0,
            ..Default::default()
        }
    }

    /// Emission pool fed from the domain centre
    pub fn transient(max_particles: usize, emit_per_frame: usize) -> Self {
        Self {
            mode: EngineMode::Transient,
            max_particles,
            emit_per_frame,
            boundary_behavior: BoundaryBehavior::Wrap,
            connection_distance_threshold: 5.0,
            ..Default::default()
        }
    }

    /// Steady-state population: `floor(density / 100 * 50) + 10`, at least 1
    pub fn steady_count(&self) -> usize {
        match self.particle_count {
            Some(count) => count.max(1),
            None => {
                let scaled = (self.particle_density / 100.0 * DENSITY_SPAN).floor() as usize;
                (scaled + STEADY_BASE_COUNT).max(1)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == Some(0) {
            return Err(ConfigError::ZeroParticleCount);
        }
        if !(self.particle_density.is_finite() && (0.0..=100.0).contains(&self.particle_density)) {
            return Err(ConfigError::DensityOutOfRange(self.particle_density));
        }
        if self.mode.is_transient() && self.max_particles == 0 {
            return Err(ConfigError::NonPositiveMaxParticles);
        }
        if self.color_palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        if let Some(bad) = self.color_palette.iter().find(|c| !c.is_valid()) {
            let value = bad.0.iter().copied().find(|c| !(0.0..=1.0).contains(c));
            return Err(ConfigError::InvalidValue {
                field: "color_palette",
                value: value.unwrap_or(f32::NAN),
            });
        }
        let threshold = self.connection_distance_threshold;
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(ConfigError::NonPositiveThreshold(threshold));
        }
        if !(self.audio_influence_scale >= 0.0) || !self.audio_influence_scale.is_finite() {
            return Err(ConfigError::NegativeInfluence(self.audio_influence_scale));
        }

        check_range("domain_half_extent", self.domain_half_extent, f32::MIN_POSITIVE, MAX_EXTENT)?;
        check_range("edge_base_opacity", self.edge_base_opacity, 0.0, 1.0)?;
        check_range("jitter_probability", self.jitter_probability, 0.0, 1.0)?;
        check_range("jitter_magnitude", self.jitter_magnitude, 0.0, MAX_EXTENT)?;
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}
