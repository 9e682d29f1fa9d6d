//! Error types for configuration, audio and rendering

use thiserror::Error;

/// Invalid simulation configuration, reported when an engine is created
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("particle_count must be at least 1")]
    ZeroParticleCount,

    #[error("particle_density must be within 0-100, got {0}")]
    DensityOutOfRange(f32),

    #[error("max_particles must be positive")]
    NonPositiveMaxParticles,

    #[error("color_palette must contain at least one color")]
    EmptyPalette,

    #[error("connection_distance_threshold must be positive, got {0}")]
    NonPositiveThreshold(f32),

    #[error("audio_influence_scale must be >= 0, got {0}")]
    NegativeInfluence(f32),

    #[error("{field} must be a finite value within range, got {value}")]
    InvalidValue { field: &'static str, value: f32 },

    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Audio source errors. All of them are recovered locally by running
/// the visualization without audio reactivity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Audio is disabled")]
    Disabled,

    #[error("No input device found")]
    NoDevice,

    #[error("Failed to get device config: {0}")]
    Device(String),

    #[error("Failed to build audio stream: {0}")]
    Stream(String),

    #[error("Thread error: {0}")]
    Thread(String),

    #[error("Invalid audio config: {0}")]
    Config(String),
}

/// Per-frame render host errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Surface not ready ({width}x{height} @ {scale})")]
    SurfaceUnready { width: f32, height: f32, scale: f32 },

    #[error("Failed to submit draw list: {0}")]
    Submit(String),
}
