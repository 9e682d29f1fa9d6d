//! Command-line argument parsing

use crate::engine::{EngineMode, SimulationConfig};
use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Shortest frame period the pacing timer is given
pub const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

/// Simulation variant chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Steady2d,
    Steady3d,
    Transient,
}

impl From<ModeArg> for EngineMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Steady2d => EngineMode::Steady2D,
            ModeArg::Steady3d => EngineMode::Steady3D,
            ModeArg::Transient => EngineMode::Transient,
        }
    }
}

/// Where the spectrum comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudioArg {
    /// Built-in 220 Hz tone with a slow vibrato
    Synth,
    /// Live capture through the default (or `--source`) device
    Capture,
    /// No audio; particles drift on kinematics alone
    Off,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "quantum-viz")]
#[command(about = "Audio-reactive particle field on a headless surface", long_about = None)]
pub struct Args {
    /// JSON simulation config; command-line options override its fields
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Simulation mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Steady 2D density, 0-100
    #[arg(long, value_name = "PERCENT")]
    pub density: Option<f32>,

    /// Steady 3D particle count, or transient pool capacity
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,

    /// Stop after this many seconds (runs until Ctrl-C otherwise)
    #[arg(long, value_name = "SECONDS")]
    pub seconds: Option<f32>,

    /// Frames per second
    #[arg(long, default_value = "60")]
    pub fps: f32,

    /// Audio source
    #[arg(long, value_enum, default_value = "synth")]
    pub audio: AudioArg,

    /// Capture source id for `--audio capture` (see `--list-sources`)
    #[arg(long, value_name = "ID")]
    pub source: Option<String>,

    /// Write the last drawn frame as JSON on exit
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Surface width in pixels
    #[arg(long, default_value = "1280")]
    pub width: f32,

    /// Surface height in pixels
    #[arg(long, default_value = "720")]
    pub height: f32,

    /// Device scale factor
    #[arg(long, default_value = "1")]
    pub scale: f32,

    /// Print the available audio sources and exit
    #[arg(long)]
    pub list_sources: bool,
}

impl Args {
    /// Resolve the simulation config from `--config` plus overrides. Without
    /// a file, `--mode` picks the matching preset.
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => match self.mode.map(EngineMode::from).unwrap_or_default() {
                EngineMode::Steady2D => SimulationConfig::field_2d(50.0),
                EngineMode::Steady3D => SimulationConfig::background_3d(100),
                EngineMode::Transient => SimulationConfig::transient(1000, 8),
            },
        };

        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(density) = self.density {
            config.particle_density = density;
        }
        if let Some(count) = self.count {
            if config.mode.is_transient() {
                config.max_particles = count;
            } else {
                config.particle_count = Some(count);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Frame period for `--fps`, never shorter than [`MIN_FRAME_PERIOD`]
    pub fn frame_period(&self) -> Result<Duration, ConfigError> {
        let invalid = ConfigError::InvalidValue {
            field: "fps",
            value: self.fps,
        };
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(invalid);
        }
        let period = Duration::try_from_secs_f32(1.0 / self.fps).map_err(|_| invalid)?;
        Ok(period.max(MIN_FRAME_PERIOD))
    }

    /// Run length for `--seconds`, `None` to run until interrupted
    pub fn run_duration(&self) -> Result<Option<Duration>, ConfigError> {
        self.seconds
            .map(|seconds| {
                let invalid = ConfigError::InvalidValue {
                    field: "seconds",
                    value: seconds,
                };
                if !(seconds.is_finite() && seconds > 0.0) {
                    return Err(invalid);
                }
                Duration::try_from_secs_f32(seconds).map_err(|_| invalid)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("quantum-viz").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_to_dense_2d_field_with_synth() {
        let args = parse(&[]);
        let config = args.simulation_config().unwrap();

        assert_eq!(args.audio, AudioArg::Synth);
        assert_eq!(config.mode, EngineMode::Steady2D);
        assert_eq!(config.steady_count(), 35);
    }

    #[test]
    fn count_sets_pool_capacity_in_transient_mode() {
        let config = parse(&["--mode", "transient", "--count", "250"])
            .simulation_config()
            .unwrap();

        assert_eq!(config.max_particles, 250);
        assert_eq!(config.particle_count, None);
    }

    #[test]
    fn frame_period_is_clamped_and_validated() {
        assert_eq!(parse(&[]).frame_period().unwrap(), Duration::from_secs_f32(1.0 / 60.0));
        assert_eq!(parse(&["--fps", "1e12"]).frame_period().unwrap(), MIN_FRAME_PERIOD);
        assert_eq!(
            parse(&["--fps", "0"]).frame_period(),
            Err(ConfigError::InvalidValue {
                field: "fps",
                value: 0.0
            })
        );
        assert!(parse(&["--fps", "1e-40"]).frame_period().is_err());
    }

    #[test]
    fn run_duration_rejects_unrepresentable_lengths() {
        assert_eq!(parse(&[]).run_duration(), Ok(None));
        assert_eq!(
            parse(&["--seconds", "2.5"]).run_duration(),
            Ok(Some(Duration::from_millis(2500)))
        );
        assert!(parse(&["--seconds", "1e30"]).run_duration().is_err());
        assert!(parse(&["--seconds", "0"]).run_duration().is_err());
    }

    #[test]
    fn out_of_range_density_is_rejected() {
        let err = parse(&["--density", "150"]).simulation_config().unwrap_err();

        assert_eq!(err, ConfigError::DensityOutOfRange(150.0));
    }
}
