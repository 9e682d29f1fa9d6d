//! Quantum Viz Library
//!
//! Audio-reactive particle visualization: spectral features from an audio
//! signal drive a particle field whose proximity graph is drawn as edges,
//! all paced by a cancellable frame loop.

pub mod audio;
pub mod bars;
pub mod cli;
pub mod engine;
pub mod error;
pub mod graph;
pub mod host;
pub mod scheduler;

use audio::{AudioConfig, AudioHost, CaptureHost, NullHost, SpectralFeatureExtractor, SynthHost};
use cli::{Args, AudioArg};
use engine::ParticleEngine;
use host::HeadlessHost;
use scheduler::{DrawList, FrameScheduler, FrameStats};

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Written by `--snapshot` when the run ends
#[derive(Serialize)]
struct Snapshot<'a> {
    stats: FrameStats,
    frame: Option<&'a DrawList>,
}

fn audio_host(args: &Args, config: &AudioConfig) -> Box<dyn AudioHost> {
    match args.audio {
        AudioArg::Synth => Box::new(SynthHost::new(config.clone())),
        AudioArg::Capture => Box::new(CaptureHost::new(args.source.clone())),
        AudioArg::Off => Box::new(NullHost),
    }
}

fn write_snapshot(path: &Path, snapshot: &Snapshot<'_>) -> Result<(), Box<dyn Error>> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, snapshot)?;
    log::info!("Snapshot written to {}", path.display());
    Ok(())
}

/// Drive a scheduler on a headless surface until Ctrl-C or `--seconds`
async fn run_headless(args: Args) -> Result<(), Box<dyn Error>> {
    let config = args.simulation_config()?;
    let engine = ParticleEngine::new(config)?;

    let period = args.frame_period()?;
    let deadline = args.run_duration()?;
    let audio_config = AudioConfig {
        frame_rate: 1.0 / period.as_secs_f32(),
        ..AudioConfig::default()
    };
    let extractor =
        SpectralFeatureExtractor::new(audio_host(&args, &audio_config), audio_config)?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let surface = HeadlessHost::new(args.width, args.height, args.scale);
    let mut scheduler = FrameScheduler::with_rng(surface, rng);
    scheduler.start_loop(engine, extractor);

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut last_report = Duration::ZERO;
    let mut drawn_at_report = 0;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                }
                log::info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {
                let elapsed = started.elapsed();
                scheduler.pump(elapsed.as_secs_f64());

                if elapsed - last_report >= Duration::from_secs(1) {
                    let stats = scheduler.stats();
                    let (particles, edges, amplitude, frequency) = scheduler
                        .host()
                        .last_frame()
                        .map(|f| {
                            (f.particles.len(), f.edges.len(), f.amplitude, f.dominant_frequency)
                        })
                        .unwrap_or_default();
                    log::info!(
                        "{} fps | {} particles | {} edges | amplitude {:.3} | centroid {:.0} Hz",
                        stats.drawn - drawn_at_report,
                        particles,
                        edges,
                        amplitude,
                        frequency
                    );
                    last_report = elapsed;
                    drawn_at_report = stats.drawn;
                }

                if deadline.is_some_and(|d| elapsed >= d) {
                    break;
                }
            }
        }
    }

    scheduler.on_teardown();
    let stats = scheduler.stats();
    log::info!(
        "Drew {} frames ({} skipped, {} rejected steps, {} failed submits)",
        stats.drawn,
        stats.skipped,
        stats.rejected_steps,
        stats.submit_failures
    );

    if let Some(path) = &args.snapshot {
        let snapshot = Snapshot {
            stats,
            frame: scheduler.host().last_frame(),
        };
        write_snapshot(path, &snapshot)?;
    }

    Ok(())
}

/// Entry point for the `quantum-viz` binary
pub fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    if args.list_sources {
        for source in audio::list_sources()? {
            println!("{:<32} {:?}  {}", source.id, source.source_type, source.name);
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_headless(args))
}
