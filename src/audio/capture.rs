//! Live audio capture on a dedicated thread

use super::{AudioHost, StreamHandle};
use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long `start_signal` waits for the device to come up
const STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Commands sent to the capture thread
enum CaptureCommand {
    Stop,
}

/// Circular audio buffer
pub struct AudioBuffer {
    samples: Vec<f32>,
    write_pos: usize,
    capacity: usize,
}

impl AudioBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: vec![0.0; capacity],
            write_pos: 0,
            capacity,
        }
    }

    pub fn push_samples(&mut self, data: &[f32]) {
        for &sample in data {
            self.samples[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.capacity;
        }
    }

    /// Latest `count` samples in time order (capped to capacity)
    pub fn get_latest(&self, count: usize) -> Vec<f32> {
        let count = count.min(self.capacity);
        let start = (self.write_pos + self.capacity - count) % self.capacity;

        (0..count)
            .map(|i| self.samples[(start + i) % self.capacity])
            .collect()
    }
}

/// Capture thread that owns the cpal stream.
///
/// `cpal::Stream` is not `Send`, so the stream lives and dies on this
/// thread; the loop only sees the shared sample buffer.
struct ActiveCapture {
    handle: StreamHandle,
    command_tx: mpsc::Sender<CaptureCommand>,
    thread_handle: Option<JoinHandle<()>>,
    buffer: Arc<Mutex<AudioBuffer>>,
}

impl ActiveCapture {
    fn stop(&mut self) {
        let _ = self.command_tx.send(CaptureCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Audio host backed by a capture device.
///
/// Source ids follow [`super::list_sources`]: `None` or `"default"` for the
/// default input, `"input:<name>"` for a named input and `"system_audio"`
/// for loopback on the default output device.
pub struct CaptureHost {
    source_id: Option<String>,
    next_id: u64,
    active: Option<ActiveCapture>,
}

impl CaptureHost {
    pub fn new(source_id: Option<String>) -> Self {
        Self {
            source_id,
            next_id: 1,
            active: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }
}

impl AudioHost for CaptureHost {
    fn start_signal(&mut self) -> Result<StreamHandle, AudioError> {
        if let Some(active) = &self.active {
            return Ok(active.handle);
        }

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let buffer = Arc::new(Mutex::new(AudioBuffer::new(1)));
        let buffer_clone = buffer.clone();
        let source_id = self.source_id.clone();

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || run_capture_thread(source_id, command_rx, ready_tx, buffer_clone))
            .map_err(|e| AudioError::Thread(e.to_string()))?;

        let mut active = ActiveCapture {
            handle: StreamHandle::new(self.next_id, 0),
            command_tx,
            thread_handle: Some(thread_handle),
            buffer,
        };

        let sample_rate = match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                active.stop();
                return Err(e);
            }
            Err(_) => {
                active.stop();
                return Err(AudioError::Thread("capture thread did not start".to_string()));
            }
        };

        active.handle = StreamHandle::new(self.next_id, sample_rate);
        self.next_id += 1;

        let handle = active.handle;
        self.active = Some(active);
        log::info!("Audio capture started ({} Hz)", sample_rate);
        Ok(handle)
    }

    fn stop_signal(&mut self, handle: StreamHandle) {
        if self.active.as_ref().map(|a| a.handle) != Some(handle) {
            return;
        }
        if let Some(mut active) = self.active.take() {
            active.stop();
            log::info!("Audio capture stopped");
        }
    }

    fn sample_spectrum(&mut self, handle: StreamHandle, len: usize) -> Option<Vec<f32>> {
        let active = self.active.as_ref().filter(|a| a.handle == handle)?;
        // Copy under a short lock so the device callback is never held up
        let samples = active.buffer.lock().get_latest(len);
        Some(samples)
    }
}

fn select_device(host: &cpal::Host, source_id: Option<&str>) -> Result<(Device, bool), AudioError> {
    match source_id {
        Some("system_audio") => {
            log::info!("Using default output device for system audio loopback");
            let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
            Ok((device, true))
        }
        Some(id) if id.starts_with("input:") => {
            let device_name = id.trim_start_matches("input:");
            let device = host
                .input_devices()
                .map_err(|e| AudioError::Device(e.to_string()))?
                .find(|d| d.name().map(|n| n == device_name).unwrap_or(false))
                .ok_or(AudioError::NoDevice)?;
            Ok((device, false))
        }
        _ => {
            let device = host.default_input_device().ok_or(AudioError::NoDevice)?;
            Ok((device, false))
        }
    }
}

/// Run the capture stream until a stop command arrives
fn run_capture_thread(
    source_id: Option<String>,
    command_rx: mpsc::Receiver<CaptureCommand>,
    ready_tx: mpsc::Sender<Result<u32, AudioError>>,
    buffer: Arc<Mutex<AudioBuffer>>,
) {
    let stream = match open_stream(source_id.as_deref(), buffer) {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(e) => {
            log::warn!("Audio capture unavailable: {}", e);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    match command_rx.recv() {
        Ok(CaptureCommand::Stop) => log::debug!("Audio capture stopping"),
        Err(_) => log::debug!("Audio capture channel disconnected"),
    }

    drop(stream);
}

fn open_stream(
    source_id: Option<&str>,
    buffer: Arc<Mutex<AudioBuffer>>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let host = cpal::default_host();
    let (device, is_loopback) = select_device(&host, source_id)?;

    let config = if is_loopback {
        device
            .default_output_config()
            .map_err(|e| AudioError::Device(format!("Loopback config: {}", e)))?
    } else {
        device
            .default_input_config()
            .map_err(|e| AudioError::Device(e.to_string()))?
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    log::info!(
        "Audio device {}: {} Hz, {} channels",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate,
        channels
    );

    // Two seconds of history is plenty for any FFT size we use
    *buffer.lock() = AudioBuffer::new(sample_rate as usize * 2);

    let stream = match config.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), buffer, channels),
        SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), buffer, channels),
        SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), buffer, channels),
        other => {
            return Err(AudioError::Device(format!(
                "Unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| AudioError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Build input stream for given sample type, downmixing to mono
fn build_stream<T: cpal::Sample + cpal::SizedSample>(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<AudioBuffer>>,
    channels: usize,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    f32: cpal::FromSample<T>,
{
    let channels = channels.max(1);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mono: Vec<f32> = data
                .chunks(channels)
                .map(|frame| {
                    let sum: f32 = frame
                        .iter()
                        .map(|s| -> f32 { cpal::Sample::from_sample(*s) })
                        .sum();
                    sum / channels as f32
                })
                .collect();

            buffer.lock().push_samples(&mono);
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )
}
