//! Audio source enumeration

use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

/// Audio source information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSource {
    /// Identifier accepted by [`super::CaptureHost::new`]
    pub id: String,

    /// Display name
    pub name: String,

    /// Source type
    pub source_type: SourceType,
}

/// Type of audio source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Built-in synthetic signal
    Synth,

    /// System-wide audio (loopback)
    SystemAudio,

    /// Input device (microphone)
    InputDevice,
}

/// List available audio sources, synthetic signal first
pub fn list_sources() -> Result<Vec<AudioSource>, AudioError> {
    let mut sources = vec![AudioSource {
        id: "synth".to_string(),
        name: "Synthetic signal (220 Hz, LFO 0.5 Hz)".to_string(),
        source_type: SourceType::Synth,
    }];

    let host = cpal::default_host();

    if let Some(device) = host.default_output_device() {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        sources.push(AudioSource {
            id: "system_audio".to_string(),
            name: format!("System Audio ({})", device_name),
            source_type: SourceType::SystemAudio,
        });
    }

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::Device(e.to_string()))?;
    for device in devices {
        match device.name() {
            Ok(name) => sources.push(AudioSource {
                id: format!("input:{}", name),
                name: format!("Input: {}", name),
                source_type: SourceType::InputDevice,
            }),
            Err(e) => log::warn!("Skipping input device without a name: {}", e),
        }
    }

    Ok(sources)
}
