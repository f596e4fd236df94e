//! WAV audio file processing

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

use crate::audio::{resample, AudioBuffer, ResampleMethod};
use crate::error::{SimulationError, Result};

/// Method used when a source file's rate differs from the manifest rate.
const LOAD_RESAMPLE_METHOD: ResampleMethod = ResampleMethod::KaiserBest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Int16,
    Float32,
}

impl AudioFormat {
    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Int16 => "int16",
            AudioFormat::Float32 => "float32",
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            AudioFormat::Int16 => 16,
            AudioFormat::Float32 => 32,
        }
    }

    pub fn to_sample_format(self) -> SampleFormat {
        match self {
            AudioFormat::Int16 => SampleFormat::Int,
            AudioFormat::Float32 => SampleFormat::Float,
        }
    }
}

impl FromStr for AudioFormat {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int16" | "pcm_16" => Ok(AudioFormat::Int16),
            "float32" | "float" => Ok(AudioFormat::Float32),
            other => Err(SimulationError::config(format!("Unsupported output format: {}", other))),
        }
    }
}

/// Read a WAV file into a channel-major buffer with samples in [-1, 1].
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();

    let reader = WavReader::open(path)
        .map_err(|e| SimulationError::audio(format!("Cannot open audio file {}: {}", path.display(), e)))?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(SimulationError::audio(format!("Invalid sample rate in {}", path.display())));
    }
    if spec.channels == 0 {
        return Err(SimulationError::audio(format!("No channels in {}", path.display())));
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| SimulationError::audio(format!("Failed to read {}: {}", path.display(), e)))?,
        (SampleFormat::Int, bits @ 8..=32) => {
            let full_scale = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| SimulationError::audio(format!("Failed to read {}: {}", path.display(), e)))?
        }
        (format, bits) => {
            return Err(SimulationError::audio(format!(
                "Unsupported WAV encoding in {}: {:?} {}-bit",
                path.display(), format, bits
            )));
        }
    };

    AudioBuffer::from_interleaved(spec.sample_rate, spec.channels as usize, &samples)
}

/// Read a source file, optionally keeping only its first channel, and bring it to `sample_rate`.
pub fn load_audio<P: AsRef<Path>>(path: P, force_mono: bool, sample_rate: Option<u32>) -> Result<AudioBuffer> {
    let mut audio = read_wav(path)?;
    if force_mono && audio.channels() > 1 {
        audio = audio.first_channel();
    }
    match sample_rate {
        Some(rate) if rate != audio.sample_rate() => resample(&audio, rate, LOAD_RESAMPLE_METHOD),
        _ => Ok(audio),
    }
}

/// Write `buffer` as WAV, creating parent directories as needed.
///
/// Integer output clamps to [-1, 1]; float output is written as is.
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &AudioBuffer, format: AudioFormat) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SimulationError::audio(format!("Cannot create output directory: {}", e)))?;
        }
    }

    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: format.bits_per_sample(),
        sample_format: format.to_sample_format(),
    };

    let file = File::create(path)
        .map_err(|e| SimulationError::audio(format!("Cannot create output file {}: {}", path.display(), e)))?;
    let mut writer = WavWriter::new(BufWriter::new(file), spec)
        .map_err(|e| SimulationError::audio(format!("Cannot create WAV writer: {}", e)))?;

    for sample in buffer.to_interleaved() {
        let written = match format {
            AudioFormat::Float32 => writer.write_sample(sample),
            AudioFormat::Int16 => writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0).round() as i16),
        };
        written.map_err(|e| SimulationError::audio(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| SimulationError::audio(format!("Failed to finalize WAV writing: {}", e)))?;

    Ok(())
}
