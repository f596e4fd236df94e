//! Per-sample simulation pipeline
//!
//! One manifest row goes through a fixed sequence of stages:
//! load, loudness shaping of the dry speech, reverberation, primary noise
//! mixing (additive or wind), the remaining recipe steps in order, a length
//! check, joint peak normalization, and finally writing the outputs.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use crate::audio::{load_audio, write_wav, AudioBuffer, AudioFormat};
use crate::augment::{AugmentationPlan, AugmentationStep};
use crate::error::{SimulationError, Result};
use crate::manifest::ManifestEntry;
use crate::registry::SourceRegistry;
use crate::rng::create_rng;
use crate::transforms::{
    apply_loudness_transition, apply_packet_loss, bandwidth_limitation, clip_by_quantile, codec_compression,
    convolve_truncate, mix_noise, nonflat_frequency_response, wind_noise, EarlyRirEstimator, LossyCodec,
    PeakWindowEstimator, SidechainCompressor,
};
use super::common::normalize_jointly;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOptions {
    /// Keep only the first channel of every source.
    pub force_mono: bool,
    pub store_noise: bool,
    pub output_format: AudioFormat,
    /// Peak of the loudest output after normalization.
    pub headroom: f32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            force_mono: true,
            store_noise: false,
            output_format: AudioFormat::Int16,
            headroom: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    LoudnessTransition,
    Reverberation,
    PrimaryNoise,
    SecondarySteps,
    LengthCheck,
    Normalization,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::LoudnessTransition => "loudness transition",
            Stage::Reverberation => "reverberation",
            Stage::PrimaryNoise => "primary noise",
            Stage::SecondarySteps => "secondary steps",
            Stage::LengthCheck => "length check",
            Stage::Normalization => "normalization",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Normalized outputs of one row, ready to be written.
#[derive(Debug, Clone)]
pub struct RenderedSample {
    pub clean: AudioBuffer,
    pub noisy: AudioBuffer,
    pub noise: AudioBuffer,
    pub gain: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub uid: String,
    pub frames: usize,
    pub noise_written: bool,
    pub elapsed_ms: u64,
}

/// Parse and validate a row's recipe and resolve every source it names.
///
/// Touches no audio, so it doubles as the dry-run check.
pub fn check_entry(registry: &SourceRegistry, entry: &ManifestEntry) -> Result<AugmentationPlan> {
    let plan = AugmentationPlan::parse(&entry.augmentation)?;
    plan.validate_for(entry.sample_rate)?;

    registry.speech_path(&entry.speech_uid)?;
    registry.noise_path(&entry.noise_uid)?;
    if let Some(rir_uid) = &entry.rir_uid {
        registry.rir_path(rir_uid)?;
    }

    let wind_steps = plan.wind_noise_steps().len();
    if registry.is_wind_noise(&entry.noise_uid) && wind_steps != 1 {
        return Err(SimulationError::unsupported(
            &entry.augmentation,
            format!(
                "wind-noise source `{}` needs exactly one wind_noise step, found {}",
                entry.noise_uid, wind_steps
            ),
        ));
    }
    Ok(plan)
}

/// Renders manifest rows against a shared registry and shared backends.
pub struct SampleSimulator<'a> {
    registry: &'a SourceRegistry,
    options: SimulationOptions,
    early_rir: Arc<dyn EarlyRirEstimator>,
    sidechain: Arc<dyn SidechainCompressor>,
    codec: Arc<dyn LossyCodec>,
}

impl<'a> SampleSimulator<'a> {
    pub fn new(
        registry: &'a SourceRegistry,
        options: SimulationOptions,
        sidechain: Arc<dyn SidechainCompressor>,
        codec: Arc<dyn LossyCodec>,
    ) -> Self {
        Self {
            registry,
            options,
            early_rir: Arc::new(PeakWindowEstimator::default()),
            sidechain,
            codec,
        }
    }

    pub fn with_early_rir(mut self, estimator: Arc<dyn EarlyRirEstimator>) -> Self {
        self.early_rir = estimator;
        self
    }

    /// Render and write one row.
    pub fn simulate(&self, entry: &ManifestEntry) -> Result<SampleOutcome> {
        let start = Instant::now();
        let rendered = self.render(entry)?;
        let noise_written = self.persist(entry, &rendered)?;
        Ok(SampleOutcome {
            uid: entry.id.clone(),
            frames: rendered.noisy.num_frames(),
            noise_written,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Run every stage except writing.
    pub fn render(&self, entry: &ManifestEntry) -> Result<RenderedSample> {
        let uid = entry.id.as_str();
        let fs = entry.sample_rate;
        let mono = self.options.force_mono;

        debug!("[{}] {}", uid, Stage::Load);
        let plan = check_entry(self.registry, entry)?;
        let speech = load_audio(self.registry.speech_path(&entry.speech_uid)?, mono, Some(fs))?;
        let noise_source = load_audio(self.registry.noise_path(&entry.noise_uid)?, mono, Some(fs))?;

        debug!("[{}] {}", uid, Stage::LoudnessTransition);
        let mut dry = speech.clone();
        for groups in plan.loudness_transitions() {
            apply_loudness_transition(&mut dry, groups);
        }

        debug!("[{}] {}", uid, Stage::Reverberation);
        let (reverberant, mut clean) = match &entry.rir_uid {
            Some(rir_uid) => {
                let rir = load_audio(self.registry.rir_path(rir_uid)?, mono, Some(fs))?;
                let reverberant = convolve_truncate(&dry, &rir)?;
                let early = self.early_rir.early_rir(&rir)?;
                (reverberant, convolve_truncate(&speech, &early)?)
            }
            None => (dry, speech),
        };

        debug!("[{}] {}", uid, Stage::PrimaryNoise);
        let mut rng = create_rng(uid);
        let wind_steps = plan.wind_noise_steps();
        let (mut noisy, mut noise) = if self.registry.is_wind_noise(&entry.noise_uid) {
            let [params] = wind_steps.as_slice() else {
                return Err(SimulationError::unsupported(&entry.augmentation, "wind-noise source without a single wind_noise step"));
            };
            wind_noise(&reverberant, &noise_source, entry.snr_db, params, uid, &mut rng, self.sidechain.as_ref())?
        } else {
            if !wind_steps.is_empty() {
                warn!("[{}] ignoring wind_noise step for non-wind noise `{}`", uid, entry.noise_uid);
            }
            mix_noise(&reverberant, &noise_source, entry.snr_db, &mut rng)?
        };

        debug!("[{}] {}", uid, Stage::SecondarySteps);
        for step in plan.secondary_steps() {
            let channels = noisy.channels();
            let frames = noisy.num_frames();
            noisy = self.apply_step(step, noisy, uid)?;
            noisy.ensure_shape(channels, frames, step.name())?;
        }

        debug!("[{}] {}", uid, Stage::LengthCheck);
        if noisy.num_frames() != entry.length {
            return Err(SimulationError::length_mismatch(uid, entry.length, noisy.num_frames()));
        }

        debug!("[{}] {}", uid, Stage::Normalization);
        let gain = normalize_jointly(&mut [&mut noisy, &mut clean, &mut noise], self.options.headroom);

        Ok(RenderedSample { clean, noisy, noise, gain })
    }

    fn apply_step(&self, step: &AugmentationStep, mut noisy: AudioBuffer, uid: &str) -> Result<AudioBuffer> {
        match step {
            AugmentationStep::BandwidthLimitation { method, target_rate } => {
                bandwidth_limitation(&noisy, *target_rate, *method)
            }
            AugmentationStep::Clipping { min_quantile, max_quantile } => {
                clip_by_quantile(&mut noisy, *min_quantile, *max_quantile)?;
                Ok(noisy)
            }
            AugmentationStep::NonflatFreqResponse(response) => nonflat_frequency_response(&noisy, response),
            AugmentationStep::Codec { vbr_quality } => codec_compression(&noisy, *vbr_quality, self.codec.as_ref(), uid),
            AugmentationStep::PacketLoss { indices, packet_duration_ms } => {
                apply_packet_loss(&mut noisy, indices, *packet_duration_ms);
                Ok(noisy)
            }
            AugmentationStep::None | AugmentationStep::LoudnessTransition(_) | AugmentationStep::WindNoise(_) => Ok(noisy),
        }
    }

    /// Write clean and noisy, plus noise when asked for and the row names a path.
    ///
    /// Returns whether the noise file was written.
    pub fn persist(&self, entry: &ManifestEntry, rendered: &RenderedSample) -> Result<bool> {
        debug!("[{}] {}", entry.id, Stage::Persist);
        let format = self.options.output_format;
        write_wav(&entry.clean_path, &rendered.clean, format)?;
        write_wav(&entry.noisy_path, &rendered.noisy, format)?;

        if !self.options.store_noise {
            return Ok(false);
        }
        match &entry.noise_path {
            Some(path) => {
                write_wav(path, &rendered.noise, format)?;
                Ok(true)
            }
            None => {
                warn!("[{}] store_noise is set but the row has no noise_path", entry.id);
                Ok(false)
            }
        }
    }
}
