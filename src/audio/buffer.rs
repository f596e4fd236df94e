//! Channel-major sample buffer

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, s};
use crate::error::{SimulationError, Result};

/// Audio samples laid out as `channels x frames`, plus the sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    data: Array2<f32>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, data: Array2<f32>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SimulationError::audio("Sample rate cannot be 0"));
        }
        if data.nrows() == 0 {
            return Err(SimulationError::audio("Audio buffer must have at least one channel"));
        }
        Ok(Self { sample_rate, data })
    }

    pub fn from_mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        let frames = samples.len();
        let data = Array2::from_shape_vec((1, frames), samples)
            .map_err(|e| SimulationError::audio(format!("Invalid mono layout: {}", e)))?;
        Self::new(sample_rate, data)
    }

    /// Builds a buffer from interleaved samples (`frame0_ch0, frame0_ch1, ...`).
    pub fn from_interleaved(sample_rate: u32, channels: usize, samples: &[f32]) -> Result<Self> {
        if channels == 0 {
            return Err(SimulationError::audio("Channel count must be greater than 0"));
        }
        if samples.len() % channels != 0 {
            return Err(SimulationError::audio(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(), channels
            )));
        }
        let frames = samples.len() / channels;
        let mut data = Array2::zeros((channels, frames));
        for (i, frame) in samples.chunks_exact(channels).enumerate() {
            for (ch, &sample) in frame.iter().enumerate() {
                data[[ch, i]] = sample;
            }
        }
        Self::new(sample_rate, data)
    }

    pub fn silent(sample_rate: u32, channels: usize, frames: usize) -> Result<Self> {
        Self::new(sample_rate, Array2::zeros((channels, frames)))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_frames(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    pub fn duration(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f32> {
        &mut self.data
    }

    pub fn channel(&self, index: usize) -> ArrayView1<'_, f32> {
        self.data.row(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> ArrayViewMut1<'_, f32> {
        self.data.row_mut(index)
    }

    /// Keeps only the first channel.
    pub fn first_channel(&self) -> Self {
        Self {
            sample_rate: self.sample_rate,
            data: self.data.slice(s![0..1, ..]).to_owned(),
        }
    }

    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for frame in self.data.axis_iter(Axis(1)) {
            out.extend(frame.iter().copied());
        }
        out
    }

    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    pub fn scale(&mut self, gain: f32) {
        self.data.mapv_inplace(|x| x * gain);
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Crops or zero-pads every channel to `frames`.
    pub fn fit_length(&mut self, frames: usize) {
        let current = self.num_frames();
        if frames == current {
            return;
        }
        if frames < current {
            self.data = self.data.slice(s![.., ..frames]).to_owned();
        } else {
            let mut padded = Array2::zeros((self.channels(), frames));
            padded.slice_mut(s![.., ..current]).assign(&self.data);
            self.data = padded;
        }
    }

    /// Checks the layout produced by a stage against what the caller expects.
    pub fn ensure_shape(&self, channels: usize, frames: usize, stage: &str) -> Result<()> {
        if self.channels() != channels || self.num_frames() != frames {
            return Err(SimulationError::audio(format!(
                "{} produced {}x{} samples, expected {}x{}",
                stage, self.channels(), self.num_frames(), channels, frames
            )));
        }
        Ok(())
    }
}
