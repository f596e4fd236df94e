//! Biquad shelving and peaking filters for frequency-response shaping.
//!
//! Coefficients follow the Audio EQ Cookbook with a fixed Q of 1/sqrt(2).

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::audio::AudioBuffer;
use crate::error::{SimulationError, Result};

/// Biquad filter coefficients, normalized by `a0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    pub fn low_shelf(frequency: f64, db_gain: f64, q: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(db_gain / 40.0);
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let beta = omega.sin() * a.sqrt() / q;

        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * cos_omega + beta),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
            a * ((a + 1.0) - (a - 1.0) * cos_omega - beta),
            (a + 1.0) + (a - 1.0) * cos_omega + beta,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
            (a + 1.0) + (a - 1.0) * cos_omega - beta,
        )
    }

    pub fn high_shelf(frequency: f64, db_gain: f64, q: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(db_gain / 40.0);
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let beta = omega.sin() * a.sqrt() / q;

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cos_omega + beta),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
            a * ((a + 1.0) + (a - 1.0) * cos_omega - beta),
            (a + 1.0) - (a - 1.0) * cos_omega + beta,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
            (a + 1.0) - (a - 1.0) * cos_omega - beta,
        )
    }

    pub fn peaking_eq(frequency: f64, db_gain: f64, q: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(db_gain / 40.0);
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos_omega,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_omega,
            1.0 - alpha / a,
        )
    }
}

/// Direct form I biquad state.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, x1: 0.0, x2: 0.0, y1: 0.0, y2: 0.0 }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakBand {
    pub hz: f64,
    pub db: f64,
}

/// Low shelf, high shelf and any number of peaking bands, applied in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct FreqResponse {
    pub low_shelf_hz: f64,
    pub high_shelf_hz: f64,
    pub low_shelf_db: f64,
    pub high_shelf_db: f64,
    pub peaks: Vec<PeakBand>,
}

impl FreqResponse {
    /// Every corner frequency must sit strictly between 0 and Nyquist.
    pub fn validate_for(&self, sample_rate: u32) -> Result<()> {
        let nyquist = sample_rate as f64 / 2.0;
        let corners = [self.low_shelf_hz, self.high_shelf_hz]
            .into_iter()
            .chain(self.peaks.iter().map(|p| p.hz));
        for hz in corners {
            if !(hz > 0.0 && hz < nyquist) {
                return Err(SimulationError::audio(format!(
                    "Filter frequency {} Hz outside (0, {}) Hz", hz, nyquist
                )));
            }
        }
        Ok(())
    }

    pub fn cascade(&self, sample_rate: u32) -> Vec<BiquadCoeffs> {
        let sr = sample_rate as f64;
        let mut stages = vec![
            BiquadCoeffs::low_shelf(self.low_shelf_hz, self.low_shelf_db, FRAC_1_SQRT_2, sr),
            BiquadCoeffs::high_shelf(self.high_shelf_hz, self.high_shelf_db, FRAC_1_SQRT_2, sr),
        ];
        stages.extend(self.peaks.iter().map(|p| BiquadCoeffs::peaking_eq(p.hz, p.db, FRAC_1_SQRT_2, sr)));
        stages
    }
}

/// Run every channel through the shelf/peak cascade.
pub fn nonflat_frequency_response(buffer: &AudioBuffer, response: &FreqResponse) -> Result<AudioBuffer> {
    response.validate_for(buffer.sample_rate())?;
    let stages = response.cascade(buffer.sample_rate());

    let mut out = buffer.clone();
    for ch in 0..out.channels() {
        let mut filters: Vec<BiquadFilter> = stages.iter().copied().map(BiquadFilter::new).collect();
        for sample in out.channel_mut(ch).iter_mut() {
            let y = filters.iter_mut().fold(*sample as f64, |acc, f| f.process(acc));
            *sample = y as f32;
        }
    }
    Ok(out)
}
