//! Augmentation recipes
//!
//! A recipe is the `augmentation` column of a manifest row: steps separated
//! by `/`, each either a bare keyword, `name(key=value,...)`, or the dash
//! form `bandwidth_limitation-<method>-><rate>`. Parsing is strict; every
//! parameter is checked before any audio is touched.

pub mod step;
pub mod value;

use std::fmt;

use crate::error::{SimulationError, Result};
use crate::transforms::{LoudnessGroup, WindNoiseParams};

pub use step::AugmentationStep;
pub use value::{parse_value, Value};

/// Ordered steps of one recipe together with the text they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationPlan {
    source: String,
    steps: Vec<AugmentationStep>,
}

impl AugmentationPlan {
    pub fn parse(spec: &str) -> Result<Self> {
        let steps = spec
            .split('/')
            .map(|text| {
                AugmentationStep::parse(text)
                    .map_err(|reason| SimulationError::unsupported(spec, format!("step `{}`: {}", text.trim(), reason)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { source: spec.to_string(), steps })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn steps(&self) -> &[AugmentationStep] {
        &self.steps
    }

    /// Groups of every `loudness_transition` step, in order.
    pub fn loudness_transitions(&self) -> impl Iterator<Item = &[LoudnessGroup]> + '_ {
        self.steps.iter().filter_map(|step| match step {
            AugmentationStep::LoudnessTransition(groups) => Some(groups.as_slice()),
            _ => None,
        })
    }

    pub fn wind_noise_steps(&self) -> Vec<&WindNoiseParams> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                AugmentationStep::WindNoise(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    /// Steps that run on the noisy signal once noise has been mixed in.
    pub fn secondary_steps(&self) -> impl Iterator<Item = &AugmentationStep> + '_ {
        self.steps.iter().filter(|step| step.is_secondary())
    }

    /// Checks that depend on the sample rate of the row.
    pub fn validate_for(&self, sample_rate: u32) -> Result<()> {
        for step in &self.steps {
            match step {
                AugmentationStep::BandwidthLimitation { target_rate, .. } if *target_rate > sample_rate => {
                    return Err(SimulationError::unsupported(
                        &self.source,
                        format!("bandwidth target {} Hz exceeds the sample rate {} Hz", target_rate, sample_rate),
                    ));
                }
                AugmentationStep::NonflatFreqResponse(response) => {
                    response
                        .validate_for(sample_rate)
                        .map_err(|e| SimulationError::unsupported(&self.source, e.to_string()))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for AugmentationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}
