use std::f64::consts::PI;

use crate::{effect::Effect, Error};

// -------------------------------------------------------------------------------------------------

/// A single sine partial of an [AmplitudeModulationEffect].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModulationPartial {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Modulation depth.
    pub depth: f64,
    /// Constant offset, which shifts the modulation away from 0.
    pub offset: f64,
}

impl ModulationPartial {
    pub fn new(frequency: f64, depth: f64, offset: f64) -> Self {
        Self {
            frequency,
            depth,
            offset,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Constant amplitude modulation. The modulator is the sum of all partials
/// `sin(2 pi f t) * depth + offset`, starting at phase 0 for every processed grain.
#[derive(Clone, Debug)]
pub struct AmplitudeModulationEffect {
    partials: Vec<ModulationPartial>,
    sample_rate: u32,
}

impl AmplitudeModulationEffect {
    pub const EFFECT_NAME: &str = "AmplitudeModulation";

    pub fn new(partials: Vec<ModulationPartial>, sample_rate: u32) -> Result<Self, Error> {
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Invalid modulation sample-rate: must be > 0".to_string(),
            ));
        }
        if partials.is_empty() {
            return Err(Error::ParameterError(
                "Amplitude modulation needs at least one partial".to_string(),
            ));
        }
        Ok(Self {
            partials,
            sample_rate,
        })
    }
}

impl Effect for AmplitudeModulationEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn process(&self, input: &[f32]) -> Vec<f32> {
        let steps = self
            .partials
            .iter()
            .map(|partial| 2.0 * PI * partial.frequency / self.sample_rate as f64)
            .collect::<Vec<_>>();
        input
            .iter()
            .enumerate()
            .map(|(index, sample)| {
                let modulator = self
                    .partials
                    .iter()
                    .zip(steps.iter())
                    .fold(0.0, |sum, (partial, step)| {
                        sum + (step * index as f64).sin() * partial.depth + partial.offset
                    });
                (*sample as f64 * modulator) as f32
            })
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------
