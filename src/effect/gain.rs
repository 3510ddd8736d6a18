use crate::{effect::Effect, utils::db_to_linear};

// -------------------------------------------------------------------------------------------------

/// Gain effect that only applies a volume factor.
#[derive(Clone, Copy, Debug)]
pub struct GainEffect {
    gain: f32,
}

impl GainEffect {
    pub const EFFECT_NAME: &str = "Gain";

    const MIN_DB: f32 = -60.0;
    const MAX_DB: f32 = 24.0;

    /// Creates a new `GainEffect` with unity gain.
    pub fn new() -> Self {
        Self { gain: 1.0 }
    }

    /// Creates a new `GainEffect` with the given gain in dB, clamped to [-60, 24] dB.
    pub fn with_gain_db(gain_db: f32) -> Self {
        Self {
            gain: db_to_linear(gain_db.clamp(Self::MIN_DB, Self::MAX_DB)),
        }
    }

    /// The linear gain factor.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Default for GainEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for GainEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn process(&self, input: &[f32]) -> Vec<f32> {
        input.iter().map(|sample| sample * self.gain).collect()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain() {
        assert_eq!(GainEffect::new().process(&[0.5, -0.5]), vec![0.5, -0.5]);
        let output = GainEffect::with_gain_db(-6.0).process(&[1.0]);
        assert!((output[0] - 0.501_187).abs() < 0.0001);
        // clamped
        assert!((GainEffect::with_gain_db(-200.0).gain() - 0.001).abs() < 1e-6);
    }
}
