use std::f64::consts::PI;

use crate::{effect::Effect, Error};

// -------------------------------------------------------------------------------------------------

// Simple Sine wave oscillator used as LFO in the chorus effect
#[derive(Debug, Default)]
struct SineWave {
    phase: f64,
    phase_inc: f64,
}

impl SineWave {
    fn new(rate: f64, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 2.0 * PI * rate / sample_rate as f64,
        }
    }

    // Advances phase and returns new value
    fn move_and_get(&mut self) -> f64 {
        let val = self.phase.sin();
        self.phase += self.phase_inc;
        if self.phase >= 2.0 * PI {
            self.phase -= 2.0 * PI;
        }
        val
    }
}

// -------------------------------------------------------------------------------------------------

// Interpolating Delay Line used in ChorusEffect
#[derive(Debug, Default)]
struct InterpolatingDelayBuffer {
    buffer: Vec<f64>,
    write_pos: usize,
    buffer_mask: usize,
}

impl InterpolatingDelayBuffer {
    fn new(size: usize) -> Self {
        let buffer_size = size.next_power_of_two();
        Self {
            buffer: vec![0.0; buffer_size],
            write_pos: 0,
            buffer_mask: buffer_size - 1,
        }
    }

    fn process_sample(&mut self, input: f64, feedback: f64, delay_pos: f64) -> f64 {
        let read_pos = self.write_pos as f64 - delay_pos;

        let read_pos_floor = read_pos.floor();
        let fraction = read_pos - read_pos_floor;

        let index1 = read_pos_floor as isize;
        let index2 = index1 + 1;

        let val1 = self.buffer[(index1 as usize) & self.buffer_mask];
        let val2 = self.buffer[(index2 as usize) & self.buffer_mask];

        let output = val1 + (val2 - val1) * fraction;

        self.buffer[self.write_pos] = input + output * feedback;
        self.write_pos = (self.write_pos + 1) & self.buffer_mask;

        output
    }
}

// -------------------------------------------------------------------------------------------------

/// Mono chorus effect: a sine LFO modulated, interpolating delay line with feedback,
/// mixed with the dry signal.
#[derive(Clone, Debug)]
pub struct ChorusEffect {
    rate: f64,
    depth: f64,
    delay_ms: f64,
    feedback: f64,
    wet_mix: f64,
    sample_rate: u32,
}

impl ChorusEffect {
    pub const EFFECT_NAME: &str = "Chorus";

    /// Max LFO modulation range in milliseconds at depth 1.
    const MAX_DEPTH_MS: f64 = 10.0;
    /// Max center delay in milliseconds.
    const MAX_DELAY_MS: f64 = 1000.0;

    /// Create a new chorus.
    ///
    /// * `rate`: LFO rate in Hz.
    /// * `depth`: LFO depth in range [0, 1].
    /// * `delay_ms`: Center delay in milliseconds, at most 1000.
    /// * `feedback`: Delay line feedback in range [-1, 1].
    /// * `wet_mix`: Dry/wet mix in range [0, 1].
    pub fn new(
        rate: f64,
        depth: f64,
        delay_ms: f64,
        feedback: f64,
        wet_mix: f64,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Invalid chorus sample-rate: must be > 0".to_string(),
            ));
        }
        let valid_rate = rate.is_finite() && rate >= 0.0;
        if !valid_rate || !(0.0..=Self::MAX_DELAY_MS).contains(&delay_ms) {
            return Err(Error::ParameterError(format!(
                "Chorus rate must be finite and >= 0, delay must be in range [0, {}]",
                Self::MAX_DELAY_MS
            )));
        }
        if !feedback.is_finite() {
            return Err(Error::ParameterError(
                "Chorus feedback must be finite".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&depth) || !(0.0..=1.0).contains(&wet_mix) {
            return Err(Error::ParameterError(
                "Chorus depth and mix must be in range [0, 1]".to_string(),
            ));
        }
        Ok(Self {
            rate,
            depth,
            delay_ms,
            feedback: feedback.clamp(-0.999, 0.999),
            wet_mix,
            sample_rate,
        })
    }
}

impl Effect for ChorusEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn process(&self, input: &[f32]) -> Vec<f32> {
        let ms_to_samples = self.sample_rate as f64 * 0.001;
        let delay_in_samples = self.delay_ms * ms_to_samples;
        let depth_in_samples = Self::MAX_DEPTH_MS * ms_to_samples * self.depth;

        let max_delay = (2.0 + delay_in_samples + 2.0 * depth_in_samples).ceil() as usize + 2;
        let mut delay_buffer = InterpolatingDelayBuffer::new(max_delay);
        let mut lfo = SineWave::new(self.rate, self.sample_rate);

        let dry_amount = 1.0 - self.wet_mix;
        input
            .iter()
            .map(|sample| {
                let input = *sample as f64;
                let delay_pos = 2.0 + delay_in_samples + (1.0 + lfo.move_and_get()) * depth_in_samples;
                let delayed = delay_buffer.process_sample(input, self.feedback, delay_pos);
                (input * dry_amount + delayed * self.wet_mix) as f32
            })
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_passthrough() {
        let chorus = ChorusEffect::new(2.0, 0.5, 20.0, 0.4, 0.0, 44100).unwrap();
        let input = [0.5, -0.25, 1.0];
        assert_eq!(chorus.process(&input), input.to_vec());
    }

    #[test]
    fn delayed_wet_signal() {
        let chorus = ChorusEffect::new(0.0, 0.0, 1.0, 0.0, 1.0, 1000).unwrap();
        let mut impulse = vec![0.0; 16];
        impulse[0] = 1.0;
        let output = chorus.process(&impulse);
        // 1 ms at 1 kHz plus the 2 samples interpolation headroom
        assert!((output[3] - 1.0).abs() < 1e-6);
        assert!(output.iter().enumerate().all(|(i, v)| i == 3 || v.abs() < 1e-6));
    }

    #[test]
    fn invalid_parameters() {
        assert!(ChorusEffect::new(1.0, 2.0, 7.0, 0.0, 0.5, 44100).is_err());
        assert!(ChorusEffect::new(1.0, 0.5, -7.0, 0.0, 0.5, 44100).is_err());
        assert!(ChorusEffect::new(1.0, 0.5, 7.0, 0.0, 0.5, 0).is_err());
        assert!(ChorusEffect::new(f64::NAN, 0.5, 7.0, 0.0, 0.5, 44100).is_err());
        assert!(ChorusEffect::new(f64::INFINITY, 0.5, 7.0, 0.0, 0.5, 44100).is_err());
        assert!(ChorusEffect::new(1.0, 0.5, f64::NAN, 0.0, 0.5, 44100).is_err());
        assert!(ChorusEffect::new(1.0, 0.5, f64::INFINITY, 0.0, 0.5, 44100).is_err());
        assert!(ChorusEffect::new(1.0, 0.5, 7.0, f64::NAN, 0.5, 44100).is_err());
    }
}
