//! Post-merge leveling of a signal's short-term energy envelope.

use crate::{
    signal::Signal,
    utils::{db_to_linear, rms, zero_non_finite},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Options for the [EqualEnergyNormalizer].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualEnergyOptions {
    /// Peak level of the normalized signal in dB. By default -3 dB.
    pub target_db: f32,
    /// Size of the non-overlapping RMS measurement windows in frames. By default 22050.
    pub window_size: usize,
    /// Upper bound of all correction scalars. Scalars are clamped to
    /// `[1 / max_scalar, max_scalar]`. By default 10.
    pub max_scalar: f32,
}

impl Default for EqualEnergyOptions {
    fn default() -> Self {
        Self {
            target_db: -3.0,
            window_size: 22050,
            max_scalar: 10.0,
        }
    }
}

impl EqualEnergyOptions {
    pub fn with_target_db(mut self, target_db: f32) -> Self {
        self.target_db = target_db;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_max_scalar(mut self, max_scalar: f32) -> Self {
        self.max_scalar = max_scalar;
        self
    }

    /// Validate all parameters. Returns `Error::ParameterError` on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.target_db.is_finite() {
            return Err(Error::ParameterError(format!(
                "Equal energy target level must be finite, got {}",
                self.target_db
            )));
        }
        if self.window_size == 0 {
            return Err(Error::ParameterError(
                "Equal energy window size must be > 0".to_string(),
            ));
        }
        if !(self.max_scalar.is_finite() && self.max_scalar >= 1.0) {
            return Err(Error::ParameterError(format!(
                "Equal energy max scalar must be a finite value >= 1, got {}",
                self.max_scalar
            )));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Holds a signal's short-term RMS energy constant over time.
///
/// Each channel is measured in non-overlapping windows. Between two window centers the measured
/// energy is interpolated linearly, sample by sample, and the correction is its reciprocal. The
/// first and last half windows use the first and last measurement. Finally the whole signal is
/// scaled by a single factor, so its peak hits the target level.
///
/// All correction scalars are clamped to `[1 / max_scalar, max_scalar]`: silent or non-finite
/// measurements use `max_scalar`. Non-finite output samples are replaced with 0.
#[derive(Debug, Clone, Default)]
pub struct EqualEnergyNormalizer {
    options: EqualEnergyOptions,
}

impl EqualEnergyNormalizer {
    pub fn new(options: EqualEnergyOptions) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &EqualEnergyOptions {
        &self.options
    }

    /// Normalize the given planar signal. Mono signals fail with [Error::ShapeError]: use
    /// [Signal::into_planar] to add an explicit channel dimension.
    pub fn process(&self, signal: &Signal) -> Result<Signal, Error> {
        let channels = signal.planar()?;
        let mut output = Signal::Planar(
            channels
                .iter()
                .map(|channel| self.level_channel(channel))
                .collect(),
        );

        let signal_peak = output.peak();
        if signal_peak > 0.0 {
            let target = db_to_linear(self.options.target_db) as f64;
            let scalar = self.clamp(target / signal_peak as f64);
            log::debug!("Applying global equal energy scalar {scalar:.3}");
            output.scale(scalar as f32);
        } else {
            log::warn!("Equal energy normalization of a silent signal");
        }

        let replaced = output
            .channels_mut()
            .map(|channel| zero_non_finite(channel))
            .sum::<usize>();
        if replaced > 0 {
            log::warn!("Replaced {replaced} non-finite samples after equal energy normalization");
        }
        Ok(output)
    }

    fn clamp(&self, scalar: f64) -> f64 {
        let max = self.options.max_scalar as f64;
        scalar.clamp(1.0 / max, max)
    }

    /// Clamped reciprocal of an energy value.
    fn correction(&self, energy: f64) -> f64 {
        if energy.is_finite() && energy > 0.0 {
            self.clamp(1.0 / energy)
        } else {
            self.options.max_scalar as f64
        }
    }

    fn level_channel(&self, samples: &[f32]) -> Vec<f32> {
        let window_size = self.options.window_size;
        let energies = samples.chunks(window_size).map(rms).collect::<Vec<_>>();
        let degenerate = energies
            .iter()
            .filter(|e| !(e.is_finite() && **e > 0.0))
            .count();
        if degenerate > 0 {
            log::warn!(
                "{degenerate} of {} energy measurements are silent or non-finite",
                energies.len()
            );
        }
        log::debug!(
            "Measured {} energy windows of {window_size} frames",
            energies.len()
        );

        let (Some(first), Some(last)) = (energies.first(), energies.last()) else {
            return Vec::new();
        };
        let half_window = window_size / 2;
        samples
            .iter()
            .enumerate()
            .map(|(frame, sample)| {
                let energy = if frame < half_window {
                    *first
                } else {
                    // interpolate between the centers of window `index` and `index + 1`
                    let index = (frame - half_window) / window_size;
                    match energies.get(index + 1) {
                        Some(next) => {
                            let center = index * window_size + half_window;
                            let fraction = (frame - center) as f64 / window_size as f64;
                            energies[index] + (next - energies[index]) * fraction
                        }
                        None => *last,
                    }
                };
                (*sample as f64 * self.correction(energy)) as f32
            })
            .collect()
    }
}

/// Shortcut for `EqualEnergyNormalizer::new(options)?.process(signal)`.
pub fn force_equal_energy(signal: &Signal, options: EqualEnergyOptions) -> Result<Signal, Error> {
    EqualEnergyNormalizer::new(options)?.process(signal)
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn square(amplitude: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    #[test]
    fn options() {
        assert!(EqualEnergyOptions::default().validate().is_ok());
        assert!(EqualEnergyOptions::default()
            .with_window_size(0)
            .validate()
            .is_err());
        assert!(EqualEnergyOptions::default()
            .with_max_scalar(0.5)
            .validate()
            .is_err());
        assert!(EqualEnergyOptions::default()
            .with_target_db(f32::NAN)
            .validate()
            .is_err());
        let invalid = EqualEnergyOptions::default().with_window_size(0);
        assert!(EqualEnergyNormalizer::new(invalid).is_err());
    }

    #[test]
    fn mono_is_rejected() {
        let signal = Signal::Mono(vec![0.5; 100]);
        assert!(matches!(
            force_equal_energy(&signal, EqualEnergyOptions::default()),
            Err(Error::ShapeError(_))
        ));
        let planar = signal.into_planar();
        assert!(force_equal_energy(&planar, EqualEnergyOptions::default()).is_ok());
    }

    #[test]
    fn constant_input_is_scaled_only() {
        let input = vec![vec![0.5; 1000], vec![-0.25; 1000]];
        let signal = Signal::from_channels(input.clone()).unwrap();
        let options = EqualEnergyOptions::default()
            .with_target_db(-6.0)
            .with_window_size(100);
        let output = force_equal_energy(&signal, options).unwrap();
        let channels = output.planar().unwrap();

        for (input, output) in input.iter().zip(channels.iter()) {
            let scalar = output[0] / input[0];
            for (i, o) in input.iter().zip(output.iter()) {
                assert!((o / i - scalar).abs() < 1e-5);
            }
        }
        assert!((output.peak() - db_to_linear(-6.0)).abs() < 1e-5);
    }

    #[test]
    fn envelope_is_leveled() {
        let mut channel = square(0.2, 2000);
        channel.extend(square(0.8, 2000));
        let signal = Signal::from_channels(vec![channel]).unwrap();
        let options = EqualEnergyOptions::default()
            .with_target_db(0.0)
            .with_window_size(200);
        let output = force_equal_energy(&signal, options).unwrap();
        let samples = &output.planar().unwrap()[0];
        assert_eq!(samples.len(), 4000);

        let quiet = rms(&samples[200..1800]);
        let loud = rms(&samples[2200..3800]);
        assert!((quiet - loud).abs() < 1e-4, "{quiet} != {loud}");
        assert!((output.peak() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn energy_is_interpolated_between_centers() {
        let mut channel = vec![0.4; 100];
        channel.extend(vec![0.1; 100]);
        let signal = Signal::from_channels(vec![channel]).unwrap();
        let options = EqualEnergyOptions::default().with_window_size(100);
        let output = force_equal_energy(&signal, options).unwrap();
        let samples = &output.planar().unwrap()[0];

        // frame 100 lies halfway between both window centers: its energy is 0.25, so the
        // input of 0.1 gets scaled by 4 while the first window gets scaled by 2.5.
        // Interpolating the scalars instead would give 0.1 * (2.5 + 10) / 2 = 0.625.
        let ratio = samples[100] / samples[0];
        assert!((ratio - 0.4).abs() < 1e-4, "{ratio}");
    }

    #[test]
    fn partial_last_window() {
        let signal = Signal::from_channels(vec![square(0.5, 250)]).unwrap();
        let options = EqualEnergyOptions::default().with_window_size(100);
        let output = force_equal_energy(&signal, options).unwrap();
        assert_eq!(output.frame_count(), 250);
        let samples = &output.planar().unwrap()[0];
        let target = db_to_linear(-3.0);
        assert!(samples.iter().all(|s| (s.abs() - target).abs() < 1e-5));
    }

    #[test]
    fn scalars_are_clamped() {
        let signal = Signal::from_channels(vec![vec![0.001; 500]]).unwrap();
        let options = EqualEnergyOptions::default()
            .with_target_db(0.0)
            .with_window_size(100)
            .with_max_scalar(10.0);
        let output = force_equal_energy(&signal, options).unwrap();
        // 10x per channel, 10x global
        assert!((output.peak() - 0.1).abs() < 1e-5);
    }

    #[test]
    fn degenerate_input_stays_finite() {
        let silence = Signal::silence(2, 300);
        let output = force_equal_energy(&silence, EqualEnergyOptions::default()).unwrap();
        assert_eq!(output, silence);

        let mut channel = square(0.5, 300);
        channel[10] = f32::NAN;
        channel[250] = f32::INFINITY;
        let signal = Signal::from_channels(vec![channel, vec![0.0; 300]]).unwrap();
        let options = EqualEnergyOptions::default().with_window_size(100);
        let output = force_equal_energy(&signal, options).unwrap();
        assert!(output.channels().flatten().all(|s| s.is_finite()));

        let empty = Signal::from_channels(vec![Vec::new()]).unwrap();
        let output = force_equal_energy(&empty, EqualEnergyOptions::default()).unwrap();
        assert_eq!(output.frame_count(), 0);
    }
}
