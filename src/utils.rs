//! Level conversion, buffer layout and filter helpers shared by the render stages.

pub mod biquad;
pub mod buffer;
pub mod decoder;

// -------------------------------------------------------------------------------------------------

const MINUS_INF_IN_DB: f32 = -200.0f32;

const LIN_TO_DB_FACTOR: f32 = 20.0f32 / std::f32::consts::LN_10;
const DB_TO_LIN_FACTOR: f32 = std::f32::consts::LN_10 / 20.0f32;

// -------------------------------------------------------------------------------------------------

/// Convert a linear amplitude into decibels. Values below 1e-12 map to -200 dB.
pub fn linear_to_db(value: f32) -> f32 {
    if value == 1.0 {
        return 0.0; // avoid rounding errors at exactly 0 dB
    } else if value > 1e-12f32 {
        return value.ln() * LIN_TO_DB_FACTOR;
    }
    MINUS_INF_IN_DB
}

/// Convert decibels into a linear amplitude. Values at or below -200 dB map to 0.
pub fn db_to_linear(value: f32) -> f32 {
    if value == 0.0f32 {
        return 1.0f32; // avoid rounding errors at exactly 0 dB
    } else if value > MINUS_INF_IN_DB {
        return (value * DB_TO_LIN_FACTOR).exp();
    }
    0.0f32
}

// -------------------------------------------------------------------------------------------------

/// Absolute peak value of the given samples. Non-finite samples are ignored.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |max, s| max.max(s.abs()))
}

/// Root mean square of the given samples, accumulated in double precision.
/// Returns 0 for empty slices.
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum = samples
        .iter()
        .fold(0.0f64, |sum, s| sum + (*s as f64) * (*s as f64));
    (sum / samples.len() as f64).sqrt()
}

/// Replace all non-finite samples with 0. Returns the number of replaced samples.
pub fn zero_non_finite(samples: &mut [f32]) -> usize {
    let mut replaced = 0;
    for sample in samples.iter_mut() {
        if !sample.is_finite() {
            *sample = 0.0;
            replaced += 1;
        }
    }
    replaced
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_db_conversion() {
        assert_eq!(linear_to_db(1.0), 0.0);
        assert_eq!(linear_to_db(0.0), MINUS_INF_IN_DB);
        assert_eq!(db_to_linear(MINUS_INF_IN_DB), 0.0);
        assert_eq!(db_to_linear(0.0), 1.0);
        assert!((linear_to_db(db_to_linear(20.0)) - 20.0).abs() < 0.0001);
        assert!((linear_to_db(db_to_linear(-20.0)) + 20.0).abs() < 0.0001);
        assert!((db_to_linear(-6.0) - 0.501_187).abs() < 0.0001);
    }

    #[test]
    fn measurements() {
        assert_eq!(peak(&[0.1, -0.5, f32::NAN, 0.2]), 0.5);
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-9);

        let mut samples = [1.0, f32::INFINITY, f32::NAN, -1.0];
        assert_eq!(zero_non_finite(&mut samples), 2);
        assert_eq!(samples, [1.0, 0.0, 0.0, -1.0]);
    }
}
