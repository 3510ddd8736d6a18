//! Tapering envelopes applied to grains before they are merged.

use std::f64::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Builtin, symmetric grain window shapes.
///
/// All shapes are 0 (or near 0) at both ends and reach 1 in the center. Lengths are inclusive
/// of both end points, so a window of length `L` is evaluated at phases `i / (L - 1)`.
#[derive(
    Default,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum WindowMode {
    /// Raised cosine. Sums to a constant when overlapped by half its length.
    #[default]
    Hann,
    /// Classic DSP window with steep spectral rolloff (a0=0.42, a1=0.5, a2=0.08).
    Blackman,
    /// Linear rise to the center, linear fall.
    Triangle,
    /// Tapered cosine with a flat center (alpha = 0.5).
    Tukey,
    /// Linear ramps over 10% of the length at each side with a flat center.
    Trapezoid,
}

impl WindowMode {
    /// Evaluate the window at the normalized phase [0.0, 1.0].
    pub fn sample(&self, phase: f64) -> f64 {
        debug_assert!((0.0..=1.0).contains(&phase));
        match self {
            WindowMode::Hann => 0.5 * (1.0 - (2.0 * PI * phase).cos()),
            WindowMode::Blackman => {
                let value =
                    0.42 - 0.5 * (2.0 * PI * phase).cos() + 0.08 * (4.0 * PI * phase).cos();
                // the blackman end points evaluate to a tiny negative value
                value.max(0.0)
            }
            WindowMode::Triangle => {
                if phase < 0.5 {
                    2.0 * phase
                } else {
                    2.0 * (1.0 - phase)
                }
            }
            WindowMode::Tukey => {
                let width = 0.25;
                if phase < width {
                    0.5 * (1.0 - (PI * phase / width).cos())
                } else if phase > 1.0 - width {
                    0.5 * (1.0 - (PI * (1.0 - phase) / width).cos())
                } else {
                    1.0
                }
            }
            WindowMode::Trapezoid => {
                let ramp_width = 0.1;
                if phase < ramp_width {
                    phase / ramp_width
                } else if phase > 1.0 - ramp_width {
                    (1.0 - phase) / ramp_width
                } else {
                    1.0
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Generates a taper envelope of a given length.
///
/// Implemented for all [WindowMode]s and for closures of type `Fn(usize) -> Vec<f32>`, so custom
/// window shapes can be passed wherever a builtin one is expected. Implementations must return
/// exactly `len` values.
pub trait WindowFunction: Send + Sync {
    fn generate(&self, len: usize) -> Vec<f32>;
}

impl WindowFunction for WindowMode {
    fn generate(&self, len: usize) -> Vec<f32> {
        match len {
            0 => Vec::new(),
            1 => vec![1.0],
            _ => {
                let last = (len - 1) as f64;
                (0..len)
                    .map(|i| self.sample(i as f64 / last) as f32)
                    .collect()
            }
        }
    }
}

impl<F> WindowFunction for F
where
    F: Fn(usize) -> Vec<f32> + Send + Sync,
{
    fn generate(&self, len: usize) -> Vec<f32> {
        self(len)
    }
}

// -------------------------------------------------------------------------------------------------

/// Rising half of a raised cosine of the given length: starts at 0 and approaches 1.
/// `fade_in_curve(len)[i] + fade_out_curve(len)[i]` is 1 for every `i`.
pub fn fade_in_curve(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (0.5 * (1.0 - (PI * i as f64 / len as f64).cos())) as f32)
        .collect()
}

/// Falling counterpart of [fade_in_curve].
pub fn fade_out_curve(len: usize) -> Vec<f32> {
    fade_in_curve(len).into_iter().map(|v| 1.0 - v).collect()
}

// -------------------------------------------------------------------------------------------------
