use std::f64;

use strum::{Display, EnumIter, EnumString};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Available filter types for the state variable filters.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FilterType {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

// -------------------------------------------------------------------------------------------------

/// The coefficients that hold parameters and necessary data to process the filter.
///
/// See [BiquadFilter] for more info about the filter implementation.
#[derive(Default, Clone, PartialEq, Debug)]
pub struct BiquadFilterCoefficients {
    filter_type: FilterType,
    sample_rate: u32,
    cutoff: f32,
    q: f32,
    a1: f64,
    a2: f64,
    a3: f64,
    m0: f64,
    m1: f64,
    m2: f64,
}

impl BiquadFilterCoefficients {
    pub fn new(filter_type: FilterType, sample_rate: u32, cutoff: f32, q: f32) -> Result<Self, Error> {
        let mut coefficients = Self {
            filter_type,
            sample_rate,
            cutoff,
            q,
            ..Default::default()
        };
        coefficients.apply()?;
        Ok(coefficients)
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    fn apply(&mut self) -> Result<(), Error> {
        validate_filter_specs(self.sample_rate, self.cutoff)?;
        if self.q <= 0.0 {
            return Err(Error::ParameterError(format!(
                "Invalid filter Q: must be > 0, but is {q}",
                q = self.q
            )));
        }
        let g = f64::tan(f64::consts::PI * self.cutoff as f64 / self.sample_rate as f64);
        let k = 1.0 / self.q as f64;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
        (self.m0, self.m1, self.m2) = match self.filter_type {
            FilterType::Lowpass => (0.0, 0.0, 1.0),
            FilterType::Highpass => (1.0, -k, -1.0),
            FilterType::Bandpass => (0.0, 1.0, 0.0),
            FilterType::Notch => (1.0, -k, 0.0),
        };
        Ok(())
    }
}

fn validate_filter_specs(sample_rate: u32, cutoff: f32) -> Result<(), Error> {
    if sample_rate == 0 {
        return Err(Error::ParameterError(
            "Invalid filter sample-rate: must be > 0".to_string(),
        ));
    }
    if cutoff <= 0.0 || cutoff >= sample_rate as f32 / 2.0 {
        return Err(Error::ParameterError(format!(
            "Invalid filter frequency: must be in range (0, nyquist {n}), but is {cutoff}",
            n = sample_rate as f32 / 2.0,
        )));
    }
    Ok(())
}

// -------------------------------------------------------------------------------------------------

/// State variable biquad filter, designed by Andrew Simper of Cytomic.
/// See <http://cytomic.com/files/dsp/SvfLinearTrapOptimised2.pdf>
///
/// This is a second-order filter. It has a cutoff slope of 12 dB/octave. Q = 0.707 means no
/// resonant peaking.
#[derive(Default, Clone)]
pub struct BiquadFilter {
    ic1eq: f64,
    ic2eq: f64,
}

impl BiquadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the filter on a single sample.
    #[inline]
    pub fn process_sample(&mut self, coefficients: &BiquadFilterCoefficients, input: f64) -> f64 {
        let v0 = input;
        let v3 = v0 - self.ic2eq;
        let v1 = coefficients.a1 * self.ic1eq + coefficients.a2 * v3;
        let v2 = self.ic2eq + coefficients.a2 * self.ic1eq + coefficients.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        coefficients.m0 * v0 + coefficients.m1 * v1 + coefficients.m2 * v2
    }
}

// -------------------------------------------------------------------------------------------------

/// Topology preserving one pole filter, used for odd butterworth orders.
#[derive(Default, Clone, Debug)]
struct OnePoleFilter {
    g: f64,
    highpass: bool,
    state: f64,
}

impl OnePoleFilter {
    fn new(filter_type: FilterType, sample_rate: u32, cutoff: f32) -> Self {
        let g = f64::tan(f64::consts::PI * cutoff as f64 / sample_rate as f64);
        Self {
            g: g / (1.0 + g),
            highpass: filter_type == FilterType::Highpass,
            state: 0.0,
        }
    }

    #[inline]
    fn process_sample(&mut self, input: f64) -> f64 {
        let v = (input - self.state) * self.g;
        let lowpass = v + self.state;
        self.state = lowpass + v;
        if self.highpass {
            input - lowpass
        } else {
            lowpass
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A butterworth style filter of arbitrary order, built from cascaded [BiquadFilter] sections
/// with butterworth pole Q values. Odd lowpass and highpass orders get an extra one pole stage.
/// Bandpass and notch filters use `ceil(order / 2)` sections with a butterworth Q.
#[derive(Clone)]
pub struct ButterworthFilter {
    sections: Vec<(BiquadFilterCoefficients, BiquadFilter)>,
    one_pole: Option<OnePoleFilter>,
}

impl ButterworthFilter {
    pub fn new(
        filter_type: FilterType,
        order: usize,
        sample_rate: u32,
        cutoff: f32,
    ) -> Result<Self, Error> {
        if order == 0 {
            return Err(Error::ParameterError(
                "Invalid filter order: must be > 0".to_string(),
            ));
        }
        validate_filter_specs(sample_rate, cutoff)?;
        let mut sections = Vec::new();
        let mut one_pole = None;
        match filter_type {
            FilterType::Lowpass | FilterType::Highpass => {
                for k in 0..order / 2 {
                    let angle = f64::consts::PI * (2 * k + 1) as f64 / (2 * order) as f64;
                    let q = 1.0 / (2.0 * angle.cos());
                    let coefficients =
                        BiquadFilterCoefficients::new(filter_type, sample_rate, cutoff, q as f32)?;
                    sections.push((coefficients, BiquadFilter::new()));
                }
                if order % 2 == 1 {
                    one_pole = Some(OnePoleFilter::new(filter_type, sample_rate, cutoff));
                }
            }
            FilterType::Bandpass | FilterType::Notch => {
                for _ in 0..order.div_ceil(2) {
                    let coefficients = BiquadFilterCoefficients::new(
                        filter_type,
                        sample_rate,
                        cutoff,
                        f64::consts::FRAC_1_SQRT_2 as f32,
                    )?;
                    sections.push((coefficients, BiquadFilter::new()));
                }
            }
        }
        Ok(Self { sections, one_pole })
    }

    /// Filter the given buffer into a new buffer, starting from a cleared filter state.
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        let mut sections = self.sections.clone();
        let mut one_pole = self.one_pole.clone();
        input
            .iter()
            .map(|sample| {
                let mut value = *sample as f64;
                for (coefficients, filter) in sections.iter_mut() {
                    value = filter.process_sample(coefficients, value);
                }
                if let Some(one_pole) = one_pole.as_mut() {
                    value = one_pole.process_sample(value);
                }
                value as f32
            })
            .collect()
    }
}

// -------------------------------------------------------------------------------------------------
