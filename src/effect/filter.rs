use crate::{
    effect::Effect,
    utils::biquad::{ButterworthFilter, FilterType},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Butterworth style filter effect, built from cascaded state variable biquads.
#[derive(Clone)]
pub struct FilterEffect {
    filter_type: FilterType,
    cutoff: f32,
    order: usize,
    filter: ButterworthFilter,
}

impl FilterEffect {
    pub const EFFECT_NAME: &str = "Filter";

    /// Create a new filter with the given type, cutoff frequency in Hz and filter order.
    pub fn new(
        filter_type: FilterType,
        cutoff: f32,
        order: usize,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        let filter = ButterworthFilter::new(filter_type, order, sample_rate, cutoff)?;
        Ok(Self {
            filter_type,
            cutoff,
            order,
            filter,
        })
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn order(&self) -> usize {
        self.order
    }
}

impl Effect for FilterEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn process(&self, input: &[f32]) -> Vec<f32> {
        self.filter.process(input)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stateless_processing() {
        let effect = FilterEffect::new(FilterType::Lowpass, 440.0, 2, 44100).unwrap();
        assert_eq!(effect.order(), 2);
        let impulse = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        // every call starts from a cleared state
        let first = effect.process(&impulse);
        let second = effect.process(&impulse);
        assert_eq!(first, second);
        assert_eq!(first.len(), impulse.len());
    }

    #[test]
    fn invalid_cutoff() {
        assert!(FilterEffect::new(FilterType::Highpass, 0.0, 2, 44100).is_err());
        assert!(FilterEffect::new(FilterType::Highpass, 50.0, 0, 44100).is_err());
    }
}
