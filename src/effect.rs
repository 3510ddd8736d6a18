pub mod chorus;
pub mod filter;
pub mod gain;
pub mod identity;
pub mod modulation;

// -------------------------------------------------------------------------------------------------

/// Effects transform a grain's mono sample buffer into a new buffer of the same or a compatible
/// length. The input buffer is never mutated, because it may be shared by many placed grains.
///
/// Effects are implemented for plain closures of type `Fn(&[f32]) -> Vec<f32>` too. Stateful
/// DSP (filters, delays) must start from a cleared state in every `process` call, so an effect
/// instance can be reused for any number of grains in any order.
pub trait Effect: Send + Sync {
    /// A static name for the effect, used for logging.
    fn name(&self) -> &'static str;

    /// Process the given buffer into a new one.
    fn process(&self, input: &[f32]) -> Vec<f32>;
}

impl<F> Effect for F
where
    F: Fn(&[f32]) -> Vec<f32> + Send + Sync,
{
    fn name(&self) -> &'static str {
        "Closure"
    }

    fn process(&self, input: &[f32]) -> Vec<f32> {
        self(input)
    }
}

// -------------------------------------------------------------------------------------------------

/// A list of effects which get applied in order to every grain.
#[derive(Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect to the end of the chain.
    pub fn with<E: Effect + 'static>(mut self, effect: E) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Names of all effects, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.effects.iter().map(|effect| effect.name()).collect()
    }

    /// Run the input through all effects. Returns `None` when the chain is empty.
    pub fn process(&self, input: &[f32]) -> Option<Vec<f32>> {
        let mut effects = self.effects.iter();
        let first = effects.next()?;
        let mut output = first.process(input);
        for effect in effects {
            output = effect.process(&output);
        }
        Some(output)
    }
}

// -------------------------------------------------------------------------------------------------

/// A list of effects from which one effect gets picked per grain, by the grain's position in the
/// sequence: `effects[index % effects.len()]`.
#[derive(Default)]
pub struct EffectCycle {
    effects: Vec<Box<dyn Effect>>,
}

impl EffectCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect to the end of the cycle.
    pub fn with<E: Effect + 'static>(mut self, effect: E) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Names of all effects, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.effects.iter().map(|effect| effect.name()).collect()
    }

    /// Effect for the given sequence position, if the cycle is not empty.
    pub fn effect_at(&self, index: usize) -> Option<&dyn Effect> {
        if self.effects.is_empty() {
            None
        } else {
            Some(self.effects[index % self.effects.len()].as_ref())
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{gain::GainEffect, identity::IdentityEffect, *};

    #[test]
    fn chain() {
        let empty = EffectChain::new();
        assert!(empty.process(&[1.0]).is_none());

        let chain = EffectChain::new()
            .with(GainEffect::with_gain_db(0.0))
            .with(|input: &[f32]| input.iter().map(|v| v * 2.0).collect::<Vec<_>>())
            .with(|input: &[f32]| input.iter().map(|v| v + 1.0).collect::<Vec<_>>());
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.names(), vec![GainEffect::EFFECT_NAME, "Closure", "Closure"]);
        assert_eq!(chain.process(&[1.0, 2.0]), Some(vec![3.0, 5.0]));
    }

    #[test]
    fn cycle() {
        let cycle = EffectCycle::new()
            .with(IdentityEffect)
            .with(|input: &[f32]| vec![0.0f32; input.len()]);
        assert_eq!(cycle.names(), vec![IdentityEffect::EFFECT_NAME, "Closure"]);
        assert_eq!(cycle.effect_at(0).unwrap().name(), IdentityEffect::EFFECT_NAME);
        assert_eq!(cycle.effect_at(1).unwrap().name(), "Closure");
        assert_eq!(cycle.effect_at(2).unwrap().name(), IdentityEffect::EFFECT_NAME);
        assert_eq!(cycle.effect_at(3).unwrap().process(&[1.0]), vec![0.0]);
        assert!(EffectCycle::new().effect_at(0).is_none());
    }
}
