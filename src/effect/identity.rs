use crate::effect::Effect;

// -------------------------------------------------------------------------------------------------

/// A blank effect, which returns an unmodified copy of its input.
/// Useful as placeholder in [EffectCycle](crate::EffectCycle)s.
#[derive(Default, Clone, Copy, Debug)]
pub struct IdentityEffect;

impl IdentityEffect {
    pub const EFFECT_NAME: &str = "Identity";
}

impl Effect for IdentityEffect {
    fn name(&self) -> &'static str {
        Self::EFFECT_NAME
    }

    fn process(&self, input: &[f32]) -> Vec<f32> {
        input.to_vec()
    }
}
