//! Grain selection policies, which turn a pool of realized grain records into a playback order.

pub mod arrange;

use std::{cmp::Ordering, sync::Arc};

use rand::{seq::SliceRandom, Rng};

use crate::{
    effect::{EffectChain, EffectCycle},
    grain::{GrainFeature, GrainRecord, GrainSequence, PlacedGrain},
    utils::{db_to_linear, peak},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Placement and level options applied to every grain a [Sequencer] emits.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceOptions {
    /// Constant, signed spacing between grains in frames. Negative values overlap grains.
    pub spacing: i64,
    /// Target peak level of each grain in dB. `None` leaves grain levels untouched.
    pub level_db: Option<f32>,
    /// Channel index all grains are placed on.
    pub channel: usize,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            spacing: 0,
            level_db: None,
            channel: 0,
        }
    }
}

impl SequenceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spacing(mut self, spacing: i64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn level_db(mut self, level_db: f32) -> Self {
        self.level_db = Some(level_db);
        self
    }

    pub fn channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Validate all options.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(level_db) = self.level_db {
            if !level_db.is_finite() || level_db > 24.0 {
                return Err(Error::ParameterError(format!(
                    "Grain level must be a finite dB value <= 24, but is {level_db}"
                )));
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Which key of a multi feature sort dominates ties.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SortPrecedence {
    /// The last feature is the primary key. Equivalent to stable re-sorting the pool once per
    /// feature in the given order.
    #[default]
    LastKeyPrimary,
    /// The first feature is the primary key, later features break ties.
    FirstKeyPrimary,
}

/// Features to sort a grain pool by. Grains without a value for a key sort after all grains
/// which have one. Equal keys keep their pool order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSort {
    pub features: Vec<GrainFeature>,
    pub precedence: SortPrecedence,
}

impl FeatureSort {
    pub fn new(features: Vec<GrainFeature>) -> Self {
        Self {
            features,
            precedence: SortPrecedence::default(),
        }
    }

    pub fn precedence(mut self, precedence: SortPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Sort keys from primary to least significant.
    fn keys(&self) -> Vec<GrainFeature> {
        match self.precedence {
            SortPrecedence::FirstKeyPrimary => self.features.clone(),
            SortPrecedence::LastKeyPrimary => self.features.iter().rev().copied().collect(),
        }
    }

    fn compare(keys: &[GrainFeature], a: &GrainRecord, b: &GrainRecord) -> Ordering {
        for key in keys {
            let ordering = match (a.feature(*key), b.feature(*key)) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

// -------------------------------------------------------------------------------------------------

/// Generates an array of `length` linearly spaced values, starting at `start` and stepping
/// towards (but not reaching) `end`. Useful as target curve for [Sequencer::targeted].
pub fn line(start: f32, end: f32, length: usize) -> Vec<f32> {
    if length == 0 {
        return Vec::new();
    }
    let slope = (end - start) / length as f32;
    (0..length).map(|i| slope * i as f32 + start).collect()
}

// -------------------------------------------------------------------------------------------------

/// Orders, selects and repeats realized grain records into a [GrainSequence].
///
/// All selection policies share the same per grain pipeline: the effect chain gets applied first,
/// then one effect of the effect cycle (picked by the grain's position in the emitted sequence),
/// then the grain gets normalized to the target peak level. Grains which pass the pipeline
/// unprocessed share the record's sample buffer.
///
/// Every emitted grain gets the same constant spacing and channel from the [SequenceOptions].
#[derive(Default)]
pub struct Sequencer {
    options: SequenceOptions,
    chain: EffectChain,
    cycle: EffectCycle,
}

impl Sequencer {
    pub fn new(options: SequenceOptions) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self {
            options,
            chain: EffectChain::new(),
            cycle: EffectCycle::new(),
        })
    }

    /// Set the effect chain which gets applied to every grain.
    pub fn with_chain(mut self, chain: EffectChain) -> Self {
        self.chain = chain;
        self
    }

    /// Set the effect cycle from which one effect gets applied per grain.
    pub fn with_cycle(mut self, cycle: EffectCycle) -> Self {
        self.cycle = cycle;
        self
    }

    pub fn options(&self) -> &SequenceOptions {
        &self.options
    }

    /// Emit all grains of the pool once, stable sorted by the given features.
    pub fn by_features(
        &self,
        pool: &[Arc<GrainRecord>],
        sort: &FeatureSort,
    ) -> Result<GrainSequence, Error> {
        Self::ensure_not_empty(pool, "feature sorted")?;
        let keys = sort.keys();
        let mut order = pool.iter().collect::<Vec<_>>();
        order.sort_by(|a, b| FeatureSort::compare(&keys, a, b));
        self.emit(order)
    }

    /// Replicate the pool `repeats` times, shuffle the copies with the given random source and
    /// emit them in shuffled order. Deterministic for a seeded random source.
    pub fn stochastic<R: Rng + ?Sized>(
        &self,
        pool: &[Arc<GrainRecord>],
        repeats: usize,
        rng: &mut R,
    ) -> Result<GrainSequence, Error> {
        Self::ensure_not_empty(pool, "stochastic")?;
        let mut order = Self::replicate(pool, repeats);
        order.shuffle(rng);
        self.emit(order)
    }

    /// Replicate the pool `repeats` times in pool order, without shuffling.
    pub fn repeat(
        &self,
        pool: &[Arc<GrainRecord>],
        repeats: usize,
    ) -> Result<GrainSequence, Error> {
        Self::ensure_not_empty(pool, "repeat")?;
        self.emit(Self::replicate(pool, repeats))
    }

    /// For each target value, emit the pool grain whose feature value is nearest to it.
    /// Grains without a value for the feature are never picked.
    pub fn targeted(
        &self,
        pool: &[Arc<GrainRecord>],
        feature: GrainFeature,
        targets: &[f32],
    ) -> Result<GrainSequence, Error> {
        Self::ensure_not_empty(pool, "targeted")?;
        let candidates = pool
            .iter()
            .filter_map(|record| record.feature(feature).map(|value| (value, record)))
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return Err(Error::EmptyInput(format!(
                "No grains with a '{feature}' value in the targeted sequencing pool"
            )));
        }
        let order = targets
            .iter()
            .map(|target| {
                candidates
                    .iter()
                    .min_by(|(a, _), (b, _)| (a - target).abs().total_cmp(&(b - target).abs()))
                    .map(|(_, record)| *record)
                    .unwrap_or(candidates[0].1)
            })
            .collect::<Vec<_>>();
        self.emit(order)
    }

    fn ensure_not_empty(pool: &[Arc<GrainRecord>], policy: &str) -> Result<(), Error> {
        if pool.is_empty() {
            Err(Error::EmptyInput(format!(
                "No candidate grains for {policy} sequencing"
            )))
        } else {
            Ok(())
        }
    }

    fn replicate(pool: &[Arc<GrainRecord>], repeats: usize) -> Vec<&Arc<GrainRecord>> {
        let mut order = Vec::with_capacity(pool.len() * repeats);
        for _ in 0..repeats {
            order.extend(pool.iter());
        }
        order
    }

    fn emit<'a, I>(&self, order: I) -> Result<GrainSequence, Error>
    where
        I: IntoIterator<Item = &'a Arc<GrainRecord>>,
    {
        let order = order.into_iter();
        let mut sequence = GrainSequence::with_capacity(order.size_hint().0);
        for (index, record) in order.enumerate() {
            let samples = self.process_grain(index, record)?;
            sequence.push(PlacedGrain::with_processed_samples(
                Arc::clone(record),
                samples,
                self.options.channel,
                self.options.spacing,
            ));
        }
        log::debug!(
            "Sequenced {} grains with spacing {}, effect chain {:?}, effect cycle {:?}",
            sequence.len(),
            self.options.spacing,
            self.chain.names(),
            self.cycle.names()
        );
        Ok(sequence)
    }

    fn process_grain(&self, index: usize, record: &GrainRecord) -> Result<Arc<Vec<f32>>, Error> {
        let source = record
            .samples()
            .ok_or(Error::GrainNotRealized(record.id()))?;

        let mut processed = self.chain.process(source);
        if let Some(effect) = self.cycle.effect_at(index) {
            let input = processed.as_deref().unwrap_or(source.as_slice());
            processed = Some(effect.process(input));
        }
        if let Some(level_db) = self.options.level_db {
            let input = processed.as_deref().unwrap_or(source.as_slice());
            let input_peak = peak(input);
            if input_peak > 0.0 {
                let scale = db_to_linear(level_db) / input_peak;
                processed = Some(input.iter().map(|sample| sample * scale).collect());
            } else {
                log::warn!(
                    "Grain {} is silent: skipping level normalization",
                    record.id()
                );
            }
        }
        Ok(match processed {
            Some(samples) => Arc::new(samples),
            None => Arc::clone(source),
        })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::gain::GainEffect;
    use rand::{rngs::SmallRng, SeedableRng};

    fn grain(id: u64, value: f32) -> Arc<GrainRecord> {
        Arc::new(
            GrainRecord::with_samples(id, format!("{id}.wav"), vec![value; 8], 44100).unwrap(),
        )
    }

    fn ids(sequence: &GrainSequence) -> Vec<u64> {
        sequence.iter().map(|g| g.record().id()).collect()
    }

    #[test]
    fn empty_pool() {
        let sequencer = Sequencer::default();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(matches!(
            sequencer.repeat(&[], 3),
            Err(Error::EmptyInput(_))
        ));
        assert!(matches!(
            sequencer.stochastic(&[], 3, &mut rng),
            Err(Error::EmptyInput(_))
        ));
        assert!(matches!(
            sequencer.by_features(&[], &FeatureSort::default()),
            Err(Error::EmptyInput(_))
        ));
        assert!(matches!(
            sequencer.targeted(&[], GrainFeature::Midi, &[60.0]),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn unrealized_grains() {
        let record = Arc::new(GrainRecord::new(3, "a.wav", 0, 10, 44100).unwrap());
        assert!(matches!(
            Sequencer::default().repeat(&[record], 1),
            Err(Error::GrainNotRealized(3))
        ));
    }

    #[test]
    fn repeat() {
        let pool = [grain(1, 0.1), grain(2, 0.2)];
        let options = SequenceOptions::new().spacing(-4).channel(1);
        let sequence = Sequencer::new(options).unwrap().repeat(&pool, 3).unwrap();
        assert_eq!(ids(&sequence), vec![1, 2, 1, 2, 1, 2]);
        assert!(sequence.iter().all(|g| g.spacing() == -4 && g.channel() == 1));
        // no processing: samples are shared with the records
        assert!(Arc::ptr_eq(
            sequence[0].samples(),
            pool[0].samples().unwrap()
        ));
        assert!(Arc::ptr_eq(
            sequence[2].samples(),
            sequence[0].samples()
        ));
    }

    #[test]
    fn stochastic_is_deterministic() {
        let pool = (0..10).map(|id| grain(id, 0.5)).collect::<Vec<_>>();
        let sequencer = Sequencer::default();
        let first = sequencer
            .stochastic(&pool, 5, &mut SmallRng::seed_from_u64(42))
            .unwrap();
        let second = sequencer
            .stochastic(&pool, 5, &mut SmallRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(first.len(), 50);
        assert_eq!(ids(&first), ids(&second));

        // every grain shows up `repeats` times
        let mut sorted = ids(&first);
        sorted.sort();
        let expected = (0..10).flat_map(|id| [id; 5]).collect::<Vec<_>>();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn feature_sort_precedence() {
        let record = |id: u64, flatness: f32, centroid: Option<f32>| {
            let record = GrainRecord::with_samples(id, "a.wav", vec![0.5; 4], 44100)
                .unwrap()
                .with_feature(GrainFeature::SpectralFlatness, flatness);
            Arc::new(match centroid {
                Some(value) => record.with_feature(GrainFeature::SpectralCentroid, value),
                None => record,
            })
        };
        let pool = [
            record(1, 0.2, Some(100.0)),
            record(2, 0.1, Some(300.0)),
            record(3, 0.2, None),
            record(4, 0.1, Some(100.0)),
        ];
        let sequencer = Sequencer::default();
        let features = vec![GrainFeature::SpectralFlatness, GrainFeature::SpectralCentroid];

        // centroid is primary, missing values last, flatness breaks ties
        let last_wins = FeatureSort::new(features.clone());
        let sequence = sequencer.by_features(&pool, &last_wins).unwrap();
        assert_eq!(ids(&sequence), vec![4, 1, 2, 3]);

        // flatness is primary, centroid breaks ties
        let first_wins = FeatureSort::new(features).precedence(SortPrecedence::FirstKeyPrimary);
        let sequence = sequencer.by_features(&pool, &first_wins).unwrap();
        assert_eq!(ids(&sequence), vec![4, 2, 1, 3]);

        // no keys: pool order
        let sequence = sequencer.by_features(&pool, &FeatureSort::default()).unwrap();
        assert_eq!(ids(&sequence), vec![1, 2, 3, 4]);
    }

    #[test]
    fn targeted() {
        let pool = (60..=72)
            .map(|midi| {
                Arc::new(
                    GrainRecord::with_samples(midi, "a.wav", vec![0.5; 4], 44100)
                        .unwrap()
                        .with_feature(GrainFeature::Midi, midi as f32),
                )
            })
            .collect::<Vec<_>>();
        let sequence = Sequencer::default()
            .targeted(&pool, GrainFeature::Midi, &line(60.0, 72.0, 4))
            .unwrap();
        assert_eq!(ids(&sequence), vec![60, 63, 66, 69]);

        assert!(matches!(
            Sequencer::default().targeted(&pool, GrainFeature::Energy, &[1.0]),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn grain_pipeline() {
        let pool = [grain(1, 0.25), grain(2, 0.0)];
        let chain = EffectChain::new().with(GainEffect::with_gain_db(6.0));
        let cycle = EffectCycle::new()
            .with(|input: &[f32]| input.to_vec())
            .with(|input: &[f32]| input.iter().map(|v| -v).collect::<Vec<_>>());
        let sequencer = Sequencer::new(SequenceOptions::new().level_db(-6.0))
            .unwrap()
            .with_chain(chain)
            .with_cycle(cycle);
        let sequence = sequencer.repeat(&pool, 2).unwrap();

        let target = db_to_linear(-6.0);
        // sequence is [1, 2, 1, 2]: grain 1 only hits the identity cycle slot
        assert!((sequence[0].samples()[0] - target).abs() < 1e-6);
        assert!((sequence[2].samples()[0] - target).abs() < 1e-6);
        // grain 2 is silent and stays silent
        assert!(sequence[1].samples().iter().all(|v| *v == 0.0));
        // record buffers are never touched
        assert_eq!(pool[0].samples().unwrap()[0], 0.25);
    }

    #[test]
    fn cycle_by_position() {
        let pool = [grain(1, 0.5)];
        let cycle = EffectCycle::new()
            .with(|input: &[f32]| input.to_vec())
            .with(|input: &[f32]| input.iter().map(|v| -v).collect::<Vec<_>>());
        let sequence = Sequencer::default()
            .with_cycle(cycle)
            .repeat(&pool, 4)
            .unwrap();
        let first_samples = sequence
            .iter()
            .map(|g| g.samples()[0])
            .collect::<Vec<_>>();
        assert_eq!(first_samples, vec![0.5, -0.5, 0.5, -0.5]);
    }

    #[test]
    fn invalid_options() {
        assert!(Sequencer::new(SequenceOptions::new().level_db(f32::NAN)).is_err());
        assert!(Sequencer::new(SequenceOptions::new().level_db(-18.0)).is_ok());
    }

    #[test]
    fn line_values() {
        assert!(line(0.0, 1.0, 0).is_empty());
        assert_eq!(line(0.0, 1.0, 4), vec![0.0, 0.25, 0.5, 0.75]);
    }
}
