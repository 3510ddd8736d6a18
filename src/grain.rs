//! Grain metadata records and their placements in a playback sequence.

use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Named scalar features of a grain, as stored in the grain catalogue.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum GrainFeature {
    Frequency,
    Midi,
    Energy,
    SpectralCentroid,
    SpectralEntropy,
    SpectralFlatness,
    SpectralKurtosis,
    #[strum(serialize = "spectral_roll_off_50")]
    SpectralRollOff50,
    #[strum(serialize = "spectral_roll_off_75")]
    SpectralRollOff75,
    #[strum(serialize = "spectral_roll_off_90")]
    SpectralRollOff90,
    #[strum(serialize = "spectral_roll_off_95")]
    SpectralRollOff95,
    SpectralSkewness,
    SpectralSlope,
    #[strum(serialize = "spectral_slope_0_1_khz")]
    SpectralSlope01Khz,
    #[strum(serialize = "spectral_slope_1_5_khz")]
    SpectralSlope15Khz,
    #[strum(serialize = "spectral_slope_0_5_khz")]
    SpectralSlope05Khz,
    SpectralVariance,
}

// -------------------------------------------------------------------------------------------------

/// Immutable metadata of a single grain, plus its lazily attached sample buffer.
///
/// Records get created by a [GrainCatalogue](crate::GrainCatalogue) and are shared as
/// `Arc<GrainRecord>` by all placements that reuse the same catalogue entry. The sample buffer
/// can be attached exactly once (see [realize_grains](crate::realize_grains)) and is never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct GrainRecord {
    id: u64,
    file: PathBuf,
    start_frame: usize,
    end_frame: usize,
    sample_rate: u32,
    features: HashMap<GrainFeature, f32>,
    samples: OnceLock<Arc<Vec<f32>>>,
}

impl GrainRecord {
    /// Create a new, unrealized grain record. `start_frame` must be smaller than `end_frame`.
    pub fn new<P: AsRef<Path>>(
        id: u64,
        file: P,
        start_frame: usize,
        end_frame: usize,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        if start_frame >= end_frame {
            return Err(Error::ParameterError(format!(
                "Grain {id}: start frame {start_frame} must be smaller than end frame {end_frame}"
            )));
        }
        if sample_rate == 0 {
            return Err(Error::ParameterError(format!(
                "Grain {id}: sample rate must be > 0"
            )));
        }
        Ok(Self {
            id,
            file: file.as_ref().to_path_buf(),
            start_frame,
            end_frame,
            sample_rate,
            features: HashMap::new(),
            samples: OnceLock::new(),
        })
    }

    /// Create a record which is realized with the given in-memory samples. The frame range is
    /// `0..samples.len()`.
    pub fn with_samples<P: AsRef<Path>>(
        id: u64,
        file: P,
        samples: Vec<f32>,
        sample_rate: u32,
    ) -> Result<Self, Error> {
        let record = Self::new(id, file, 0, samples.len(), sample_rate)?;
        record.attach_samples(Arc::new(samples))?;
        Ok(record)
    }

    /// Builder function to set a feature value.
    pub fn with_feature(mut self, feature: GrainFeature, value: f32) -> Self {
        self.features.insert(feature, value);
        self
    }

    /// Unique id of the grain in the catalogue.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Path of the source file, as recorded in the catalogue.
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn end_frame(&self) -> usize {
        self.end_frame
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration of the grain in frames.
    pub fn frame_count(&self) -> usize {
        self.end_frame - self.start_frame
    }

    /// Duration of the grain in seconds.
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Value of the given feature, or `None` when the catalogue has no value for it.
    pub fn feature(&self, feature: GrainFeature) -> Option<f32> {
        self.features.get(&feature).copied()
    }

    /// All known feature values.
    pub fn features(&self) -> &HashMap<GrainFeature, f32> {
        &self.features
    }

    /// The attached sample buffer, if the grain got realized.
    pub fn samples(&self) -> Option<&Arc<Vec<f32>>> {
        self.samples.get()
    }

    pub fn is_realized(&self) -> bool {
        self.samples.get().is_some()
    }

    /// Attach the grain's sample buffer. The buffer length must match the frame range, and a
    /// buffer can only be attached once.
    pub fn attach_samples(&self, samples: Arc<Vec<f32>>) -> Result<(), Error> {
        if samples.len() != self.frame_count() {
            return Err(Error::ShapeError(format!(
                "Grain {}: got {} samples for a range of {} frames",
                self.id,
                samples.len(),
                self.frame_count()
            )));
        }
        self.samples.set(samples).map_err(|_| {
            Error::ParameterError(format!("Grain {} is already realized", self.id))
        })
    }
}

// -------------------------------------------------------------------------------------------------

/// Absolute position of a placed grain in the output timeline, in frames.
/// `start` may be negative when spacing drove the grain before the timeline origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrainSpan {
    pub start: i64,
    pub end: i64,
}

impl GrainSpan {
    pub fn len(&self) -> usize {
        (self.end - self.start).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

// -------------------------------------------------------------------------------------------------

/// A grain record with placement attributes: the processed sample buffer, the target channel,
/// the signed spacing to its predecessor and, once resolved, its absolute span.
///
/// Placed grains are never edited in place by the render stages: each stage builds a new value
/// via the `with_XXX` functions. Sample buffers and records are shared, so this is cheap.
#[derive(Clone, Debug)]
pub struct PlacedGrain {
    record: Arc<GrainRecord>,
    samples: Arc<Vec<f32>>,
    channel: usize,
    spacing: i64,
    span: Option<GrainSpan>,
}

impl PlacedGrain {
    /// Place the given realized record with its unprocessed sample buffer.
    pub fn new(record: Arc<GrainRecord>, channel: usize, spacing: i64) -> Result<Self, Error> {
        let samples = record
            .samples()
            .cloned()
            .ok_or(Error::GrainNotRealized(record.id()))?;
        Ok(Self::with_processed_samples(
            record, samples, channel, spacing,
        ))
    }

    /// Place the given record with an already processed sample buffer.
    pub fn with_processed_samples(
        record: Arc<GrainRecord>,
        samples: Arc<Vec<f32>>,
        channel: usize,
        spacing: i64,
    ) -> Self {
        Self {
            record,
            samples,
            channel,
            spacing,
            span: None,
        }
    }

    /// The catalogue record this grain got created from.
    pub fn record(&self) -> &Arc<GrainRecord> {
        &self.record
    }

    /// The processed samples, which get merged into the output.
    pub fn samples(&self) -> &Arc<Vec<f32>> {
        &self.samples
    }

    /// Length of the processed samples in frames.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 0-based target channel index.
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Signed frame offset between the end of the previous grain and the start of this one:
    /// negative values overlap, positive values leave a silent gap.
    pub fn spacing(&self) -> i64 {
        self.spacing
    }

    /// Absolute position in the output timeline, once resolved.
    pub fn span(&self) -> Option<GrainSpan> {
        self.span
    }

    /// Copy of this grain, moved to the given channel.
    pub fn with_channel(&self, channel: usize) -> Self {
        Self {
            channel,
            ..self.clone()
        }
    }

    /// Copy of this grain with a new spacing. Clears a resolved span, because it no longer
    /// matches the spacing.
    pub fn with_spacing(&self, spacing: i64) -> Self {
        Self {
            spacing,
            span: None,
            ..self.clone()
        }
    }

    /// Copy of this grain, placed at the given absolute start frame.
    pub fn with_start(&self, start: i64) -> Self {
        Self {
            span: Some(GrainSpan {
                start,
                end: start + self.samples.len() as i64,
            }),
            ..self.clone()
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// An ordered list of placed grains. The order is the playback order.
#[derive(Clone, Debug, Default)]
pub struct GrainSequence {
    grains: Vec<PlacedGrain>,
}

impl GrainSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            grains: Vec::with_capacity(capacity),
        }
    }

    /// Append a grain to the end of the sequence.
    pub fn push(&mut self, grain: PlacedGrain) {
        self.grains.push(grain);
    }

    /// Length of the timeline once resolved: the max end index of all grains, or `None` when
    /// any grain is not yet resolved.
    pub fn resolved_len(&self) -> Option<usize> {
        self.grains.iter().try_fold(0usize, |len, grain| {
            grain.span().map(|span| len.max(span.end.max(0) as usize))
        })
    }

    pub fn into_vec(self) -> Vec<PlacedGrain> {
        self.grains
    }
}

impl Deref for GrainSequence {
    type Target = [PlacedGrain];

    fn deref(&self) -> &Self::Target {
        &self.grains
    }
}

// Length preserving access only: slices can be swapped and shuffled, but not resized.
impl DerefMut for GrainSequence {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.grains
    }
}

impl From<Vec<PlacedGrain>> for GrainSequence {
    fn from(grains: Vec<PlacedGrain>) -> Self {
        Self { grains }
    }
}

impl FromIterator<PlacedGrain> for GrainSequence {
    fn from_iter<I: IntoIterator<Item = PlacedGrain>>(iter: I) -> Self {
        Self {
            grains: iter.into_iter().collect(),
        }
    }
}

impl Extend<PlacedGrain> for GrainSequence {
    fn extend<I: IntoIterator<Item = PlacedGrain>>(&mut self, iter: I) {
        self.grains.extend(iter);
    }
}

impl IntoIterator for GrainSequence {
    type Item = PlacedGrain;
    type IntoIter = std::vec::IntoIter<PlacedGrain>;

    fn into_iter(self) -> Self::IntoIter {
        self.grains.into_iter()
    }
}

impl<'a> IntoIterator for &'a GrainSequence {
    type Item = &'a PlacedGrain;
    type IntoIter = std::slice::Iter<'a, PlacedGrain>;

    fn into_iter(self) -> Self::IntoIter {
        self.grains.iter()
    }
}

// -------------------------------------------------------------------------------------------------
