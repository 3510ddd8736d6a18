//! Grain catalogue queries: selecting candidate grains by their features.

use std::fmt;

use rand::Rng;

use crate::{
    grain::{GrainFeature, GrainRecord},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// A single condition of a [FeaturePredicate].
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureClause {
    /// Feature value is present and within `low..=high`.
    Between {
        feature: GrainFeature,
        low: f32,
        high: f32,
    },
    /// Feature value is absent.
    IsNull(GrainFeature),
    /// Grain duration equals the given number of frames.
    Length(usize),
    /// Grain's source file path does not contain the given text.
    ExcludeFile(String),
}

impl FeatureClause {
    pub fn matches(&self, record: &GrainRecord) -> bool {
        match self {
            FeatureClause::Between { feature, low, high } => record
                .feature(*feature)
                .is_some_and(|value| value >= *low && value <= *high),
            FeatureClause::IsNull(feature) => record.feature(*feature).is_none(),
            FeatureClause::Length(frames) => record.frame_count() == *frames,
            FeatureClause::ExcludeFile(text) => {
                !record.file().to_string_lossy().contains(text.as_str())
            }
        }
    }
}

impl fmt::Display for FeatureClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureClause::Between { feature, low, high } => {
                write!(f, "{feature} BETWEEN {low} AND {high}")
            }
            FeatureClause::IsNull(feature) => write!(f, "{feature} IS NULL"),
            FeatureClause::Length(frames) => write!(f, "length = {frames}"),
            FeatureClause::ExcludeFile(text) => write!(f, "file NOT LIKE '%{text}%'"),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A conjunction of feature clauses, describing one category of grains.
///
/// ```
/// use grainweave::{FeaturePredicate, GrainFeature};
///
/// let predicate = FeaturePredicate::new()
///     .between(GrainFeature::Frequency, 100.0, 200.0)
///     .is_null(GrainFeature::Midi)
///     .length(4410);
/// assert_eq!(
///     predicate.to_string(),
///     "frequency BETWEEN 100 AND 200 AND midi IS NULL AND length = 4410"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePredicate {
    clauses: Vec<FeatureClause>,
}

impl FeaturePredicate {
    /// Create an empty predicate, which matches all grains.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(mut self, feature: GrainFeature, low: f32, high: f32) -> Self {
        self.clauses.push(FeatureClause::Between { feature, low, high });
        self
    }

    pub fn is_null(mut self, feature: GrainFeature) -> Self {
        self.clauses.push(FeatureClause::IsNull(feature));
        self
    }

    pub fn length(mut self, frames: usize) -> Self {
        self.clauses.push(FeatureClause::Length(frames));
        self
    }

    pub fn exclude_file<S: Into<String>>(mut self, text: S) -> Self {
        self.clauses.push(FeatureClause::ExcludeFile(text.into()));
        self
    }

    pub fn clauses(&self) -> &[FeatureClause] {
        &self.clauses
    }

    /// True when all clauses match the given record.
    pub fn matches(&self, record: &GrainRecord) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}

impl fmt::Display for FeaturePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "TRUE");
        }
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Source of grain metadata records.
///
/// Query results are unordered. Returned records may or may not be realized already: use
/// [realize_grains](crate::realize_grains) to attach their sample buffers.
pub trait GrainCatalogue {
    fn query(&self, predicate: &FeaturePredicate) -> Result<Vec<GrainRecord>, Error>;
}

/// A catalogue which holds all records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogue {
    records: Vec<GrainRecord>,
}

impl MemoryCatalogue {
    pub fn new(records: Vec<GrainRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: GrainRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[GrainRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GrainCatalogue for MemoryCatalogue {
    fn query(&self, predicate: &FeaturePredicate) -> Result<Vec<GrainRecord>, Error> {
        Ok(self
            .records
            .iter()
            .filter(|record| predicate.matches(record))
            .cloned()
            .collect())
    }
}

// -------------------------------------------------------------------------------------------------

/// Query one candidate pool per category predicate.
///
/// Fails with [Error::EmptyInput] for the first category which yields no grains, naming the
/// category index and its predicate.
pub fn select_categories<C: GrainCatalogue + ?Sized>(
    catalogue: &C,
    predicates: &[FeaturePredicate],
) -> Result<Vec<Vec<GrainRecord>>, Error> {
    predicates
        .iter()
        .enumerate()
        .map(|(index, predicate)| {
            let records = catalogue.query(predicate)?;
            if records.is_empty() {
                return Err(Error::EmptyInput(format!(
                    "No grains found for category {index}: {predicate}"
                )));
            }
            log::debug!("Category {index} ({predicate}): {} grains", records.len());
            Ok(records)
        })
        .collect()
}

/// Draw `count` entries uniformly at random from the pool, with replacement.
///
/// This picks the grain identities of a render, so a catalogue entry may show up more than once.
/// Fails with [Error::EmptyInput] when grains are requested from an empty pool.
pub fn pick_unique<T: Clone, R: Rng + ?Sized>(
    pool: &[T],
    count: usize,
    rng: &mut R,
) -> Result<Vec<T>, Error> {
    if pool.is_empty() && count > 0 {
        return Err(Error::EmptyInput(format!(
            "Can't pick {count} grains from an empty pool"
        )));
    }
    Ok((0..count)
        .map(|_| pool[rng.random_range(0..pool.len())].clone())
        .collect())
}

// -------------------------------------------------------------------------------------------------
