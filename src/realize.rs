//! Attaching sample buffers to catalogue records before they get sequenced.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use crate::{grain::GrainRecord, Error};

// -------------------------------------------------------------------------------------------------

pub mod file;

// -------------------------------------------------------------------------------------------------

/// Provides the raw samples of a grain record's frame range.
///
/// Implemented for [FileSampleProvider](crate::FileSampleProvider) and for closures of type
/// `FnMut(&GrainRecord) -> Result<Arc<Vec<f32>>, Error>`. Returned buffers must have exactly
/// [GrainRecord::frame_count] samples.
pub trait SampleProvider {
    fn samples(&mut self, record: &GrainRecord) -> Result<Arc<Vec<f32>>, Error>;
}

impl<F> SampleProvider for F
where
    F: FnMut(&GrainRecord) -> Result<Arc<Vec<f32>>, Error>,
{
    fn samples(&mut self, record: &GrainRecord) -> Result<Arc<Vec<f32>>, Error> {
        self(record)
    }
}

// -------------------------------------------------------------------------------------------------

/// Attach sample buffers to the given records and share them for sequencing.
///
/// Records are identified by their catalogue id: repeated picks of the same entry are realized
/// once and resolve to the same shared record and sample buffer. Records which are already
/// realized are passed through. Records whose samples contain NaN or infinite values are
/// discarded with a warning. Provider failures (missing files, frame ranges out of bounds) are
/// fatal and abort the whole realization.
pub fn realize_grains<P: SampleProvider + ?Sized>(
    records: Vec<GrainRecord>,
    provider: &mut P,
) -> Result<Vec<Arc<GrainRecord>>, Error> {
    let record_count = records.len();
    let mut realized = Vec::with_capacity(record_count);
    // `None` marks discarded records
    let mut shared = HashMap::<u64, Option<Arc<GrainRecord>>>::new();
    for record in records {
        let entry = match shared.entry(record.id()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if !record.is_realized() {
                    let samples = provider.samples(&record)?;
                    if samples.iter().any(|s| !s.is_finite()) {
                        log::warn!(
                            "Discarding grain {} from '{}': samples contain non-finite values",
                            record.id(),
                            record.file().display()
                        );
                        entry.insert(None);
                        continue;
                    }
                    record.attach_samples(samples)?;
                }
                entry.insert(Some(Arc::new(record)))
            }
        };
        if let Some(record) = entry {
            realized.push(Arc::clone(record));
        }
    }
    log::debug!(
        "Realized {} of {record_count} grains from {} catalogue entries",
        realized.len(),
        shared.len()
    );
    Ok(realized)
}

// -------------------------------------------------------------------------------------------------
