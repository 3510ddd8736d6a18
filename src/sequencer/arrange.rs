//! Length preserving edit passes over already sequenced grains.

use rand::{seq::SliceRandom, Rng};

use crate::{grain::GrainSequence, Error};

// -------------------------------------------------------------------------------------------------

/// Swap the grains at `i` and `i + 1` for every `i` with `(i + 1) % n == 0`, breaking up
/// the periodicity of repeated grain lists. `n` must be > 0.
pub fn swap_nth_adjacent_pairs(sequence: &mut GrainSequence, n: usize) -> Result<(), Error> {
    if n == 0 {
        return Err(Error::ParameterError(
            "Swap interval must be > 0".to_string(),
        ));
    }
    let mut index = n - 1;
    while index + 1 < sequence.len() {
        sequence.swap(index, index + 1);
        index += n;
    }
    Ok(())
}

/// Spread grains round robin across channels: grain `k` goes to channel
/// `(k + offset) % channel_count`.
pub fn assign_channels(
    sequence: &mut GrainSequence,
    channel_count: usize,
    offset: usize,
) -> Result<(), Error> {
    if channel_count == 0 {
        return Err(Error::ParameterError(
            "Channel count must be > 0".to_string(),
        ));
    }
    for (index, grain) in sequence.iter_mut().enumerate() {
        *grain = grain.with_channel((index + offset) % channel_count);
    }
    Ok(())
}

/// Shuffle the grains with the given random source.
pub fn shuffle<R: Rng + ?Sized>(sequence: &mut GrainSequence, rng: &mut R) {
    sequence.shuffle(rng);
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GrainRecord, PlacedGrain};
    use rand::{rngs::SmallRng, SeedableRng};
    use std::sync::Arc;

    fn sequence(len: u64) -> GrainSequence {
        (0..len)
            .map(|id| {
                let record = GrainRecord::with_samples(id, "a.wav", vec![0.0; 2], 44100).unwrap();
                PlacedGrain::new(Arc::new(record), 0, 0).unwrap()
            })
            .collect()
    }

    fn ids(sequence: &GrainSequence) -> Vec<u64> {
        sequence.iter().map(|g| g.record().id()).collect()
    }

    #[test]
    fn swap_pairs() {
        let mut grains = sequence(7);
        swap_nth_adjacent_pairs(&mut grains, 3).unwrap();
        assert_eq!(ids(&grains), vec![0, 1, 3, 2, 4, 6, 5]);

        let mut grains = sequence(4);
        swap_nth_adjacent_pairs(&mut grains, 1).unwrap();
        assert_eq!(ids(&grains), vec![1, 2, 3, 0]);

        let mut grains = sequence(3);
        assert!(swap_nth_adjacent_pairs(&mut grains, 0).is_err());
        swap_nth_adjacent_pairs(&mut grains, 9).unwrap();
        assert_eq!(ids(&grains), vec![0, 1, 2]);
    }

    #[test]
    fn channels() {
        let mut grains = sequence(5);
        assign_channels(&mut grains, 2, 1).unwrap();
        let channels = grains.iter().map(|g| g.channel()).collect::<Vec<_>>();
        assert_eq!(channels, vec![1, 0, 1, 0, 1]);
        assert!(assign_channels(&mut grains, 0, 0).is_err());
    }

    #[test]
    fn shuffled() {
        let mut grains = sequence(20);
        shuffle(&mut grains, &mut SmallRng::seed_from_u64(7));
        assert_eq!(grains.len(), 20);
        let mut sorted = ids(&grains);
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }
}
