//! Overlap-add merging of resolved grain sequences into a single output signal.

use std::collections::{hash_map::Entry, HashMap};

use crate::{
    grain::GrainSequence,
    signal::Signal,
    window::{WindowFunction, WindowMode},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Sums windowed grains into an output buffer at their resolved positions and divides out the
/// accumulated window mass, so overlapping regions are a weighted average of the contributing
/// grains instead of a raw sum.
///
/// Frames which are not covered by any grain (or only by zero window values) end up as 0.
/// Grain frames before the timeline origin (negative start indices) are skipped.
pub struct OverlapAddMerger {
    channel_count: usize,
    window: Box<dyn WindowFunction>,
}

impl OverlapAddMerger {
    /// Create a new merger for the given output channel count, using a Hann window.
    /// A channel count of 1 produces [Signal::Mono] output, else [Signal::Planar].
    pub fn new(channel_count: usize) -> Result<Self, Error> {
        if channel_count == 0 {
            return Err(Error::ParameterError(
                "Merge channel count must be > 0".to_string(),
            ));
        }
        Ok(Self {
            channel_count,
            window: Box::new(WindowMode::Hann),
        })
    }

    /// Use the given window function to taper grains.
    pub fn with_window<W: WindowFunction + 'static>(mut self, window: W) -> Self {
        self.window = Box::new(window);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Merge a single resolved sequence.
    pub fn merge_sequence(&self, sequence: &GrainSequence) -> Result<Signal, Error> {
        self.merge(&[sequence])
    }

    /// Merge one or more resolved sequences into a single output buffer, sized to the maximum end
    /// index of all their grains.
    pub fn merge(&self, sequences: &[&GrainSequence]) -> Result<Signal, Error> {
        let mut frame_count = 0;
        for sequence in sequences {
            for (index, grain) in sequence.iter().enumerate() {
                let span = grain.span().ok_or(Error::UnresolvedPosition(index))?;
                if grain.channel() >= self.channel_count {
                    return Err(Error::ParameterError(format!(
                        "Grain at sequence index {index} targets channel {}, but the merge only has {} channels",
                        grain.channel(),
                        self.channel_count
                    )));
                }
                frame_count = frame_count.max(span.end.max(0) as usize);
            }
        }
        log::debug!(
            "Merging {} sequences into {} channels with {frame_count} frames",
            sequences.len(),
            self.channel_count
        );

        let mut output = vec![vec![0.0f32; frame_count]; self.channel_count];
        let mut window_mass = vec![vec![0.0f32; frame_count]; self.channel_count];
        let mut windows = HashMap::<usize, Vec<f32>>::new();
        let mut skipped_frames = 0;

        for grain in sequences.iter().flat_map(|sequence| sequence.iter()) {
            let Some(span) = grain.span() else {
                continue;
            };
            let samples = grain.samples();
            let window = match windows.entry(samples.len()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let window = self.window.generate(samples.len());
                    if window.len() != samples.len() {
                        return Err(Error::ParameterError(format!(
                            "Window function returned {} values for a grain of {} frames",
                            window.len(),
                            samples.len()
                        )));
                    }
                    entry.insert(window)
                }
            };

            // skip frames before the timeline origin
            let skip = (-span.start).max(0) as usize;
            skipped_frames += skip.min(samples.len());
            let start = span.start.max(0) as usize;

            let target = &mut output[grain.channel()];
            let mass = &mut window_mass[grain.channel()];
            for (offset, (sample, gain)) in samples.iter().zip(window.iter()).skip(skip).enumerate()
            {
                let frame = start + offset;
                target[frame] += sample * gain;
                mass[frame] += gain;
            }
        }
        if skipped_frames > 0 {
            log::warn!("Skipped {skipped_frames} grain frames before the timeline origin");
        }

        let mut non_finite = 0;
        for (target, mass) in output.iter_mut().zip(window_mass.iter()) {
            for (sample, mass) in target.iter_mut().zip(mass.iter()) {
                let value = *sample / mass;
                if value.is_finite() {
                    *sample = value;
                } else {
                    *sample = 0.0;
                    // frames without any grain are expected to be 0/0
                    if *mass != 0.0 {
                        non_finite += 1;
                    }
                }
            }
        }
        if non_finite > 0 {
            log::warn!("Replaced {non_finite} non-finite merged samples with 0");
        }

        Ok(if self.channel_count == 1 {
            Signal::Mono(output.pop().unwrap_or_default())
        } else {
            Signal::Planar(output)
        })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{position::resolve_positions, GrainRecord, PlacedGrain};
    use std::sync::Arc;

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        // deterministic pseudo random values in [-1, 1]
        let mut state = seed.wrapping_mul(747796405).wrapping_add(2891336453);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    fn sequence(buffers: Vec<Vec<f32>>, spacing: i64) -> GrainSequence {
        let mut sequence = buffers
            .into_iter()
            .enumerate()
            .map(|(id, samples)| {
                let record = GrainRecord::with_samples(id as u64, "a.wav", samples, 44100).unwrap();
                PlacedGrain::new(Arc::new(record), 0, spacing).unwrap()
            })
            .collect::<GrainSequence>();
        resolve_positions(&mut sequence);
        sequence
    }

    fn mono(signal: Signal) -> Vec<f32> {
        match signal {
            Signal::Mono(samples) => samples,
            Signal::Planar(_) => panic!("expected a mono signal"),
        }
    }

    #[test]
    fn invalid_input() {
        assert!(OverlapAddMerger::new(0).is_err());

        let record = Arc::new(GrainRecord::with_samples(1, "a.wav", vec![1.0; 4], 44100).unwrap());
        let unresolved = GrainSequence::from(vec![PlacedGrain::new(record.clone(), 0, 0).unwrap()]);
        let merger = OverlapAddMerger::new(1).unwrap();
        assert!(matches!(
            merger.merge_sequence(&unresolved),
            Err(Error::UnresolvedPosition(0))
        ));

        let mut wrong_channel =
            GrainSequence::from(vec![PlacedGrain::new(record, 2, 0).unwrap()]);
        resolve_positions(&mut wrong_channel);
        assert!(matches!(
            OverlapAddMerger::new(2).unwrap().merge_sequence(&wrong_channel),
            Err(Error::ParameterError(_))
        ));
    }

    #[test]
    fn window_length_mismatch() {
        let merged = sequence(vec![vec![1.0; 8]], 0);
        let merger = OverlapAddMerger::new(1)
            .unwrap()
            .with_window(|len: usize| vec![1.0f32; len / 2]);
        match merger.merge_sequence(&merged) {
            Err(Error::ParameterError(message)) => {
                assert_eq!(
                    message,
                    "Window function returned 4 values for a grain of 8 frames"
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn placement_without_overlap() {
        let grains = vec![noise(64, 1), noise(64, 2)];
        let merged = sequence(grains.clone(), 16);
        let output = mono(OverlapAddMerger::new(1).unwrap().merge_sequence(&merged).unwrap());
        assert_eq!(output.len(), 64 + 16 + 64);

        let window = WindowMode::Hann.generate(64);
        let mut expected = vec![0.0; 144];
        for (offset, grain) in [(0, &grains[0]), (80, &grains[1])] {
            for i in 0..64 {
                // window mass is the window itself: un-windowed samples, except at the
                // zero valued window end points
                expected[offset + i] = if window[i] > 0.0 { grain[i] } else { 0.0 };
            }
        }
        for (out, exp) in output.iter().zip(expected.iter()) {
            assert!((out - exp).abs() < 1e-5, "{out} != {exp}");
        }
        // gap is silent
        assert!(output[64..80].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn overlap_add_identity() {
        let grain = noise(128, 3);
        let merged = sequence(vec![grain.clone(), grain.clone()], -128);
        assert_eq!(merged[1].span().unwrap().start, 0);
        let output = mono(OverlapAddMerger::new(1).unwrap().merge_sequence(&merged).unwrap());
        assert_eq!(output.len(), 128);
        let window = WindowMode::Hann.generate(128);
        for (i, (out, exp)) in output.iter().zip(grain.iter()).enumerate() {
            if window[i] == 0.0 {
                assert_eq!(*out, 0.0);
            } else {
                assert!((out - exp).abs() < 1e-5, "{out} != {exp}");
            }
        }
    }

    #[test]
    fn three_grains_with_overlap() {
        let grains = vec![noise(1000, 4), noise(1000, 5), noise(1000, 6)];
        let merged = sequence(grains.clone(), -200);
        let output = mono(OverlapAddMerger::new(1).unwrap().merge_sequence(&merged).unwrap());
        assert_eq!(output.len(), 3 * 1000 - 2 * 200);
        assert!(output.iter().all(|v| v.is_finite()));

        // center of the first overlap: frames 800..1000 of the first grain and 0..200 of the
        // second one. The result is a weighted average of both grains.
        let center = 900;
        let window = WindowMode::Hann.generate(1000);
        let (a, wa) = (grains[0][center], window[center]);
        let (b, wb) = (grains[1][center - 800], window[center - 800]);
        let expected = (a * wa + b * wb) / (wa + wb);
        assert!((output[center] - expected).abs() < 1e-5);
        assert!(output[center].abs() <= a.abs().max(b.abs()) + 1e-6);
    }

    #[test]
    fn multiple_sequences_and_channels() {
        let left = sequence(vec![vec![0.5; 10], vec![0.5; 10]], 0);
        let mut right = sequence(vec![vec![-0.25; 30]], 0);
        right[0] = right[0].with_channel(1);

        let merger = OverlapAddMerger::new(2)
            .unwrap()
            .with_window(|len: usize| vec![1.0f32; len]);
        let output = merger.merge(&[&left, &right]).unwrap();
        let channels = output.planar().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].len(), 30);
        assert_eq!(channels[0][..20], [0.5; 20]);
        assert_eq!(channels[0][20..], [0.0; 10]);
        assert_eq!(channels[1], vec![-0.25; 30]);
    }

    #[test]
    fn layered_sequences_are_averaged() {
        let a = sequence(vec![vec![1.0; 8]], 0);
        let b = sequence(vec![vec![0.0; 8]], 0);
        let merger = OverlapAddMerger::new(1)
            .unwrap()
            .with_window(|len: usize| vec![1.0f32; len]);
        let output = mono(merger.merge(&[&a, &b]).unwrap());
        assert_eq!(output, vec![0.5; 8]);
    }

    #[test]
    fn negative_starts_are_clipped() {
        let merged = sequence(vec![vec![1.0; 4], vec![2.0; 4]], -6);
        let merger = OverlapAddMerger::new(1)
            .unwrap()
            .with_window(|len: usize| vec![1.0f32; len]);
        let output = mono(merger.merge_sequence(&merged).unwrap());
        // second grain spans -2..2: only its last two frames are merged
        assert_eq!(output, vec![1.5, 1.5, 1.0, 1.0]);
    }
}
