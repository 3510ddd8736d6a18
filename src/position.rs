use crate::grain::GrainSequence;

// -------------------------------------------------------------------------------------------------

/// Convert the relative spacing of all grains into absolute positions, in sequence order.
///
/// The first grain starts at frame 0, its spacing is ignored. Each following grain starts at
/// `previous.end + spacing`. Start indices are not clamped: spacings which drive a grain before
/// the timeline origin produce negative starts. The merger skips the frames before 0.
///
/// Sample buffers are shared, not copied.
pub fn resolve_positions(sequence: &mut GrainSequence) {
    let mut previous_end = None;
    for grain in sequence.iter_mut() {
        let start = match previous_end {
            None => 0,
            Some(end) => end + grain.spacing(),
        };
        *grain = grain.with_start(start);
        previous_end = grain.span().map(|span| span.end);
    }
    if let Some(len) = sequence.resolved_len() {
        log::debug!(
            "Resolved positions of {} grains: timeline length is {len} frames",
            sequence.len()
        );
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grain::GrainSpan, GrainRecord, PlacedGrain};
    use std::sync::Arc;

    fn sequence(lengths: &[usize], spacing: i64) -> GrainSequence {
        lengths
            .iter()
            .enumerate()
            .map(|(id, len)| {
                let record =
                    GrainRecord::with_samples(id as u64, "a.wav", vec![0.5; *len], 44100).unwrap();
                PlacedGrain::new(Arc::new(record), 0, spacing).unwrap()
            })
            .collect()
    }

    #[test]
    fn constant_spacing() {
        for spacing in [-300, -100, 0, 250] {
            let mut grains = sequence(&[1000; 6], spacing);
            resolve_positions(&mut grains);
            for (i, grain) in grains.iter().enumerate() {
                let start = i as i64 * (1000 + spacing);
                assert_eq!(
                    grain.span(),
                    Some(GrainSpan {
                        start,
                        end: start + 1000
                    })
                );
            }
        }
    }

    #[test]
    fn mixed_lengths_and_spacings() {
        let mut grains = sequence(&[10, 20, 5], 0);
        grains[0] = grains[0].with_spacing(100); // ignored
        grains[1] = grains[1].with_spacing(-5);
        grains[2] = grains[2].with_spacing(7);
        resolve_positions(&mut grains);
        let spans = grains.iter().filter_map(|g| g.span()).collect::<Vec<_>>();
        assert_eq!(
            spans,
            vec![
                GrainSpan { start: 0, end: 10 },
                GrainSpan { start: 5, end: 25 },
                GrainSpan { start: 32, end: 37 },
            ]
        );
        assert_eq!(grains.resolved_len(), Some(37));
    }

    #[test]
    fn negative_starts_pass_through() {
        let mut grains = sequence(&[4, 4], -10);
        resolve_positions(&mut grains);
        assert_eq!(grains[1].span(), Some(GrainSpan { start: -6, end: -2 }));
        assert_eq!(grains.resolved_len(), Some(4));
    }

    #[test]
    fn empty_sequence() {
        let mut grains = GrainSequence::new();
        resolve_positions(&mut grains);
        assert_eq!(grains.resolved_len(), Some(0));
    }
}
