//! Morphing between two grain sequences by shifting their mixture ratio over time.

use crate::grain::{GrainSequence, PlacedGrain};

// -------------------------------------------------------------------------------------------------

/// Default number of interpolation steps for sequences of length `m` and `n`:
/// `ceil(sqrt(2 * min(m, n)))`, at least 1.
pub fn default_interpolations(m: usize, n: usize) -> usize {
    ((2 * m.min(n)) as f64).sqrt().ceil().max(1.0) as usize
}

/// Create a new sequence which starts dominated by `a` and ends dominated by `b`.
///
/// The grains of both sequences are split into `interpolations` steps: `a` with linearly
/// decreasing, `b` with linearly increasing chunk sizes. Within each step the two chunks get
/// interleaved in proportional batches, so the local A:B ratio follows the step's ratio.
/// The result is a permutation of `a` and `b`: no grain is dropped or duplicated and the
/// relative order of each input's grains is preserved.
///
/// When `interpolations` is `None`, [default_interpolations] is used. Step counts larger than
/// the sequences produce empty steps. Positions are not resolved: run
/// [resolve_positions](crate::resolve_positions) on the result.
pub fn interpolate(
    a: GrainSequence,
    b: GrainSequence,
    interpolations: Option<usize>,
) -> GrainSequence {
    let (m, n) = (a.len(), b.len());
    if m == 0 {
        return b;
    }
    if n == 0 {
        return a;
    }
    let steps = interpolations
        .unwrap_or_else(|| default_interpolations(m, n))
        .max(1);

    let a_sizes = chunk_sizes(m, steps, Slope::Falling);
    let b_sizes = chunk_sizes(n, steps, Slope::Rising);
    log::debug!("Interpolating {m} -> {n} grains in {steps} steps: {a_sizes:?} / {b_sizes:?}");

    let mut a = a.into_iter();
    let mut b = b.into_iter();
    let mut output = GrainSequence::with_capacity(m + n);
    for (a_size, b_size) in a_sizes.into_iter().zip(b_sizes) {
        let a_chunk = a.by_ref().take(a_size).collect::<Vec<_>>();
        let b_chunk = b.by_ref().take(b_size).collect::<Vec<_>>();
        interleave(a_chunk, b_chunk, &mut output);
    }
    // chunk sizes exhaust both inputs, but never drop anything
    output.extend(a.chain(b));

    debug_assert_eq!(output.len(), m + n);
    output
}

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Slope {
    Rising,
    Falling,
}

/// Split `total` items into `steps` linearly rising or falling chunk sizes which sum up to
/// exactly `total`. Sizes are derived from rounded cumulative targets, so rounding residue lands
/// in the step where it accrues.
fn chunk_sizes(total: usize, steps: usize, slope: Slope) -> Vec<usize> {
    let weight_sum = steps * (steps + 1) / 2;
    let mut cumulative_weight = 0;
    let mut consumed = 0;
    (0..steps)
        .map(|step| {
            cumulative_weight += match slope {
                Slope::Rising => step + 1,
                Slope::Falling => steps - step,
            };
            let target = (total * cumulative_weight + weight_sum / 2) / weight_sum;
            let size = target - consumed;
            consumed = target;
            size
        })
        .collect()
}

/// Interleave two chunks: the larger one is emitted in batches sized to the ratio between both
/// chunks, alternated with single items of the smaller one. A-items precede B-items in every
/// round. Remaining items are appended.
fn interleave(a: Vec<PlacedGrain>, b: Vec<PlacedGrain>, output: &mut GrainSequence) {
    if a.is_empty() || b.is_empty() {
        output.extend(a.into_iter().chain(b));
        return;
    }
    let a_is_larger = a.len() >= b.len();
    let (larger_len, smaller_len) = if a_is_larger {
        (a.len(), b.len())
    } else {
        (b.len(), a.len())
    };
    let ratio = larger_len as f64 / smaller_len as f64;

    let mut a = a.into_iter();
    let mut b = b.into_iter();
    for round in 0..smaller_len {
        let batch = ((round + 1) as f64 * ratio).round() as usize
            - (round as f64 * ratio).round() as usize;
        let (a_batch, b_batch) = if a_is_larger { (batch, 1) } else { (1, batch) };
        output.extend(a.by_ref().take(a_batch));
        output.extend(b.by_ref().take(b_batch));
    }
    output.extend(a.chain(b));
}

// -------------------------------------------------------------------------------------------------
