// -------------------------------------------------------------------------------------------------

/// Interleave the given planar channels into a newly allocated buffer.
///
/// Channels are expected to have equal lengths: shorter channels are padded with silence up to
/// the length of the longest one.
pub fn planar_to_interleaved(planar: &[Vec<f32>]) -> Vec<f32> {
    let channel_count = planar.len();
    let frame_count = planar.iter().map(Vec::len).max().unwrap_or(0);
    let mut interleaved = vec![0.0; frame_count * channel_count];
    match channel_count {
        0 => (),
        1 => {
            interleaved[..planar[0].len()].copy_from_slice(&planar[0]);
        }
        _ => {
            for (channel_index, channel_values) in planar.iter().enumerate() {
                for (frame_index, value) in channel_values.iter().enumerate() {
                    interleaved[frame_index * channel_count + channel_index] = *value;
                }
            }
        }
    }
    interleaved
}

// -------------------------------------------------------------------------------------------------

/// Copy a single channel out of an interleaved buffer and append it to the given target.
pub fn append_interleaved_channel(
    interleaved: &[f32],
    channel_count: usize,
    channel_index: usize,
    target: &mut Vec<f32>,
) {
    debug_assert!(channel_index < channel_count);
    if channel_count == 1 {
        target.extend_from_slice(interleaved);
    } else {
        target.extend(
            interleaved
                .chunks_exact(channel_count)
                .map(|frame| frame[channel_index]),
        );
    }
}

// -------------------------------------------------------------------------------------------------
